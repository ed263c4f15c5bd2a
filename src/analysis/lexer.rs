//! C# tokenizer for the partial-class analyzer.
//!
//! Produces identifiers, literals and single-character punctuation (plus
//! `::` and `=>`). Comments, whitespace and preprocessor lines are dropped.
//! String literal tokens carry their unescaped value so attribute arguments
//! can be read back.

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword; a verbatim `@` prefix is stripped
    Ident(String),
    /// String literal value
    Str(String),
    /// Character or numeric literal, kept as written
    Literal(String),
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

const PUNCTUATION: &[&str] = &[
    "{", "}", "(", ")", "[", "]", "<", ">", ";", ",", ".", ":", "=", "?", "!", "~", "+", "-", "*", "/", "%", "&",
    "|", "^",
];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    // only whitespace seen since the last newline
    at_line_start: bool,
}

/// Tokenize C# source text
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    // editors commonly save C# with a byte order mark
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        at_line_start: true,
    };
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }

    Ok(tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        } else if !c.is_whitespace() {
            self.at_line_start = false;
        }
        Some(c)
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;

        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let line = self.line;

        let kind = match c {
            '"' => TokenKind::Str(self.read_string(false)?),
            '@' if self.peek_at(1) == Some('"') => {
                self.bump();
                TokenKind::Str(self.read_string(true)?)
            }
            '$' | '@' if matches!(self.peek_at(1), Some('"' | '@' | '$')) => self.read_prefixed_string()?,
            '@' => {
                self.bump();
                TokenKind::Ident(self.read_word())
            }
            '\'' => TokenKind::Literal(self.read_char()?),
            c if c.is_ascii_digit() => TokenKind::Literal(self.read_word()),
            c if c == '_' || c.is_alphabetic() => TokenKind::Ident(self.read_word()),
            ':' if self.peek_at(1) == Some(':') => {
                self.bump();
                self.bump();
                TokenKind::Punct("::")
            }
            '=' if self.peek_at(1) == Some('>') => {
                self.bump();
                self.bump();
                TokenKind::Punct("=>")
            }
            c => {
                let punct = PUNCTUATION
                    .iter()
                    .find(|p| p.starts_with(c))
                    .copied()
                    .ok_or(ParseError::UnexpectedChar { ch: c, line })?;
                self.bump();
                TokenKind::Punct(punct)
            }
        };

        Ok(Some(Token { kind, line }))
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') if self.at_line_start => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let line = self.line;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(ParseError::UnterminatedComment { line }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                word.push(c);
                self.bump();
            } else if c == '.' && word.chars().next().is_some_and(|f| f.is_ascii_digit()) {
                // 1.5m
                if !self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                    break;
                }
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    /// Regular (`"..."`) or verbatim (`@"..."`) string, positioned on the quote
    fn read_string(&mut self, verbatim: bool) -> Result<String, ParseError> {
        let line = self.line;

        // raw string literal: three or more quotes
        let quotes = (0..).take_while(|&i| self.peek_at(i) == Some('"')).count();
        if !verbatim && quotes >= 3 {
            return self.read_raw_string(quotes);
        }

        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') if verbatim && self.peek() == Some('"') => {
                    self.bump();
                    value.push('"');
                }
                Some('"') => return Ok(value),
                Some('\\') if !verbatim => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                    None => return Err(ParseError::UnterminatedLiteral { line }),
                },
                Some('\n') if !verbatim => return Err(ParseError::UnterminatedLiteral { line }),
                Some(c) => value.push(c),
                None => return Err(ParseError::UnterminatedLiteral { line }),
            }
        }
    }

    fn read_raw_string(&mut self, quotes: usize) -> Result<String, ParseError> {
        let line = self.line;
        for _ in 0..quotes {
            self.bump();
        }

        let mut value = String::new();
        loop {
            let closing = (0..quotes).all(|i| self.peek_at(i) == Some('"'));
            if closing {
                for _ in 0..quotes {
                    self.bump();
                }
                return Ok(value.trim().to_string());
            }
            match self.bump() {
                Some(c) => value.push(c),
                None => return Err(ParseError::UnterminatedLiteral { line }),
            }
        }
    }

    /// `$"..."`, `$@"..."`, `@$"..."`, `$$"""..."""`
    fn read_prefixed_string(&mut self) -> Result<TokenKind, ParseError> {
        let mut verbatim = false;
        while let Some(c @ ('$' | '@')) = self.peek() {
            verbatim |= c == '@';
            self.bump();
        }
        if self.peek() != Some('"') {
            return Err(ParseError::UnexpectedChar {
                ch: self.peek().unwrap_or('$'),
                line: self.line,
            });
        }
        Ok(TokenKind::Str(self.read_string(verbatim)?))
    }

    fn read_char(&mut self) -> Result<String, ParseError> {
        let line = self.line;
        let mut literal = String::new();
        if let Some(quote) = self.bump() {
            literal.push(quote);
        }
        loop {
            match self.bump() {
                Some('\\') => {
                    literal.push('\\');
                    if let Some(escaped) = self.bump() {
                        literal.push(escaped);
                    }
                }
                Some('\'') => {
                    literal.push('\'');
                    return Ok(literal);
                }
                Some('\n') | None => return Err(ParseError::UnterminatedLiteral { line }),
                Some(c) => literal.push(c),
            }
        }
    }
}
