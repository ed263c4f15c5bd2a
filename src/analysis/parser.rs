//! Recursive descent parser for partial-class files.
//!
//! Grammar (the subset that is inspected; everything else is skipped with
//! balanced-delimiter scanning):
//! ```text
//! file       := (using | namespace | type)*
//! using      := 'global'? 'using' 'static'? (IDENT '=')? name ';'
//! namespace  := 'namespace' name ('{' file '}' | ';' file)
//! type       := attributes modifiers ('class' class | other_type)
//! class      := IDENT type_params? params? (':' type (',' type)*)? constraints? ('{' member* '}' | ';')
//! member     := attributes modifiers (ctor | other_type | type (property | method | field))
//! ctor       := IDENT params initializer? body
//! property   := IDENT ('{' accessors '}' ('=' expr ';')? | '=>' expr ';')
//! method     := IDENT type_params? params constraints? body
//! attributes := ('[' (IDENT ':')? attribute (',' attribute)* ']')*
//! ```

use super::lexer::{Token, TokenKind};
use super::{
    ClassSummary, ConstructorSummary, FileSummary, MethodSummary, NamespaceSummary, ParameterSummary,
    ParseError, PropertySummary,
};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "virtual", "override", "abstract",
    "sealed", "new", "partial", "async", "extern", "unsafe", "volatile", "const", "required", "file", "fixed",
];

const PARAMETER_MODIFIERS: &[&str] = &["this", "ref", "out", "in", "params", "scoped", "readonly"];

const OTHER_TYPE_KEYWORDS: &[&str] = &["struct", "interface", "enum", "record", "delegate"];

/// An attribute with its positional string arguments
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    /// Last name segment, without the `Attribute` suffix
    name: String,
    args: Vec<String>,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

/// Parse a token stream into a file summary
pub fn parse_file(tokens: &[Token]) -> Result<FileSummary, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut file = FileSummary::default();
    parser.parse_declarations(&mut file, "", false)?;
    Ok(file)
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(s) | TokenKind::Literal(s) => s.clone(),
        TokenKind::Str(s) => format!("\"{}\"", s),
        TokenKind::Punct(p) => p.to_string(),
    }
}

fn namespace_mut<'f>(file: &'f mut FileSummary, name: &str) -> &'f mut NamespaceSummary {
    let index = match file.namespaces.iter().position(|ns| ns.name == name) {
        Some(index) => index,
        None => {
            file.namespaces.push(NamespaceSummary {
                name: name.to_string(),
                classes: Vec::new(),
            });
            file.namespaces.len() - 1
        }
    };
    &mut file.namespaces[index]
}

impl<'a> Parser<'a> {
    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn is_punct_at(&self, offset: usize, punct: &str) -> bool {
        matches!(self.peek_kind_at(offset), Some(TokenKind::Punct(p)) if *p == punct)
    }

    fn check_punct(&self, punct: &str) -> bool {
        self.is_punct_at(0, punct)
    }

    fn is_ident_at(&self, offset: usize, ident: &str) -> bool {
        matches!(self.peek_kind_at(offset), Some(TokenKind::Ident(s)) if s == ident)
    }

    fn check_ident(&self, ident: &str) -> bool {
        self.is_ident_at(0, ident)
    }

    fn peek_ident(&self) -> Option<&'a str> {
        match self.peek_kind_at(0) {
            Some(TokenKind::Ident(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.check_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ParseError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", punct)))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek_ident() {
            Some(ident) => {
                self.pos += 1;
                Ok(ident.to_string())
            }
            None => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                found: token_text(token),
                expected: expected.to_string(),
                line: token.line,
            },
            None => ParseError::UnexpectedEof(expected.to_string()),
        }
    }

    // =========================================================================
    // Skipping
    // =========================================================================

    /// Skip a delimited group, positioned on `open`
    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<(), ParseError> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.bump().ok_or_else(|| ParseError::UnexpectedEof(format!("'{}'", close)))?;
            if let TokenKind::Punct(p) = token.kind {
                if p == open {
                    depth += 1;
                } else if p == close {
                    depth -= 1;
                }
            }
        }
        Ok(())
    }

    /// Skip up to and including the next `;` outside of any brackets
    fn skip_to_semicolon(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let token = self.bump().ok_or_else(|| ParseError::UnexpectedEof("';'".to_string()))?;
            if let TokenKind::Punct(p) = token.kind {
                match p {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    ";" if depth == 0 => return Ok(()),
                    _ => {}
                }
            }
        }
    }

    /// Skip to the end of a member body: a `{...}` block, `=> expr;` or `;`
    fn skip_member_body(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.peek_kind_at(0) {
                None => return Err(ParseError::UnexpectedEof("a member body".to_string())),
                Some(TokenKind::Punct("{")) if depth == 0 => {
                    self.skip_balanced("{", "}")?;
                    // auto-property initializer
                    if self.check_punct("=") {
                        self.skip_to_semicolon()?;
                    }
                    return Ok(());
                }
                Some(TokenKind::Punct("=>")) if depth == 0 => return self.skip_to_semicolon(),
                Some(TokenKind::Punct(";")) if depth == 0 => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(TokenKind::Punct("(" | "[")) => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(TokenKind::Punct(")" | "]")) => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a struct, interface, enum, record or delegate declaration,
    /// positioned on its keyword
    fn skip_type_declaration(&mut self) -> Result<(), ParseError> {
        self.skip_member_body()?;
        self.eat_punct(";");
        Ok(())
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_declarations(&mut self, file: &mut FileSummary, namespace: &str, in_block: bool) -> Result<(), ParseError> {
        loop {
            if self.peek().is_none() {
                return if in_block {
                    Err(ParseError::UnexpectedEof("'}'".to_string()))
                } else {
                    Ok(())
                };
            }

            if self.check_punct("}") {
                return if in_block {
                    Ok(())
                } else {
                    Err(self.unexpected("a declaration"))
                };
            }

            if self.check_ident("using") || (self.check_ident("global") && self.is_ident_at(1, "using")) {
                let using = self.parse_using()?;
                file.usings.push(using);
                continue;
            }

            if self.check_ident("extern") && self.is_ident_at(1, "alias") {
                self.skip_to_semicolon()?;
                continue;
            }

            if self.check_ident("namespace") {
                self.pos += 1;
                let name = self.parse_qualified_name()?;
                let full_name = if namespace.is_empty() {
                    name
                } else {
                    format!("{}.{}", namespace, name)
                };
                namespace_mut(file, &full_name);

                if self.eat_punct(";") {
                    // file-scoped: the rest of the file belongs to it
                    return self.parse_declarations(file, &full_name, in_block);
                }
                self.expect_punct("{")?;
                self.parse_declarations(file, &full_name, true)?;
                self.expect_punct("}")?;
                continue;
            }

            let attributes = self.parse_attributes()?;
            self.parse_modifiers();

            match self.peek_ident() {
                Some("class") => {
                    let class = self.parse_class(namespace, &attributes)?;
                    namespace_mut(file, namespace).classes.push(class);
                }
                Some(keyword) if OTHER_TYPE_KEYWORDS.contains(&keyword) => self.skip_type_declaration()?,
                // assembly or module attributes
                _ if !attributes.is_empty() => {}
                _ => return Err(self.unexpected("a type declaration")),
            }
        }
    }

    fn parse_using(&mut self) -> Result<String, ParseError> {
        if self.check_ident("global") {
            self.pos += 1;
        }
        self.pos += 1;
        if self.check_ident("static") {
            self.pos += 1;
        }
        if self.peek_ident().is_some() && self.is_punct_at(1, "=") {
            self.pos += 2;
        }

        let mut name = String::new();
        loop {
            let token = self.bump().ok_or_else(|| ParseError::UnexpectedEof("';'".to_string()))?;
            if token.kind == TokenKind::Punct(";") {
                return Ok(name);
            }
            name.push_str(&token_text(token));
        }
    }

    fn parse_qualified_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_ident("a name")?;
        while self.check_punct(".") {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.expect_ident("a name")?);
        }
        Ok(name)
    }

    /// Consume modifier keywords, returning them
    fn parse_modifiers(&mut self) -> Vec<&'a str> {
        let mut modifiers = Vec::new();
        while let Some(ident) = self.peek_ident() {
            if !MODIFIERS.contains(&ident) {
                break;
            }
            modifiers.push(ident);
            self.pos += 1;
        }
        modifiers
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();

        while self.eat_punct("[") {
            // attribute target, e.g. `return:` or `assembly:`
            if self.peek_ident().is_some() && self.is_punct_at(1, ":") {
                self.pos += 2;
            }

            loop {
                let mut name = self.expect_ident("an attribute name")?;
                while self.eat_punct(".") || self.eat_punct("::") {
                    name = self.expect_ident("an attribute name")?;
                }
                let name = name.strip_suffix("Attribute").map(str::to_string).unwrap_or(name);

                let args = if self.check_punct("(") {
                    self.parse_attribute_arguments()?
                } else {
                    Vec::new()
                };
                attributes.push(Attribute { name, args });

                if !self.eat_punct(",") {
                    break;
                }
            }

            self.expect_punct("]")?;
        }

        Ok(attributes)
    }

    /// String literals passed at the top level of an argument list
    fn parse_attribute_arguments(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        let mut depth = 1usize;

        while depth > 0 {
            let token = self.bump().ok_or_else(|| ParseError::UnexpectedEof("')'".to_string()))?;
            match &token.kind {
                TokenKind::Punct("(") => depth += 1,
                TokenKind::Punct(")") => depth -= 1,
                TokenKind::Str(value) if depth == 1 => args.push(value.clone()),
                _ => {}
            }
        }

        Ok(args)
    }

    /// A type reference, rendered without whitespace
    fn parse_type(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();

        if self.check_punct("(") {
            // tuple
            let start = self.pos;
            self.skip_balanced("(", ")")?;
            for token in &self.tokens[start..self.pos] {
                let word = matches!(token.kind, TokenKind::Ident(_));
                if word && text.ends_with(|c: char| c.is_alphanumeric() || c == '_' || c == '>' || c == '?') {
                    text.push(' ');
                }
                text.push_str(&token_text(token));
                if token.kind == TokenKind::Punct(",") {
                    text.push(' ');
                }
            }
        } else {
            loop {
                text.push_str(&self.expect_ident("a type name")?);
                if self.check_punct("<") {
                    text.push_str(&self.parse_type_arguments()?);
                }
                if self.eat_punct("::") {
                    text.push_str("::");
                    continue;
                }
                if self.check_punct(".") && matches!(self.peek_kind_at(1), Some(TokenKind::Ident(_))) {
                    self.pos += 1;
                    text.push('.');
                    continue;
                }
                break;
            }
        }

        loop {
            if self.eat_punct("?") {
                text.push('?');
            } else if self.eat_punct("*") {
                text.push('*');
            } else if self.check_punct("[") && (self.is_punct_at(1, "]") || self.is_punct_at(1, ",")) {
                self.pos += 1;
                text.push('[');
                while self.eat_punct(",") {
                    text.push(',');
                }
                self.expect_punct("]")?;
                text.push(']');
            } else {
                return Ok(text);
            }
        }
    }

    fn parse_type_arguments(&mut self) -> Result<String, ParseError> {
        self.expect_punct("<")?;
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_type()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(">")?;
        Ok(format!("<{}>", arguments.join(",")))
    }

    fn parse_parameters(&mut self) -> Result<Vec<ParameterSummary>, ParseError> {
        self.expect_punct("(")?;
        let mut parameters = Vec::new();
        if self.eat_punct(")") {
            return Ok(parameters);
        }

        loop {
            self.parse_attributes()?;
            while self.peek_ident().is_some_and(|i| PARAMETER_MODIFIERS.contains(&i)) {
                self.pos += 1;
            }

            let type_name = self.parse_type()?;
            let name = self.expect_ident("a parameter name")?;
            parameters.push(ParameterSummary { type_name, name });

            // default value
            if self.eat_punct("=") {
                let mut depth = 0usize;
                while !(depth == 0 && (self.check_punct(",") || self.check_punct(")"))) {
                    let token = self.bump().ok_or_else(|| ParseError::UnexpectedEof("')'".to_string()))?;
                    match token.kind {
                        TokenKind::Punct("(" | "[" | "{") => depth += 1,
                        TokenKind::Punct(")" | "]" | "}") => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
            }

            if !self.eat_punct(",") {
                break;
            }
        }

        self.expect_punct(")")?;
        Ok(parameters)
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn parse_class(&mut self, namespace: &str, attributes: &[Attribute]) -> Result<ClassSummary, ParseError> {
        self.pos += 1;
        let mut class = ClassSummary {
            namespace: namespace.to_string(),
            name: self.expect_ident("a class name")?,
            ..ClassSummary::default()
        };

        for attribute in attributes {
            if matches!(attribute.name.as_str(), "IgnorePropertyType" | "IgnorePropertyTypes") {
                class.ignored_property_types.extend(
                    attribute
                        .args
                        .iter()
                        .filter(|alias| !alias.trim().is_empty())
                        .cloned(),
                );
            }
        }

        if self.check_punct("<") {
            self.skip_balanced("<", ">")?;
        }

        // primary constructor
        if self.check_punct("(") {
            let parameters = self.parse_parameters()?;
            class.constructors.push(ConstructorSummary { parameters });
        }

        if self.eat_punct(":") {
            loop {
                class.base_types.push(self.parse_type()?);
                // base(...) arguments of a primary constructor
                if self.check_punct("(") {
                    self.skip_balanced("(", ")")?;
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }

        while self.check_ident("where") {
            while !(self.check_punct("{") || self.check_punct(";")) {
                if self.check_punct("(") {
                    self.skip_balanced("(", ")")?;
                } else if self.bump().is_none() {
                    return Err(ParseError::UnexpectedEof("a class body".to_string()));
                }
            }
        }

        if self.eat_punct(";") {
            return Ok(class);
        }

        self.expect_punct("{")?;
        while !self.check_punct("}") {
            if self.peek().is_none() {
                return Err(ParseError::UnexpectedEof("'}'".to_string()));
            }
            self.parse_member(&mut class)?;
        }
        self.expect_punct("}")?;
        self.eat_punct(";");

        Ok(class)
    }

    fn parse_member(&mut self, class: &mut ClassSummary) -> Result<(), ParseError> {
        if self.eat_punct(";") {
            return Ok(());
        }

        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();

        match self.peek_ident() {
            Some("class") => {
                // nested classes are not part of the summary
                self.parse_class("", &attributes)?;
                return Ok(());
            }
            Some(keyword) if OTHER_TYPE_KEYWORDS.contains(&keyword) => return self.skip_type_declaration(),
            Some("event" | "implicit" | "explicit") => return self.skip_member_body(),
            Some(name) if name == class.name && self.is_punct_at(1, "(") => {
                self.pos += 1;
                let parameters = self.parse_parameters()?;
                class.constructors.push(ConstructorSummary { parameters });
                return self.skip_member_body();
            }
            _ => {}
        }

        if self.check_punct("~") {
            return self.skip_member_body();
        }

        let type_name = self.parse_type()?;

        if self.check_ident("operator") || self.check_ident("this") {
            return self.skip_member_body();
        }

        let mut name = self.expect_ident("a member name")?;
        let mut generic_method = false;
        loop {
            if self.check_punct("<") {
                self.skip_balanced("<", ">")?;
                generic_method = true;
            }
            // explicit interface implementation
            if self.eat_punct(".") {
                name = self.expect_ident("a member name")?;
                generic_method = false;
                continue;
            }
            break;
        }

        if self.check_punct("(") {
            self.parse_parameters()?;
            class.methods.push(MethodSummary {
                return_type: type_name,
                name,
                is_static: modifiers.contains(&"static"),
            });
            return self.skip_member_body();
        }

        if generic_method {
            return Err(self.unexpected("'('"));
        }

        if self.check_punct("{") || self.check_punct("=>") {
            let implements_property_type = attributes
                .iter()
                .find(|a| a.name == "ImplementPropertyType")
                .and_then(|a| a.args.first().cloned());
            class.properties.push(PropertySummary {
                type_name,
                name,
                implements_property_type,
            });
            return self.skip_member_body();
        }

        if self.check_punct("=") || self.check_punct(";") || self.check_punct(",") {
            // field
            return self.skip_to_semicolon();
        }

        Err(self.unexpected("a member declaration"))
    }
}
