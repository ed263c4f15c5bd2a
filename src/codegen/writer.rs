//! Indentation-aware text writer for generated source.

use crate::config::EditorConfigSettings;

/// Accumulates source lines, indenting them by nesting level
#[derive(Debug, Clone)]
pub struct SourceWriter {
    output: String,
    unit: String,
}

impl SourceWriter {
    pub fn new(editor: &EditorConfigSettings) -> Self {
        Self {
            output: String::with_capacity(4096),
            unit: editor.indent_unit(),
        }
    }

    /// Write `text` at `level`, followed by a newline
    pub fn line(&mut self, level: usize, text: &str) {
        if !text.is_empty() {
            for _ in 0..level {
                self.output.push_str(&self.unit);
            }
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    /// Write raw text without indentation or newline
    pub fn raw(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// The written text, trimmed of surrounding whitespace
    pub fn finish(self) -> String {
        self.output.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;

    #[test]
    fn test_indentation() {
        let mut writer = SourceWriter::new(&EditorConfigSettings::default());
        writer.line(0, "namespace A {");
        writer.line(1, "class B { }");
        writer.line(1, "");
        writer.raw("}");
        assert_eq!(writer.finish(), "namespace A {\n    class B { }\n\n}");
    }

    #[test]
    fn test_tabs() {
        let editor = EditorConfigSettings {
            indent_size: 4,
            indent_style: IndentStyle::Tab,
        };
        let mut writer = SourceWriter::new(&editor);
        writer.line(2, "x");
        assert_eq!(writer.finish(), "x");

        let mut writer = SourceWriter::new(&editor);
        writer.line(0, "{");
        writer.line(2, "x");
        assert_eq!(writer.finish(), "{\n\t\tx");
    }
}
