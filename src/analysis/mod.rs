//! Existing-Source Analyzer
//!
//! Reads hand-written partial classes so generation can skip what they
//! already declare. Only the subset of C# needed for that is understood:
//! - using directives, block and file-scoped namespaces
//! - class headers with attributes, generic parameters and base lists
//! - constructor parameter lists
//! - property, method and field headers (bodies are skipped)
//!
//! Analysis never fails a build: a missing or unparseable file is reported
//! as "no summary".

pub mod lexer;
pub mod parser;
pub mod registry;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Partial-file parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected character '{ch}' on line {line}")]
    UnexpectedChar { ch: char, line: usize },

    #[error("Unterminated literal starting on line {line}")]
    UnterminatedLiteral { line: usize },

    #[error("Unterminated comment starting on line {line}")]
    UnterminatedComment { line: usize },

    #[error("Unexpected token '{found}' on line {line}, expected {expected}")]
    UnexpectedToken { found: String, expected: String, line: usize },

    #[error("Unexpected end of file, expected {0}")]
    UnexpectedEof(String),
}

// =============================================================================
// Summaries
// =============================================================================

/// A constructor or method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSummary {
    /// Type as written, without whitespace
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructorSummary {
    pub parameters: Vec<ParameterSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    pub type_name: String,
    pub name: String,
    /// Alias from an `[ImplementPropertyType("alias")]` attribute
    pub implements_property_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub return_type: String,
    pub name: String,
    pub is_static: bool,
}

/// A class declared in a partial file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub namespace: String,
    pub name: String,
    /// Base class and interfaces, as written
    pub base_types: Vec<String>,
    pub constructors: Vec<ConstructorSummary>,
    pub properties: Vec<PropertySummary>,
    pub methods: Vec<MethodSummary>,
    /// Aliases from `[IgnorePropertyType]` and `[IgnorePropertyTypes]`
    pub ignored_property_types: HashSet<String>,
}

impl ClassSummary {
    /// `{namespace}.{name}`, trimmed of dots for the global namespace
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name).trim_matches('.').to_string()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    /// Whether the class declares the `(content, fallback)` model constructor
    pub fn has_published_content_constructor(&self) -> bool {
        self.constructors.iter().any(|ctor| match ctor.parameters.as_slice() {
            [content, fallback] => {
                matches!(simple_type_name(&content.type_name), "IPublishedContent" | "IPublishedElement")
                    && simple_type_name(&fallback.type_name) == "IPublishedValueFallback"
            }
            _ => false,
        })
    }

    /// Whether some property claims to implement the property type `alias`
    pub fn implements_property_type(&self, alias: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.implements_property_type.as_deref() == Some(alias))
    }

    /// Whether the base list contains `name`, qualified or not
    pub fn has_base_type(&self, name: &str) -> bool {
        self.base_types.iter().any(|base| simple_type_name(base) == name)
    }
}

/// Last segment of a possibly qualified type name, without generic
/// arguments or nullability
pub fn simple_type_name(type_name: &str) -> &str {
    let name = type_name.split('<').next().unwrap_or(type_name).trim_end_matches('?');
    name.rsplit(['.', ':']).next().unwrap_or(name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub classes: Vec<ClassSummary>,
}

/// Everything the analyzer extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: Option<PathBuf>,
    pub usings: Vec<String>,
    pub namespaces: Vec<NamespaceSummary>,
}

impl FileSummary {
    /// Parse C# source text
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = lexer::tokenize(source)?;
        parser::parse_file(&tokens)
    }

    /// Load and parse a file.
    ///
    /// Returns `None` when the file does not exist, cannot be read, or does
    /// not parse.
    pub fn try_load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return None;
        }

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read partial file");
                return None;
            }
        };

        match Self::parse(&source) {
            Ok(mut summary) => {
                debug!(path = %path.display(), "analyzed partial file");
                summary.path = Some(path.to_path_buf());
                Some(summary)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not parse partial file, ignoring it");
                None
            }
        }
    }

    /// Find a class by full name
    pub fn class(&self, full_name: &str) -> Option<&ClassSummary> {
        self.classes().find(|c| c.full_name() == full_name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassSummary> {
        self.namespaces.iter().flat_map(|ns| ns.classes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PARTIAL: &str = r#"
using System;
using Umbraco.Cms.Core.Models.PublishedContent;

namespace My.Models.Content {

    [IgnorePropertyType("legacyField")]
    [My.Attributes.IgnorePropertyTypesAttribute("a", "b")]
    public partial class Article : PublishedContentModel, global::My.Models.ISeoComposition {

        public Article(global::Umbraco.Cms.Core.Models.PublishedContent.IPublishedContent content,
            IPublishedValueFallback publishedValueFallback) : base(content, publishedValueFallback) {
        }

        public string Title => "Hello";

        [ImplementPropertyType("body")]
        public IHtmlEncodedString Text { get; set; }

        public static string GetSummary(IArticle that) => that.Title;
    }
}
"#;

    #[test]
    fn test_class_queries() {
        let summary = FileSummary::parse(PARTIAL).unwrap();
        assert_eq!(summary.usings, vec!["System", "Umbraco.Cms.Core.Models.PublishedContent"]);

        let class = summary.class("My.Models.Content.Article").unwrap();
        assert!(class.has_property("Title"));
        assert!(class.has_property("Text"));
        assert!(!class.has_property("Body"));
        assert!(class.implements_property_type("body"));
        assert!(class.has_method("GetSummary"));
        assert!(class.has_published_content_constructor());
        assert!(class.has_base_type("ISeoComposition"));
        assert_eq!(
            class.ignored_property_types,
            ["legacyField", "a", "b"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn test_constructor_signature_must_match() {
        let source = "namespace A { partial class B { public B(IPublishedContent content) { } } }";
        let summary = FileSummary::parse(source).unwrap();
        assert!(!summary.class("A.B").unwrap().has_published_content_constructor());
    }

    #[test]
    fn test_try_load_missing_or_broken() {
        let dir = TempDir::new().unwrap();
        assert!(FileSummary::try_load(dir.path().join("Missing.cs")).is_none());

        let broken = dir.path().join("Broken.cs");
        fs::write(&broken, "namespace A { class B { \"unterminated").unwrap();
        assert!(FileSummary::try_load(&broken).is_none());

        let valid = dir.path().join("Valid.cs");
        fs::write(&valid, "namespace A; public partial class B { }").unwrap();
        let summary = FileSummary::try_load(&valid).unwrap();
        assert_eq!(summary.path.as_deref(), Some(valid.as_path()));
        assert!(summary.class("A.B").is_some());
    }

    #[test]
    fn test_parse_with_byte_order_mark() {
        let source = "\u{FEFF}namespace My.Models.Content { public partial class BlogPost { public string Title => \"x\"; } }";
        let summary = FileSummary::parse(source).unwrap();
        assert!(summary.class("My.Models.Content.BlogPost").unwrap().has_property("Title"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BlogPost.cs");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(source.trim_start_matches('\u{FEFF}').as_bytes());
        fs::write(&path, bytes).unwrap();
        assert!(FileSummary::try_load(&path).is_some());
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("global::A.B.IPublishedContent"), "IPublishedContent");
        assert_eq!(simple_type_name("string?"), "string");
        assert_eq!(simple_type_name("Item"), "Item");
        assert_eq!(simple_type_name("System.Collections.Generic.List<A.B>"), "List");
    }
}
