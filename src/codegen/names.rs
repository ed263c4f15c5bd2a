//! Naming Utilities
//!
//! Member names for generated models are derived from schema aliases:
//! - `blogPost` -> `BlogPost`
//! - `meta_title` / `meta-title` / `meta title` -> `MetaTitle`
//! - leading digits get an underscore prefix (`404page` -> `_404page`)

use regex::Regex;
use std::sync::OnceLock;

/// Convert an alias to a PascalCase identifier
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if !c.is_alphanumeric() {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    if result.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        result.insert(0, '_');
    }

    result
}

fn interface_regex() -> &'static Regex {
    static INTERFACE: OnceLock<Regex> = OnceLock::new();
    INTERFACE.get_or_init(|| Regex::new(r"^I[A-Z]").expect("interface pattern is valid"))
}

/// Whether a type name follows the interface convention (`I` + uppercase)
pub fn is_interface_name(name: &str) -> bool {
    // qualified names are judged by their last segment
    let simple = name.rsplit(['.', ':']).next().unwrap_or(name);
    interface_regex().is_match(simple)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("blogPost"), "BlogPost");
        assert_eq!(to_pascal_case("meta_title"), "MetaTitle");
        assert_eq!(to_pascal_case("meta-title"), "MetaTitle");
        assert_eq!(to_pascal_case("meta title"), "MetaTitle");
        assert_eq!(to_pascal_case("SEO"), "SEO");
        assert_eq!(to_pascal_case("404page"), "_404page");
    }

    #[test]
    fn test_is_interface_name() {
        assert!(is_interface_name("IPublishedContent"));
        assert!(is_interface_name("global::My.Models.ISeoComposition"));
        assert!(!is_interface_name("Item"));
        assert!(!is_interface_name("PublishedContentModel"));
        assert!(!is_interface_name("Iceberg"));
    }
}
