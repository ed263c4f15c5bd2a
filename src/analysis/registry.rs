//! Declared property-type ignores, by full class name.
//!
//! Built by scanning every `*.cs` file below a directory for
//! `[IgnorePropertyType]` / `[IgnorePropertyTypes]` on class declarations.
//! Declarations of the same class across several partial files are merged.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::FileSummary;

#[derive(Debug, Clone, Default)]
pub struct IgnoreRegistry {
    ignores: HashMap<String, HashSet<String>>,
}

impl IgnoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan all source files below `root`.
    ///
    /// A missing root yields an empty registry; unparseable files are skipped.
    pub fn scan(root: &Path) -> Self {
        let mut registry = Self::new();
        if !root.is_dir() {
            return registry;
        }

        let mut files = 0usize;
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "cs"))
        {
            files += 1;
            if let Some(summary) = FileSummary::try_load(entry.path()) {
                registry.add_file(&summary);
            }
        }

        debug!(root = %root.display(), files, types = registry.ignores.len(), "scanned declared ignores");
        registry
    }

    /// Record the ignores declared by the classes of a file
    pub fn add_file(&mut self, summary: &FileSummary) {
        for class in summary.classes() {
            if class.ignored_property_types.is_empty() {
                continue;
            }
            self.insert(&class.full_name(), class.ignored_property_types.iter().cloned());
        }
    }

    pub fn insert(&mut self, full_name: &str, aliases: impl IntoIterator<Item = String>) {
        self.ignores
            .entry(full_name.to_string())
            .or_default()
            .extend(aliases);
    }

    pub fn get(&self, full_name: &str) -> Option<&HashSet<String>> {
        self.ignores.get(full_name)
    }

    /// Whether `alias` is declared ignored on `full_name`; unknown types ignore nothing
    pub fn is_ignored(&self, full_name: &str, alias: &str) -> bool {
        self.get(full_name).is_some_and(|aliases| aliases.contains(alias))
    }

    pub fn len(&self) -> usize {
        self.ignores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ignores.is_empty()
    }
}
