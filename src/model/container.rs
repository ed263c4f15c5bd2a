//! Model containers
//!
//! A container claims a subset of the types and places them in its own
//! sub-directory. Containers are consulted in order; the first match wins.

use std::collections::HashMap;

use super::{TypeId, TypeModel};
use crate::config::ContainerSettings;

/// Read-only view of the type graph handed to container predicates
pub struct ContainerContext {
    parents: HashMap<TypeId, Option<TypeId>>,
}

impl ContainerContext {
    pub fn new(types: &[TypeModel]) -> Self {
        let mut parents = HashMap::with_capacity(types.len());
        for model in types {
            parents.entry(model.id).or_insert(model.parent);
        }
        Self { parents }
    }

    /// `id` followed by its ancestors, nearest first
    pub fn ancestry(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(Some(parent)) = self.parents.get(&current) {
            if chain.contains(parent) {
                break;
            }
            chain.push(*parent);
            current = *parent;
        }
        chain
    }
}

/// A predicate plus the directory its types are generated in
pub trait ModelsContainer: Send + Sync {
    fn directory(&self) -> &str;

    fn include(&self, model: &TypeModel, ctx: &ContainerContext) -> bool;
}

impl ModelsContainer for ContainerSettings {
    fn directory(&self) -> &str {
        &self.directory
    }

    fn include(&self, model: &TypeModel, ctx: &ContainerContext) -> bool {
        if let Some(kind) = self.kind {
            if model.kind() != kind {
                return false;
            }
        }

        let filtered = !self.aliases.is_empty() || !self.root_ids.is_empty();
        if !filtered {
            return true;
        }

        self.aliases.iter().any(|alias| alias == &model.alias)
            || ctx
                .ancestry(model.id)
                .iter()
                .any(|id| self.root_ids.contains(&id.0))
    }
}

/// Container backed by a closure
pub struct CallbackContainer {
    directory: String,
    callback: Box<dyn Fn(&TypeModel) -> bool + Send + Sync>,
}

impl CallbackContainer {
    pub fn new(directory: impl Into<String>, callback: impl Fn(&TypeModel) -> bool + Send + Sync + 'static) -> Self {
        Self {
            directory: directory.into(),
            callback: Box::new(callback),
        }
    }
}

impl ModelsContainer for CallbackContainer {
    fn directory(&self) -> &str {
        &self.directory
    }

    fn include(&self, model: &TypeModel, _ctx: &ContainerContext) -> bool {
        (self.callback)(model)
    }
}
