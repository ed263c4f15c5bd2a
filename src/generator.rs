//! Models Generator
//!
//! Produces the normalized `TypeModelList` for a run:
//! 1. default settings, passed through the registered settings hooks
//! 2. type graph built from the schema source
//! 3. containers, placement and auto-ignore
//! 4. registered models hooks, which may replace the list
//! 5. output paths for every type without one

use tracing::{debug, info};

use crate::config::GeneratorSettings;
use crate::error::Result;
use crate::model::builder::build_types;
use crate::model::container::ModelsContainer;
use crate::model::normalize::{assign_paths, normalize};
use crate::model::{TypeModel, TypeModelList};
use crate::schema::SchemaSource;

/// Hook run on the default settings
pub type SettingsHook = Box<dyn Fn(GeneratorSettings) -> GeneratorSettings + Send + Sync>;

/// Hook run on the normalized types, before paths are assigned
pub type ModelsHook = Box<dyn Fn(Vec<TypeModel>, &GeneratorSettings) -> Vec<TypeModel> + Send + Sync>;

/// Builds type models from a schema source
pub struct ModelsGenerator<S: SchemaSource> {
    source: S,
    settings: GeneratorSettings,
    settings_hooks: Vec<SettingsHook>,
    models_hooks: Vec<ModelsHook>,
    containers: Vec<Box<dyn ModelsContainer>>,
}

impl<S: SchemaSource> ModelsGenerator<S> {
    pub fn new(source: S, settings: GeneratorSettings) -> Self {
        Self {
            source,
            settings,
            settings_hooks: Vec::new(),
            models_hooks: Vec::new(),
            containers: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Register a hook that may adjust or replace the default settings
    pub fn add_settings_hook(
        &mut self,
        hook: impl Fn(GeneratorSettings) -> GeneratorSettings + Send + Sync + 'static,
    ) -> &mut Self {
        self.settings_hooks.push(Box::new(hook));
        self
    }

    /// Register a hook that may adjust or replace the model list
    pub fn add_models_hook(
        &mut self,
        hook: impl Fn(Vec<TypeModel>, &GeneratorSettings) -> Vec<TypeModel> + Send + Sync + 'static,
    ) -> &mut Self {
        self.models_hooks.push(Box::new(hook));
        self
    }

    /// Register a container, consulted after the configured ones
    pub fn add_container(&mut self, container: impl ModelsContainer + 'static) -> &mut Self {
        self.containers.push(Box::new(container));
        self
    }

    /// The configured settings after all settings hooks have run
    pub fn default_settings(&self) -> GeneratorSettings {
        self.settings_hooks
            .iter()
            .fold(self.settings.clone(), |settings, hook| hook(settings))
    }

    /// Build the normalized model list for `settings`
    pub fn get_models(&self, settings: &GeneratorSettings) -> Result<TypeModelList> {
        settings.validate()?;

        let mut types = build_types(&self.source, settings)?;
        normalize(&mut types, settings, &self.containers);

        for hook in &self.models_hooks {
            types = hook(types, settings);
        }
        debug!(hooks = self.models_hooks.len(), "ran models hooks");

        assign_paths(&mut types, settings);

        info!(count = types.len(), namespace = %settings.default_namespace, "generated type models");
        Ok(TypeModelList::new(types))
    }
}
