//! Model Normalizer
//!
//! Policy passes over the built type graph:
//! - containers: first matching container claims a type, unclaimed types are ignored
//! - placement: namespace suffix and sub-directory by kind and composition status
//! - auto-ignore: properties bound to editors that hold no content value
//!
//! Output paths are assigned separately, after extension hooks have run.

use std::path::PathBuf;

use tracing::debug;

use super::container::{ContainerContext, ModelsContainer};
use super::{ContentTypeKind, TypeModel};
use crate::config::GeneratorSettings;

/// File extension of generated sources
pub const SOURCE_EXTENSION: &str = "cs";

/// Editors whose properties never carry a retrievable value
pub const IGNORED_EDITOR_ALIASES: &[&str] = &[
    "Skybrud.Separator",
    "Skybrud.Umbraco.Redirects",
    "Skybrud.Umbraco.Redirects.OutboundRedirect",
];

/// Run all normalization passes
pub fn normalize(types: &mut [TypeModel], settings: &GeneratorSettings, extra_containers: &[Box<dyn ModelsContainer>]) {
    let containers: Vec<&dyn ModelsContainer> = settings
        .containers
        .iter()
        .map(|c| c as &dyn ModelsContainer)
        .chain(extra_containers.iter().map(|c| c.as_ref() as &dyn ModelsContainer))
        .collect();

    apply_containers(types, &containers);

    for model in types.iter_mut() {
        if settings.use_directories {
            apply_placement(model);
        }
        apply_auto_ignore(model);
    }
}

/// Place each type in the first container that includes it.
///
/// Without containers this is a no-op.
pub fn apply_containers(types: &mut [TypeModel], containers: &[&dyn ModelsContainer]) {
    if containers.is_empty() {
        return;
    }

    let ctx = ContainerContext::new(types);
    for model in types.iter_mut() {
        match containers.iter().find(|c| c.include(model, &ctx)) {
            Some(container) => {
                let directory = container.directory();
                let segment = namespace_segment(directory);
                if !segment.is_empty() {
                    model.namespace = format!("{}.{}", model.namespace, segment);
                }
                let mut directories: Vec<String> = directory
                    .split(['/', '\\'])
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect();
                directories.append(&mut model.directories);
                model.directories = directories;
            }
            None => {
                debug!(alias = %model.alias, "type not included by any container");
                model.is_ignored = true;
            }
        }
    }
}

fn namespace_segment(directory: &str) -> String {
    directory
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Nest a type by kind. Element compositions go to `Compositions` instead of
/// `Elements`; content compositions go to `Content/Compositions`.
pub fn apply_placement(model: &mut TypeModel) {
    let segments: &[&str] = match (model.kind(), model.is_composition) {
        (ContentTypeKind::Media, _) => &["Media"],
        (ContentTypeKind::Member, _) => &["Members"],
        (ContentTypeKind::Element, true) => &["Compositions"],
        (ContentTypeKind::Element, false) => &["Elements"],
        (ContentTypeKind::Content, true) => &["Content", "Compositions"],
        (ContentTypeKind::Content, false) => &["Content"],
    };

    for segment in segments {
        model.namespace.push('.');
        model.namespace.push_str(segment);
        model.directories.push(segment.to_string());
    }
}

/// Ignore properties bound to a denylisted editor
pub fn apply_auto_ignore(model: &mut TypeModel) {
    for property in &mut model.properties {
        if IGNORED_EDITOR_ALIASES.contains(&property.editor_alias.as_str()) {
            property.is_ignored = true;
        }
    }
}

/// `{root}/{directories…}/{ClrName}.generated.cs`
pub fn generated_path(settings: &GeneratorSettings, model: &TypeModel) -> PathBuf {
    let mut path = settings.models_path.clone();
    for directory in &model.directories {
        path.push(directory);
    }
    path.push(format!("{}.generated.{}", model.clr_name, SOURCE_EXTENSION));
    path
}

/// Assign output paths to every type that has none yet
pub fn assign_paths(types: &mut [TypeModel], settings: &GeneratorSettings) {
    for model in types.iter_mut() {
        if model.path.is_none() {
            model.path = Some(generated_path(settings, model));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerSettings;
    use crate::model::container::CallbackContainer;
    use crate::model::{PropertyModel, TypeId, ValueType};
    use uuid::Uuid;

    fn model(id: i32, alias: &str, kind: ContentTypeKind, is_composition: bool) -> TypeModel {
        let mut model = TypeModel::new(TypeId(id), Uuid::nil(), alias, alias, kind, "My.Models");
        model.is_composition = is_composition;
        model
    }

    fn placed(kind: ContentTypeKind, is_composition: bool) -> (String, Vec<String>) {
        let mut m = model(1, "x", kind, is_composition);
        apply_placement(&mut m);
        (m.namespace, m.directories)
    }

    #[test]
    fn test_placement_policy() {
        assert_eq!(placed(ContentTypeKind::Media, false), ("My.Models.Media".to_string(), vec!["Media".to_string()]));
        assert_eq!(placed(ContentTypeKind::Member, true), ("My.Models.Members".to_string(), vec!["Members".to_string()]));
        assert_eq!(placed(ContentTypeKind::Element, false), ("My.Models.Elements".to_string(), vec!["Elements".to_string()]));
        assert_eq!(placed(ContentTypeKind::Content, false), ("My.Models.Content".to_string(), vec!["Content".to_string()]));
    }

    #[test]
    fn test_composition_placement_is_asymmetric() {
        let (namespace, directories) = placed(ContentTypeKind::Content, true);
        assert_eq!(namespace, "My.Models.Content.Compositions");
        assert_eq!(directories, vec!["Content", "Compositions"]);

        let (namespace, directories) = placed(ContentTypeKind::Element, true);
        assert_eq!(namespace, "My.Models.Compositions");
        assert_eq!(directories, vec!["Compositions"]);
    }

    #[test]
    fn test_auto_ignore() {
        let mut m = model(1, "page", ContentTypeKind::Content, false);
        m.properties.push(PropertyModel::new("title", "Title", "Umbraco.TextBox", ValueType::string()));
        m.properties.push(PropertyModel::new("sep", "Separator", "Skybrud.Separator", ValueType::string()));
        m.properties.push(PropertyModel::new("redirects", "Redirects", "Skybrud.Umbraco.Redirects", ValueType::string()));

        apply_auto_ignore(&mut m);
        let ignored: Vec<bool> = m.properties.iter().map(|p| p.is_ignored).collect();
        assert_eq!(ignored, vec![false, true, true]);
    }

    #[test]
    fn test_normalize_without_directories() {
        let mut types = vec![model(1, "page", ContentTypeKind::Content, true)];
        let mut settings = GeneratorSettings::new("My.Models", "models");
        settings.use_directories = false;

        normalize(&mut types, &settings, &[]);
        assert_eq!(types[0].namespace, "My.Models");
        assert!(types[0].directories.is_empty());
    }

    #[test]
    fn test_containers_place_and_exclude() {
        let mut types = vec![
            model(1, "blogPost", ContentTypeKind::Content, false),
            model(2, "home", ContentTypeKind::Content, false),
            model(3, "image", ContentTypeKind::Media, false),
        ];
        let mut settings = GeneratorSettings::new("My.Models", "models");
        settings.containers.push(ContainerSettings {
            directory: "Blog".to_string(),
            kind: None,
            aliases: vec!["blogPost".to_string()],
            root_ids: Vec::new(),
        });
        let extra: Vec<Box<dyn ModelsContainer>> =
            vec![Box::new(CallbackContainer::new("Shared/Media", |m| m.kind() == ContentTypeKind::Media))];

        normalize(&mut types, &settings, &extra);

        assert_eq!(types[0].namespace, "My.Models.Blog.Content");
        assert_eq!(types[0].directories, vec!["Blog", "Content"]);
        assert!(types[1].is_ignored);
        assert_eq!(types[2].namespace, "My.Models.Shared.Media.Media");
        assert_eq!(types[2].directories, vec!["Shared", "Media", "Media"]);
    }

    #[test]
    fn test_assign_paths_keeps_preset_path() {
        let settings = GeneratorSettings::new("My.Models", "models");
        let mut page = model(1, "blogPost", ContentTypeKind::Content, false);
        apply_placement(&mut page);
        let mut custom = model(2, "custom", ContentTypeKind::Content, false);
        custom.path = Some(PathBuf::from("elsewhere/Custom.cs"));

        let mut types = vec![page, custom];
        assign_paths(&mut types, &settings);

        assert_eq!(types[0].path, Some(PathBuf::from("models/Content/BlogPost.generated.cs")));
        assert_eq!(types[1].path, Some(PathBuf::from("elsewhere/Custom.cs")));
    }
}
