//! Source Renderer
//!
//! Renders one C# model file per type. Given the type, the full model list,
//! the settings and the summary of a hand-written partial (if any), output
//! is fully deterministic. Render order:
//!
//! 1. base type (skipped when the partial declares one)
//! 2. composition interfaces on the inherits list
//! 3. the `I{Name}` interface of a composition
//! 4. class header
//! 5. model constructor (skipped when the partial declares one)
//! 6. property accessors
//! 7. static helpers for properties declared on this type
//! 8. extension methods
//!
//! Members the partial already declares are never emitted again.

pub mod names;
pub mod writer;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::analysis::registry::IgnoreRegistry;
use crate::analysis::{ClassSummary, FileSummary};
use crate::config::GeneratorSettings;
use crate::error::{BuildError, Result};
use crate::model::normalize::generated_path;
use crate::model::{
    DefaultValueHandling, NullValueHandling, PropertyModel, PropertyStaticMethod, TypeId, TypeModel,
    TypeModelList, ValueType,
};
use names::is_interface_name;
use writer::SourceWriter;

/// Name written into the header of every generated file
pub const GENERATOR_NAME: &str = env!("CARGO_PKG_NAME");

pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Suffix of generated file names
pub const GENERATED_SUFFIX: &str = ".generated.cs";

/// Namespace whose types are imported by every generated file
pub const PUBLISHED_CONTENT_NAMESPACE: &str = "Umbraco.Cms.Core.Models.PublishedContent";

const DEFAULT_IMPORTS: &[&str] = &[
    "System",
    "System.Linq.Expressions",
    PUBLISHED_CONTENT_NAMESPACE,
    "Umbraco.Cms.Core.PublishedCache",
    "Umbraco.Cms.Infrastructure.ModelsBuilder",
    "Umbraco.Extensions",
];

const SIMPLE_NAMES: &[(&str, &str)] = &[
    ("System.String", "string"),
    ("System.Boolean", "bool"),
    ("System.Int32", "int"),
    ("System.Int64", "long"),
    ("System.Decimal", "decimal"),
    ("System.Double", "double"),
    ("System.Single", "float"),
    ("System.Object", "object"),
];

const MAYBE_NULL: &str = "[return: global::System.Diagnostics.CodeAnalysis.MaybeNull]";

/// The header line that identifies a generated file, up to the version
pub fn signature() -> String {
    format!("//    {} v", GENERATOR_NAME)
}

/// Hand-written counterpart of a generated file: `X.generated.cs` -> `X.cs`
pub fn partial_path(generated: &Path) -> Option<PathBuf> {
    let file_name = generated.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(GENERATED_SUFFIX)?;
    Some(generated.with_file_name(format!("{}.cs", stem)))
}

/// C# name of a value type, as referenced from `model`
pub fn value_type_name(model: &TypeModel, value_type: &ValueType, models: &TypeModelList) -> Result<String> {
    match value_type {
        ValueType::Model { content_type_alias } => {
            let target = models
                .by_alias(content_type_alias)
                .ok_or_else(|| BuildError::UnresolvedModelType {
                    alias: content_type_alias.clone(),
                    model: model.alias.clone(),
                })?;
            Ok(qualified_class_name(model, target))
        }
        ValueType::Concrete {
            name,
            namespace,
            generic_arguments,
            ..
        } => {
            let full_name = match namespace {
                Some(ns) => format!("{}.{}", ns, name),
                None => name.clone(),
            };
            if generic_arguments.is_empty() {
                if let Some((_, simple)) = SIMPLE_NAMES.iter().find(|(clr, _)| *clr == full_name) {
                    return Ok(simple.to_string());
                }
            }

            let prefix = match namespace.as_deref() {
                None | Some("") | Some(PUBLISHED_CONTENT_NAMESPACE) => String::new(),
                Some(ns) => format!("global::{}.", ns),
            };
            // nested types are exported as Outer+Inner
            let name = name.replace('+', ".");
            let base = name.split('`').next().unwrap_or(&name);

            if generic_arguments.is_empty() {
                return Ok(format!("{}{}", prefix, base));
            }

            let arguments = generic_arguments
                .iter()
                .map(|argument| value_type_name(model, argument, models))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{}{}<{}>", prefix, base, arguments.join(",")))
        }
    }
}

/// `ClrName` within the same namespace, `global::{ns}.{ClrName}` otherwise
fn qualified_class_name(from: &TypeModel, target: &TypeModel) -> String {
    if target.namespace == from.namespace || target.namespace.is_empty() {
        target.clr_name.clone()
    } else {
        format!("global::{}.{}", target.namespace, target.clr_name)
    }
}

/// Whether a property accessor delegates to a static helper
fn uses_static_method(model: &TypeModel, property: &PropertyModel, declaring: &TypeModel) -> bool {
    match property.static_method {
        PropertyStaticMethod::Always => true,
        PropertyStaticMethod::Never => false,
        // a helper only exists on compositions
        PropertyStaticMethod::Auto if declaring.id != model.id => declaring.is_composition,
        PropertyStaticMethod::Auto => model.is_composition,
    }
}

/// Renders model source files
pub struct SourceGenerator<'a> {
    models: &'a TypeModelList,
    settings: &'a GeneratorSettings,
    ignores: Option<&'a IgnoreRegistry>,
}

/// Everything decided before writing a file
struct RenderPlan<'a> {
    model: &'a TypeModel,
    partial: Option<&'a ClassSummary>,
    imports: BTreeSet<String>,
    inherits: Vec<String>,
    ignored: HashSet<String>,
}

impl<'a> SourceGenerator<'a> {
    pub fn new(models: &'a TypeModelList, settings: &'a GeneratorSettings) -> Self {
        Self {
            models,
            settings,
            ignores: None,
        }
    }

    /// Use declared ignores from a scanned registry
    pub fn with_ignores(mut self, ignores: &'a IgnoreRegistry) -> Self {
        self.ignores = Some(ignores);
        self
    }

    /// Render `model`, analyzing its hand-written partial if one exists
    pub fn get_source(&self, model: &TypeModel) -> Result<String> {
        let path = model
            .path
            .clone()
            .unwrap_or_else(|| generated_path(self.settings, model));
        let summary = partial_path(&path).and_then(FileSummary::try_load);
        let partial = summary.as_ref().and_then(|s| s.class(&model.full_name()));
        if partial.is_some() {
            debug!(alias = %model.alias, "found hand-written partial");
        }
        self.render(model, partial)
    }

    /// Render `model` against an already analyzed partial
    pub fn render(&self, model: &TypeModel, partial: Option<&ClassSummary>) -> Result<String> {
        let plan = self.plan(model, partial)?;
        let mut w = SourceWriter::new(&self.settings.editor_config);

        self.write_file_start(&mut w);
        for import in &plan.imports {
            w.line(0, &format!("using {};", import));
        }
        w.blank();
        w.line(0, "#pragma warning disable 0108");
        w.line(0, "#pragma warning disable 0109");
        w.line(0, "#pragma warning disable 1591");
        w.blank();
        w.line(0, &format!("namespace {} {{", model.namespace));
        w.blank();

        self.write_composition_interface(&mut w, &plan)?;
        self.write_class_start(&mut w, &plan);
        self.write_helpers(&mut w, model);
        self.write_constructor(&mut w, &plan);
        self.write_properties(&mut w, &plan)?;
        self.write_static_methods(&mut w, &plan)?;
        w.line(1, "}");
        w.blank();
        self.write_extension_methods(&mut w, &plan)?;

        w.raw("}");
        Ok(w.finish())
    }

    fn lookup(&self, model: &TypeModel, id: TypeId) -> Result<&'a TypeModel> {
        self.models.get(id).ok_or_else(|| BuildError::UnresolvedRelation {
            model: model.alias.clone(),
            id: id.0,
        })
    }

    fn plan<'p>(&self, model: &'p TypeModel, partial: Option<&'p ClassSummary>) -> Result<RenderPlan<'p>> {
        let mut imports: BTreeSet<String> = DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect();
        let mut inherits = Vec::new();

        let partial_base = partial.and_then(|p| p.base_types.iter().find(|b| !is_interface_name(b)));

        if partial_base.is_none() {
            match model.parent {
                Some(parent_id) => {
                    let parent = self.lookup(model, parent_id)?;
                    inherits.push(parent.clr_name.clone());
                    if parent.namespace != model.namespace {
                        imports.insert(parent.namespace.clone());
                    }
                }
                None if model.is_element => inherits.push("PublishedElementModel".to_string()),
                None => inherits.push("PublishedContentModel".to_string()),
            }
        }

        for &composition_id in &model.compositions {
            let composition = self.lookup(model, composition_id)?;
            let interface = composition.interface_name();
            if partial.is_some_and(|p| p.has_base_type(&interface)) {
                continue;
            }
            inherits.push(interface);
            if composition.namespace != model.namespace {
                imports.insert(composition.namespace.clone());
            }
        }

        if model.is_composition {
            let interface = model.interface_name();
            if !partial.is_some_and(|p| p.has_base_type(&interface)) {
                inherits.push(interface);
            }
        }

        let mut ignored: HashSet<String> = self
            .ignores
            .and_then(|registry| registry.get(&model.full_name()))
            .cloned()
            .unwrap_or_default();
        if let Some(partial) = partial {
            ignored.extend(partial.ignored_property_types.iter().cloned());
        }

        Ok(RenderPlan {
            model,
            partial,
            imports,
            inherits,
            ignored,
        })
    }

    fn write_file_start(&self, w: &mut SourceWriter) {
        let rule = format!("//{}", "-".repeat(78));
        w.line(0, &rule);
        w.line(0, "// <auto-generated>");
        w.line(0, "//");
        w.line(0, &format!("{}{}", signature(), GENERATOR_VERSION));
        w.line(0, "//");
        w.line(0, "//   Changes to this file will be lost if the code is regenerated.");
        w.line(0, "// </auto-generated>");
        w.line(0, &rule);
        w.blank();
    }

    fn is_ignored(plan: &RenderPlan<'_>, property: &PropertyModel) -> bool {
        property.is_ignored || plan.ignored.contains(&property.alias)
    }

    fn write_composition_interface(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) -> Result<()> {
        let model = plan.model;
        if !model.is_composition {
            return Ok(());
        }

        let base = if model.is_element { "IPublishedElement" } else { "IPublishedContent" };
        w.line(1, &format!("public partial interface {} : {} {{", model.interface_name(), base));
        w.blank();

        for property in model.properties.iter().filter(|p| !Self::is_ignored(plan, p)) {
            let value_type = value_type_name(model, &property.value_type, self.models)?;
            w.line(2, &format!("{} {} {{ get; }}", value_type, property.clr_name));
            w.blank();
        }

        w.line(1, "}");
        w.blank();
        Ok(())
    }

    fn write_class_start(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) {
        let model = plan.model;
        let inherits = if plan.inherits.is_empty() {
            String::new()
        } else {
            format!(" : {}", plan.inherits.join(", "))
        };
        w.line(1, &format!("[PublishedModel(\"{}\")]", model.alias));
        w.line(1, &format!("public partial class {}{} {{", model.clr_name, inherits));
        w.blank();
    }

    fn write_helpers(&self, w: &mut SourceWriter, model: &TypeModel) {
        w.line(2, "#region Helpers");
        w.blank();
        w.line(2, &format!("public new const string ModelTypeAlias = \"{}\";", model.alias));
        w.blank();
        w.line(
            2,
            &format!(
                "public new const PublishedItemType ModelItemType = PublishedItemType.{};",
                model.kind().item_type()
            ),
        );
        w.blank();
        w.line(2, MAYBE_NULL);
        w.line(
            2,
            "public new static IPublishedContentType GetModelContentType(IPublishedSnapshotAccessor publishedSnapshotAccessor)",
        );
        w.line(
            3,
            "=> PublishedModelUtility.GetModelContentType(publishedSnapshotAccessor, ModelItemType, ModelTypeAlias);",
        );
        w.blank();
        w.line(2, MAYBE_NULL);
        w.line(
            2,
            &format!(
                "public static IPublishedPropertyType GetModelPropertyType<TValue>(IPublishedSnapshotAccessor publishedSnapshotAccessor, Expression<Func<{}, TValue>> selector)",
                model.clr_name
            ),
        );
        w.line(
            3,
            "=> PublishedModelUtility.GetModelPropertyType(GetModelContentType(publishedSnapshotAccessor), selector);",
        );
        w.blank();
        w.line(2, "#endregion");
        w.blank();
    }

    fn write_constructor(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) {
        if plan.partial.is_some_and(|p| p.has_published_content_constructor()) {
            return;
        }

        let model = plan.model;
        let content = if model.is_element { "IPublishedElement" } else { "IPublishedContent" };
        w.line(2, "#region Constructors");
        w.blank();
        w.line(
            2,
            &format!(
                "public {}({} content, IPublishedValueFallback publishedValueFallback) : base(content, publishedValueFallback) {{ }}",
                model.clr_name, content
            ),
        );
        w.blank();
        w.line(2, "#endregion");
        w.blank();
    }

    fn write_properties(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) -> Result<()> {
        let model = plan.model;
        let properties: Vec<&PropertyModel> = model
            .properties
            .iter()
            .filter(|p| !Self::is_ignored(plan, p))
            .filter(|p| {
                !plan
                    .partial
                    .is_some_and(|c| c.has_property(&p.clr_name) || c.implements_property_type(&p.alias))
            })
            .collect();

        if properties.is_empty() {
            return Ok(());
        }

        w.line(2, "#region Properties");
        w.blank();

        for property in properties {
            let value_type = value_type_name(model, &property.value_type, self.models)?;
            let declaring = self.models.declaring_type(model, &property.alias).unwrap_or(model);

            self.write_json_attributes(w, property);
            w.line(2, &format!("[ImplementPropertyType(\"{}\")]", property.alias));
            w.line(2, &format!("public new {} {}", value_type, property.clr_name));

            if uses_static_method(model, property, declaring) {
                let class = if declaring.id == model.id {
                    String::new()
                } else {
                    format!("{}.", qualified_class_name(model, declaring))
                };
                w.line(3, &format!("=> {}Get{}(this);", class, property.clr_name));
            } else {
                w.line(3, &format!("=> this.Value<{}>(\"{}\");", value_type, property.alias));
            }
            w.blank();
        }

        w.line(2, "#endregion");
        w.blank();
        Ok(())
    }

    fn write_json_attributes(&self, w: &mut SourceWriter, property: &PropertyModel) {
        if !self.settings.emit_json_attributes {
            return;
        }

        let json = &property.json;
        if json.ignore {
            w.line(2, "[Newtonsoft.Json.JsonIgnore]");
            return;
        }

        let mut arguments = Vec::new();
        if let Some(name) = json.property_name.as_deref().filter(|n| !n.trim().is_empty()) {
            arguments.push(format!("\"{}\"", name));
        }
        if let Some(order) = json.order {
            arguments.push(format!("Order = {}", order));
        }
        if let Some(handling) = json.null_value_handling.filter(|h| *h != NullValueHandling::Include) {
            arguments.push(format!("NullValueHandling = Newtonsoft.Json.NullValueHandling.{:?}", handling));
        }
        if let Some(handling) = json
            .default_value_handling
            .filter(|h| *h != DefaultValueHandling::Include)
        {
            arguments.push(format!("DefaultValueHandling = Newtonsoft.Json.DefaultValueHandling.{:?}", handling));
        }

        if !arguments.is_empty() {
            w.line(2, &format!("[Newtonsoft.Json.JsonProperty({})]", arguments.join(", ")));
        }
    }

    fn write_static_methods(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) -> Result<()> {
        let model = plan.model;
        let mut properties = Vec::new();
        for property in model.properties.iter().filter(|p| !Self::is_ignored(plan, p)) {
            let declaring = self.models.declaring_type(model, &property.alias).unwrap_or(model);
            if declaring.id != model.id || !uses_static_method(model, property, declaring) {
                continue;
            }
            let method = format!("Get{}", property.clr_name);
            if plan.partial.is_some_and(|p| p.has_method(&method)) {
                continue;
            }
            properties.push((property, method));
        }

        if properties.is_empty() {
            return Ok(());
        }

        let parameter = if model.is_composition {
            model.interface_name()
        } else {
            model.clr_name.clone()
        };

        w.line(2, "#region Static methods");
        w.blank();

        for (property, method) in properties {
            let value_type = value_type_name(model, &property.value_type, self.models)?;
            w.line(2, &format!("public static {} {}({} that)", value_type, method, parameter));
            w.line(3, &format!("=> that.Value<{}>(\"{}\");", value_type, property.alias));
            w.blank();
        }

        w.line(2, "#endregion");
        w.blank();
        Ok(())
    }

    fn write_extension_methods(&self, w: &mut SourceWriter, plan: &RenderPlan<'_>) -> Result<()> {
        let model = plan.model;
        let target = if model.is_composition {
            model.interface_name()
        } else {
            model.clr_name.clone()
        };

        let mut methods = Vec::new();
        for property in model.properties.iter().filter(|p| !Self::is_ignored(plan, p)) {
            if plan.partial.is_some_and(|p| p.has_property(&property.clr_name)) {
                continue;
            }
            methods.push((property, value_type_name(model, &property.value_type, self.models)?));
        }

        if methods.is_empty() {
            return Ok(());
        }

        w.line(1, &format!("public static class {}Extensions {{", model.clr_name));
        w.blank();

        for (property, value_type) in methods {
            let maybe_null = property
                .maybe_null
                .unwrap_or_else(|| !property.value_type.is_value_type());
            if maybe_null {
                w.line(2, MAYBE_NULL);
            }
            w.line(
                2,
                &format!(
                    "public static {} {}(this {} content, string culture = null, string segment = null) {{",
                    value_type, property.clr_name, target
                ),
            );
            w.line(
                3,
                &format!("return content.Value<{}>(\"{}\", culture, segment);", value_type, property.alias),
            );
            w.line(2, "}");
            w.blank();
        }

        w.line(1, "}");
        w.blank();
        Ok(())
    }
}
