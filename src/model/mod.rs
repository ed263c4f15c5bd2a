//! Type Models
//!
//! In-memory representation of the content-type graph:
//! - TypeModel: one content type, owning its properties
//! - PropertyModel: one property, with its resolved value type
//! - TypeModelList: flat arena of all types with id/alias lookups
//!
//! Parent and composition relations are stored as `TypeId`s and resolved
//! through the list, never as direct references.

pub mod builder;
pub mod container;
pub mod normalize;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codegen::names::to_pascal_case;

// =============================================================================
// Identifiers & Kinds
// =============================================================================

/// Stable numeric identifier of a content type in the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub i32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTypeKind {
    Element,
    Content,
    Media,
    Member,
}

impl ContentTypeKind {
    /// The item type reported by the published content cache
    pub fn item_type(&self) -> PublishedItemType {
        match self {
            Self::Element => PublishedItemType::Element,
            Self::Content => PublishedItemType::Content,
            Self::Media => PublishedItemType::Media,
            Self::Member => PublishedItemType::Member,
        }
    }
}

/// Published item type, emitted as `PublishedItemType.{Variant}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishedItemType {
    Element,
    Content,
    Media,
    Member,
}

impl fmt::Display for PublishedItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element => write!(f, "Element"),
            Self::Content => write!(f, "Content"),
            Self::Media => write!(f, "Media"),
            Self::Member => write!(f, "Member"),
        }
    }
}

// =============================================================================
// Value Types
// =============================================================================

/// The value type of a property.
///
/// `Model` is a placeholder pointing at another content type by alias. It is
/// kept as-is until rendering, since the referenced type is only known once
/// the full model list exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueType {
    #[serde(rename_all = "camelCase")]
    Concrete {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        generic_arguments: Vec<ValueType>,
        #[serde(default)]
        is_value_type: bool,
    },
    #[serde(rename_all = "camelCase")]
    Model { content_type_alias: String },
}

impl ValueType {
    /// A non-generic concrete type
    pub fn concrete(namespace: &str, name: &str, is_value_type: bool) -> Self {
        Self::Concrete {
            name: name.to_string(),
            namespace: if namespace.is_empty() { None } else { Some(namespace.to_string()) },
            generic_arguments: Vec::new(),
            is_value_type,
        }
    }

    /// A placeholder referencing another content type
    pub fn model(content_type_alias: &str) -> Self {
        Self::Model { content_type_alias: content_type_alias.to_string() }
    }

    /// `System.String`
    pub fn string() -> Self {
        Self::concrete("System", "String", false)
    }

    /// Whether values of this type can never be null.
    /// Model placeholders are reference types.
    pub fn is_value_type(&self) -> bool {
        match self {
            Self::Concrete { is_value_type, .. } => *is_value_type,
            Self::Model { .. } => false,
        }
    }
}

// =============================================================================
// Property Settings
// =============================================================================

/// When a property accessor delegates to a static helper method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStaticMethod {
    #[default]
    Auto,
    Always,
    Never,
}

/// Newtonsoft.Json null value handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullValueHandling {
    Include,
    Ignore,
}

/// Newtonsoft.Json default value handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValueHandling {
    Include,
    Ignore,
    Populate,
    IgnoreAndPopulate,
}

/// Serialization attributes emitted on a generated property
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonNetSettings {
    #[serde(default)]
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_value_handling: Option<NullValueHandling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value_handling: Option<DefaultValueHandling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

// =============================================================================
// Property Model
// =============================================================================

/// A property of a content type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyModel {
    /// Alias used as the value lookup key
    pub alias: String,
    /// Display name
    pub name: String,
    /// Generated member name
    pub clr_name: String,
    pub value_type: ValueType,
    /// Alias of the editor bound to the property
    pub editor_alias: String,
    pub is_ignored: bool,
    pub json: JsonNetSettings,
    pub static_method: PropertyStaticMethod,
    /// Overrides the `[return: MaybeNull]` decision for extension methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maybe_null: Option<bool>,
}

impl PropertyModel {
    pub fn new(alias: &str, name: &str, editor_alias: &str, value_type: ValueType) -> Self {
        Self {
            alias: alias.to_string(),
            name: name.to_string(),
            clr_name: to_pascal_case(alias),
            value_type,
            editor_alias: editor_alias.to_string(),
            is_ignored: false,
            json: JsonNetSettings::default(),
            static_method: PropertyStaticMethod::Auto,
            maybe_null: None,
        }
    }
}

// =============================================================================
// Type Model
// =============================================================================

/// A content type and everything needed to generate its model class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeModel {
    pub id: TypeId,
    pub key: Uuid,
    pub alias: String,
    pub name: String,
    kind: ContentTypeKind,
    pub is_element: bool,
    pub clr_name: String,
    pub namespace: String,
    /// Output file; assigned after normalization unless a hook sets it first
    pub path: Option<PathBuf>,
    pub is_ignored: bool,
    /// True iff another type lists this one as a composition
    pub is_composition: bool,
    /// Output sub-directories below the models root
    pub directories: Vec<String>,
    pub parent: Option<TypeId>,
    pub compositions: Vec<TypeId>,
    pub properties: Vec<PropertyModel>,
}

impl TypeModel {
    pub fn new(id: TypeId, key: Uuid, alias: &str, name: &str, kind: ContentTypeKind, namespace: &str) -> Self {
        Self {
            id,
            key,
            alias: alias.to_string(),
            name: name.to_string(),
            kind,
            is_element: kind == ContentTypeKind::Element,
            clr_name: to_pascal_case(alias),
            namespace: namespace.to_string(),
            path: None,
            is_ignored: false,
            is_composition: false,
            directories: Vec::new(),
            parent: None,
            compositions: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// The kind is fixed at construction
    pub fn kind(&self) -> ContentTypeKind {
        self.kind
    }

    /// `{Namespace}.{ClrName}`, without a dangling separator
    pub fn full_name(&self) -> String {
        match (self.namespace.is_empty(), self.clr_name.is_empty()) {
            (true, _) => self.clr_name.clone(),
            (_, true) => self.namespace.clone(),
            _ => format!("{}.{}", self.namespace, self.clr_name),
        }
    }

    /// Name of the composition interface for this type
    pub fn interface_name(&self) -> String {
        format!("I{}", self.clr_name)
    }

    pub fn property(&self, alias: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.alias == alias)
    }

    pub fn property_mut(&mut self, alias: &str) -> Option<&mut PropertyModel> {
        self.properties.iter_mut().find(|p| p.alias == alias)
    }
}

// =============================================================================
// Type Model List
// =============================================================================

/// All types of a run, with lookups by id and alias.
///
/// When two types share an alias (or id), the first one wins.
#[derive(Debug, Clone, Default)]
pub struct TypeModelList {
    types: Vec<TypeModel>,
    by_id: HashMap<TypeId, usize>,
    by_alias: HashMap<String, usize>,
}

impl TypeModelList {
    pub fn new(types: Vec<TypeModel>) -> Self {
        let mut by_id = HashMap::with_capacity(types.len());
        let mut by_alias = HashMap::with_capacity(types.len());
        for (index, model) in types.iter().enumerate() {
            by_id.entry(model.id).or_insert(index);
            by_alias.entry(model.alias.clone()).or_insert(index);
        }
        Self { types, by_id, by_alias }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeModel> {
        self.types.iter()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeModel> {
        self.by_id.get(&id).map(|&i| &self.types[i])
    }

    /// Look up a type by alias
    pub fn by_alias(&self, alias: &str) -> Option<&TypeModel> {
        self.by_alias.get(alias).map(|&i| &self.types[i])
    }

    pub fn parent_of(&self, model: &TypeModel) -> Option<&TypeModel> {
        model.parent.and_then(|id| self.get(id))
    }

    /// Compositions of `model` that exist in this list, in declaration order
    pub fn compositions_of<'a>(&'a self, model: &'a TypeModel) -> impl Iterator<Item = &'a TypeModel> + 'a {
        model.compositions.iter().filter_map(move |id| self.get(*id))
    }

    /// Find the type that declares the property `alias` as seen from `model`.
    ///
    /// Compositions are searched first (transitively), then the parent chain,
    /// then `model` itself.
    pub fn declaring_type<'a>(&'a self, model: &'a TypeModel, alias: &str) -> Option<&'a TypeModel> {
        let mut visited = HashSet::new();
        self.find_declaring(model, alias, &mut visited)
    }

    fn find_declaring<'a>(
        &'a self,
        model: &'a TypeModel,
        alias: &str,
        visited: &mut HashSet<TypeId>,
    ) -> Option<&'a TypeModel> {
        if !visited.insert(model.id) {
            return None;
        }
        for composition in self.compositions_of(model) {
            if let Some(found) = self.find_declaring(composition, alias, visited) {
                return Some(found);
            }
        }
        if let Some(parent) = self.parent_of(model) {
            if let Some(found) = self.find_declaring(parent, alias, visited) {
                return Some(found);
            }
        }
        model.property(alias).map(|_| model)
    }

    pub fn into_vec(self) -> Vec<TypeModel> {
        self.types
    }
}

impl<'a> IntoIterator for &'a TypeModelList {
    type Item = &'a TypeModel;
    type IntoIter = std::slice::Iter<'a, TypeModel>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i32, alias: &str, namespace: &str) -> TypeModel {
        TypeModel::new(TypeId(id), Uuid::nil(), alias, alias, ContentTypeKind::Content, namespace)
    }

    #[test]
    fn test_full_name() {
        assert_eq!(model(1, "blogPost", "My.Models").full_name(), "My.Models.BlogPost");
        assert_eq!(model(1, "blogPost", "").full_name(), "BlogPost");

        let mut unnamed = model(1, "blogPost", "My.Models");
        unnamed.clr_name.clear();
        assert_eq!(unnamed.full_name(), "My.Models");
    }

    #[test]
    fn test_first_alias_wins() {
        let list = TypeModelList::new(vec![model(1, "page", "A"), model(2, "page", "B")]);
        assert_eq!(list.by_alias("page").map(|m| m.id), Some(TypeId(1)));
        assert_eq!(list.get(TypeId(2)).map(|m| m.namespace.as_str()), Some("B"));
    }

    #[test]
    fn test_declaring_type_searches_compositions() {
        let mut seo = model(1, "seo", "A");
        seo.properties.push(PropertyModel::new("metaTitle", "Meta Title", "Umbraco.TextBox", ValueType::string()));

        let mut article = model(2, "article", "A");
        article.compositions.push(TypeId(1));
        article.properties.push(PropertyModel::new("metaTitle", "Meta Title", "Umbraco.TextBox", ValueType::string()));
        article.properties.push(PropertyModel::new("body", "Body", "Umbraco.TextArea", ValueType::string()));

        let list = TypeModelList::new(vec![seo, article]);
        let article = list.by_alias("article").unwrap();

        assert_eq!(list.declaring_type(article, "metaTitle").map(|m| m.alias.as_str()), Some("seo"));
        assert_eq!(list.declaring_type(article, "body").map(|m| m.alias.as_str()), Some("article"));
        assert!(list.declaring_type(article, "missing").is_none());
    }

    #[test]
    fn test_value_type_serde() {
        let json = r#"{"kind":"model","contentTypeAlias":"author"}"#;
        let value: ValueType = serde_json::from_str(json).unwrap();
        assert_eq!(value, ValueType::model("author"));

        let json = r#"{"kind":"concrete","name":"Int32","namespace":"System","isValueType":true}"#;
        let value: ValueType = serde_json::from_str(json).unwrap();
        assert!(value.is_value_type());
    }
}
