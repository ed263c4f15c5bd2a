//! Schema Source
//!
//! Raw content-type definitions as exposed by the content platform, and the
//! `SchemaSource` trait the graph builder reads them through.
//!
//! `JsonSchemaSource` reads a JSON export of the schema:
//!
//! ```json
//! {
//!   "contentTypes": [{ "id": 1, "alias": "blogPost", "name": "Blog Post",
//!     "properties": [{ "alias": "title", "name": "Title",
//!       "editorAlias": "Umbraco.TextBox",
//!       "valueType": { "kind": "concrete", "name": "String", "namespace": "System" } }] }],
//!   "mediaTypes": [],
//!   "memberTypes": []
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::ValueType;

/// A property type as declared on a content type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTypeDefinition {
    pub alias: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub editor_alias: String,
    /// Published value type; absent when the platform could not resolve one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

/// A content, media or member type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeDefinition {
    pub id: i32,
    #[serde(default)]
    pub key: Uuid,
    pub alias: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_element: bool,
    /// Non-positive means "no parent"
    #[serde(default = "default_parent_id")]
    pub parent_id: i32,
    #[serde(default)]
    pub composition_ids: Vec<i32>,
    /// Property types, including those inherited from compositions and parent
    #[serde(default)]
    pub properties: Vec<PropertyTypeDefinition>,
}

fn default_parent_id() -> i32 {
    -1
}

/// Published runtime information about a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPropertyType {
    pub editor_alias: String,
    pub model_clr_type: ValueType,
}

/// Read access to the platform's content-type schema
pub trait SchemaSource {
    fn content_types(&self) -> Vec<ContentTypeDefinition>;

    fn media_types(&self) -> Vec<ContentTypeDefinition>;

    fn member_types(&self) -> Vec<ContentTypeDefinition>;

    /// Resolve the published descriptor of a property on a content type
    fn published_property_type(
        &self,
        content_type: &ContentTypeDefinition,
        property_alias: &str,
    ) -> Option<PublishedPropertyType>;
}

/// Schema export document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaExport {
    #[serde(default)]
    pub content_types: Vec<ContentTypeDefinition>,
    #[serde(default)]
    pub media_types: Vec<ContentTypeDefinition>,
    #[serde(default)]
    pub member_types: Vec<ContentTypeDefinition>,
}

/// Schema source backed by a JSON export
#[derive(Debug, Clone)]
pub struct JsonSchemaSource {
    export: SchemaExport,
}

impl JsonSchemaSource {
    /// Load and expand a schema export from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse and expand a schema export
    pub fn from_str(content: &str) -> Result<Self> {
        let export: SchemaExport = serde_json::from_str(content)?;
        Ok(Self::new(export))
    }

    pub fn new(mut export: SchemaExport) -> Self {
        expand_composition_properties(&mut export);
        Self { export }
    }

    pub fn export(&self) -> &SchemaExport {
        &self.export
    }
}

impl SchemaSource for JsonSchemaSource {
    fn content_types(&self) -> Vec<ContentTypeDefinition> {
        self.export.content_types.clone()
    }

    fn media_types(&self) -> Vec<ContentTypeDefinition> {
        self.export.media_types.clone()
    }

    fn member_types(&self) -> Vec<ContentTypeDefinition> {
        self.export.member_types.clone()
    }

    fn published_property_type(
        &self,
        content_type: &ContentTypeDefinition,
        property_alias: &str,
    ) -> Option<PublishedPropertyType> {
        let property = content_type.properties.iter().find(|p| p.alias == property_alias)?;
        Some(PublishedPropertyType {
            editor_alias: property.editor_alias.clone(),
            model_clr_type: property.value_type.clone()?,
        })
    }
}

/// Add the property types of compositions and parents to every definition.
///
/// Compositions come first (in declaration order), then the parent, then the
/// type's own properties; the first property seen for an alias wins.
fn expand_composition_properties(export: &mut SchemaExport) {
    let all: Vec<&ContentTypeDefinition> = export
        .content_types
        .iter()
        .chain(&export.media_types)
        .chain(&export.member_types)
        .collect();

    let mut lookup: HashMap<i32, &ContentTypeDefinition> = HashMap::with_capacity(all.len());
    for definition in &all {
        lookup.entry(definition.id).or_insert(definition);
    }

    let expanded: HashMap<i32, Vec<PropertyTypeDefinition>> = all
        .iter()
        .map(|definition| {
            let mut visited = HashSet::new();
            let mut properties = Vec::new();
            collect_properties(definition, &lookup, &mut visited, &mut properties);
            (definition.id, properties)
        })
        .collect();

    for definition in export
        .content_types
        .iter_mut()
        .chain(export.media_types.iter_mut())
        .chain(export.member_types.iter_mut())
    {
        if let Some(properties) = expanded.get(&definition.id) {
            definition.properties = properties.clone();
        }
    }
}

fn collect_properties(
    definition: &ContentTypeDefinition,
    lookup: &HashMap<i32, &ContentTypeDefinition>,
    visited: &mut HashSet<i32>,
    out: &mut Vec<PropertyTypeDefinition>,
) {
    // cycles are reported by the graph builder
    if !visited.insert(definition.id) {
        return;
    }

    let inherited = definition
        .composition_ids
        .iter()
        .copied()
        .chain((definition.parent_id > 0).then_some(definition.parent_id));

    for id in inherited {
        if let Some(other) = lookup.get(&id) {
            collect_properties(other, lookup, visited, out);
        }
    }

    for property in &definition.properties {
        if !out.iter().any(|p| p.alias == property.alias) {
            out.push(property.clone());
        }
    }
}
