//! Type Graph Builder
//!
//! Converts raw schema definitions into TypeModels and wires parent and
//! composition relations. Definitions are processed content, then media,
//! then members; the first type seen for an id wins the id lookup.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use super::{ContentTypeKind, PropertyModel, TypeId, TypeModel};
use crate::config::GeneratorSettings;
use crate::error::{BuildError, Result};
use crate::schema::{ContentTypeDefinition, SchemaSource};

/// Raw relation ids of a type, pending resolution
struct PendingRelations {
    parent_id: i32,
    composition_ids: Vec<i32>,
}

/// Build all type models from a schema source.
///
/// Fails on the first property without a published descriptor, and on
/// cyclic parent/composition relations.
pub fn build_types<S: SchemaSource + ?Sized>(source: &S, settings: &GeneratorSettings) -> Result<Vec<TypeModel>> {
    let mut types = Vec::new();
    let mut pending = Vec::new();

    let kinds = [
        (source.content_types(), None),
        (source.media_types(), Some(ContentTypeKind::Media)),
        (source.member_types(), Some(ContentTypeKind::Member)),
    ];

    for (definitions, kind) in kinds {
        for definition in definitions {
            let kind = kind.unwrap_or(if definition.is_element {
                ContentTypeKind::Element
            } else {
                ContentTypeKind::Content
            });
            let model = build_type(source, &definition, kind, settings)?;
            pending.push(PendingRelations {
                parent_id: definition.parent_id,
                composition_ids: definition.composition_ids.clone(),
            });
            types.push(model);
        }
    }

    build_relations(&mut types, &pending);
    check_acyclic(&types)?;

    debug!(count = types.len(), "built type graph");
    Ok(types)
}

fn build_type<S: SchemaSource + ?Sized>(
    source: &S,
    definition: &ContentTypeDefinition,
    kind: ContentTypeKind,
    settings: &GeneratorSettings,
) -> Result<TypeModel> {
    let mut model = TypeModel::new(
        TypeId(definition.id),
        definition.key,
        &definition.alias,
        &definition.name,
        kind,
        &settings.default_namespace,
    );

    for property in &definition.properties {
        let published = source
            .published_property_type(definition, &property.alias)
            .ok_or_else(|| BuildError::PublishedPropertyTypeNotFound {
                content_type: definition.alias.clone(),
                property: property.alias.clone(),
            })?;

        model.properties.push(PropertyModel::new(
            &property.alias,
            &property.name,
            &published.editor_alias,
            published.model_clr_type,
        ));
    }

    Ok(model)
}

fn build_relations(types: &mut [TypeModel], pending: &[PendingRelations]) {
    let mut lookup: HashMap<i32, usize> = HashMap::with_capacity(types.len());
    for (index, model) in types.iter().enumerate() {
        lookup.entry(model.id.0).or_insert(index);
    }

    for (index, relations) in pending.iter().enumerate() {
        if relations.parent_id > 0 {
            if let Some(&parent) = lookup.get(&relations.parent_id) {
                types[index].parent = Some(types[parent].id);
            }
        }

        for composition_id in &relations.composition_ids {
            let Some(&composition) = lookup.get(composition_id) else {
                continue;
            };
            let composition_type_id = types[composition].id;
            types[index].compositions.push(composition_type_id);
            types[composition].is_composition = true;
        }
    }
}

/// Fail if parent/composition edges form a cycle
pub fn check_acyclic(types: &[TypeModel]) -> Result<()> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(types.len(), types.len() * 2);
    let mut nodes: HashMap<TypeId, NodeIndex> = HashMap::with_capacity(types.len());

    for (index, model) in types.iter().enumerate() {
        nodes.entry(model.id).or_insert_with(|| graph.add_node(index));
    }

    for model in types {
        let Some(&from) = nodes.get(&model.id) else { continue };
        for target in model.parent.iter().chain(&model.compositions) {
            if let Some(&to) = nodes.get(target) {
                graph.add_edge(from, to, ());
            }
        }
    }

    toposort(&graph, None).map(|_| ()).map_err(|cycle| BuildError::CyclicRelation {
        alias: types[graph[cycle.node_id()]].alias.clone(),
    })
}
