//! Error Aggregator: folds per-node error sets into one domain-shaped tree.
//!
//! Groups key by field name, collections by stringified index. A branch with
//! no error is absent, never an empty map. The tree is derived on every read.

use std::collections::BTreeMap;

use generational_arena::Index;
use serde::Serialize;
use serde_json::Value;

use crate::domain::arena::{FormArena, NodeKind};
use crate::domain::path::{FieldPath, PathSegment};
use crate::domain::validator::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    /// Validator tag detail (`true`, or bounds for length/range validators)
    Tag(Value),
    Nested(ErrorTree),
}

impl ErrorEntry {
    pub fn as_tree(&self) -> Option<&ErrorTree> {
        match self {
            ErrorEntry::Nested(tree) => Some(tree),
            ErrorEntry::Tag(_) => None,
        }
    }
}

/// Aggregated error snapshot. Never empty when present.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ErrorTree(BTreeMap<String, ErrorEntry>);

impl ErrorTree {
    pub fn get(&self, key: &str) -> Option<&ErrorEntry> {
        self.0.get(key)
    }

    /// Errors of the node at `path`; a collection item is addressed by its
    /// index as a key.
    pub fn at(&self, path: &FieldPath) -> Option<&ErrorTree> {
        let mut current = self;
        for segment in path.segments() {
            let key = match segment {
                PathSegment::Field(name) => name.clone(),
                PathSegment::Index(i) => i.to_string(),
            };
            current = current.get(&key)?.as_tree()?;
        }
        Some(current)
    }

    /// Whether a validator tag is reported directly at this level.
    pub fn has_tag(&self, tag: &str) -> bool {
        matches!(self.0.get(tag), Some(ErrorEntry::Tag(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn local(errors: &ValidationErrors) -> BTreeMap<String, ErrorEntry> {
    errors
        .iter()
        .map(|(tag, detail)| (tag.clone(), ErrorEntry::Tag(detail.clone())))
        .collect()
}

fn non_empty(map: BTreeMap<String, ErrorEntry>) -> Option<ErrorTree> {
    (!map.is_empty()).then_some(ErrorTree(map))
}

/// Aggregated errors of the subtree at `idx`, or `None` when it is error free.
pub fn aggregate(arena: &FormArena, idx: Index) -> Option<ErrorTree> {
    let node = arena.get_node(idx)?;
    let mut map = local(&node.errors);
    match &node.kind {
        NodeKind::Leaf { .. } => {}
        NodeKind::Group(group) => {
            for (name, child) in &group.children {
                if let Some(tree) = aggregate(arena, *child) {
                    map.insert(name.clone(), ErrorEntry::Nested(tree));
                }
            }
        }
        NodeKind::Collection(collection) => {
            for (i, item) in collection.items.iter().enumerate() {
                if let Some(tree) = aggregate(arena, *item) {
                    map.insert(i.to_string(), ErrorEntry::Nested(tree));
                }
            }
        }
    }
    non_empty(map)
}
