use generational_arena::Index;
use itertools::Itertools;
use termtree::Tree;
use tracing::instrument;

use crate::domain::aggregate::{ErrorEntry, ErrorTree};
use crate::domain::arena::{FormArena, FormNode, NodeKind, VariantState};
use crate::domain::path::PathSegment;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label(arena: &FormArena, idx: Index, node: &FormNode) -> String {
    let key = match arena.key_of(idx) {
        Some(PathSegment::Field(name)) => name,
        Some(PathSegment::Index(i)) => format!("[{}]", i),
        None => "<root>".to_string(),
    };
    let mut label = match &node.kind {
        NodeKind::Leaf { .. } => format!("{} = {}", key, node.value),
        NodeKind::Group(group) => match &group.state {
            VariantState::Active { tag, .. } => format!("{} (group, variant {})", key, tag),
            VariantState::Unselected if group.variants.is_some() => {
                format!("{} (group, no variant)", key)
            }
            VariantState::Unselected => format!("{} (group)", key),
        },
        NodeKind::Collection(collection) => {
            format!("{} (collection, {} items)", key, collection.items.len())
        }
    };
    if !node.errors.is_empty() {
        label.push_str(&format!(" [{}]", node.errors.keys().join(", ")));
    }
    if node.disabled {
        label.push_str(" (disabled)");
    }
    label
}

impl TreeNodeConvert for FormArena {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(arena: &FormArena, idx: Index) -> Tree<String> {
            match arena.get_node(idx) {
                Some(node) => Tree::new(label(arena, idx, node)).with_leaves(
                    node.children()
                        .into_iter()
                        .map(|child| build_tree(arena, child)),
                ),
                None => Tree::new("<removed>".to_string()),
            }
        }

        match self.root() {
            Some(root) => build_tree(self, root),
            None => Tree::new("Empty form".to_string()),
        }
    }
}

impl TreeNodeConvert for ErrorTree {
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(name: String, tree: &ErrorTree) -> Tree<String> {
            Tree::new(name).with_leaves(tree.iter().map(|(key, entry)| match entry {
                ErrorEntry::Tag(detail) if detail.is_boolean() => Tree::new(key.clone()),
                ErrorEntry::Tag(detail) => Tree::new(format!("{}: {}", key, detail)),
                ErrorEntry::Nested(nested) => build_tree(key.clone(), nested),
            }))
        }
        build_tree("errors".to_string(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::Form;
    use crate::domain::mapper::Mapper;
    use crate::domain::shape::{CollectionShape, GroupShape, LeafShape};
    use crate::domain::validator::Required;
    use serde_json::json;

    #[test]
    fn given_form_when_describing_then_every_node_is_listed() {
        let shape = GroupShape::new(Mapper::identity())
            .child("title", LeafShape::new().validator(Required))
            .child("tags", CollectionShape::new(LeafShape::new()));
        let form = Form::create(shape, &json!({ "title": "", "tags": ["a"] })).unwrap();

        let rendered = form.describe().to_string();

        assert!(rendered.contains("<root> (group)"));
        assert!(rendered.contains("title = \"\" [required]"));
        assert!(rendered.contains("tags (collection, 1 items)"));
        assert!(rendered.contains("[0] = \"a\""));
    }
}
