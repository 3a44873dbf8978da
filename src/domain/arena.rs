use generational_arena::{Arena, Index};
use serde_json::Value;
use tracing::instrument;

use crate::domain::error::{FormError, FormResult};
use crate::domain::mapper::Mapper;
use crate::domain::path::{FieldPath, PathSegment};
use crate::domain::shape::{CollectionFactory, NodeKindName, Shape, VariantSpec};
use crate::domain::validator::{ValidationErrors, ValidatorSet};

/// Which variant subtree of a group is materialized.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantState {
    /// Discriminant unset: no variant subtree exists.
    Unselected,
    Active { tag: Value, field: String },
}

#[derive(Debug, Clone)]
pub struct GroupNode {
    /// Ordered child name -> node, including the active variant subtree
    pub children: Vec<(String, Index)>,
    pub mapper: Mapper,
    pub factory: Option<CollectionFactory>,
    pub variants: Option<VariantSpec>,
    pub state: VariantState,
}

impl GroupNode {
    pub fn child(&self, name: &str) -> Option<Index> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, idx)| *idx)
    }
}

#[derive(Debug, Clone)]
pub struct CollectionNode {
    pub items: Vec<Index>,
    pub element: Shape,
    /// Field key handed to the factory, when the owning group declared one
    pub key: String,
    pub factory: Option<CollectionFactory>,
}

impl CollectionNode {
    /// Shape for a new element: the owning group's factory wins over the
    /// declared element shape.
    pub fn element_shape(&self, value: &Value) -> Shape {
        match &self.factory {
            Some(factory) => factory.create(&self.key, value),
            None => self.element.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Leaf { default: Value },
    Group(GroupNode),
    Collection(CollectionNode),
}

/// Node in the arena-based form tree.
#[derive(Debug, Clone)]
pub struct FormNode {
    pub kind: NodeKind,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Leaf: the held value. Group/Collection: derived domain value.
    pub value: Value,
    /// Local errors only; never the aggregate of the children
    pub errors: ValidationErrors,
    pub validators: ValidatorSet,
    pub dirty: bool,
    pub touched: bool,
    /// Disabled on this node itself (ancestors are not consulted)
    pub disabled: bool,
}

impl FormNode {
    pub fn new(kind: NodeKind, parent: Option<Index>, validators: ValidatorSet) -> Self {
        Self {
            kind,
            parent,
            value: Value::Null,
            errors: ValidationErrors::new(),
            validators,
            dirty: false,
            touched: false,
            disabled: false,
        }
    }

    pub fn kind_name(&self) -> NodeKindName {
        match self.kind {
            NodeKind::Leaf { .. } => NodeKindName::Leaf,
            NodeKind::Group(_) => NodeKindName::Group,
            NodeKind::Collection(_) => NodeKindName::Collection,
        }
    }

    /// Children in declaration order (group) or position order (collection).
    pub fn children(&self) -> Vec<Index> {
        match &self.kind {
            NodeKind::Leaf { .. } => Vec::new(),
            NodeKind::Group(group) => group.children.iter().map(|(_, idx)| *idx).collect(),
            NodeKind::Collection(collection) => collection.items.clone(),
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupNode> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionNode> {
        match &self.kind {
            NodeKind::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut CollectionNode> {
        match &mut self.kind {
            NodeKind::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Arena-based form tree.
///
/// Uses a generational arena so that indices of torn-down subtrees never
/// alias freshly built nodes. Each form owns exactly one tree.
#[derive(Debug, Clone, Default)]
pub struct FormArena {
    arena: Arena<FormNode>,
    root: Option<Index>,
}

impl FormArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    #[instrument(level = "trace", skip(self, node))]
    pub fn insert_node(&mut self, node: FormNode) -> Index {
        let is_root = node.parent.is_none();
        let idx = self.arena.insert(node);
        if is_root {
            self.root = Some(idx);
        }
        idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&FormNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut FormNode> {
        self.arena.get_mut(idx)
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Node lookup for indices the engine itself handed out.
    pub(crate) fn node(&self, idx: Index) -> &FormNode {
        &self.arena[idx]
    }

    pub(crate) fn node_mut(&mut self, idx: Index) -> &mut FormNode {
        &mut self.arena[idx]
    }

    /// Removes `idx` and all of its descendants. Returns removed indices in
    /// post-order. The parent's child list is not touched.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, idx: Index) -> Vec<Index> {
        let removed: Vec<Index> = self.iter_postorder_from(idx).map(|(i, _)| i).collect();
        for i in &removed {
            self.arena.remove(*i);
        }
        if self.root == Some(idx) {
            self.root = None;
        }
        removed
    }

    /// Key under which `idx` hangs in its parent.
    pub fn key_of(&self, idx: Index) -> Option<PathSegment> {
        let parent = self.get_node(self.get_node(idx)?.parent?)?;
        match &parent.kind {
            NodeKind::Group(group) => group
                .children
                .iter()
                .find(|(_, child)| *child == idx)
                .map(|(name, _)| PathSegment::Field(name.clone())),
            NodeKind::Collection(collection) => collection
                .items
                .iter()
                .position(|item| *item == idx)
                .map(PathSegment::Index),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn path_of(&self, idx: Index) -> FieldPath {
        let mut segments = Vec::new();
        let mut current = idx;
        while let Some(segment) = self.key_of(current) {
            segments.push(segment);
            match self.get_node(current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        let mut path = FieldPath::root();
        for segment in segments.into_iter().rev() {
            path.push(segment);
        }
        path
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: Index) -> Vec<Index> {
        let mut out = Vec::new();
        let mut current = self.get_node(idx).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get_node(parent).and_then(|n| n.parent);
        }
        out
    }

    #[instrument(level = "trace", skip(self))]
    pub fn resolve(&self, path: &FieldPath) -> FormResult<Index> {
        let mut current = self
            .root
            .ok_or_else(|| FormError::PathNotFound(path.clone()))?;
        for segment in path.segments() {
            let node = self.node(current);
            let next = match (&node.kind, segment) {
                (NodeKind::Group(group), PathSegment::Field(name)) => group.child(name),
                (NodeKind::Collection(collection), PathSegment::Index(i)) => {
                    collection.items.get(*i).copied()
                }
                _ => None,
            };
            current = next.ok_or_else(|| FormError::PathNotFound(path.clone()))?;
        }
        Ok(current)
    }

    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self, self.root)
    }

    pub fn iter_from(&self, idx: Index) -> TreeIterator {
        TreeIterator::new(self, Some(idx))
    }

    pub fn iter_postorder_from(&self, idx: Index) -> PostOrderIterator {
        PostOrderIterator::new(self, Some(idx))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, idx: Index) -> usize {
        if let Some(node) = self.get_node(idx) {
            1 + node
                .children()
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Paths of all leaf nodes, in pre-order.
    pub fn leaf_paths(&self) -> Vec<FieldPath> {
        self.iter()
            .filter(|(_, node)| matches!(node.kind, NodeKind::Leaf { .. }))
            .map(|(idx, _)| self.path_of(idx))
            .collect()
    }
}

pub struct TreeIterator<'a> {
    arena: &'a FormArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a FormArena, start: Option<Index>) -> Self {
        Self {
            arena,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a FormNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for child in node.children().into_iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a FormArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a FormArena, start: Option<Index>) -> Self {
        Self {
            arena,
            stack: start.map(|idx| (idx, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a FormNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for child in node.children().into_iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(parent: Option<Index>) -> FormNode {
        FormNode::new(
            NodeKind::Leaf {
                default: Value::Null,
            },
            parent,
            ValidatorSet::new(),
        )
    }

    fn group(parent: Option<Index>) -> FormNode {
        FormNode::new(
            NodeKind::Group(GroupNode {
                children: Vec::new(),
                mapper: Mapper::identity(),
                factory: None,
                variants: None,
                state: VariantState::Unselected,
            }),
            parent,
            ValidatorSet::new(),
        )
    }

    // root
    // ├── a
    // └── b
    //     └── c
    fn sample() -> (FormArena, Index, Index, Index, Index) {
        let mut arena = FormArena::new();
        let root = arena.insert_node(group(None));
        let a = arena.insert_node(leaf(Some(root)));
        let b = arena.insert_node(group(Some(root)));
        let c = arena.insert_node(leaf(Some(b)));
        arena.node_mut(b).as_group_mut().unwrap().children.push(("c".into(), c));
        let children = &mut arena.node_mut(root).as_group_mut().unwrap().children;
        children.push(("a".into(), a));
        children.push(("b".into(), b));
        (arena, root, a, b, c)
    }

    #[test]
    fn given_tree_when_resolving_paths_then_round_trips() {
        let (arena, _, _, _, c) = sample();
        let path = arena.path_of(c);
        assert_eq!(path.to_string(), "b.c");
        assert_eq!(arena.resolve(&path).unwrap(), c);
        assert!(arena.resolve(&"b.x".parse().unwrap()).is_err());
    }

    #[test]
    fn given_tree_when_iterating_then_preorder_and_postorder() {
        let (arena, root, a, b, c) = sample();
        let pre: Vec<Index> = arena.iter().map(|(i, _)| i).collect();
        assert_eq!(pre, vec![root, a, b, c]);
        let post: Vec<Index> = arena.iter_postorder_from(root).map(|(i, _)| i).collect();
        assert_eq!(post, vec![a, c, b, root]);
        assert_eq!(arena.depth(), 3);
    }

    #[test]
    fn given_subtree_when_removed_then_indices_are_gone() {
        let (mut arena, _, a, b, c) = sample();
        let removed = arena.remove_subtree(b);
        assert_eq!(removed, vec![c, b]);
        assert!(!arena.contains(c));
        assert!(arena.contains(a));
    }
}
