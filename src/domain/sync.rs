//! Synchronizer: keeps every node's value equal to what its mapper derives.
//!
//! Upward: a leaf edit recomputes each ancestor once, up to the root.
//! Downward: a programmatic write maps the domain value through each group's
//! `to_representation` and applies the fields to the children. Both directions
//! run as one synchronous pass; nothing re-enters propagation.

use generational_arena::Index;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::domain::arena::{FormArena, FormNode, NodeKind};
use crate::domain::builder;
use crate::domain::error::{FormError, FormResult};
use crate::domain::mapper::Representation;
use crate::domain::remap;

/// Bookkeeping for one propagation pass.
#[derive(Debug, Default)]
pub(crate) struct Pass {
    /// Nodes whose value changed, in the order they settled
    pub changed: Vec<Index>,
    /// Nodes torn down during the pass
    pub removed: Vec<Index>,
    /// A subtree was built or destroyed
    pub structural: bool,
}

impl Pass {
    pub fn mark_changed(&mut self, idx: Index) {
        if !self.changed.contains(&idx) {
            self.changed.push(idx);
        }
    }

    pub fn mark_removed(&mut self, removed: Vec<Index>) {
        self.changed.retain(|idx| !removed.contains(idx));
        self.removed.extend(removed);
        self.structural = true;
    }

    /// Nothing observable happened.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty() && !self.structural
    }
}

/// Children values keyed by name; inactive variant fields read as `null`.
pub(crate) fn group_representation(arena: &FormArena, idx: Index) -> Representation {
    let mut rep = Representation::new();
    let Some(group) = arena.node(idx).as_group() else {
        return rep;
    };
    for (name, child) in &group.children {
        rep.insert(name.clone(), arena.node(*child).value.clone());
    }
    if let Some(spec) = &group.variants {
        for variant in spec.variants() {
            rep.entry(variant.field().to_string()).or_insert(Value::Null);
        }
    }
    rep
}

/// Recomputes a node's derived value and local errors from its children.
/// Returns whether the value changed.
pub(crate) fn recompute(arena: &mut FormArena, idx: Index) -> FormResult<bool> {
    let next = match &arena.node(idx).kind {
        NodeKind::Leaf { .. } => None,
        NodeKind::Group(group) => {
            let mapper = group.mapper.clone();
            let rep = group_representation(arena, idx);
            let value = mapper
                .from_representation(&rep)
                .map_err(|e| e.at(&arena.path_of(idx)))?;
            Some(value)
        }
        NodeKind::Collection(collection) => Some(Value::Array(
            collection
                .items
                .iter()
                .map(|item| arena.node(*item).value.clone())
                .collect(),
        )),
    };

    let node = arena.node_mut(idx);
    let changed = match next {
        Some(value) if value != node.value => {
            node.value = value;
            true
        }
        _ => false,
    };
    node.errors = node.validators.run(&node.value);
    Ok(changed)
}

/// Recomputes every ancestor of `from`, nearest first.
#[instrument(level = "trace", skip(arena, pass))]
pub(crate) fn propagate_up(arena: &mut FormArena, from: Index, pass: &mut Pass) -> FormResult<()> {
    for ancestor in arena.ancestors(from) {
        if recompute(arena, ancestor)? {
            pass.mark_changed(ancestor);
        }
    }
    Ok(())
}

/// Value a child takes when the representation leaves it out.
fn default_of(arena: &FormArena, idx: Index) -> Value {
    match &arena.node(idx).kind {
        NodeKind::Leaf { default } => default.clone(),
        _ => Value::Null,
    }
}

/// Programmatic write of `value` into the subtree at `idx`.
///
/// Leaves that change are marked not dirty: programmatic writes are not
/// user edits. Does not touch ancestors; callers follow up with
/// [`propagate_up`].
pub(crate) fn write_down(
    arena: &mut FormArena,
    idx: Index,
    value: &Value,
    pass: &mut Pass,
) -> FormResult<()> {
    match &arena.node(idx).kind {
        NodeKind::Leaf { .. } => {
            write_leaf(arena, idx, value, false, pass);
            Ok(())
        }
        NodeKind::Group(_) => write_group(arena, idx, value, pass),
        NodeKind::Collection(_) => write_collection(arena, idx, value, pass),
    }
}

/// Sets a leaf value. `user_edit` decides the dirty flag.
pub(crate) fn write_leaf(
    arena: &mut FormArena,
    idx: Index,
    value: &Value,
    user_edit: bool,
    pass: &mut Pass,
) -> bool {
    let node = arena.node_mut(idx);
    if &node.value == value {
        return false;
    }
    node.value = value.clone();
    node.dirty = user_edit;
    node.errors = node.validators.run(&node.value);
    pass.mark_changed(idx);
    true
}

fn write_group(arena: &mut FormArena, idx: Index, value: &Value, pass: &mut Pass) -> FormResult<()> {
    let (mapper, variants, children) = match arena.node(idx).as_group() {
        Some(group) => (
            group.mapper.clone(),
            group.variants.clone(),
            group.children.clone(),
        ),
        None => return Ok(()),
    };
    let rep = mapper
        .to_representation(value)
        .map_err(|e| e.at(&arena.path_of(idx)))?;

    let is_variant_field =
        |name: &str| variants.as_ref().is_some_and(|spec| spec.is_variant_field(name));
    for key in rep.keys() {
        if !is_variant_field(key) && !children.iter().any(|(name, _)| name == key) {
            return Err(FormError::ShapeMismatch {
                path: arena.path_of(idx),
                field: key.clone(),
            });
        }
    }

    for (name, child) in children.iter().filter(|(name, _)| !is_variant_field(name)) {
        let child_value = rep
            .get(name)
            .cloned()
            .unwrap_or_else(|| default_of(arena, *child));
        write_down(arena, *child, &child_value, pass)?;
    }

    if let Some(spec) = &variants {
        remap::apply_written(arena, idx, spec, &rep, pass)?;
    }

    if recompute(arena, idx)? {
        pass.mark_changed(idx);
    }
    Ok(())
}

fn write_collection(
    arena: &mut FormArena,
    idx: Index,
    value: &Value,
    pass: &mut Pass,
) -> FormResult<()> {
    let values = builder::collection_values(value, &arena.path_of(idx))?;
    let current = arena
        .node(idx)
        .as_collection()
        .map(|c| c.items.clone())
        .unwrap_or_default();

    for (item, item_value) in current.iter().zip(values.iter()) {
        write_down(arena, *item, item_value, pass)?;
    }
    if values.len() < current.len() {
        trace!(from = current.len(), to = values.len(), "shrinking collection on write");
        for item in &current[values.len()..] {
            let removed = arena.remove_subtree(*item);
            pass.mark_removed(removed);
        }
        if let Some(collection) = arena.node_mut(idx).as_collection_mut() {
            collection.items.truncate(values.len());
        }
    } else {
        for item_value in &values[current.len()..] {
            append_item(arena, idx, item_value, pass)?;
        }
    }

    if recompute(arena, idx)? {
        pass.mark_changed(idx);
    }
    Ok(())
}

/// Builds one element through the collection factory and appends it.
/// The factory runs exactly once per call.
#[instrument(level = "debug", skip(arena, value, pass))]
pub(crate) fn append_item(
    arena: &mut FormArena,
    idx: Index,
    value: &Value,
    pass: &mut Pass,
) -> FormResult<Index> {
    let path = arena.path_of(idx);
    let (shape, position) = match arena.node(idx).as_collection() {
        Some(collection) => (collection.element_shape(value), collection.items.len()),
        None => return Err(FormError::NotACollection(path)),
    };
    let item = builder::build_node(arena, &shape, Some(value), Some(idx), &path.index(position), None)?;
    if let Some(collection) = arena.node_mut(idx).as_collection_mut() {
        collection.items.push(item);
    }
    pass.structural = true;
    debug!(path = %path, position, "appended collection item");
    Ok(item)
}

/// Detaches and destroys the element at `index`; returns its last value.
#[instrument(level = "debug", skip(arena, pass))]
pub(crate) fn remove_item(
    arena: &mut FormArena,
    idx: Index,
    index: usize,
    pass: &mut Pass,
) -> FormResult<Value> {
    let path = arena.path_of(idx);
    let items = match arena.node(idx).as_collection() {
        Some(collection) => collection.items.clone(),
        None => return Err(FormError::NotACollection(path)),
    };
    let Some(item) = items.get(index).copied() else {
        return Err(FormError::IndexOutOfRange {
            path,
            index,
            len: items.len(),
        });
    };
    if let Some(collection) = arena.node_mut(idx).as_collection_mut() {
        collection.items.remove(index);
    }
    let value = arena.node(item).value.clone();
    let removed = arena.remove_subtree(item);
    pass.mark_removed(removed);
    debug!(path = %path, index, "removed collection item");
    Ok(value)
}

/// Applies `f` to every node of the subtree at `idx`.
pub(crate) fn for_each_in_subtree(
    arena: &mut FormArena,
    idx: Index,
    mut f: impl FnMut(&mut FormNode),
) {
    let indices: Vec<Index> = arena.iter_from(idx).map(|(i, _)| i).collect();
    for i in indices {
        f(arena.node_mut(i));
    }
}
