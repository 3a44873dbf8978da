//! The form handle: the public contract of the engine.
//!
//! Every mutating operation runs as one transaction: the tree is settled
//! completely (values, local errors, variant subtrees) before any listener
//! hears about it, and a failed operation leaves the tree as it was.

use generational_arena::Index;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::aggregate::{aggregate, ErrorTree};
use crate::domain::arena::{FormArena, NodeKind};
use crate::domain::builder;
use crate::domain::display::TreeNodeConvert;
use crate::domain::error::{FormError, FormResult};
use crate::domain::observer::{ChangeBus, Subscription};
use crate::domain::path::{FieldPath, IntoFieldPath};
use crate::domain::remap;
use crate::domain::shape::{NodeKindName, Shape};
use crate::domain::sync::{self, Pass};

/// Settled state of the whole form, as handed to root listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorTree>,
    pub valid: bool,
}

#[derive(Debug)]
pub struct Form {
    arena: FormArena,
    root: Index,
    bus: ChangeBus,
    /// Root value after the last programmatic write, for [`Form::output`]
    last_written: Value,
}

impl Form {
    /// Builds the node tree for `shape`, seeded with `initial`.
    #[instrument(level = "debug", skip(shape, initial))]
    pub fn create(shape: impl Into<Shape>, initial: &Value) -> FormResult<Self> {
        let shape = shape.into();
        let mut arena = FormArena::new();
        let root = builder::build_node(
            &mut arena,
            &shape,
            Some(initial),
            None,
            &FieldPath::root(),
            None,
        )?;
        debug!(nodes = arena.len(), kind = %shape.kind(), "form created");
        let last_written = arena.node(root).value.clone();
        Ok(Self {
            arena,
            root,
            bus: ChangeBus::new(),
            last_written,
        })
    }

    pub fn create_typed<T: Serialize>(shape: impl Into<Shape>, initial: &T) -> FormResult<Self> {
        let value = serde_json::to_value(initial).map_err(|e| FormError::Mapping {
            path: FieldPath::root(),
            message: e.to_string(),
        })?;
        Self::create(shape, &value)
    }

    pub fn arena(&self) -> &FormArena {
        &self.arena
    }

    /// Current domain value of the root.
    pub fn value(&self) -> &Value {
        &self.arena.node(self.root).value
    }

    pub fn value_at(&self, path: impl IntoFieldPath) -> FormResult<&Value> {
        let idx = self.resolve(path)?;
        Ok(&self.arena.node(idx).value)
    }

    pub fn kind_at(&self, path: impl IntoFieldPath) -> FormResult<NodeKindName> {
        let idx = self.resolve(path)?;
        Ok(self.arena.node(idx).kind_name())
    }

    pub fn value_as<T: DeserializeOwned>(&self) -> FormResult<T> {
        serde_json::from_value(self.value().clone()).map_err(|e| FormError::Mapping {
            path: FieldPath::root(),
            message: e.to_string(),
        })
    }

    pub fn valid(&self) -> bool {
        self.errors().is_none()
    }

    /// Aggregated error snapshot; `None` when the whole tree is valid.
    pub fn errors(&self) -> Option<ErrorTree> {
        aggregate(&self.arena, self.root)
    }

    pub fn snapshot(&self) -> Snapshot {
        let errors = self.errors();
        Snapshot {
            value: self.value().clone(),
            valid: errors.is_none(),
            errors,
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot) + 'static) -> Subscription {
        self.bus.subscribe_root(listener)
    }

    /// Listens to one node's own value. Released when the node is torn down.
    pub fn subscribe_at(
        &mut self,
        path: impl IntoFieldPath,
        listener: impl FnMut(&Value) + 'static,
    ) -> FormResult<Subscription> {
        let idx = self.resolve(path)?;
        Ok(self.bus.subscribe_node(idx, listener))
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Programmatic write of the root domain value.
    pub fn write(&mut self, value: &Value) -> FormResult<()> {
        self.write_at(FieldPath::root(), value)
    }

    /// Programmatic write into any node. Leaves that change are marked not
    /// dirty; ancestors are recomputed.
    #[instrument(level = "debug", skip(self, path, value))]
    pub fn write_at(&mut self, path: impl IntoFieldPath, value: &Value) -> FormResult<()> {
        let path = path.into_field_path()?;
        self.transact("write", |arena, pass| {
            let idx = arena.resolve(&path)?;
            sync::write_down(arena, idx, value, pass)?;
            if let Some(group) = remap::owning_variant_group(arena, idx) {
                remap::transition(arena, group, pass)?;
            }
            sync::propagate_up(arena, idx, pass)
        })?;
        if path.is_root() {
            self.last_written = self.value().clone();
        }
        Ok(())
    }

    /// User edit of a leaf: marks it dirty, propagates up, and remaps when
    /// the leaf is a discriminant.
    #[instrument(level = "debug", skip(self, path, value))]
    pub fn set_value(&mut self, path: impl IntoFieldPath, value: impl Into<Value>) -> FormResult<()> {
        let path = path.into_field_path()?;
        let value = value.into();
        self.transact("set_value", |arena, pass| {
            let idx = arena.resolve(&path)?;
            if !matches!(arena.node(idx).kind, NodeKind::Leaf { .. }) {
                return Err(FormError::NotALeaf(path.clone()));
            }
            if !sync::write_leaf(arena, idx, &value, true, pass) {
                return Ok(());
            }
            if let Some(group) = remap::owning_variant_group(arena, idx) {
                remap::transition(arena, group, pass)?;
            }
            sync::propagate_up(arena, idx, pass)
        })
    }

    /// Writes `value` and clears dirty and touched across the tree.
    pub fn reset(&mut self, value: &Value) -> FormResult<()> {
        self.write(value)?;
        let root = self.root;
        sync::for_each_in_subtree(&mut self.arena, root, |node| {
            node.dirty = false;
            node.touched = false;
        });
        Ok(())
    }

    /// Marks the node and every node beneath it as touched.
    pub fn mark_touched(&mut self, path: impl IntoFieldPath) -> FormResult<()> {
        let idx = self.resolve(path)?;
        sync::for_each_in_subtree(&mut self.arena, idx, |node| node.touched = true);
        Ok(())
    }

    pub fn is_dirty(&self, path: impl IntoFieldPath) -> FormResult<bool> {
        let idx = self.resolve(path)?;
        Ok(self.arena.iter_from(idx).any(|(_, node)| node.dirty))
    }

    pub fn is_touched(&self, path: impl IntoFieldPath) -> FormResult<bool> {
        let idx = self.resolve(path)?;
        Ok(self.arena.iter_from(idx).any(|(_, node)| node.touched))
    }

    /// Structural edit: builds one element through the collection factory.
    /// Returns the position of the new element.
    #[instrument(level = "debug", skip(self, path, value))]
    pub fn append(&mut self, path: impl IntoFieldPath, value: &Value) -> FormResult<usize> {
        let path = path.into_field_path()?;
        self.transact("append", |arena, pass| {
            let idx = arena.resolve(&path)?;
            sync::append_item(arena, idx, value, pass)?;
            if sync::recompute(arena, idx)? {
                pass.mark_changed(idx);
            }
            sync::propagate_up(arena, idx, pass)?;
            Ok(arena
                .node(idx)
                .as_collection()
                .map(|c| c.items.len() - 1)
                .unwrap_or_default())
        })
    }

    /// Structural edit: destroys the element at `index`, returning its value.
    #[instrument(level = "debug", skip(self, path))]
    pub fn remove_at(&mut self, path: impl IntoFieldPath, index: usize) -> FormResult<Value> {
        let path = path.into_field_path()?;
        self.transact("remove_at", |arena, pass| {
            let idx = arena.resolve(&path)?;
            let removed = sync::remove_item(arena, idx, index, pass)?;
            if sync::recompute(arena, idx)? {
                pass.mark_changed(idx);
            }
            sync::propagate_up(arena, idx, pass)?;
            Ok(removed)
        })
    }

    pub fn len(&self, path: impl IntoFieldPath) -> FormResult<usize> {
        let path = path.into_field_path()?;
        let idx = self.arena.resolve(&path)?;
        self.arena
            .node(idx)
            .as_collection()
            .map(|c| c.items.len())
            .ok_or(FormError::NotACollection(path))
    }

    /// Disables the node; descendants report disabled through it.
    pub fn disable(&mut self, path: impl IntoFieldPath) -> FormResult<()> {
        let idx = self.resolve(path)?;
        self.arena.node_mut(idx).disabled = true;
        Ok(())
    }

    /// Clears the node's own flag. Independently disabled descendants stay
    /// disabled.
    pub fn enable(&mut self, path: impl IntoFieldPath) -> FormResult<()> {
        let idx = self.resolve(path)?;
        self.arena.node_mut(idx).disabled = false;
        Ok(())
    }

    /// Effective state: disabled itself or below a disabled ancestor.
    pub fn is_disabled(&self, path: impl IntoFieldPath) -> FormResult<bool> {
        let idx = self.resolve(path)?;
        Ok(self.arena.node(idx).disabled
            || self
                .arena
                .ancestors(idx)
                .into_iter()
                .any(|a| self.arena.node(a).disabled))
    }

    pub fn is_interactive(&self, path: impl IntoFieldPath) -> FormResult<bool> {
        self.is_disabled(path).map(|disabled| !disabled)
    }

    /// The root value, when valid and different from the last programmatic
    /// write.
    pub fn output(&self) -> Option<Value> {
        (self.valid() && *self.value() != self.last_written).then(|| self.value().clone())
    }

    /// Printable tree of the materialized nodes.
    pub fn describe(&self) -> Tree<String> {
        self.arena.to_tree_string()
    }

    /// Releases every subscription; nothing fires afterwards.
    pub fn dispose(mut self) {
        debug!(subscriptions = self.bus.len(), "disposing form");
        self.bus.clear();
    }

    fn resolve(&self, path: impl IntoFieldPath) -> FormResult<Index> {
        let path = path.into_field_path()?;
        self.arena.resolve(&path)
    }

    fn transact<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut FormArena, &mut Pass) -> FormResult<T>,
    ) -> FormResult<T> {
        let backup = self.arena.clone();
        let mut pass = Pass::default();
        match f(&mut self.arena, &mut pass) {
            Ok(out) => {
                self.publish(pass);
                Ok(out)
            }
            Err(e) => {
                debug!(operation, error = %e, "rolled back");
                self.arena = backup;
                Err(e)
            }
        }
    }

    fn publish(&mut self, pass: Pass) {
        self.bus.release_nodes(&pass.removed);
        if pass.is_noop() {
            return;
        }
        for idx in pass.changed.iter().filter(|idx| self.arena.contains(**idx)) {
            self.bus.emit_node(*idx, &self.arena.node(*idx).value);
        }
        let snapshot = self.snapshot();
        self.bus.emit_root(&snapshot);
    }
}
