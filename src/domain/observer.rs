//! Subscription primitive for value changes.
//!
//! Listeners are called synchronously after a propagation pass has fully
//! settled, node listeners first (in settle order), then root listeners.

use generational_arena::Index;
use serde_json::Value;
use tracing::trace;

use crate::domain::form::Snapshot;

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type RootListener = Box<dyn FnMut(&Snapshot)>;
type NodeListener = Box<dyn FnMut(&Value)>;

#[derive(Default)]
pub struct ChangeBus {
    next_id: u64,
    root: Vec<(Subscription, RootListener)>,
    nodes: Vec<(Subscription, Index, NodeListener)>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> Subscription {
        self.next_id += 1;
        Subscription(self.next_id)
    }

    pub fn subscribe_root(&mut self, listener: impl FnMut(&Snapshot) + 'static) -> Subscription {
        let id = self.next();
        self.root.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_node(
        &mut self,
        node: Index,
        listener: impl FnMut(&Value) + 'static,
    ) -> Subscription {
        let id = self.next();
        self.nodes.push((id, node, Box::new(listener)));
        id
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.root.len() + self.nodes.len();
        self.root.retain(|(id, _)| *id != subscription);
        self.nodes.retain(|(id, _, _)| *id != subscription);
        before != self.root.len() + self.nodes.len()
    }

    /// Drops every listener bound to one of `removed`.
    pub fn release_nodes(&mut self, removed: &[Index]) {
        let before = self.nodes.len();
        self.nodes.retain(|(_, node, _)| !removed.contains(node));
        let released = before - self.nodes.len();
        if released > 0 {
            trace!(released, "released subscriptions of torn-down nodes");
        }
    }

    pub fn clear(&mut self) {
        self.root.clear();
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.root.len() + self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit_node(&mut self, node: Index, value: &Value) {
        for (_, _, listener) in self.nodes.iter_mut().filter(|(_, n, _)| *n == node) {
            listener(value);
        }
    }

    pub fn emit_root(&mut self, snapshot: &Snapshot) {
        for (_, listener) in self.root.iter_mut() {
            listener(snapshot);
        }
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("root", &self.root.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
