use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    node::{Node, NodeArena, NodeId},
    trace::TraceObserver,
    value::{ValueArena, ValueId},
};

/// The recording store behind a [`Tape`](crate::tape::Tape): every executed
/// operation and every value it produced, plus the observer slot used while
/// a trace is running.
#[derive(Default)]
pub struct Graph {
    pub nodes: NodeArena,
    pub values: ValueArena,
    observer: Option<Box<dyn TraceObserver>>,
}

impl Graph {
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    /// Value -> nodes consuming it.
    pub fn value_users(&self) -> FxHashMap<ValueId, FxHashSet<NodeId>> {
        let mut value_users: FxHashMap<ValueId, FxHashSet<NodeId>> = FxHashMap::default();

        for (node_id, node) in self.nodes.iter() {
            for &input in node.inputs.iter() {
                value_users.entry(input).or_default().insert(node_id);
            }
        }

        value_users
    }

    /// At most one observer at a time; an occupied slot hands the observer
    /// back to the caller.
    pub fn set_observer(
        &mut self,
        observer: Box<dyn TraceObserver>,
    ) -> Result<(), Box<dyn TraceObserver>> {
        if self.observer.is_some() {
            return Err(observer);
        }
        self.observer = Some(observer);
        Ok(())
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn TraceObserver>> {
        self.observer.take()
    }

    pub(crate) fn notify_operation(&mut self, label: &str) -> Option<String> {
        self.observer
            .as_mut()
            .and_then(|o| o.on_operation_start(label))
    }

    pub(crate) fn notify_scope_enter(&mut self, name: Option<&str>) {
        if let Some(o) = self.observer.as_mut() {
            o.on_scope_enter(name);
        }
    }

    pub(crate) fn notify_scope_exit(&mut self) {
        if let Some(o) = self.observer.as_mut() {
            o.on_scope_exit();
        }
    }
}
