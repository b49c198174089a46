use id_arena::{Arena, Id};
use rustc_hash::FxHashSet;

pub(crate) type TraceNodeId = Id<TraceNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Operation,
    Value,
}

/// One node of a captured computation: either an executed operation or a
/// value that flowed between operations. Edges are reciprocal; identity is
/// the arena id, valid for one extraction only.
#[derive(Debug, Clone)]
pub(crate) struct TraceNode {
    pub kind: NodeKind,
    pub label: String,
    pub display_name: Option<String>,
    pub shape: Option<Vec<usize>>,
    pub inputs: FxHashSet<TraceNodeId>,
    pub outputs: FxHashSet<TraceNodeId>,
    /// Marks a value the model returned; such nodes keep their output
    /// names and survive normalization.
    pub is_graph_output: bool,
    /// Output slot on the producing operation (values only).
    pub slot: usize,
    pub deleted: bool,
}

impl TraceNode {
    pub fn operation(label: impl Into<String>, name: Option<String>) -> Self {
        Self {
            kind: NodeKind::Operation,
            label: label.into(),
            display_name: name,
            shape: None,
            inputs: FxHashSet::default(),
            outputs: FxHashSet::default(),
            is_graph_output: false,
            slot: 0,
            deleted: false,
        }
    }

    pub fn value(name: Option<String>, shape: Vec<usize>, slot: usize) -> Self {
        Self {
            kind: NodeKind::Value,
            label: "Variable".to_string(),
            display_name: name,
            shape: Some(shape),
            inputs: FxHashSet::default(),
            outputs: FxHashSet::default(),
            is_graph_output: false,
            slot,
            deleted: false,
        }
    }
}

#[derive(Default)]
pub(crate) struct TraceGraph {
    pub nodes: Arena<TraceNode>,
}

impl TraceGraph {
    pub fn live(&self) -> impl Iterator<Item = (TraceNodeId, &TraceNode)> {
        self.nodes.iter().filter(|(_, node)| !node.deleted)
    }
}
