use id_arena::{Arena, Id};

use crate::{op::Op, value::ValueId};

pub type NodeId = Id<Node>;
pub type NodeArena = Arena<Node>;

/// One recorded operation. `name` is assigned by a registered trace
/// observer at execution time and stays `None` on untraced runs.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub name: Option<String>,
    pub inputs: Vec<ValueId>,
    pub outputs: Vec<ValueId>,
}

impl Node {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<Option<String>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_ins(mut self, mut ids: Vec<ValueId>) -> Self {
        self.inputs.append(&mut ids);
        self
    }
}
