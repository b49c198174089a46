use std::ops::{Index, IndexMut};

use id_arena::{Arena, Id};

use crate::{node::NodeId, tensor::Tensor};

pub type ValueId = Id<Value>;

/// Where a value came from: the node that computed it and the output slot
/// it fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Producer {
    pub node: NodeId,
    pub slot: usize,
}

/// One value recorded on the tape. Leaf values (inputs, parameters) have no
/// producer; everything else was computed by a node.
#[derive(Debug, Clone)]
pub struct Value {
    pub name: Option<String>,
    pub data: Tensor,
    pub producer: Option<Producer>,
}

#[derive(Debug, Default, Clone)]
pub struct ValueArena(Arena<Value>);

impl ValueArena {
    pub fn new_val(&mut self, data: Tensor) -> ValueId {
        self.0.alloc(Value {
            name: None,
            data,
            producer: None,
        })
    }

    pub fn new_val_named(&mut self, name: impl Into<String>, data: Tensor) -> ValueId {
        self.0.alloc(Value {
            name: Some(name.into()),
            data,
            producer: None,
        })
    }

    pub fn new_val_produced(&mut self, producer: Producer, data: Tensor) -> ValueId {
        self.0.alloc(Value {
            name: None,
            data,
            producer: Some(producer),
        })
    }

    pub fn inner(&self) -> &Arena<Value> {
        &self.0
    }
}

impl Index<ValueId> for ValueArena {
    type Output = Value;

    fn index(&self, index: ValueId) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<ValueId> for ValueArena {
    fn index_mut(&mut self, index: ValueId) -> &mut Self::Output {
        &mut self.0[index]
    }
}
