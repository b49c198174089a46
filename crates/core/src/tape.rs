use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

use crate::{
    graph::Graph,
    node::Node,
    op::{Op, OpError},
    tensor::Tensor,
    trace::TraceObserver,
    value::Producer,
    variable::Variable,
};

/// Handle to a recording tape. Clones are cheap and share the same
/// underlying [`Graph`]; every operation applied to variables of this tape
/// is recorded on it.
#[derive(Clone, Default)]
pub struct Tape {
    inner: Rc<RefCell<Graph>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> Ref<'_, Graph> {
        self.inner.borrow()
    }

    pub fn graph_mut(&self) -> RefMut<'_, Graph> {
        self.inner.borrow_mut()
    }

    /// Create a leaf variable holding `data`.
    pub fn new_var(&self, data: Tensor) -> Variable {
        let id = self.inner.borrow_mut().values.new_val(data);
        Variable::new(self.clone(), id)
    }

    pub fn new_var_named(&self, name: impl Into<String>, data: Tensor) -> Variable {
        let id = self.inner.borrow_mut().values.new_val_named(name, data);
        Variable::new(self.clone(), id)
    }

    pub fn same_tape(&self, other: &Tape) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a trace observer for the duration of one extraction. An
    /// occupied slot hands the observer back.
    pub fn set_observer(
        &self,
        observer: Box<dyn TraceObserver>,
    ) -> Result<(), Box<dyn TraceObserver>> {
        self.inner.borrow_mut().set_observer(observer)
    }

    pub fn take_observer(&self) -> Option<Box<dyn TraceObserver>> {
        self.inner.borrow_mut().take_observer()
    }

    /// Announce a sub-module boundary. The scope stays open until the
    /// returned guard drops, so the matching exit fires on every path.
    pub fn scope(&self, name: Option<&str>) -> ScopeGuard {
        self.inner.borrow_mut().notify_scope_enter(name);
        ScopeGuard { tape: self.clone() }
    }

    /// The single recording path: notify the observer, run the kernel,
    /// record the node and its freshly produced values.
    pub(crate) fn apply(&self, op: Op, inputs: &[&Variable]) -> Result<Vec<Variable>, OpError> {
        for v in inputs {
            if !self.same_tape(v.tape()) {
                return Err(OpError::TapeMismatch);
            }
        }

        let tensors: Vec<Tensor> = {
            let g = self.inner.borrow();
            inputs.iter().map(|v| g.values[v.id()].data.clone()).collect()
        };

        let name = self.inner.borrow_mut().notify_operation(op.name());
        let operands: Vec<&Tensor> = tensors.iter().collect();
        let results = op.run(&operands)?;

        let mut g = self.inner.borrow_mut();
        let node_id = g.add_node(
            Node::new(op)
                .with_name(name)
                .with_ins(inputs.iter().map(|v| v.id()).collect()),
        );
        let mut out = Vec::with_capacity(results.len());
        for (slot, data) in results.into_iter().enumerate() {
            let vid = g.values.new_val_produced(
                Producer {
                    node: node_id,
                    slot,
                },
                data,
            );
            g.nodes[node_id].outputs.push(vid);
            out.push(Variable::new(self.clone(), vid));
        }
        log::trace!(
            "recorded {} ({} inputs, {} outputs)",
            g.nodes[node_id].op.name(),
            inputs.len(),
            out.len()
        );
        Ok(out)
    }
}

pub struct ScopeGuard {
    tape: Tape,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.tape.inner.borrow_mut().notify_scope_exit();
    }
}
