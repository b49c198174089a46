use crate::{
    op::{Op, OpError},
    tape::Tape,
    tensor::Tensor,
    value::ValueId,
};

/// User-facing handle to one value on a tape. Clones refer to the same
/// recorded value; the name is caller-owned state living on the tape.
#[derive(Clone)]
pub struct Variable {
    tape: Tape,
    id: ValueId,
}

impl Variable {
    pub(crate) fn new(tape: Tape, id: ValueId) -> Self {
        Self { tape, id }
    }

    pub fn id(&self) -> ValueId {
        self.id
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn name(&self) -> Option<String> {
        self.tape.graph().values[self.id].name.clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        self.tape.graph_mut().values[self.id].name = name;
    }

    pub fn dims(&self) -> Vec<usize> {
        self.tape.graph().values[self.id].data.dims().to_vec()
    }

    pub fn data(&self) -> Tensor {
        self.tape.graph().values[self.id].data.clone()
    }

    pub fn relu(&self) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::ReLU, &[self])?, "ReLU")
    }

    pub fn sigmoid(&self) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Sigmoid, &[self])?, "Sigmoid")
    }

    pub fn tanh(&self) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Tanh, &[self])?, "Tanh")
    }

    pub fn softmax(&self) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Softmax, &[self])?, "Softmax")
    }

    pub fn matmul(&self, rhs: &Variable) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::MatMul, &[self, rhs])?, "MatMul")
    }

    /// Fused affine map `self · w + b`, recorded as one node.
    pub fn linear(&self, w: &Variable, b: &Variable) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Linear, &[self, w, b])?, "Linear")
    }

    pub fn add(&self, rhs: &Variable) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Add, &[self, rhs])?, "Add")
    }

    pub fn mul(&self, rhs: &Variable) -> Result<Variable, OpError> {
        single(self.tape.apply(Op::Mul, &[self, rhs])?, "Mul")
    }

    pub fn split(&self, axis: usize, parts: usize) -> Result<Vec<Variable>, OpError> {
        self.tape.apply(Op::Split { axis, parts }, &[self])
    }
}

fn single(mut vars: Vec<Variable>, op: &'static str) -> Result<Variable, OpError> {
    match vars.len() {
        1 => Ok(vars.swap_remove(0)),
        got => Err(OpError::OutputArity { op, got }),
    }
}
