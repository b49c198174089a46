use std::borrow::Cow;

use thiserror::Error;

use crate::{op::OpError, tape::Tape, variable::Variable};

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("{0}")]
    Op(#[from] OpError),

    #[error("Expected a single input variable")]
    ExpectedSingleInput,

    #[error("Expected a single output variable")]
    ExpectedSingleOutput,

    /// General failures raised by module implementations themselves.
    #[error("{0}")]
    Message(Cow<'static, str>),
}

/// What a model is called with: one variable, an ordered sequence, or a
/// key-to-variable mapping. Map entries keep caller order.
#[derive(Clone)]
pub enum Inputs {
    One(Variable),
    List(Vec<Variable>),
    Map(Vec<(String, Variable)>),
}

impl Inputs {
    pub fn variables(&self) -> Vec<Variable> {
        match self {
            Inputs::One(v) => vec![v.clone()],
            Inputs::List(vs) => vs.clone(),
            Inputs::Map(kvs) => kvs.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    pub fn tape(&self) -> Option<Tape> {
        match self {
            Inputs::One(v) => Some(v.tape().clone()),
            Inputs::List(vs) => vs.first().map(|v| v.tape().clone()),
            Inputs::Map(kvs) => kvs.first().map(|(_, v)| v.tape().clone()),
        }
    }

    pub fn one(&self) -> Result<&Variable, ForwardError> {
        match self {
            Inputs::One(v) => Ok(v),
            Inputs::List(vs) if vs.len() == 1 => Ok(&vs[0]),
            _ => Err(ForwardError::ExpectedSingleInput),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        match self {
            Inputs::Map(kvs) => kvs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// What a model returns; the same three shapes as [`Inputs`].
#[derive(Clone)]
pub enum Outputs {
    One(Variable),
    List(Vec<Variable>),
    Map(Vec<(String, Variable)>),
}

impl Outputs {
    pub fn variables(&self) -> Vec<Variable> {
        match self {
            Outputs::One(v) => vec![v.clone()],
            Outputs::List(vs) => vs.clone(),
            Outputs::Map(kvs) => kvs.iter().map(|(_, v)| v.clone()).collect(),
        }
    }

    pub fn into_one(self) -> Result<Variable, ForwardError> {
        match self {
            Outputs::One(v) => Ok(v),
            _ => Err(ForwardError::ExpectedSingleOutput),
        }
    }
}

pub trait Module {
    /// Name this module contributes to the scope path. `None` makes a trace
    /// observer fall back to its placeholder name.
    fn scope_name(&self) -> Option<&str> {
        None
    }

    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError>;

    /// Learnable parameters with their scope-relative paths (`"w"`,
    /// `"fc1/w"`, ...). Parents prefix children by the child's scope name.
    fn named_parameters(&self) -> Vec<(String, Variable)>;

    /// Invoke the module, announcing the scope boundary to any registered
    /// trace observer. Sub-modules must be invoked through this rather than
    /// through [`Module::forward`] directly, or nesting is invisible to
    /// observers.
    fn apply(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        match inputs.tape() {
            Some(tape) => {
                let _scope = tape.scope(self.scope_name());
                self.forward(inputs)
            }
            None => self.forward(inputs),
        }
    }

    /// Single-input, single-output convenience over [`Module::apply`].
    fn apply1(&self, x: &Variable) -> Result<Variable, ForwardError> {
        self.apply(&Inputs::One(x.clone()))?.into_one()
    }
}
