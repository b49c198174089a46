use ndarray::{ArrayD, IxDyn};
use rand::Rng;

use crate::{
    module::{ForwardError, Inputs, Module, Outputs},
    tape::Tape,
    tensor::Tensor,
    variable::Variable,
};

/// Fully-connected layer `y = x W + b`, recorded as one fused node per
/// application. `W` is `[in_features, out_features]`, `b` is
/// `[out_features]`.
pub struct Linear {
    name: String,
    w: Variable,
    b: Variable,
}

impl Linear {
    pub fn new(
        tape: &Tape,
        name: impl Into<String>,
        in_features: usize,
        out_features: usize,
    ) -> Self {
        let mut rng = rand::thread_rng();
        let k = (1.0 / in_features as f32).sqrt();
        let w = ArrayD::from_shape_fn(IxDyn(&[in_features, out_features]), |_| {
            rng.gen_range(-k..=k)
        });
        Self {
            name: name.into(),
            w: tape.new_var_named("w", Tensor::from(w)),
            b: tape.new_var_named("b", Tensor::zeros(&[out_features])),
        }
    }

    pub fn weight(&self) -> &Variable {
        &self.w
    }

    pub fn bias(&self) -> &Variable {
        &self.b
    }
}

impl Module for Linear {
    fn scope_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let x = inputs.one()?;
        Ok(Outputs::One(x.linear(&self.w, &self.b)?))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        vec![
            ("w".to_string(), self.w.clone()),
            ("b".to_string(), self.b.clone()),
        ]
    }
}
