use ndarray::{ArrayD, Axis, Ix2};
use thiserror::Error;

use crate::tensor::Tensor;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("{op} expects {expected} inputs, got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{op}: incompatible operand shapes {lhs:?} and {rhs:?}")]
    IncompatibleShapes {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    #[error("{op}: expected a matrix, got shape {dims:?}")]
    NotAMatrix { op: &'static str, dims: Vec<usize> },

    #[error("{op}: rank-0 tensor has no axis to reduce over")]
    ZeroRank { op: &'static str },

    #[error("{op}: no axis {axis} in shape {dims:?}")]
    BadAxis {
        op: &'static str,
        axis: usize,
        dims: Vec<usize>,
    },

    #[error("Split: axis of length {len} is not divisible into {parts} parts")]
    NotDivisible { len: usize, parts: usize },

    #[error("{op} produced {got} outputs where one was expected")]
    OutputArity { op: &'static str, got: usize },

    #[error("Operands belong to different tapes")]
    TapeMismatch,
}

/// Operations the tape can record. `Linear` is the fused affine map
/// `x W + b`, one node per layer application.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Linear,
    MatMul,
    Add,
    Mul,
    ReLU,
    Sigmoid,
    Tanh,
    Softmax,
    Split { axis: usize, parts: usize },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Linear => "Linear",
            Op::MatMul => "MatMul",
            Op::Add => "Add",
            Op::Mul => "Mul",
            Op::ReLU => "ReLU",
            Op::Sigmoid => "Sigmoid",
            Op::Tanh => "Tanh",
            Op::Softmax => "Softmax",
            Op::Split { .. } => "Split",
        }
    }

    fn arity(&self) -> usize {
        match self {
            Op::Linear => 3,
            Op::MatMul | Op::Add | Op::Mul => 2,
            _ => 1,
        }
    }

    /// Execute eagerly. Multi-output operations return more than one tensor;
    /// the position in the returned vec is the output slot.
    pub fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>, OpError> {
        let expected = self.arity();
        if inputs.len() != expected {
            return Err(OpError::Arity {
                op: self.name(),
                expected,
                got: inputs.len(),
            });
        }

        match self {
            Op::Linear => {
                let y = matmul2("Linear", inputs[0], inputs[1])?;
                let y = broadcast_binary("Linear", &y.into(), inputs[2], |a, b| a + b)?;
                Ok(vec![y.into()])
            }
            Op::MatMul => Ok(vec![matmul2("MatMul", inputs[0], inputs[1])?.into()]),
            Op::Add => Ok(vec![
                broadcast_binary("Add", inputs[0], inputs[1], |a, b| a + b)?.into(),
            ]),
            Op::Mul => Ok(vec![
                broadcast_binary("Mul", inputs[0], inputs[1], |a, b| a * b)?.into(),
            ]),
            Op::ReLU => Ok(vec![inputs[0].array().mapv(|v| v.max(0.0)).into()]),
            Op::Sigmoid => Ok(vec![inputs[0]
                .array()
                .mapv(|v| 1.0 / (1.0 + (-v).exp()))
                .into()]),
            Op::Tanh => Ok(vec![inputs[0].array().mapv(f32::tanh).into()]),
            Op::Softmax => Ok(vec![softmax(inputs[0])?.into()]),
            Op::Split { axis, parts } => split(inputs[0], *axis, *parts),
        }
    }
}

fn matmul2(op: &'static str, a: &Tensor, b: &Tensor) -> Result<ArrayD<f32>, OpError> {
    let av = a
        .array()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| OpError::NotAMatrix {
            op,
            dims: a.dims().to_vec(),
        })?;
    let bv = b
        .array()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| OpError::NotAMatrix {
            op,
            dims: b.dims().to_vec(),
        })?;
    if av.shape()[1] != bv.shape()[0] {
        return Err(OpError::IncompatibleShapes {
            op,
            lhs: a.dims().to_vec(),
            rhs: b.dims().to_vec(),
        });
    }
    Ok(av.dot(&bv).into_dyn())
}

/// Elementwise with ndarray broadcasting of the right-hand side.
fn broadcast_binary(
    op: &'static str,
    a: &Tensor,
    b: &Tensor,
    f: impl Fn(f32, f32) -> f32,
) -> Result<ArrayD<f32>, OpError> {
    let bv = b
        .array()
        .broadcast(a.array().raw_dim())
        .ok_or_else(|| OpError::IncompatibleShapes {
            op,
            lhs: a.dims().to_vec(),
            rhs: b.dims().to_vec(),
        })?;
    let mut out = a.array().clone();
    out.zip_mut_with(&bv, |x, y| *x = f(*x, *y));
    Ok(out)
}

fn softmax(x: &Tensor) -> Result<ArrayD<f32>, OpError> {
    let rank = x.dims().len();
    if rank == 0 {
        return Err(OpError::ZeroRank { op: "Softmax" });
    }
    let mut y = x.array().clone();
    for mut lane in y.lanes_mut(Axis(rank - 1)) {
        let max = lane.fold(f32::NEG_INFINITY, |m, v| m.max(*v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|v| v / sum);
    }
    Ok(y)
}

fn split(x: &Tensor, axis: usize, parts: usize) -> Result<Vec<Tensor>, OpError> {
    let dims = x.dims();
    if axis >= dims.len() {
        return Err(OpError::BadAxis {
            op: "Split",
            axis,
            dims: dims.to_vec(),
        });
    }
    let len = dims[axis];
    if parts == 0 || len % parts != 0 {
        return Err(OpError::NotDivisible { len, parts });
    }
    Ok(x.array()
        .axis_chunks_iter(Axis(axis), len / parts)
        .map(|chunk| chunk.to_owned().into())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_fuses_matmul_and_bias() {
        let x = Tensor::from_vec(&[2, 3], vec![1., 0., 0., 0., 1., 0.]).unwrap();
        let w = Tensor::from_vec(&[3, 2], vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let b = Tensor::from_vec(&[2], vec![10., 20.]).unwrap();
        let y = Op::Linear.run(&[&x, &w, &b]).unwrap();
        assert_eq!(y.len(), 1);
        assert_eq!(y[0].dims(), &[2, 2]);
        assert_eq!(
            y[0].array().iter().copied().collect::<Vec<_>>(),
            vec![11., 22., 13., 24.]
        );
    }

    #[test]
    fn matmul_rejects_bad_shapes() {
        let a = Tensor::zeros(&[2, 3]);
        let b = Tensor::zeros(&[4, 2]);
        assert!(matches!(
            Op::MatMul.run(&[&a, &b]),
            Err(OpError::IncompatibleShapes { op: "MatMul", .. })
        ));

        let v = Tensor::zeros(&[3]);
        assert!(matches!(
            Op::MatMul.run(&[&a, &v]),
            Err(OpError::NotAMatrix { .. })
        ));
    }

    #[test]
    fn add_broadcasts_rhs() {
        let a = Tensor::from_vec(&[2, 2], vec![1., 2., 3., 4.]).unwrap();
        let b = Tensor::from_vec(&[2], vec![10., 20.]).unwrap();
        let y = Op::Add.run(&[&a, &b]).unwrap();
        assert_eq!(
            y[0].array().iter().copied().collect::<Vec<_>>(),
            vec![11., 22., 13., 24.]
        );

        let c = Tensor::zeros(&[3]);
        assert!(Op::Add.run(&[&a, &c]).is_err());
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let x = Tensor::from_vec(&[2, 3], vec![1., 2., 3., 0., 0., 0.]).unwrap();
        let y = Op::Softmax.run(&[&x]).unwrap();
        for row in y[0].array().rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }

        let scalar = Tensor::zeros(&[]);
        assert!(matches!(
            Op::Softmax.run(&[&scalar]),
            Err(OpError::ZeroRank { op: "Softmax" })
        ));
    }

    #[test]
    fn split_yields_slot_per_chunk() {
        let x = Tensor::from_vec(&[4, 2], (0..8).map(|v| v as f32).collect()).unwrap();
        let ys = Op::Split { axis: 0, parts: 2 }.run(&[&x]).unwrap();
        assert_eq!(ys.len(), 2);
        assert_eq!(ys[0].dims(), &[2, 2]);
        assert_eq!(ys[1].array()[[0, 0]], 4.);

        assert!(matches!(
            Op::Split { axis: 0, parts: 3 }.run(&[&x]),
            Err(OpError::NotDivisible { len: 4, parts: 3 })
        ));
        assert!(matches!(
            Op::Split { axis: 2, parts: 2 }.run(&[&x]),
            Err(OpError::BadAxis { axis: 2, .. })
        ));
    }

    #[test]
    fn arity_is_checked() {
        let x = Tensor::zeros(&[1]);
        assert!(matches!(
            Op::Add.run(&[&x]),
            Err(OpError::Arity {
                op: "Add",
                expected: 2,
                got: 1
            })
        ));
    }
}
