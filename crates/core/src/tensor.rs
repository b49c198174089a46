use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("Data of length {len} does not fit shape {dims:?}")]
    SizeMismatch { dims: Vec<usize>, len: usize },
}

/// Dense f32 tensor. Everything this framework computes with is one of
/// these; the shape is carried by the underlying array.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    pub fn zeros(dims: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(dims)),
        }
    }

    pub fn from_vec(dims: &[usize], data: Vec<f32>) -> Result<Self, TensorError> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(dims), data)
            .map(|data| Self { data })
            .map_err(|_| TensorError::SizeMismatch {
                dims: dims.to_vec(),
                len,
            })
    }

    pub fn dims(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn array(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self { data }
    }
}
