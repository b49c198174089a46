//! Extraction of a recorded forward computation into the structural graph
//! records a TensorBoard-style viewer consumes: run the model once, collect
//! the operation/value dataflow, name every node, optionally splice out
//! pass-through values, and encode the survivors.

use std::borrow::Cow;

use sumie_core::module::ForwardError;
use thiserror::Error;

mod capture;
mod export;
mod graph;
mod namer;
mod normalize;
pub mod proto;

pub use export::GraphExportBuilder;

#[derive(Error, Debug)]
pub enum ExportError {
    /// The model's own forward pass failed. Naming state is already
    /// restored by the time this surfaces.
    #[error("Forward pass failed: {0}")]
    Forward(#[from] ForwardError),

    #[error("Model inputs not usable: {0}")]
    InvalidInput(Cow<'static, str>),

    #[error("Model output must be a variable or a non-empty list or map of variables: {0}")]
    InvalidOutput(Cow<'static, str>),

    #[error("Model parameters and inputs do not share a tape")]
    TapeMismatch,

    #[error("A trace observer is already registered on this tape")]
    ExtractionInProgress,

    #[error("Captured node '{0}' is neither an operation nor a produced value")]
    UnrecognizedNode(String),
}
