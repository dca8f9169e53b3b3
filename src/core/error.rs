//! Error types for density trees and max-kernel search

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No leaf with tag {0} was visited while caching paths")]
    TagNotFound(usize),

    #[error("Unknown kernel type: {0}")]
    UnknownKernel(String),

    #[error("Conflicting inputs: {0}")]
    ConflictingInputs(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;
