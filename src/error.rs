use std::io;

/// Errors raised while loading a corpus or running the sampler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid hyperparameter {param} = {value}: must be finite and positive")]
    InvalidHyperparameter { param: String, value: f64 },

    #[error("document {doc} refers to word {index}, outside a vocabulary of {vocab_size}")]
    WordOutOfRange {
        doc: usize,
        index: usize,
        vocab_size: usize,
    },

    #[error("numerical degeneracy at document {doc}: {reason}")]
    Numerical { doc: usize, reason: String },

    #[error("numerical degeneracy while resampling topic {label}: {reason}")]
    TopicDegenerate { label: usize, reason: String },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
