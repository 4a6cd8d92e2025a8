use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FskTestError {
    #[error("{0}")]
    Usage(String),

    #[error("Couldn't open {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to allocate buffer of {requested} elements")]
    Allocation { requested: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input size: expected {expected}, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("Modem requested {required} input samples, outside [{min}, {max}]")]
    FrameContract {
        required: usize,
        min: usize,
        max: usize,
    },
}

impl FskTestError {
    pub fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by how the program was invoked.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, FskTestError>;
