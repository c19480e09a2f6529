use thiserror::Error;

#[derive(Error, Debug)]
pub enum PermForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Invalid Order: {order:?} is not a permutation of 0..{n}")]
    InvalidOrder { order: Vec<usize>, n: usize },

    #[error("Size Mismatch: {what} has {got} items, expected {expected}")]
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}

pub type PfResult<T> = Result<T, PermForgeError>;
