use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("External tool failure: {0}")]
    ExternalTool(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Diagnosis is not repairable: {0}")]
    NotRepairable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConfError>;
