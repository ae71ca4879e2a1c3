use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasinError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter vector length mismatch: expected {expected}, got {got}")]
    ParameterLength { expected: usize, got: usize },

    #[error("Table '{path}': {message}")]
    Table { path: String, message: String },

    #[error("Simulation horizon exceeded: step {step} >= horizon {horizon}")]
    HorizonExceeded { step: usize, horizon: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BasinResult<T> = Result<T, BasinError>;
