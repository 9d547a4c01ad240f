use thiserror::Error;

/// Main error type for the RankForge system
#[derive(Error, Debug)]
pub enum RfError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Master error: {0}")]
    Master(#[from] MasterError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data-store related errors. Inside the coordinator loops these are
/// transient: the cycle is logged and skipped, never escalated.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Persistence failed: {message}")]
    PersistFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Model-related errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model clone failed: {message}")]
    CloneFailed { message: String },

    #[error("Unknown model: {name}")]
    UnknownModel { name: String },

    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    #[error("Invalid model snapshot: {message}")]
    InvalidSnapshot { message: String },

    #[error("Fit failed: {message}")]
    FitFailed { message: String },
}

/// Hyperparameter search errors. `Config` is returned synchronously to the
/// caller of the search entry point, never silently coerced.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Coordinator errors
#[derive(Error, Debug)]
pub enum MasterError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },
}

/// Result type alias for RankForge operations
pub type RfResult<T> = Result<T, RfError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::SearchError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ModelError::CloneFailed {
            message: "state not initialized".to_string(),
        };
        assert!(error.to_string().contains("Model clone failed"));
        assert!(error.to_string().contains("state not initialized"));
    }

    #[test]
    fn test_error_conversion() {
        let model_error = ModelError::UnknownModel {
            name: "bpr".to_string(),
        };
        let rf_error: RfError = model_error.into();

        match rf_error {
            RfError::Model(_) => (),
            _ => panic!("Expected Model error"),
        }
    }

    #[test]
    fn test_macros() {
        let err = config_error!("expect {} to be categorical", "n_factors");
        assert!(err.to_string().contains("n_factors"));
    }
}
