use thiserror::Error;

use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("{0} is a directory; an extension is required for directory input")]
    AmbiguousTarget(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("No match found")]
    EmptyResult,
}

impl AppError {
    /// Process exit status for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 1,
            AppError::Usage(_) => 2,
            AppError::AmbiguousTarget(_) => 3,
            AppError::Engine(_) => 4,
            AppError::EmptyResult => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let errors = [
            AppError::Config("bad".into()),
            AppError::Usage("bad".into()),
            AppError::AmbiguousTarget("./songs".into()),
            AppError::Engine(EngineError::Capture("no device".into())),
            AppError::EmptyResult,
        ];

        let mut codes: Vec<i32> = errors.iter().map(AppError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_engine_error_keeps_underlying_message() {
        let err: AppError = EngineError::Capture("device unplugged".into()).into();
        assert!(err.to_string().contains("device unplugged"));
    }

    #[test]
    fn test_ambiguous_target_names_path() {
        let err = AppError::AmbiguousTarget("./songs".into());
        let msg = err.to_string();
        assert!(msg.contains("./songs"));
        assert!(msg.contains("extension is required"));
    }
}
