//! Error types with actionable diagnostics.
//!
//! Every variant carries enough context to act on without consulting
//! external documentation. Configuration errors abort construction before
//! any partial state exists; resource errors name the iteration and phrase
//! that were in flight.

use thiserror::Error;

/// Result type alias for imaginar operations.
pub type Result<T> = std::result::Result<T, ImaginarError>;

/// Errors that can occur while setting up or driving a dream run.
#[derive(Error, Debug)]
pub enum ImaginarError {
    /// The encourage phrase list came out empty after parsing.
    #[error("No encourage phrase given\n  → Provide at least one non-empty phrase, e.g. \"a red cube\" or \"fire|flames\"")]
    EmptyPrompt,

    /// A configuration field holds an invalid value.
    #[error("Invalid configuration value for '{field}': {message}\n  → {suggestion}")]
    ConfigValue { field: String, message: String, suggestion: String },

    /// Latent dimensions disagree with the generator's input contract.
    #[error("Latent shape mismatch: expected {expected:?}, got {actual:?}\n  → The latent state must match the generator's noise_dim and num_classes")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// A frozen backend (generator or critic) failed to construct.
    ///
    /// Fatal by design: scoring is the loop's only feedback signal, so
    /// there is no degraded mode to fall back to.
    #[error("Failed to load {model}: {message}\n  → Check that the weights are present and the backend supports this host")]
    ModelLoad { model: String, message: String },

    /// Device or host memory was exhausted mid-iteration.
    #[error("Resource exhaustion at iteration {iteration} while dreaming \"{phrase}\": {message}\n  → Reduce num_cutouts, copies, or the image size and rerun")]
    ResourceExhausted { iteration: usize, phrase: String, message: String },

    /// IO error with context (CLI layer only).
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic error for unexpected internal conditions.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ImaginarError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a configuration error for a named field.
    pub fn config(
        field: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::ConfigValue {
            field: field.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Check if this error is user-recoverable (fix the input and rerun).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyPrompt
                | Self::ConfigValue { .. }
                | Self::ModelLoad { .. }
                | Self::ResourceExhausted { .. }
        )
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "E001",
            Self::ConfigValue { .. } => "E002",
            Self::ShapeMismatch { .. } => "E010",
            Self::ModelLoad { .. } => "E020",
            Self::ResourceExhausted { .. } => "E030",
            Self::Io { .. } => "E050",
            Self::Internal { .. } => "E999",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = vec![
            ImaginarError::EmptyPrompt,
            ImaginarError::config("lr", "must be positive", "use 0.07"),
            ImaginarError::ShapeMismatch { expected: vec![128], actual: vec![64] },
            ImaginarError::ModelLoad { model: "critic".into(), message: "".into() },
            ImaginarError::ResourceExhausted {
                iteration: 0,
                phrase: "".into(),
                message: "".into(),
            },
            ImaginarError::Internal { message: "".into() },
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(ImaginarError::EmptyPrompt.is_user_error());
        assert!(ImaginarError::config("lr", "", "").is_user_error());
        assert!(!ImaginarError::Internal { message: "".into() }.is_user_error());
        assert!(!ImaginarError::ShapeMismatch { expected: vec![], actual: vec![] }
            .is_user_error());
    }

    #[test]
    fn test_resource_error_names_iteration_and_phrase() {
        let err = ImaginarError::ResourceExhausted {
            iteration: 412,
            phrase: "a red cube".into(),
            message: "allocation of 8 GiB failed".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("412"));
        assert!(msg.contains("a red cube"));
        assert!(msg.contains("num_cutouts"));
    }

    #[test]
    fn test_config_error_includes_suggestion() {
        let err = ImaginarError::config("max_classes", "must be at least 1", "omit the flag or pass 1..=num_classes");
        let msg = err.to_string();
        assert!(msg.contains("max_classes"));
        assert!(msg.contains("omit the flag"));
    }

    #[test]
    fn test_io_error_constructor() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ImaginarError::io("writing snapshot", io_err);
        assert!(matches!(err, ImaginarError::Io { .. }));
        assert!(err.to_string().contains("writing snapshot"));
    }
}
