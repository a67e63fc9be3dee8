//! Error types for template rendering and record grouping

use thiserror::Error;

/// Errors produced while parsing or rendering a filename template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template text could not be parsed
    #[error("Malformed template '{template}': {reason}")]
    Malformed { template: String, reason: String },

    /// The template references a variable that has no binding
    #[error("Variable '{0}' is referenced by the template but has no binding")]
    UnboundVariable(String),

    /// A variable parameter is unknown or carries an unsupported value
    #[error("Invalid parameter '{name}={value}' for variable '{variable}'")]
    InvalidParameter {
        variable: String,
        name: String,
        value: String,
    },

    /// A variable requires a parameter that was not given
    #[error("Variable '{variable}' requires parameter '{parameter}'")]
    MissingParameter { variable: String, parameter: String },
}

impl TemplateError {
    pub fn malformed(template: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(variable: &str, name: &str, value: &str) -> Self {
        Self::InvalidParameter {
            variable: variable.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Errors that can occur while grouping records into batches
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrouperError {
    /// A construction parameter or input was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Rendering the batch key failed; grouper state is unchanged
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A rollover rendered the key of a batch that is already full
    ///
    /// Only reachable when a partition repeats a sequence number across a
    /// batch boundary.
    #[error("Batch key '{key}' already holds {limit} records; offsets must increase across a rollover")]
    KeyCollision { key: String, limit: usize },
}

impl GrouperError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type alias for GrouperError
pub type Result<T> = std::result::Result<T, GrouperError>;
