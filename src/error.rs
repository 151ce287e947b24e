//! Error types.
//!
//! Input problems (malformed instance data, unreadable instance text)
//! fail fast at construction. Solver-boundary failures are kept apart
//! from optimization outcomes: an infeasible model is an [`Outcome`],
//! an unreachable solver is a [`SolverError`].
//!
//! [`Outcome`]: crate::extract::Outcome

use thiserror::Error;

use crate::validation::ValidationError;

/// An instance failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    /// One or more structural problems were detected in the raw data.
    #[error("invalid instance: {}", join_messages(.0))]
    Invalid(Vec<ValidationError>),
}

impl InstanceError {
    /// All validation errors carried by this error.
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Invalid(errors) => errors,
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Instance text could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEnd(String),

    #[error("invalid integer '{token}' while reading {context}")]
    InvalidInteger { token: String, context: String },

    #[error("{0} unexpected trailing token(s)")]
    TrailingTokens(usize),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The external solver could not process a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// Solver binary, license or resources are not available.
    #[error("solver unavailable: {0}")]
    Unavailable(String),

    /// The model uses a construct this solver cannot handle.
    #[error("unsupported model: {0}")]
    Unsupported(String),
}

/// Solver configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while compiling or reading back a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// A generated model failed its own consistency checks.
    #[error("formulation defect: {0}")]
    Formulation(String),

    #[error(transparent)]
    Instance(#[from] InstanceError),
}
