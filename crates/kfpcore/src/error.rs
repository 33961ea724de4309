use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Op error: {0}")]
    Op(#[from] OpError),

    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Cyclic dependency detected")]
    CyclicDependency,
}

/// Failures raised while constructing an op. Construction is all-or-nothing,
/// so one of these means no op exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    /// A required parameter was not supplied at all.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// A parameter was supplied but its value is unusable, or a parameter
    /// with no default (the image) was left out.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Construction failed: {0}")]
    Construction(String),
}

impl OpError {
    pub fn missing(field: impl Into<String>) -> Self {
        OpError::MissingArgument(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OpError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter, when there is one
    pub fn field(&self) -> Option<&str> {
        match self {
            OpError::MissingArgument(field) => Some(field),
            OpError::InvalidValue { field, .. } => Some(field),
            OpError::Construction(_) => None,
        }
    }
}
