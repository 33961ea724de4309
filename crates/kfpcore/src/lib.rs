//! Core abstractions for notebook pipeline steps
//!
//! This crate provides the step descriptor that pipeline authoring consumes,
//! the error taxonomy shared by every op, and the pipeline container that
//! orders steps. It performs no I/O.

mod container;
mod error;
mod pipeline;
mod value;

pub use container::{ContainerSpec, EnvVar, Resources, VolumeMount};
pub use error::{OpError, PipelineError};
pub use pipeline::{Dependency, Pipeline, PipelineId};
pub use value::Value;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
