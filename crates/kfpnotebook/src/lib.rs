//! Notebook pipeline steps
//!
//! Validates the parameters of a notebook step and renders the container
//! command line that hands the notebook to the bootstrapper.

mod artifacts;
mod factory;
mod notebook_op;

pub use artifacts::{ArtifactList, INOUT_SEPARATOR};
pub use factory::{NotebookOpFactory, OpMetadata, ParamDefinition};
pub use notebook_op::{
    NotebookOp, NotebookOpBuilder, DEFAULT_BOOTSTRAP_SCRIPT_URL, DEFAULT_GPU_VENDOR,
    DEFAULT_REQUIREMENTS_URL, GPU_VENDOR_ENV, WORKSPACE_MOUNT_PATH, WORKSPACE_VOLUME_NAME,
};
