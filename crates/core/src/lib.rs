//! debpress-core: staged Debian package build pipeline
//!
//! This crate derives a package version from project metadata, assembles a
//! filtered source tree and versioned archive for a target Ubuntu release,
//! and drives the external packaging toolchain (debuild, sbuild, dput)
//! through the requested build stages with guaranteed cleanup.

mod assemble;
mod changelog;
mod config;
mod error;
mod exec;
mod fetch;
mod pipeline;
mod release;
mod stage;
mod version;
mod workspace;

pub use assemble::SourceTreeAssembler;
pub use config::{PipelineConfig, Toolchain};
pub use error::Error;
pub use fetch::DEFAULT_HELPER_URL;
pub use pipeline::PipelineController;
pub use release::ReleaseTarget;
pub use stage::{BuildStage, BuildStageRunner};
pub use version::PackageVersion;
pub use workspace::BuildWorkspace;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
