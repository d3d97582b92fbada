//! Pipeline configuration
//!
//! All run parameters live in one explicit value constructed by the caller
//! and threaded through the pipeline; no component consults ambient state.

use std::path::PathBuf;

use crate::stage::BuildStage;

/// External tool binaries invoked by the pipeline.
///
/// Overridable so tests can substitute scripted stand-ins for the real
/// packaging tools.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub debuild: String,
    pub sbuild: String,
    pub dput: String,
    pub schroot: String,
    pub perl: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            debuild: "debuild".to_string(),
            sbuild: "sbuild".to_string(),
            dput: "dput".to_string(),
            schroot: "schroot".to_string(),
            perl: "perl".to_string(),
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Package name; names the source archive and build artifacts.
    pub project_name: String,
    /// Root of the project source tree. Never written to.
    pub project_root: PathBuf,
    /// Target release codename, validated against the registry at run start.
    pub release: String,
    /// Numeric package release counter appended to the Debian version.
    pub revision: u32,
    /// Optional version suffix, joined with `~`.
    pub suffix: Option<String>,
    /// Stages to run, in the order requested by the operator.
    pub stages: Vec<BuildStage>,
    /// Retain the workspace at teardown instead of deleting it.
    pub keep_workspace: bool,
    /// Directory under which workspaces and the helper cache are created.
    pub build_root: PathBuf,
    /// Distribution channel passed to the upload client.
    pub upload_channel: String,
    /// URL template for the header generation helper, with `{version}`
    /// standing for the release's toolchain version. `None` disables header
    /// generation entirely.
    pub helper_url: Option<String>,
    pub toolchain: Toolchain,
}

impl PipelineConfig {
    /// The project config file holding the version declaration.
    pub fn version_file(&self) -> PathBuf {
        self.project_root.join(".qmake.conf")
    }

    /// Directory holding packaging metadata and the changelog template.
    pub fn packaging_dir(&self) -> PathBuf {
        self.project_root.join("packaging")
    }

    pub fn template_path(&self) -> PathBuf {
        self.packaging_dir().join("changelog_template")
    }

    /// On-disk cache for fetched helper scripts, shared across runs.
    pub fn helper_cache_dir(&self) -> PathBuf {
        self.build_root.join("cache")
    }
}
