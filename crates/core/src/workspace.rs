//! Build workspace lifecycle
//!
//! A workspace is owned by exactly one pipeline run. Its path is keyed by
//! project and release name so batch invocations for several releases can
//! never collide, and any leftover from an earlier run is destroyed before
//! the directory is recreated.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::release::ReleaseTarget;
use crate::Result;

/// An ephemeral directory tree holding the filtered source copy, packaging
/// metadata and generated changelog for one release build.
pub struct BuildWorkspace {
    root: PathBuf,
    /// Directory one level above the workspace; build tools drop their
    /// artifacts (.orig.tar.gz, .dsc, .changes, .deb) here.
    artifacts: PathBuf,
    keep: bool,
    cleaned_up: bool,
}

impl BuildWorkspace {
    /// Create a fresh workspace for one release under `build_root`.
    ///
    /// Partial state from a previous run is removed first; a workspace is
    /// always rebuilt from scratch.
    pub fn create(
        build_root: &Path,
        project: &str,
        release: &ReleaseTarget,
        keep: bool,
    ) -> Result<Self> {
        let artifacts = build_root.join(format!("{project}-build"));
        let root = artifacts.join(release.name);

        if root.exists() {
            debug!(path = %root.display(), "removing leftover workspace");
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        info!(path = %root.display(), "created build workspace");

        Ok(Self {
            root,
            artifacts,
            keep,
            cleaned_up: false,
        })
    }

    /// The workspace directory holding the filtered source tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where build tools leave their output, one level above the workspace.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifacts
    }

    /// The packaging metadata directory inside the workspace.
    pub fn debian_dir(&self) -> PathBuf {
        self.root.join("debian")
    }

    /// Remove the workspace directory, unless retention was requested.
    /// Safe to call more than once.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }
        if self.keep {
            info!(path = %self.root.display(), "keeping build workspace");
            self.cleaned_up = true;
            return Ok(());
        }
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        info!(path = %self.root.display(), "removed build workspace");
        self.cleaned_up = true;
        Ok(())
    }
}

impl Drop for BuildWorkspace {
    fn drop(&mut self) {
        if !self.cleaned_up {
            if let Err(e) = self.cleanup() {
                error!(error = %e, path = %self.root.display(), "failed to clean up workspace on drop");
            }
        }
    }
}
