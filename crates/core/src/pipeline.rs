//! Pipeline controller
//!
//! Sequences version resolution, workspace assembly and the requested build
//! stages, and guarantees teardown on every exit path that created a
//! workspace. Failures before the workspace exists end the pipeline with
//! nothing to tear down.

use std::process::Command;

use tracing::{error, info, warn};

use crate::assemble::SourceTreeAssembler;
use crate::config::PipelineConfig;
use crate::release::ReleaseTarget;
use crate::stage::{BuildStage, BuildStageRunner};
use crate::version::PackageVersion;
use crate::workspace::BuildWorkspace;
use crate::{exec, Result};

pub struct PipelineController {
    config: PipelineConfig,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for the configured release.
    ///
    /// A stage failure aborts the remaining stages but still reaches
    /// teardown; the error is returned after cleanup completes.
    pub fn run(&self) -> Result<()> {
        let release = ReleaseTarget::lookup(&self.config.release)?;
        let version = PackageVersion::resolve(
            &self.config.version_file(),
            self.config.suffix.as_deref(),
            self.config.revision,
        )?;
        info!(
            version = %version.qualified(),
            release = release.name,
            "resolved package version"
        );

        let mut workspace = BuildWorkspace::create(
            &self.config.build_root,
            &self.config.project_name,
            release,
            self.config.keep_workspace,
        )?;

        let result = self.assemble_and_stage(release, &version, &workspace);
        self.teardown(&mut workspace);
        result
    }

    fn assemble_and_stage(
        &self,
        release: &'static ReleaseTarget,
        version: &PackageVersion,
        workspace: &BuildWorkspace,
    ) -> Result<()> {
        let assembler = SourceTreeAssembler::new(&self.config, release, version);
        let archive = assembler.assemble(workspace)?;
        info!(archive = %archive.display(), "source tree assembled");

        let runner = BuildStageRunner::new(&self.config, release, version, workspace);
        for stage in &self.config.stages {
            if let Err(e) = runner.run(*stage) {
                error!(
                    stage = stage.label(),
                    error = %e,
                    "build stage failed, skipping remaining stages"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Best-effort teardown: end any chroot sessions the isolated build may
    /// have left behind, then remove the workspace unless retention was
    /// requested. Never turns a successful run into a failure.
    fn teardown(&self, workspace: &mut BuildWorkspace) {
        if self.config.stages.contains(&BuildStage::ChrootBinary) {
            let mut cmd = Command::new(&self.config.toolchain.schroot);
            cmd.args(["-e", "--all-sessions"]);
            if let Err(e) = exec::run_streamed(&mut cmd) {
                warn!(error = %e, "failed to end chroot sessions");
            }
        }
        if let Err(e) = workspace.cleanup() {
            warn!(error = %e, "failed to remove workspace");
        }
    }
}
