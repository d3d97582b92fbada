//! Build stages and per-stage tool invocation
//!
//! Each stage maps to exactly one external packaging command, built from the
//! resolved version, release target and workspace path. Stages run in the
//! order the operator requested them; the only deviation is the implicit
//! dependency rule, which synthesizes a source package ahead of a stage
//! that needs one.

use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::config::PipelineConfig;
use crate::exec;
use crate::release::ReleaseTarget;
use crate::version::PackageVersion;
use crate::workspace::BuildWorkspace;
use crate::Result;

/// A single step of the packaging pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Signed source package (`debuild -S -sa`); prompts for a key.
    SignedSource,
    /// Unsigned source package (`debuild -S -us -uc`); never prompts.
    UnsignedSource,
    /// Binary package built inside a release chroot (`sbuild`).
    ChrootBinary,
    /// Binary package built directly on the host (`debuild -b`).
    LocalBinary,
    /// Upload of the source changes descriptor (`dput`).
    Upload,
}

impl BuildStage {
    pub fn label(&self) -> &'static str {
        match self {
            BuildStage::SignedSource => "signed source package",
            BuildStage::UnsignedSource => "unsigned source package",
            BuildStage::ChrootBinary => "chroot binary package",
            BuildStage::LocalBinary => "local binary package",
            BuildStage::Upload => "upload",
        }
    }
}

/// Executes build stages against one assembled workspace.
pub struct BuildStageRunner<'a> {
    config: &'a PipelineConfig,
    release: &'static ReleaseTarget,
    version: &'a PackageVersion,
    workspace: &'a BuildWorkspace,
}

impl<'a> BuildStageRunner<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        release: &'static ReleaseTarget,
        version: &'a PackageVersion,
        workspace: &'a BuildWorkspace,
    ) -> Self {
        Self {
            config,
            release,
            version,
            workspace,
        }
    }

    pub fn run(&self, stage: BuildStage) -> Result<()> {
        info!(stage = stage.label(), "running build stage");
        match stage {
            BuildStage::SignedSource => self.source_package(true),
            BuildStage::UnsignedSource => self.source_package(false),
            BuildStage::ChrootBinary => self.chroot_binary(),
            BuildStage::LocalBinary => self.local_binary(),
            BuildStage::Upload => self.upload(),
        }
    }

    fn source_package(&self, signed: bool) -> Result<()> {
        let mut cmd = Command::new(&self.config.toolchain.debuild);
        if signed {
            cmd.args(["-S", "-sa"]);
        } else {
            cmd.args(["-S", "-us", "-uc"]);
        }
        cmd.current_dir(self.workspace.root());
        exec::run_streamed(&mut cmd)
    }

    fn chroot_binary(&self) -> Result<()> {
        let dsc = self.dsc_path();
        if !dsc.exists() {
            info!(dsc = %dsc.display(), "no source package descriptor, building one first");
            self.source_package(false)?;
        }

        let mut cmd = Command::new(&self.config.toolchain.sbuild);
        cmd.args(["-vd", self.release.name])
            .args(["-c", &self.release.chroot()])
            .arg("-j8")
            .arg(self.dsc_name())
            .current_dir(self.workspace.artifact_dir());
        exec::run_streamed(&mut cmd)
    }

    fn local_binary(&self) -> Result<()> {
        let mut cmd = Command::new(&self.config.toolchain.debuild);
        cmd.args(["-b", "-uc", "-us"])
            .current_dir(self.workspace.root());
        exec::run_streamed(&mut cmd)
    }

    fn upload(&self) -> Result<()> {
        let changes = self.changes_path();
        if !changes.exists() {
            info!(changes = %changes.display(), "no changes descriptor, building a signed source package first");
            self.source_package(true)?;
        }

        let mut cmd = Command::new(&self.config.toolchain.dput);
        cmd.arg(&self.config.upload_channel)
            .arg(self.changes_name())
            .current_dir(self.workspace.artifact_dir());
        exec::run_streamed(&mut cmd)
    }

    fn dsc_name(&self) -> String {
        format!(
            "{}_{}.dsc",
            self.config.project_name,
            self.version.full(self.release)
        )
    }

    fn dsc_path(&self) -> PathBuf {
        self.workspace.artifact_dir().join(self.dsc_name())
    }

    fn changes_name(&self) -> String {
        format!(
            "{}_{}_source.changes",
            self.config.project_name,
            self.version.full(self.release)
        )
    }

    fn changes_path(&self) -> PathBuf {
        self.workspace.artifact_dir().join(self.changes_name())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Toolchain;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for a packaging tool.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    struct Fixture {
        _build: TempDir,
        _tools: TempDir,
        _project: TempDir,
        config: PipelineConfig,
        version: PackageVersion,
        workspace: BuildWorkspace,
    }

    /// Scripted toolchain: `debuild` records its arguments and drops the
    /// descriptor files a real run would leave in the artifact directory,
    /// `sbuild`/`dput` record their invocation.
    fn fixture() -> Fixture {
        let build = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        let release = ReleaseTarget::lookup("focal").unwrap();
        let workspace = BuildWorkspace::create(build.path(), "qtusb", release, true).unwrap();

        let debuild = fake_tool(
            tools.path(),
            "debuild",
            "echo \"debuild $@\" >> ../debuild.log\n\
             touch ../qtusb_1.4.0-focal1.dsc\n\
             touch ../qtusb_1.4.0-focal1_source.changes",
        );
        let sbuild = fake_tool(tools.path(), "sbuild", "echo \"sbuild $@\" >> sbuild.log");
        let dput = fake_tool(tools.path(), "dput", "echo \"dput $@\" >> dput.log");

        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".qmake.conf"), "MODULE_VERSION = 1.4.0\n").unwrap();

        let config = PipelineConfig {
            project_name: "qtusb".to_string(),
            project_root: project.path().to_path_buf(),
            release: "focal".to_string(),
            revision: 1,
            suffix: None,
            stages: vec![],
            keep_workspace: true,
            build_root: build.path().to_path_buf(),
            upload_channel: "ppa:test/ppa".to_string(),
            helper_url: None,
            toolchain: Toolchain {
                debuild,
                sbuild,
                dput,
                ..Default::default()
            },
        };
        let version = PackageVersion::resolve(&config.version_file(), None, 1).unwrap();

        Fixture {
            _build: build,
            _tools: tools,
            _project: project,
            config,
            version,
            workspace,
        }
    }

    fn runner(f: &Fixture) -> BuildStageRunner<'_> {
        let release = ReleaseTarget::lookup("focal").unwrap();
        BuildStageRunner::new(&f.config, release, &f.version, &f.workspace)
    }

    #[test]
    fn signed_and_unsigned_source_use_expected_flags() {
        let f = fixture();
        runner(&f).run(BuildStage::SignedSource).unwrap();
        runner(&f).run(BuildStage::UnsignedSource).unwrap();

        let log = fs::read_to_string(f.workspace.artifact_dir().join("debuild.log")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "debuild -S -sa");
        assert_eq!(lines[1], "debuild -S -us -uc");
    }

    #[test]
    fn chroot_binary_synthesizes_missing_source_package() {
        let f = fixture();
        runner(&f).run(BuildStage::ChrootBinary).unwrap();

        // The implicit unsigned source build ran first...
        let debuild = fs::read_to_string(f.workspace.artifact_dir().join("debuild.log")).unwrap();
        assert!(debuild.contains("-S -us -uc"));
        // ...and sbuild was pointed at the descriptor it produced.
        let sbuild = fs::read_to_string(f.workspace.artifact_dir().join("sbuild.log")).unwrap();
        assert!(sbuild.contains("-vd focal -c focal-amd64 -j8 qtusb_1.4.0-focal1.dsc"));
    }

    #[test]
    fn chroot_binary_reuses_existing_descriptor() {
        let f = fixture();
        fs::write(
            f.workspace.artifact_dir().join("qtusb_1.4.0-focal1.dsc"),
            "",
        )
        .unwrap();
        runner(&f).run(BuildStage::ChrootBinary).unwrap();

        assert!(!f.workspace.artifact_dir().join("debuild.log").exists());
        assert!(f.workspace.artifact_dir().join("sbuild.log").exists());
    }

    #[test]
    fn upload_synthesizes_missing_changes_descriptor() {
        let f = fixture();
        runner(&f).run(BuildStage::Upload).unwrap();

        let debuild = fs::read_to_string(f.workspace.artifact_dir().join("debuild.log")).unwrap();
        assert!(debuild.contains("-S -sa"), "upload wants a signed source");
        let dput = fs::read_to_string(f.workspace.artifact_dir().join("dput.log")).unwrap();
        assert!(dput.contains("ppa:test/ppa qtusb_1.4.0-focal1_source.changes"));
    }

    #[test]
    fn failing_tool_reports_external_tool_error() {
        let mut f = fixture();
        f.config.toolchain.debuild = fake_tool(f._tools.path(), "debuild-fail", "exit 2");

        let err = runner(&f).run(BuildStage::UnsignedSource).unwrap_err();
        match err {
            crate::Error::ExternalTool { status, .. } => assert_eq!(status.code(), Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }
}
