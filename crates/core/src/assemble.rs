//! Source tree assembly and archive creation
//!
//! Strategy: filter-copy. The project tree is copied into the workspace with
//! development artifacts excluded by name pattern, headers are generated in
//! the copy where the toolchain needs it, the versioned source archive is
//! packed from the copy, and only then is packaging metadata installed on
//! top. Copying happens before pruning decisions ever touch disk, so the
//! original tree is never written to.

use std::fs;
use std::path::Path;
use std::process::Command;

use flate2::write::GzEncoder;
use flate2::Compression;
use glob::Pattern;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::release::ReleaseTarget;
use crate::version::PackageVersion;
use crate::workspace::BuildWorkspace;
use crate::{changelog, exec, fetch};
use crate::{Error, Result};

/// Name patterns that never ship in a source package: packaging metadata,
/// version control, local build output, editor state, CI config and
/// scripting helpers.
const EXCLUDED: &[&str] = &[
    "debian*",
    "packaging",
    ".git*",
    "build*",
    "bin",
    "lib",
    "include",
    "mkspecs",
    "libusb*",
    "tests",
    "examples",
    "*.deb",
    "*.ddeb",
    "*.dsc",
    "*.changes",
    "*.orig.tar.gz",
    "*.user",
    "*.clang*",
    ".travis*",
    "appveyor.yml",
    "Jenkinsfile",
    "*.py",
    "*.bat",
    "Doxyfile",
];

/// Produces a populated [`BuildWorkspace`] and the matching source archive
/// for one release.
pub struct SourceTreeAssembler<'a> {
    config: &'a PipelineConfig,
    release: &'static ReleaseTarget,
    version: &'a PackageVersion,
    patterns: Vec<Pattern>,
}

impl<'a> SourceTreeAssembler<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        release: &'static ReleaseTarget,
        version: &'a PackageVersion,
    ) -> Self {
        let patterns = EXCLUDED
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self {
            config,
            release,
            version,
            patterns,
        }
    }

    /// Fill the workspace and produce the source archive.
    ///
    /// Returns the archive path in the artifact directory.
    pub fn assemble(&self, ws: &BuildWorkspace) -> Result<std::path::PathBuf> {
        self.copy_source(ws)?;
        self.generate_headers(ws)?;
        let archive = self.create_archive(ws)?;
        self.install_metadata(ws)?;

        changelog::materialize(
            &self.config.template_path(),
            self.release,
            &self.version.full(self.release),
            &ws.debian_dir().join("changelog"),
        )?;
        fs::write(ws.root().join("version"), self.version.qualified())?;

        Ok(archive)
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// Copy the project tree into the workspace, skipping excluded entries.
    fn copy_source(&self, ws: &BuildWorkspace) -> Result<()> {
        let src_root = &self.config.project_root;
        // Guard against a build root nested inside the project tree.
        let build_root = self.config.build_root.canonicalize().ok();

        let walker = WalkDir::new(src_root).into_iter().filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if self.is_excluded(&name) {
                debug!(path = %entry.path().display(), "excluded from source copy");
                return false;
            }
            if let Some(build_root) = &build_root {
                if entry
                    .path()
                    .canonicalize()
                    .map(|p| p.starts_with(build_root))
                    .unwrap_or(false)
                {
                    return false;
                }
            }
            true
        });

        let mut copied = 0usize;
        for entry in walker {
            let entry = entry.map_err(|e| Error::Assembly(e.to_string()))?;
            if entry.depth() == 0 {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(src_root)
                .map_err(|e| Error::Assembly(e.to_string()))?;
            let dest = ws.root().join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &dest)?;
                copied += 1;
            }
        }
        info!(files = copied, dest = %ws.root().display(), "copied filtered source tree");
        Ok(())
    }

    /// Run the toolchain's header generation helper inside the workspace
    /// copy. Headers must exist in the archive since the package builds from
    /// an exported tree, not a checkout.
    fn generate_headers(&self, ws: &BuildWorkspace) -> Result<()> {
        let Some(url_template) = &self.config.helper_url else {
            debug!("header generation disabled");
            return Ok(());
        };

        let helper = fetch::fetch_helper(
            url_template,
            self.release.toolchain,
            &self.config.helper_cache_dir(),
        )?;

        let mut cmd = Command::new(&self.config.toolchain.perl);
        cmd.arg(&helper)
            .args(["-version", self.version.base()])
            .arg(".")
            .current_dir(ws.root());
        exec::run_streamed(&mut cmd)
    }

    /// Pack the workspace content into `<project>_<qualified>.orig.tar.gz`.
    ///
    /// Runs before metadata installation, so the archive and the shipped
    /// source tree are byte-identical in content.
    fn create_archive(&self, ws: &BuildWorkspace) -> Result<std::path::PathBuf> {
        let archive_path = ws.artifact_dir().join(format!(
            "{}_{}.orig.tar.gz",
            self.config.project_name,
            self.version.qualified()
        ));

        let file = fs::File::create(&archive_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", ws.root())?;
        builder.into_inner()?.finish()?;

        info!(archive = %archive_path.display(), "wrote source archive");
        Ok(archive_path)
    }

    /// Install packaging metadata into `workspace/debian/`: shared files
    /// first, then per-release overrides on top.
    fn install_metadata(&self, ws: &BuildWorkspace) -> Result<()> {
        let shared = self.config.packaging_dir().join("debian");
        if !shared.is_dir() {
            return Err(Error::Assembly(format!(
                "packaging metadata missing: {}",
                shared.display()
            )));
        }
        copy_tree(&shared, &ws.debian_dir())?;

        let overrides = self.config.packaging_dir().join(self.release.name);
        if overrides.is_dir() {
            debug!(dir = %overrides.display(), "applying per-release metadata overrides");
            copy_tree(&overrides, &ws.debian_dir())?;
        }
        Ok(())
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Assembly(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Assembly(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let out = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out)?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &out)?;
        }
    }
    Ok(())
}
