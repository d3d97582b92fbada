//! Package version resolution from project metadata
//!
//! The upstream version lives in the project's qmake config as a
//! `MODULE_VERSION = x.y.z` line. The first matching line wins.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::release::ReleaseTarget;
use crate::{Error, Result};

const VERSION_PATTERN: &str = r"^MODULE_VERSION = (.+)";

/// The package version for one pipeline run.
///
/// Resolved once from the project config, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    base: String,
    suffix: Option<String>,
    counter: u32,
}

impl PackageVersion {
    /// Extract the version from `config`, combining it with an optional
    /// suffix and the numeric release counter.
    ///
    /// Fails with [`Error::Config`] if the file cannot be opened and
    /// [`Error::VersionNotFound`] if no line matches the version pattern.
    pub fn resolve(config: &Path, suffix: Option<&str>, counter: u32) -> Result<Self> {
        let file = File::open(config).map_err(|source| Error::Config {
            path: config.to_path_buf(),
            source,
        })?;

        // The pattern is a constant, so compilation cannot fail.
        let pattern = Regex::new(VERSION_PATTERN).map_err(|e| Error::Assembly(e.to_string()))?;

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| Error::Config {
                path: config.to_path_buf(),
                source,
            })?;
            if let Some(captures) = pattern.captures(&line) {
                let base = captures[1].trim().to_string();
                if base.is_empty() {
                    break;
                }
                debug!(version = %base, config = %config.display(), "resolved version");
                return Ok(Self {
                    base,
                    suffix: suffix.filter(|s| !s.is_empty()).map(str::to_string),
                    counter,
                });
            }
        }

        Err(Error::VersionNotFound(config.to_path_buf()))
    }

    /// The bare upstream version, e.g. `1.4.0`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The upstream version with the optional suffix, e.g. `1.4.0~beta1`.
    /// This names the source archive.
    pub fn qualified(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}~{}", self.base, suffix),
            None => self.base.clone(),
        }
    }

    /// The full Debian version for one release, e.g. `1.4.0-focal1`.
    pub fn full(&self, release: &ReleaseTarget) -> String {
        format!("{}-{}{}", self.qualified(), release.name, self.counter)
    }
}
