//! Cached retrieval of the header generation helper
//!
//! Some toolchain versions need the upstream `syncqt` script to generate
//! module headers before the source archive is produced. The script is
//! fetched once per toolchain version and cached on disk; a later run with
//! the same toolchain reuses the cached copy without touching the network.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Error, Result};

/// Default URL template; `{version}` is replaced by the toolchain version.
pub const DEFAULT_HELPER_URL: &str =
    "https://raw.githubusercontent.com/qt/qtbase/{version}/bin/syncqt.pl";

/// Fetch the helper script for `toolchain` into `cache_dir`, skipping the
/// download if the cached file already exists. Returns the cached path.
pub fn fetch_helper(url_template: &str, toolchain: &str, cache_dir: &Path) -> Result<PathBuf> {
    let dest = cache_dir.join(format!("syncqt_{toolchain}.pl"));
    if dest.is_file() {
        debug!(path = %dest.display(), "helper already cached");
        return Ok(dest);
    }

    fs::create_dir_all(cache_dir)?;

    let url = url_template.replace("{version}", toolchain);
    info!("Fetching {}", url);
    let response = reqwest::blocking::get(&url)?;
    if !response.status().is_success() {
        return Err(Error::Http(
            response
                .error_for_status()
                .expect_err("should be error status"),
        ));
    }
    let bytes = response.bytes()?;
    fs::write(&dest, &bytes)?;

    info!("Downloaded to {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cached_helper_skips_network() {
        let temp = TempDir::new().unwrap();
        let cached = temp.path().join("syncqt_5.12.pl");
        fs::write(&cached, "#!/usr/bin/perl\n").unwrap();

        // An unreachable URL proves no fetch is attempted.
        let path = fetch_helper("http://invalid.invalid/{version}", "5.12", temp.path()).unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn cache_is_keyed_by_toolchain_version() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("syncqt_5.9.pl"), "").unwrap();

        // Same cache dir, different toolchain: the cached 5.9 copy must not
        // satisfy a 5.12 request.
        let err = fetch_helper("http://invalid.invalid/{version}", "5.12", temp.path());
        assert!(err.is_err());
    }
}
