//! Changelog rendering
//!
//! The changelog template carries two literal placeholder tokens: the word
//! `distro` where the release codename goes, and `(0.0.0)` where the full
//! Debian version goes. Substitution is plain string replacement, not a
//! templating language; a template without a token renders unchanged (we
//! warn, since that almost always means a stale template).

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::release::ReleaseTarget;
use crate::{Error, Result};

const RELEASE_TOKEN: &str = "distro";
const VERSION_TOKEN: &str = "(0.0.0)";

/// Render the changelog template for one release and full Debian version.
pub fn render(template: &str, release: &ReleaseTarget, full_version: &str) -> String {
    if !template.contains(RELEASE_TOKEN) {
        warn!(token = RELEASE_TOKEN, "changelog template has no release token");
    }
    if !template.contains(VERSION_TOKEN) {
        warn!(token = VERSION_TOKEN, "changelog template has no version token");
    }
    template
        .replace(RELEASE_TOKEN, release.name)
        .replace(VERSION_TOKEN, &format!("({full_version})"))
}

/// Read the template at `template_path`, render it, and write the result to
/// `dest`, overwriting any existing changelog there.
pub fn materialize(
    template_path: &Path,
    release: &ReleaseTarget,
    full_version: &str,
    dest: &Path,
) -> Result<()> {
    let template = match fs::read_to_string(template_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::TemplateMissing(template_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let rendered = render(&template, release, full_version);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, rendered)?;
    debug!(dest = %dest.display(), "wrote changelog");
    Ok(())
}
