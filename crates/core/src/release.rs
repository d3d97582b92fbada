//! Release target registry
//!
//! Every Ubuntu release the pipeline can build for is described here, in one
//! static table. Components receive a `&'static ReleaseTarget` and never
//! branch on release names themselves.

use crate::{Error, Result};

/// A supported Ubuntu release and its packaging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// Release codename, also used as the workspace directory name.
    pub name: &'static str,
    /// Qt branch whose `syncqt` script generates headers for this release.
    pub toolchain: &'static str,
    /// Architecture the chroot build runs under.
    pub arch: &'static str,
}

const RELEASES: &[ReleaseTarget] = &[
    ReleaseTarget {
        name: "bionic",
        toolchain: "5.9",
        arch: "amd64",
    },
    ReleaseTarget {
        name: "focal",
        toolchain: "5.12",
        arch: "amd64",
    },
    ReleaseTarget {
        name: "jammy",
        toolchain: "5.15",
        arch: "amd64",
    },
];

impl ReleaseTarget {
    /// Look up a release by codename.
    ///
    /// An unknown release is a configuration error, not something the
    /// pipeline recovers from.
    pub fn lookup(name: &str) -> Result<&'static ReleaseTarget> {
        RELEASES
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownRelease {
                name: name.to_string(),
                known: Self::known().join(", "),
            })
    }

    /// Codenames of all registered releases.
    pub fn known() -> Vec<&'static str> {
        RELEASES.iter().map(|r| r.name).collect()
    }

    /// Name of the schroot profile used for the isolated binary build.
    pub fn chroot(&self) -> String {
        format!("{}-{}", self.name, self.arch)
    }
}
