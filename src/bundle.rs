//! Bundled-artifact discovery
//!
//! The second resolution tier. A deployment may carry zero, one, or many
//! native-artifact bundles (e.g. one per target platform in a multi-module
//! build), each described by a manifest in its own directory. The locator
//! iterates an explicit, injected list of source directories rather than
//! scanning any process-wide resource path, which keeps discovery
//! deterministic and testable.

use crate::error::{SideloadError, SideloadResult};
use crate::platform::PlatformDescriptor;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Manifest file name expected inside each source directory.
pub const MANIFEST_FILE: &str = "native.toml";

/// Outcome of scanning the configured manifest sources.
#[derive(Debug)]
pub enum BundleResolution {
    /// A bundled artifact exactly matching the host platform, with the
    /// directory its library files live in.
    Matched {
        descriptor: PlatformDescriptor,
        dir: PathBuf,
    },
    /// Only a generic placeholder was found; the library set must be
    /// downloaded.
    Placeholder(PlatformDescriptor),
    /// No native artifacts are present at all. This is the expected state
    /// for an override-only deployment, not an error.
    NoBundles,
}

/// Enumerates and classifies bundled-artifact manifests.
#[derive(Debug)]
pub struct BundleLocator {
    sources: Vec<PathBuf>,
}

impl BundleLocator {
    /// `sources` are scanned in order; that order is the tie-break when
    /// several bundles match the host.
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Scan all sources and classify the result against `host`.
    ///
    /// The first manifest that exactly matches the host wins and stops the
    /// scan; otherwise the first placeholder encountered is reported. A
    /// manifest that fails to parse is logged and skipped so one bad bundle
    /// cannot abort discovery. A non-empty scan with neither a match nor a
    /// placeholder is a hard failure: artifacts were bundled for platforms
    /// that do not include this host.
    pub fn discover(&self, host: &PlatformDescriptor) -> SideloadResult<BundleResolution> {
        let mut placeholder = None;
        let mut seen_any = false;

        for source in &self.sources {
            let manifest_path = source.join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            seen_any = true;

            let descriptor = match PlatformDescriptor::from_manifest(&manifest_path) {
                Ok(d) => d,
                Err(e) => {
                    warn!(manifest = %manifest_path.display(), error = %e, "skipping unreadable native manifest");
                    continue;
                }
            };

            if descriptor.is_placeholder() {
                if placeholder.is_none() {
                    placeholder = Some(descriptor);
                }
            } else if descriptor.matches(host) {
                debug!(dir = %source.display(), "bundled native artifact matches host");
                return Ok(BundleResolution::Matched {
                    descriptor,
                    dir: source.clone(),
                });
            }
        }

        if let Some(descriptor) = placeholder {
            return Ok(BundleResolution::Placeholder(descriptor));
        }
        if !seen_any {
            return Ok(BundleResolution::NoBundles);
        }
        Err(SideloadError::PlatformMismatch {
            classifier: host.arch_classifier().to_string(),
            flavor: host.normalized_flavor().to_string(),
        })
    }
}
