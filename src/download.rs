//! On-demand download of native library sets
//!
//! The final resolution tier: a placeholder manifest names a version but no
//! concrete platform, so the matching library set is fetched from a
//! version-scoped release URL. The remote publishes a plain-text index
//! (`files.txt`) whose lines are `flavor/os/filename.ext.gz`; only lines
//! matching the resolved flavor and OS prefix are fetched, gunzipped while
//! streaming, and handed to the cache for an atomic install.
//!
//! Network fetches are the only slow operations in the crate. There is no
//! timeout, retry, or cancellation here: a failed fetch is terminal for the
//! call, and a mid-stream failure discards the staging directory so no
//! partial cache entry is ever observable.

use crate::cache::CacheStore;
use crate::error::{SideloadError, SideloadResult};
use crate::platform::PlatformDescriptor;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Fetches a remote release into the local cache.
pub struct Downloader {
    base_url: String,
    agent: ureq::Agent,
}

impl Downloader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Resolve `placeholder` against the remote release for the concrete
    /// `host` platform, returning the installed cache directory.
    ///
    /// The cache is consulted first; a hit skips the network entirely. The
    /// placeholder's flavor drives remote selection (falling back to the
    /// host's flavor when the placeholder leaves it empty), the host supplies
    /// the OS prefix and classifier.
    pub fn fetch(
        &self,
        placeholder: &PlatformDescriptor,
        host: &PlatformDescriptor,
        cache: &CacheStore,
    ) -> SideloadResult<PathBuf> {
        let flavor = if placeholder.flavor().is_empty() {
            host.normalized_flavor().to_string()
        } else {
            placeholder.normalized_flavor().to_string()
        };
        let classifier = host.arch_classifier();
        let version = placeholder.version();

        if let Some(dir) = cache.lookup(version, &flavor, classifier) {
            return Ok(dir);
        }

        // Malformed version is a hard stop before any network traffic.
        let url_version = placeholder.normalized_version()?;
        let release_url = format!("{}/{}", self.base_url, url_version);

        let index_url = format!("{release_url}/files.txt");
        debug!(url = %index_url, "fetching remote native library index");
        let listing = self.get_text(&index_url)?;

        let wanted = select_remote_files(&listing, &flavor, host.os_family());
        if wanted.is_empty() {
            return Err(SideloadError::download(
                &index_url,
                format!("no remote files published for {flavor}/{}", host.os_family()),
            ));
        }

        let staging = tempfile::tempdir()
            .map_err(|e| SideloadError::io("creating download staging directory", e))?;
        let mut staged = Vec::with_capacity(wanted.len());
        for line in &wanted {
            let file_url = format!("{release_url}/{line}");
            let name = local_file_name(line);
            info!(file = %name, "downloading native library file");

            let dest = staging.path().join(&name);
            self.get_gzipped(&file_url, &dest)?;
            staged.push(dest);
        }

        cache.install(version, &flavor, classifier, &staged)
    }

    fn get_text(&self, url: &str) -> SideloadResult<String> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| SideloadError::download(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| SideloadError::download(url, e))
    }

    /// Stream `url`, stripping the single gzip container, into `dest`.
    fn get_gzipped(&self, url: &str, dest: &std::path::Path) -> SideloadResult<()> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| SideloadError::download(url, e))?;
        let mut decoder = GzDecoder::new(response.into_body().into_reader());
        let mut file = File::create(dest)
            .map_err(|e| SideloadError::io(format!("creating {}", dest.display()), e))?;
        io::copy(&mut decoder, &mut file).map_err(|e| SideloadError::download(url, e))?;
        Ok(())
    }
}

/// Index lines selected for this flavor and OS, in published order.
fn select_remote_files(listing: &str, flavor: &str, os_prefix: &str) -> Vec<String> {
    let prefix = format!("{flavor}/{os_prefix}/");
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(&prefix))
        .map(str::to_string)
        .collect()
}

/// Local file name for an index line: the last path segment with the single
/// compression suffix stripped (`cpu/linux/libfoo.so.gz` -> `libfoo.so`).
fn local_file_name(line: &str) -> String {
    let name = line.rsplit('/').next().unwrap_or(line);
    name.strip_suffix(".gz").unwrap_or(name).to_string()
}
