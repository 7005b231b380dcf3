//! Local cache of installed native library sets
//!
//! Entries are keyed by `(version, flavor, classifier)` and live as plain
//! directories under the cache root. The central correctness property is that
//! an entry directory either does not exist or is fully populated: installs
//! are staged in a private unique temp directory and land via
//! delete-then-rename, so a partial install is never visible under the final
//! name. Entries are never updated in place and never evicted here; a version
//! bump creates a new key.

use crate::error::{SideloadError, SideloadResult};
use crate::platform::mapped_library_name;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Content-addressed-by-version directory cache for native library sets.
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    main_lib_file: String,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, lib_name: &str) -> Self {
        Self {
            root: root.into(),
            main_lib_file: mapped_library_name(lib_name),
        }
    }

    /// Directory a given key maps to: `<root>/<version><flavor>-<classifier>`.
    fn entry_dir(&self, version: &str, flavor: &str, classifier: &str) -> PathBuf {
        self.root.join(format!("{version}{flavor}-{classifier}"))
    }

    /// Returns the entry directory if a usable copy is already installed,
    /// judged by the presence of the main library file. A miss is a normal
    /// negative result.
    pub fn lookup(&self, version: &str, flavor: &str, classifier: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(version, flavor, classifier);
        if dir.join(&self.main_lib_file).is_file() {
            debug!(dir = %dir.display(), "native library cache hit");
            Some(dir)
        } else {
            None
        }
    }

    /// Install `source_files` as the entry for the given key.
    ///
    /// Files are copied into a private staging directory first; only a fully
    /// staged set replaces the target (any prior entry is deleted just before
    /// the rename). On any staging failure the staging directory is removed
    /// and the target is left in its prior state. Concurrent installs of the
    /// same key each stage privately; last writer wins with a self-consistent
    /// result.
    pub fn install(
        &self,
        version: &str,
        flavor: &str,
        classifier: &str,
        source_files: &[PathBuf],
    ) -> SideloadResult<PathBuf> {
        fs::create_dir_all(&self.root)
            .map_err(|e| SideloadError::io(format!("creating cache root {}", self.root.display()), e))?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|e| SideloadError::io("creating cache staging directory", e))?;

        for source in source_files {
            let name = source
                .file_name()
                .ok_or_else(|| {
                    SideloadError::io(
                        format!("staging {}", source.display()),
                        std::io::Error::other("source path has no file name"),
                    )
                })?;
            // TempDir cleans up the staging directory if any copy fails.
            fs::copy(source, staging.path().join(name)).map_err(|e| {
                SideloadError::io(format!("staging {}", source.display()), e)
            })?;
        }

        let target = self.entry_dir(version, flavor, classifier);
        if target.exists() {
            fs::remove_dir_all(&target).map_err(|e| {
                SideloadError::io(format!("removing stale cache entry {}", target.display()), e)
            })?;
        }

        let staged = staging.keep();
        if let Err(e) = fs::rename(&staged, &target) {
            let _ = fs::remove_dir_all(&staged);
            return Err(SideloadError::io(
                format!("installing cache entry {}", target.display()),
                e,
            ));
        }

        info!(dir = %target.display(), files = source_files.len(), "installed native library cache entry");
        Ok(target)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
