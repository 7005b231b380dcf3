//! Resolution pipeline and in-process dynamic load
//!
//! `Loader::load_library` is the single entry point for embedders. It walks
//! the resolution tiers in order:
//!
//! 1. explicit override path from the environment ([`crate::PathProbe`]);
//! 2. bundled artifact matching the host ([`crate::BundleLocator`]), copied
//!    into the cache;
//! 3. generic placeholder resolved over the network ([`crate::Downloader`]),
//!    installed into the cache.
//!
//! The resolved directory is then opened with the configured load policy. On
//! platforms whose dynamic loader resolves sibling dependencies itself, one
//! open of the main library suffices; on the ordered platform every library
//! must be opened in dependency order, because getting it wrong surfaces as
//! missing-symbol failures at load time.

use crate::bundle::{BundleLocator, BundleResolution};
use crate::cache::CacheStore;
use crate::config::{LoadConfig, LoadPolicy, OrderedLoadPlan};
use crate::download::Downloader;
use crate::error::{SideloadError, SideloadResult};
use crate::platform::{mapped_library_name, PlatformDescriptor};
use crate::probe::PathProbe;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Handles stay open for the life of the process; there is no unload.
struct LoadedNative {
    main_path: PathBuf,
    _handles: Vec<libloading::Library>,
}

static LOADED: OnceLock<LoadedNative> = OnceLock::new();

/// Resolves and loads one native library cluster.
pub struct Loader {
    config: LoadConfig,
}

impl Loader {
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Resolve and load the native library, returning the path of the loaded
    /// main library file.
    ///
    /// The load is a process-wide once-only operation: the first successful
    /// call wins, and every later call is a no-op that returns the originally
    /// loaded path without re-running resolution. A failed call leaves the
    /// latch unset, so the embedder may retry.
    pub fn load_library(&self) -> SideloadResult<PathBuf> {
        if let Some(loaded) = LOADED.get() {
            debug!(path = %loaded.main_path.display(), "native library already loaded");
            return Ok(loaded.main_path.clone());
        }

        let main_path = self.resolve_library()?;
        let handles = self.open(&main_path)?;

        // Two racing first calls both dlopen; the loser's handles drop and
        // only decrement the loader's reference counts.
        let entry = LOADED.get_or_init(|| LoadedNative {
            main_path,
            _handles: handles,
        });
        Ok(entry.main_path.clone())
    }

    /// Run the resolution tiers without performing the dynamic load,
    /// returning the path of the main library file.
    pub fn resolve_library(&self) -> SideloadResult<PathBuf> {
        if let Some(path) = PathProbe::new(&self.config).find_override() {
            debug!(path = %path.display(), "resolved native library from override path");
            return Ok(path);
        }

        let host = PlatformDescriptor::from_host(self.config.flavor.clone());
        let cache = CacheStore::new(self.config.cache_root(), &self.config.lib_name);
        let locator = BundleLocator::new(self.config.manifest_sources.clone());

        let dir = match locator.discover(&host)? {
            BundleResolution::Matched { descriptor, dir } => {
                self.install_bundled(&descriptor, &dir, &cache)?
            }
            BundleResolution::Placeholder(placeholder) => {
                Downloader::new(&self.config.base_url).fetch(&placeholder, &host, &cache)?
            }
            BundleResolution::NoBundles => {
                let mapped = mapped_library_name(&self.config.lib_name);
                return Err(SideloadError::native_load(
                    mapped,
                    "not found in override path and no bundled native artifacts are present",
                ));
            }
        };

        Ok(dir.join(mapped_library_name(&self.config.lib_name)))
    }

    /// Copy a matching bundled artifact's library files into the cache,
    /// unless a usable entry is already installed.
    fn install_bundled(
        &self,
        descriptor: &PlatformDescriptor,
        bundle_dir: &Path,
        cache: &CacheStore,
    ) -> SideloadResult<PathBuf> {
        let version = descriptor.version();
        let flavor = descriptor.normalized_flavor();
        let classifier = descriptor.arch_classifier();

        if let Some(dir) = cache.lookup(version, flavor, classifier) {
            return Ok(dir);
        }

        let sources: Vec<PathBuf> = descriptor
            .libraries()
            .iter()
            .map(|name| bundle_dir.join(name))
            .collect();
        cache.install(version, flavor, classifier, &sources)
    }

    /// Open the resolved library under the configured load policy.
    fn open(&self, main_path: &Path) -> SideloadResult<Vec<libloading::Library>> {
        let sequence = match self.config.load_policy {
            LoadPolicy::AutoResolve => {
                if !main_path.is_file() {
                    return Err(SideloadError::native_load(main_path, "file does not exist"));
                }
                vec![main_path.to_path_buf()]
            }
            LoadPolicy::Ordered => {
                let dir = main_path.parent().ok_or_else(|| {
                    SideloadError::native_load(main_path, "library path has no parent directory")
                })?;
                let main_name = main_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ordered_load_sequence(dir, &main_name, &self.config.ordered_plan)?
            }
        };

        let mut handles = Vec::with_capacity(sequence.len());
        for path in sequence {
            debug!(path = %path.display(), "opening native library");
            let library = unsafe { libloading::Library::new(&path) }
                .map_err(|e| SideloadError::native_load(&path, e))?;
            handles.push(library);
        }
        Ok(handles)
    }
}

/// Staged open order for the platform whose loader does not resolve sibling
/// dependencies: first every other regular file in the directory (sorted by
/// name, excluding the plan's libraries and the main library), then the
/// required intermediates in plan order, then each optional library that is
/// present on disk, then the main library.
///
/// Pure path computation; the caller performs the actual opens.
fn ordered_load_sequence(
    dir: &Path,
    main_name: &str,
    plan: &OrderedLoadPlan,
) -> SideloadResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SideloadError::io(format!("reading library directory {}", dir.display()), e))?;

    let mut sweep: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| SideloadError::io(format!("reading library directory {}", dir.display()), e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let deferred = name == main_name
            || plan.intermediates.iter().any(|n| n == &name)
            || plan.optional.iter().any(|n| n == &name);
        if !deferred {
            sweep.push(path);
        }
    }
    sweep.sort();

    let mut sequence = sweep;
    for name in &plan.intermediates {
        let path = dir.join(name);
        if !path.is_file() {
            return Err(SideloadError::native_load(path, "required dependency is missing"));
        }
        sequence.push(path);
    }
    for name in &plan.optional {
        let path = dir.join(name);
        // Absent optional runtimes (CPU-only installs) are skipped silently.
        if path.is_file() {
            sequence.push(path);
        }
    }

    let main = dir.join(main_name);
    if !main.is_file() {
        return Err(SideloadError::native_load(main, "file does not exist"));
    }
    sequence.push(main);
    Ok(sequence)
}
