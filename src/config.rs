//! Load configuration
//!
//! `LoadConfig` is constructed by the embedding process and carries every
//! knob the resolution pipeline needs: library naming, the override and
//! search-path environment variables, the injected manifest sources, the
//! download base URL, and the load-order policy. The crate reads no config
//! files of its own.

use std::path::PathBuf;

/// How the main library's sibling dependencies are resolved at load time.
///
/// Decided once, up front, from the host OS (or overridden by the embedder)
/// rather than re-derived at each load site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// The platform's dynamic loader resolves the dependency graph itself;
    /// a single open of the main library suffices.
    AutoResolve,
    /// The platform's loader does not resolve sibling dependencies, so the
    /// caller must open every library in dependency order.
    Ordered,
}

impl LoadPolicy {
    /// Default policy for the platform this process is running on.
    pub fn for_host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Ordered
        } else {
            Self::AutoResolve
        }
    }
}

/// Staged load order used under [`LoadPolicy::Ordered`].
///
/// The sweep phase loads every regular file in the resolved directory that
/// is not named here and is not the main library. Then `intermediates` load
/// in order (all required), then `optional` in order (each skipped silently
/// when absent), then the main library.
#[derive(Debug, Clone, Default)]
pub struct OrderedLoadPlan {
    /// Libraries that must load after the sweep but before the main library,
    /// in this exact order (e.g. a math/threading library, then the CPU
    /// runtime).
    pub intermediates: Vec<String>,
    /// Libraries loaded after the intermediates only if present on disk
    /// (e.g. the GPU runtime and its compute runtime). Absence is normal
    /// for CPU-only installs.
    pub optional: Vec<String>,
}

/// Configuration for a single native library load.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Base name of the main library, mapped per-OS to a file name
    /// (`foo` becomes `libfoo.so`, `libfoo.dylib`, or `foo.dll`).
    pub lib_name: String,
    /// Product name used for the cache root: `<home>/.<product>/cache`.
    pub product: String,
    /// Version-scoped download root; the remote index lives at
    /// `<base_url>/<version>/files.txt`.
    pub base_url: String,
    /// Environment variable naming an explicit override directory or file.
    pub override_var: String,
    /// Generic library-search-path variable consulted after the override.
    pub search_path_var: String,
    /// Ordered directories scanned for bundled-artifact manifests.
    pub manifest_sources: Vec<PathBuf>,
    /// Accelerator flavor of this host ("" means default/cpu).
    pub flavor: String,
    /// Cache root override; defaults to `<home>/.<product>/cache`.
    pub cache_root: Option<PathBuf>,
    /// Dependency resolution behavior of the host's dynamic loader.
    pub load_policy: LoadPolicy,
    /// Load order used when `load_policy` is [`LoadPolicy::Ordered`].
    pub ordered_plan: OrderedLoadPlan,
}

impl LoadConfig {
    /// Create a configuration with platform defaults for `lib_name`.
    pub fn new(lib_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let lib_name = lib_name.into();
        let override_var = format!(
            "{}_LIBRARY_PATH",
            lib_name.to_uppercase().replace('-', "_")
        );
        Self {
            product: lib_name.clone(),
            base_url: base_url.into(),
            override_var,
            search_path_var: default_search_path_var().to_string(),
            manifest_sources: Vec::new(),
            flavor: String::new(),
            cache_root: None,
            load_policy: LoadPolicy::for_host(),
            ordered_plan: OrderedLoadPlan::default(),
            lib_name,
        }
    }

    /// Set the ordered directories scanned for bundled manifests.
    pub fn with_manifest_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.manifest_sources = sources;
        self
    }

    /// Set the host accelerator flavor (e.g. "cu117").
    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    /// Override the cache root (primarily for tests).
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Override the load policy and its ordered plan.
    pub fn with_load_policy(mut self, policy: LoadPolicy, plan: OrderedLoadPlan) -> Self {
        self.load_policy = policy;
        self.ordered_plan = plan;
        self
    }

    /// Cache root for this configuration.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_root.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(format!(".{}", self.product))
                .join("cache")
        })
    }
}

/// The platform's conventional library-search-path variable.
fn default_search_path_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}
