//! sideload - runtime resolution of platform-specific native libraries
//!
//! A host process that binds to a large native project cannot bundle every
//! platform/accelerator build of that library. This crate finds a compatible
//! build at runtime, materializes it on local disk if necessary, and loads it
//! in a platform-correct order.
//!
//! The library is searched for in the following order:
//!
//! 1. an explicit override directory or file named by an environment
//!    variable (then the platform's generic library-search path);
//! 2. a bundled native artifact shipped with the deployment, selected by
//!    platform manifest and copied into the local cache;
//! 3. a generic placeholder manifest, resolved by downloading the matching
//!    file set from a version-scoped release URL into the local cache.
//!
//! ```no_run
//! use sideload::{LoadConfig, Loader};
//!
//! let config = LoadConfig::new("demo_engine", "https://releases.example.com/native")
//!     .with_manifest_sources(vec!["bundles/linux".into(), "bundles/generic".into()]);
//! let loaded = Loader::new(config).load_library()?;
//! println!("native library loaded from {}", loaded.display());
//! # Ok::<(), sideload::SideloadError>(())
//! ```

pub mod bundle;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod loader;
pub mod platform;
pub mod probe;

pub use bundle::{BundleLocator, BundleResolution};
pub use cache::CacheStore;
pub use config::{LoadConfig, LoadPolicy, OrderedLoadPlan};
pub use download::Downloader;
pub use error::{SideloadError, SideloadResult};
pub use loader::Loader;
pub use platform::{mapped_library_name, PlatformDescriptor};
pub use probe::PathProbe;
