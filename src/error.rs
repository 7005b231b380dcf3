//! Error types for sideload
//!
//! All modules use `SideloadResult<T>` as their return type. Absence at a
//! resolution tier (no override, no bundles, cache miss) is a normal negative
//! result and is never modeled as an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sideload operations
pub type SideloadResult<T> = Result<T, SideloadError>;

/// All errors that can occur while resolving, fetching, or loading a
/// native library bundle. Every variant is terminal for the call that
/// produced it; there is no fallback tier after one of these surfaces.
#[derive(Error, Debug)]
pub enum SideloadError {
    // Version errors
    #[error("Malformed native library version: {version}. Expected MAJOR.MINOR.PATCH with optional -suffix")]
    VersionFormat { version: String },

    // Resolution errors
    #[error(
        "Bundled native artifacts do not match this host ({classifier}, flavor {flavor}) \
         and no generic placeholder is present"
    )]
    PlatformMismatch { classifier: String, flavor: String },

    #[error("Invalid native manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    // Network errors
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    // Load errors
    #[error("Failed to load native library {path}: {reason}")]
    NativeLoad { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SideloadError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a manifest parse error
    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ManifestParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a download error
    pub fn download(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a native load error
    pub fn native_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::NativeLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
