//! Platform descriptors
//!
//! A `PlatformDescriptor` is an immutable value describing one target runtime
//! environment: OS family, architecture classifier, accelerator flavor,
//! version, and the file names making up one load unit. Descriptors come from
//! two places: introspecting the running host, or parsing the TOML manifest
//! shipped next to a bundled native artifact.

use crate::error::{SideloadError, SideloadResult};
use serde::Deserialize;
use std::path::Path;

/// Flavor sentinel used when a descriptor carries the empty (default) flavor.
pub const DEFAULT_FLAVOR: &str = "cpu";

/// Raw manifest shape as written by the artifact packaging tool.
#[derive(Debug, Deserialize)]
struct RawManifest {
    version: String,
    #[serde(default)]
    classifier: String,
    #[serde(default)]
    flavor: String,
    #[serde(default)]
    libraries: Vec<String>,
    #[serde(default)]
    placeholder: bool,
}

/// Immutable description of a target runtime environment.
///
/// Exactly one of {concrete platform match, placeholder} holds for any
/// instance; a placeholder never names constituent libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    os_family: String,
    arch_classifier: String,
    flavor: String,
    version: String,
    libraries: Vec<String>,
    placeholder: bool,
}

impl PlatformDescriptor {
    /// Describe the platform this process is currently executing on.
    ///
    /// Never fails; an OS this crate has no name for degrades to a generic
    /// family tag. The host descriptor carries no version (version selection
    /// happens against manifests, not the host) and the default flavor;
    /// embedders with accelerator hardware set the flavor through
    /// [`crate::LoadConfig::with_flavor`].
    pub fn from_host(flavor: impl Into<String>) -> Self {
        let os_family = host_os_family();
        Self {
            arch_classifier: format!("{}-{}", os_family, host_arch()),
            os_family: os_family.to_string(),
            flavor: flavor.into(),
            version: String::new(),
            libraries: Vec::new(),
            placeholder: false,
        }
    }

    /// Parse the manifest at `path` into a descriptor.
    ///
    /// Missing or malformed required keys, and a placeholder that names
    /// constituent libraries, are both manifest errors.
    pub fn from_manifest(path: &Path) -> SideloadResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SideloadError::io(format!("reading manifest {}", path.display()), e))?;
        let raw: RawManifest =
            toml::from_str(&content).map_err(|e| SideloadError::manifest(path, e.to_string()))?;

        if raw.placeholder && !raw.libraries.is_empty() {
            return Err(SideloadError::manifest(
                path,
                "placeholder manifests must not list libraries",
            ));
        }
        if !raw.placeholder && raw.classifier.is_empty() {
            return Err(SideloadError::manifest(
                path,
                "concrete manifests require a classifier",
            ));
        }

        let os_family = raw
            .classifier
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            os_family,
            arch_classifier: raw.classifier,
            flavor: raw.flavor,
            version: raw.version,
            libraries: raw.libraries,
            placeholder: raw.placeholder,
        })
    }

    /// True iff `other` describes the same platform: equal OS family,
    /// architecture classifier, and normalized flavor. Version is
    /// intentionally not part of the predicate; flavor/arch compatibility is
    /// necessary and sufficient, and version selection happens later.
    pub fn matches(&self, other: &Self) -> bool {
        self.os_family == other.os_family
            && self.arch_classifier == other.arch_classifier
            && self.normalized_flavor() == other.normalized_flavor()
    }

    /// Canonical `MAJOR.MINOR.PATCH(-suffix)?` component of the version,
    /// with any `-SNAPSHOT` / trailing build-number suffix stripped.
    ///
    /// A version that does not start with a numeric triplet is a hard stop:
    /// no download URL can be built from it.
    pub fn normalized_version(&self) -> SideloadResult<String> {
        normalize_version(&self.version)
    }

    /// Raw flavor tag as declared; may be empty (meaning default/cpu).
    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Flavor with the empty string normalized to the `"cpu"` sentinel.
    pub fn normalized_flavor(&self) -> &str {
        if self.flavor.is_empty() {
            DEFAULT_FLAVOR
        } else {
            &self.flavor
        }
    }

    pub fn os_family(&self) -> &str {
        &self.os_family
    }

    pub fn arch_classifier(&self) -> &str {
        &self.arch_classifier
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// File names that together make up one load unit. Empty for
    /// placeholders and host descriptors.
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

fn normalize_version(version: &str) -> SideloadResult<String> {
    let mut segments = version.split('-');
    let triplet = segments.next().unwrap_or_default();
    let numbers: Vec<&str> = triplet.split('.').collect();
    let well_formed = numbers.len() == 3
        && numbers
            .iter()
            .all(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(SideloadError::VersionFormat {
            version: version.to_string(),
        });
    }

    let mut normalized = triplet.to_string();
    // A non-numeric, non-SNAPSHOT segment right after the triplet is part of
    // the canonical version (e.g. "1.9.0-cpu"); everything after it is build
    // metadata and is dropped.
    if let Some(suffix) = segments.next() {
        if suffix != "SNAPSHOT" && !suffix.bytes().all(|b| b.is_ascii_digit()) {
            normalized.push('-');
            normalized.push_str(suffix);
        }
    }
    Ok(normalized)
}

/// OS-conventional file name for a library base name
/// (`foo` -> `libfoo.so` / `libfoo.dylib` / `foo.dll`).
pub fn mapped_library_name(base: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{base}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{base}.dylib")
    } else {
        format!("lib{base}.so")
    }
}

fn host_os_family() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

fn host_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else {
        "unknown"
    }
}
