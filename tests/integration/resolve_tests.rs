//! Resolution-tier integration tests: override path, bundled artifacts,
//! cache reuse, and terminal failures.

use serial_test::serial;
use sideload::{
    mapped_library_name, LoadConfig, Loader, PlatformDescriptor, SideloadError,
};
use std::path::Path;
use tempfile::TempDir;

fn host_classifier() -> String {
    PlatformDescriptor::from_host("").arch_classifier().to_string()
}

/// Base URL that refuses connections; reaching it fails the test loudly.
const DEAD_URL: &str = "http://127.0.0.1:1";

fn write_bundle(dir: &Path, version: &str, classifier: &str, libraries: &[&str]) {
    let list = libraries
        .iter()
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(", ");
    std::fs::write(
        dir.join("native.toml"),
        format!("version = \"{version}\"\nclassifier = \"{classifier}\"\nlibraries = [{list}]\n"),
    )
    .unwrap();
    for library in libraries {
        std::fs::write(dir.join(library), format!("bytes of {library}")).unwrap();
    }
}

fn write_placeholder(dir: &Path, version: &str) {
    std::fs::write(
        dir.join("native.toml"),
        format!("version = \"{version}\"\nplaceholder = true\n"),
    )
    .unwrap();
}

#[test]
#[serial]
fn override_path_short_circuits_bundled_artifacts() {
    let override_dir = TempDir::new().unwrap();
    let mapped = mapped_library_name("demo");
    std::fs::write(override_dir.path().join(&mapped), b"installed by operator").unwrap();

    // The only bundle is for a foreign platform; consulting it would fail
    // with PlatformMismatch, so success proves the override won first.
    let foreign = TempDir::new().unwrap();
    write_bundle(foreign.path(), "1.0.0", "solaris-sparc", &["libdemo.so"]);

    let cache = TempDir::new().unwrap();
    let mut config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![foreign.path().to_path_buf()])
        .with_cache_root(cache.path());
    config.override_var = "SIDELOAD_IT_OVERRIDE".to_string();

    std::env::set_var(&config.override_var, override_dir.path());
    let resolved = Loader::new(config.clone()).resolve_library().unwrap();
    std::env::remove_var(&config.override_var);

    assert_eq!(resolved, override_dir.path().join(mapped));
}

#[test]
fn bundled_match_is_copied_into_cache() {
    let bundle = TempDir::new().unwrap();
    let mapped = mapped_library_name("demo");
    write_bundle(
        bundle.path(),
        "1.4.0",
        &host_classifier(),
        &[mapped.as_str(), "libdep.so"],
    );

    let cache = TempDir::new().unwrap();
    let config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![bundle.path().to_path_buf()])
        .with_cache_root(cache.path());

    let resolved = Loader::new(config).resolve_library().unwrap();

    assert!(resolved.starts_with(cache.path()));
    assert!(resolved.is_file());
    assert_eq!(resolved.file_name().unwrap().to_string_lossy(), mapped);
    assert!(resolved.parent().unwrap().join("libdep.so").is_file());
}

#[test]
fn cache_entry_survives_bundle_removal() {
    let bundle = TempDir::new().unwrap();
    let mapped = mapped_library_name("demo");
    write_bundle(bundle.path(), "1.4.0", &host_classifier(), &[mapped.as_str()]);

    let cache = TempDir::new().unwrap();
    let config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![bundle.path().to_path_buf()])
        .with_cache_root(cache.path());

    let first = Loader::new(config.clone()).resolve_library().unwrap();

    // Remove the bundle's library files; only the manifest remains. The
    // second resolution must be served from the cache.
    std::fs::remove_file(bundle.path().join(&mapped)).unwrap();
    let second = Loader::new(config).resolve_library().unwrap();

    assert_eq!(first, second);
    assert!(second.is_file());
}

#[test]
fn exact_match_is_preferred_over_placeholder_without_download() {
    let placeholder = TempDir::new().unwrap();
    write_placeholder(placeholder.path(), "1.4.0");

    let bundle = TempDir::new().unwrap();
    let mapped = mapped_library_name("demo");
    write_bundle(bundle.path(), "1.4.0", &host_classifier(), &[mapped.as_str()]);

    let cache = TempDir::new().unwrap();
    // Placeholder listed first; the dead base URL guarantees any download
    // attempt would fail the test.
    let config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![
            placeholder.path().to_path_buf(),
            bundle.path().to_path_buf(),
        ])
        .with_cache_root(cache.path());

    let resolved = Loader::new(config).resolve_library().unwrap();
    assert!(resolved.is_file());
}

#[test]
fn mismatched_bundles_without_placeholder_fail() {
    let foreign = TempDir::new().unwrap();
    write_bundle(foreign.path(), "1.0.0", "solaris-sparc", &["libdemo.so"]);

    let cache = TempDir::new().unwrap();
    let config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![foreign.path().to_path_buf()])
        .with_cache_root(cache.path());

    let err = Loader::new(config).resolve_library().unwrap_err();
    assert!(matches!(err, SideloadError::PlatformMismatch { .. }));
}

#[test]
fn no_override_and_no_bundles_is_a_load_error() {
    let cache = TempDir::new().unwrap();
    let config = LoadConfig::new("demo", DEAD_URL).with_cache_root(cache.path());

    let err = Loader::new(config).resolve_library().unwrap_err();
    assert!(matches!(err, SideloadError::NativeLoad { .. }));
}

#[test]
fn dynamic_load_failure_surfaces_as_native_load_error() {
    // The resolved "library" is a text file; the platform loader must
    // reject it and the error must carry the offending path.
    let bundle = TempDir::new().unwrap();
    let mapped = mapped_library_name("demo");
    write_bundle(bundle.path(), "1.4.0", &host_classifier(), &[mapped.as_str()]);

    let cache = TempDir::new().unwrap();
    let config = LoadConfig::new("demo", DEAD_URL)
        .with_manifest_sources(vec![bundle.path().to_path_buf()])
        .with_cache_root(cache.path());

    let err = Loader::new(config).load_library().unwrap_err();
    match err {
        SideloadError::NativeLoad { path, .. } => {
            assert_eq!(path.file_name().unwrap().to_string_lossy(), mapped);
        }
        other => panic!("expected NativeLoad, got {other}"),
    }
}
