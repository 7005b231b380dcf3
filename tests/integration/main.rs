//! Integration tests for sideload
//!
//! Pipeline-level tests covering the resolution tiers end to end: override
//! path, bundled artifacts, cache installs, and network downloads against a
//! loopback HTTP server. No external network access and no real dynamic
//! loads of well-formed libraries (a garbage file is used to exercise the
//! load-failure path).

mod resolve_tests;
mod support;
