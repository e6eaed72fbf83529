//! Test helpers for session manager integration tests
//!
//! - FakeBackend: in-memory audio backend that records every graph it builds
//! - init_tracing: route library logs to the test writer

#![allow(dead_code)]

pub mod fake_backend;

pub use fake_backend::{FakeBackend, FakeGraph, FakeNode, NodeState, Probe, PLAYED};

/// Install a test subscriber once per binary; later calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ambient_mixer=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Asset whose bytes decode instantly
pub fn quick_asset(name: &str) -> ambient_mixer::AssetRef {
    ambient_mixer::AssetRef::embedded(format!("ok:{}", name).into_bytes())
}

/// Asset whose decode takes long enough to interleave other calls
pub fn slow_asset(name: &str) -> ambient_mixer::AssetRef {
    ambient_mixer::AssetRef::embedded(format!("slow:{}", name).into_bytes())
}

/// Asset that fails to decode
pub fn corrupt_asset() -> ambient_mixer::AssetRef {
    ambient_mixer::AssetRef::embedded(b"bad:not audio".to_vec())
}
