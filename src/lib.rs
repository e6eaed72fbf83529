// Asset loader module for fetching (and caching) encoded audio
#[path = "assetLoader/mod.rs"]
pub mod asset_loader;

// Audio module: capability traits, rodio output, session manager
pub mod audio;

// Track catalog and session registry
pub mod state;

pub mod config;
pub mod error;

pub use asset_loader::{AssetLoader, AssetRef};
pub use audio::{
    AudioBackend, AudioContext, AudioSessionManager, PlaybackGraph, RodioBackend,
};
pub use config::MixerConfig;
pub use error::{Error, Result};
pub use state::{Track, TrackState, TrackStatus};
