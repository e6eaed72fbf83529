use crate::asset_loader::AssetRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Volume a track starts at unless configured otherwise
pub const DEFAULT_VOLUME: f32 = 0.5;

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

/// A named, independently controllable ambient loop
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Track {
    pub key: String,     // Stable identifier (e.g., "birds")
    pub asset: AssetRef, // Where the encoded audio comes from
    #[serde(default = "default_volume")]
    pub volume: f32,     // Default start volume
}

impl Track {
    pub fn new(key: impl Into<String>, asset: impl Into<AssetRef>, volume: f32) -> Self {
        Self {
            key: key.into(),
            asset: asset.into(),
            volume,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackState {
    /// No session; the track is silent
    Stopped,
    /// A start is in flight (fetching or decoding)
    Loading,
    /// A session is looping
    Playing,
    /// Halted at a loop position; resume continues from there
    Paused { offset_secs: f64 },
}

/// Snapshot of one registered track for the presentation layer
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TrackStatus {
    pub key: String,
    #[serde(flatten)]
    pub state: TrackState,
    pub volume: f32,
    pub session_id: Option<Uuid>, // Present while Playing
}
