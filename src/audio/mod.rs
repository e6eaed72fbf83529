pub mod output;
pub mod session;

use crate::error::Result;
use std::time::Duration;

pub use self::output::{DecodedBuffer, RodioBackend, RodioContext, RodioGraph};
pub use self::session::AudioSessionManager;

/// Opens the process-wide audio resource.
///
/// The manager calls `open` from `initialize()` so tests can substitute a
/// backend that never touches a real device.
pub trait AudioBackend: Send + Sync {
    type Context: AudioContext;

    fn open(&self) -> Result<Self::Context>;
}

/// An open audio context: decodes assets and builds playback graphs.
pub trait AudioContext: Send + Sync + 'static {
    /// Decoded in-memory audio. Cloning must be cheap.
    type Buffer: Clone + Send + Sync + 'static;
    type Graph: PlaybackGraph;

    /// Convert encoded bytes into a playable buffer
    fn decode(&self, bytes: Vec<u8>) -> Result<Self::Buffer>;

    /// Build `source(loop) -> gain(volume) -> output`, positioned at
    /// `offset` into the buffer. The graph is silent until `start`.
    fn connect_looping(
        &self,
        buffer: &Self::Buffer,
        volume: f32,
        offset: Duration,
    ) -> Result<Self::Graph>;

    /// Release the output. Graphs built from this context go silent.
    fn close(&self);
}

/// A single-use looping source wired through its own gain stage.
pub trait PlaybackGraph: Send + 'static {
    /// Begin playback. Fails with `Error::SourceAlreadyUsed` if the graph
    /// was started or stopped before.
    fn start(&mut self) -> Result<()>;

    /// Halt playback permanently. Stopping twice is harmless.
    fn stop(&mut self);

    /// Set the gain immediately, without ramping
    fn set_gain(&self, level: f32);

    fn gain(&self) -> f32;

    /// Current position inside the loop
    fn position(&self) -> Duration;

    fn is_stopped(&self) -> bool;
}

/// Fold an absolute play position back into a loop of `loop_len`
pub fn wrap_position(position: Duration, loop_len: Duration) -> Duration {
    if loop_len.is_zero() {
        return position;
    }
    let secs = position.as_secs_f64() % loop_len.as_secs_f64();
    Duration::from_secs_f64(secs)
}
