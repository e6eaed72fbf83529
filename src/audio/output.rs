use super::{wrap_position, AudioBackend, AudioContext, PlaybackGraph};
use crate::error::{Error, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Decoded PCM held in memory. Clones share the sample data.
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl DecodedBuffer {
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length of one pass through the loop
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    fn to_source(&self) -> SharedSamples {
        SharedSamples {
            buffer: self.clone(),
            pos: 0,
        }
    }
}

/// One pass over a decoded buffer, reading the shared samples in place
#[derive(Debug, Clone)]
struct SharedSamples {
    buffer: DecodedBuffer,
    pos: usize,
}

impl Iterator for SharedSamples {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.samples.get(self.pos).copied()?;
        self.pos += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.samples.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl Source for SharedSamples {
    // Channel count and rate never change mid-buffer
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.buffer.channels
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.buffer.duration())
    }
}

/// Decode a compressed asset fully into memory
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedBuffer> {
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| Error::Decode(e.to_string()))?;

    // Metadata must be read before the decoder is consumed
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    if channels == 0 || sample_rate == 0 {
        return Err(Error::Decode(format!(
            "unsupported stream layout ({} channels @ {} Hz)",
            channels, sample_rate
        )));
    }

    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();
    if samples.len() < channels as usize {
        return Err(Error::Decode("asset contains no audio frames".to_string()));
    }

    Ok(DecodedBuffer {
        channels,
        sample_rate,
        samples: samples.into(),
    })
}

/// Plays through the default output device via rodio
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioBackend;

impl AudioBackend for RodioBackend {
    type Context = RodioContext;

    fn open(&self) -> Result<RodioContext> {
        RodioContext::open_default()
    }
}

struct StreamKeeper {
    close_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Audio context backed by the default output device.
///
/// `OutputStream` cannot move between threads, so a dedicated thread owns
/// it and parks until `close()`. Only the handle (Send + Sync) is kept here.
pub struct RodioContext {
    handle: OutputStreamHandle,
    keeper: Mutex<Option<StreamKeeper>>,
}

impl RodioContext {
    pub fn open_default() -> Result<Self> {
        let (ready_tx, ready_rx) = channel();
        let (close_tx, close_rx) = channel::<()>();

        let thread = thread::Builder::new()
            .name("ambient-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Blocks until close() sends or the sender is dropped
                    let _ = close_rx.recv();
                    drop(stream);
                    debug!("output stream released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(Error::Output(e.to_string())));
                }
            })?;

        let handle = ready_rx
            .recv()
            .map_err(|_| Error::Output("output thread exited before opening a stream".to_string()))??;

        info!("audio output opened on default device");
        Ok(Self {
            handle,
            keeper: Mutex::new(Some(StreamKeeper { close_tx, thread })),
        })
    }
}

impl AudioContext for RodioContext {
    type Buffer = DecodedBuffer;
    type Graph = RodioGraph;

    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer> {
        decode_bytes(bytes)
    }

    fn connect_looping(
        &self,
        buffer: &DecodedBuffer,
        volume: f32,
        offset: Duration,
    ) -> Result<RodioGraph> {
        let sink = Sink::try_new(&self.handle).map_err(|e| Error::Output(e.to_string()))?;

        // Held until start(); a fresh sink would otherwise play on append
        sink.pause();
        sink.set_volume(volume);
        sink.append(buffer.to_source().repeat_infinite().skip_duration(offset));

        Ok(RodioGraph {
            sink,
            loop_len: buffer.duration(),
            offset,
            started_at: None,
            played: None,
        })
    }

    fn close(&self) {
        if let Some(keeper) = take_once(&self.keeper) {
            let _ = keeper.close_tx.send(());
            if keeper.thread.join().is_err() {
                warn!("output thread panicked during shutdown");
            }
            info!("audio output closed");
        }
    }
}

/// Take the slot's value, even from a poisoned lock: a panic elsewhere must
/// not keep the output stream alive
fn take_once<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

impl Drop for RodioContext {
    fn drop(&mut self) {
        self.close();
    }
}

/// One looping sink. Single-use: once stopped it never plays again.
pub struct RodioGraph {
    sink: Sink,
    loop_len: Duration,
    offset: Duration,
    started_at: Option<Instant>,
    // Elapsed play time frozen at stop()
    played: Option<Duration>,
}

impl PlaybackGraph for RodioGraph {
    fn start(&mut self) -> Result<()> {
        if self.started_at.is_some() || self.played.is_some() {
            return Err(Error::SourceAlreadyUsed);
        }
        self.sink.play();
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        if self.played.is_some() {
            return;
        }
        self.played = Some(self.started_at.map(|t| t.elapsed()).unwrap_or_default());
        self.sink.stop();
    }

    fn set_gain(&self, level: f32) {
        self.sink.set_volume(level);
    }

    fn gain(&self) -> f32 {
        self.sink.volume()
    }

    fn position(&self) -> Duration {
        let elapsed = match (self.played, self.started_at) {
            (Some(played), _) => played,
            (None, Some(t)) => t.elapsed(),
            (None, None) => Duration::ZERO,
        };
        wrap_position(self.offset + elapsed, self.loop_len)
    }

    fn is_stopped(&self) -> bool {
        self.played.is_some()
    }
}
