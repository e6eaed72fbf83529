//! Audio session manager
//!
//! Owns the audio context and the per-track session registry. Callers
//! (UI handlers) drive it with start / set_volume / stop / pause / resume.
//!
//! Policy for missing state:
//! - lifecycle violations (before `initialize`, after `teardown`) are errors
//! - an unknown or stopped track is a silent no-op
//!
//! A track key has at most one owner. `start` claims the key up front with a
//! ticket; an older in-flight start whose ticket was replaced (by a newer
//! start, `stop`, or `teardown`) resolves with `Error::StartCancelled` and
//! never wires a graph.

use super::{AudioBackend, AudioContext, PlaybackGraph, RodioBackend};
use crate::asset_loader::{AssetLoader, AssetRef};
use crate::error::{Error, Result};
use crate::state::{PlaybackSession, SessionRegistry, Slot, Track, TrackState, TrackStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Registry<C> = SessionRegistry<<C as AudioContext>::Graph, <C as AudioContext>::Buffer>;

enum Lifecycle<C: AudioContext> {
    Uninitialized,
    Active {
        context: Arc<C>,
        registry: Registry<C>,
    },
    TornDown,
}

pub struct AudioSessionManager<B: AudioBackend> {
    backend: B,
    loader: AssetLoader,
    inner: Mutex<Lifecycle<B::Context>>,
}

impl AudioSessionManager<RodioBackend> {
    /// Manager that plays through the default output device
    pub fn with_default_output(loader: AssetLoader) -> Self {
        Self::with_loader(RodioBackend, loader)
    }
}

impl<B: AudioBackend> AudioSessionManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_loader(backend, AssetLoader::new())
    }

    pub fn with_loader(backend: B, loader: AssetLoader) -> Self {
        Self {
            backend,
            loader,
            inner: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<B::Context>> {
        // Registry mutations are single-step; a poisoned lock still guards consistent state
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_active<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Arc<B::Context>, &mut Registry<B::Context>) -> Result<T>,
    {
        let mut guard = self.lock();
        match &mut *guard {
            Lifecycle::Active { context, registry } => f(context, registry),
            Lifecycle::Uninitialized => Err(Error::Uninitialized),
            Lifecycle::TornDown => Err(Error::TornDown),
        }
    }

    /// Open the audio context. Must run before anything else, ideally from
    /// a user-initiated action.
    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.lock();
        match &*guard {
            Lifecycle::Active { .. } => return Err(Error::AlreadyInitialized),
            Lifecycle::TornDown => return Err(Error::TornDown),
            Lifecycle::Uninitialized => {}
        }

        let context = self.backend.open()?;
        *guard = Lifecycle::Active {
            context: Arc::new(context),
            registry: SessionRegistry::new(),
        };
        info!("audio context initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(&*self.lock(), Lifecycle::Active { .. })
    }

    /// Fetch, decode and loop `asset` under `key` at `volume`.
    ///
    /// Whatever held `key` before is released first. The volume is passed
    /// to the gain stage as-is. Resolves with the new session id once the
    /// track is audible.
    pub async fn start(&self, key: &str, asset: &AssetRef, volume: f32) -> Result<Uuid> {
        if key.is_empty() {
            return Err(Error::InvalidTrackKey(key.to_string()));
        }

        let (context, ticket) = self.with_active(|context, registry| {
            let previous = registry.state(key);
            if previous != TrackState::Stopped {
                debug!(track = key, ?previous, "start replaces existing slot");
            }
            Ok((Arc::clone(context), registry.claim(key, volume)))
        })?;
        debug!(track = key, ?asset, volume, "loading track");

        let buffer = match self.load(&context, asset).await {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(track = key, error = %e, "track failed to load");
                self.abandon(key, ticket);
                return Err(e);
            }
        };

        self.with_active(move |context, registry| {
            let Some(volume) = registry.ticket_volume(key, ticket) else {
                debug!(track = key, "start superseded before it could play");
                return Err(Error::StartCancelled(key.to_string()));
            };

            let wired = context
                .connect_looping(&buffer, volume, Duration::ZERO)
                .and_then(|mut graph| graph.start().map(|_| graph));

            match wired {
                Ok(graph) => {
                    let session = PlaybackSession::new(key.to_string(), graph, buffer, volume);
                    let id = session.id;
                    registry.put(key, Slot::Playing(session));
                    info!(track = key, session = %id, volume, "track playing");
                    Ok(id)
                }
                Err(e) => {
                    registry.abandon(key, ticket);
                    Err(e)
                }
            }
        })
    }

    /// `start` with the track's configured asset and default volume
    pub async fn start_track(&self, track: &Track) -> Result<Uuid> {
        self.start(&track.key, &track.asset, track.volume).await
    }

    async fn load(
        &self,
        context: &Arc<B::Context>,
        asset: &AssetRef,
    ) -> Result<<B::Context as AudioContext>::Buffer> {
        let bytes = self.loader.fetch(asset).await?;
        let context = Arc::clone(context);
        tokio::task::spawn_blocking(move || context.decode(bytes))
            .await
            .map_err(|e| Error::Decode(format!("decode task failed: {}", e)))?
    }

    fn abandon(&self, key: &str, ticket: Uuid) {
        if let Lifecycle::Active { registry, .. } = &mut *self.lock() {
            registry.abandon(key, ticket);
        }
    }

    /// Set a track's gain immediately.
    ///
    /// A loading or paused track remembers the level for when it becomes
    /// audible. A stopped track is left alone.
    pub fn set_volume(&self, key: &str, level: f32) -> Result<()> {
        self.with_active(|_, registry| {
            match registry.get_mut(key) {
                Some(Slot::Playing(session)) => {
                    session.graph.set_gain(level);
                    session.volume = level;
                }
                Some(Slot::Loading { volume, .. }) | Some(Slot::Paused { volume, .. }) => {
                    *volume = level;
                }
                None => debug!(track = key, "set_volume ignored: track not started"),
            }
            Ok(())
        })
    }

    /// Stop a track. The playing source is discarded; a pending start is
    /// cancelled. Stopping a stopped track does nothing.
    pub fn stop(&self, key: &str) -> Result<()> {
        self.with_active(|_, registry| {
            match registry.remove(key) {
                Some(slot) => {
                    let from = slot.state();
                    slot.release();
                    info!(track = key, ?from, "track stopped");
                }
                None => debug!(track = key, "stop ignored: track not started"),
            }
            Ok(())
        })
    }

    /// Halt a playing track and remember where it was in the loop.
    ///
    /// Returns the saved offset, or `None` if the track was not playing.
    pub fn pause(&self, key: &str) -> Result<Option<Duration>> {
        self.with_active(|_, registry| match registry.remove(key) {
            Some(Slot::Playing(mut session)) => {
                let offset = session.graph.position();
                session.graph.stop();
                registry.put(
                    key,
                    Slot::Paused {
                        buffer: session.buffer,
                        volume: session.volume,
                        offset,
                    },
                );
                info!(track = key, offset_secs = offset.as_secs_f64(), "track paused");
                Ok(Some(offset))
            }
            Some(other) => {
                registry.put(key, other);
                Ok(None)
            }
            None => Ok(None),
        })
    }

    /// Continue a paused track from its saved offset with a fresh source.
    ///
    /// Returns the new session id, or `None` if the track was not paused.
    pub fn resume(&self, key: &str) -> Result<Option<Uuid>> {
        self.with_active(|context, registry| {
            let (buffer, volume, offset) = match registry.get(key) {
                Some(Slot::Paused {
                    buffer,
                    volume,
                    offset,
                }) => (buffer.clone(), *volume, *offset),
                _ => return Ok(None),
            };

            let mut graph = context.connect_looping(&buffer, volume, offset)?;
            graph.start()?;

            let session = PlaybackSession::new(key.to_string(), graph, buffer, volume);
            let id = session.id;
            registry.put(key, Slot::Playing(session));
            info!(track = key, session = %id, offset_secs = offset.as_secs_f64(), "track resumed");
            Ok(Some(id))
        })
    }

    /// Stop everything and close the audio context. Every later call
    /// fails with `Error::TornDown`.
    pub fn teardown(&self) -> Result<()> {
        let mut guard = self.lock();
        match std::mem::replace(&mut *guard, Lifecycle::TornDown) {
            Lifecycle::Active {
                context,
                mut registry,
            } => {
                let released = registry.release_all();
                context.close();
                info!(released, "audio context closed");
                Ok(())
            }
            Lifecycle::Uninitialized => {
                *guard = Lifecycle::Uninitialized;
                Err(Error::Uninitialized)
            }
            Lifecycle::TornDown => Err(Error::TornDown),
        }
    }

    pub fn state(&self, key: &str) -> Result<TrackState> {
        self.with_active(|_, registry| Ok(registry.state(key)))
    }

    /// Gain of the live graph, `None` unless the track is playing
    pub fn gain(&self, key: &str) -> Result<Option<f32>> {
        self.with_active(|_, registry| match registry.get(key) {
            Some(Slot::Playing(session)) => Ok(Some(session.graph.gain())),
            _ => Ok(None),
        })
    }

    pub fn session_id(&self, key: &str) -> Result<Option<Uuid>> {
        self.with_active(|_, registry| match registry.get(key) {
            Some(Slot::Playing(session)) => Ok(Some(session.id)),
            _ => Ok(None),
        })
    }

    pub fn statuses(&self) -> Result<Vec<TrackStatus>> {
        self.with_active(|_, registry| Ok(registry.statuses()))
    }
}

impl<B: AudioBackend> Drop for AudioSessionManager<B> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Lifecycle::Active { context, registry } = inner {
            registry.release_all();
            context.close();
        }
    }
}
