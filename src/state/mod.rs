use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::audio::PlaybackGraph;

pub use self::track::{Track, TrackState, TrackStatus, DEFAULT_VOLUME};

pub mod track;

/// Live audio-graph state for one playing track
pub struct PlaybackSession<G, B> {
    pub id: Uuid,       // Unique per session, never reused
    pub track: String,  // Owning track key
    pub graph: G,       // Source + gain, wired to the output
    pub buffer: B,      // Decoded audio, kept so pause/resume can rebuild the source
    pub volume: f32,
}

impl<G: PlaybackGraph, B> PlaybackSession<G, B> {
    pub fn new(track: String, graph: G, buffer: B, volume: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            track,
            graph,
            buffer,
            volume,
        }
    }
}

/// What the registry holds for a track key. No slot means stopped.
pub enum Slot<G, B> {
    /// In-flight start. Only the holder of the current ticket may register.
    Loading { ticket: Uuid, volume: f32 },
    Playing(PlaybackSession<G, B>),
    Paused {
        buffer: B,
        volume: f32,
        offset: Duration,
    },
}

impl<G: PlaybackGraph, B> Slot<G, B> {
    pub fn state(&self) -> TrackState {
        match self {
            Slot::Loading { .. } => TrackState::Loading,
            Slot::Playing(_) => TrackState::Playing,
            Slot::Paused { offset, .. } => TrackState::Paused {
                offset_secs: offset.as_secs_f64(),
            },
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            Slot::Loading { volume, .. } | Slot::Paused { volume, .. } => *volume,
            Slot::Playing(session) => session.volume,
        }
    }

    /// Silence and drop whatever the slot holds
    pub fn release(self) {
        if let Slot::Playing(mut session) = self {
            session.graph.stop();
        }
    }
}

/// Track key → slot. Enforces a single owner per key.
pub struct SessionRegistry<G, B> {
    slots: HashMap<String, Slot<G, B>>,
}

impl<G: PlaybackGraph, B> Default for SessionRegistry<G, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: PlaybackGraph, B> SessionRegistry<G, B> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Install a fresh in-flight marker for `key`, releasing anything that
    /// held the key before. Returns the new ticket.
    pub fn claim(&mut self, key: &str, volume: f32) -> Uuid {
        let ticket = Uuid::new_v4();
        if let Some(previous) = self
            .slots
            .insert(key.to_string(), Slot::Loading { ticket, volume })
        {
            previous.release();
        }
        ticket
    }

    /// Volume recorded on the ticket, or `None` when the ticket is no longer
    /// the current owner of `key`.
    pub fn ticket_volume(&self, key: &str, ticket: Uuid) -> Option<f32> {
        match self.slots.get(key) {
            Some(Slot::Loading { ticket: current, volume }) if *current == ticket => Some(*volume),
            _ => None,
        }
    }

    /// Drop the in-flight marker if `ticket` still owns it
    pub fn abandon(&mut self, key: &str, ticket: Uuid) -> bool {
        if self.ticket_volume(key, ticket).is_some() {
            self.slots.remove(key);
            true
        } else {
            false
        }
    }

    /// Replace the slot for `key` without releasing the old one.
    /// Callers must have taken ownership of the previous slot first.
    pub fn put(&mut self, key: &str, slot: Slot<G, B>) {
        self.slots.insert(key.to_string(), slot);
    }

    pub fn get(&self, key: &str) -> Option<&Slot<G, B>> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Slot<G, B>> {
        self.slots.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Slot<G, B>> {
        self.slots.remove(key)
    }

    pub fn state(&self, key: &str) -> TrackState {
        self.slots
            .get(key)
            .map_or(TrackState::Stopped, |slot| slot.state())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release every slot. Returns how many were held.
    pub fn release_all(&mut self) -> usize {
        let count = self.slots.len();
        for (_, slot) in self.slots.drain() {
            slot.release();
        }
        count
    }

    /// Sorted by key so the output is stable
    pub fn statuses(&self) -> Vec<TrackStatus> {
        let mut statuses: Vec<TrackStatus> = self
            .slots
            .iter()
            .map(|(key, slot)| TrackStatus {
                key: key.clone(),
                state: slot.state(),
                volume: slot.volume(),
                session_id: match slot {
                    Slot::Playing(session) => Some(session.id),
                    _ => None,
                },
            })
            .collect();
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        statuses
    }
}
