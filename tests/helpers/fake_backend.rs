//! In-memory audio backend
//!
//! Decoding keeps the raw bytes. Byte prefixes steer behaviour:
//! `bad:` fails to decode, `slow:` sleeps before returning.
//! Every graph is backed by a shared `FakeNode` that the test can inspect
//! after the manager has dropped the graph.

use ambient_mixer::{AudioBackend, AudioContext, Error, PlaybackGraph, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long the fake pretends a started graph has been playing
pub const PLAYED: Duration = Duration::from_millis(250);

const SLOW_DECODE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeState {
    Idle,
    Playing,
    Stopped,
}

#[derive(Debug)]
pub struct FakeNode {
    pub offset: Duration,
    pub asset: Vec<u8>,
    gain: Mutex<f32>,
    state: Mutex<NodeState>,
}

impl FakeNode {
    pub fn state(&self) -> NodeState {
        *self.state.lock().unwrap()
    }

    pub fn gain(&self) -> f32 {
        *self.gain.lock().unwrap()
    }
}

/// Shared record of what the backend did
#[derive(Clone, Default)]
pub struct Probe {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    nodes: Arc<Mutex<Vec<Arc<FakeNode>>>>,
}

impl Probe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn nodes(&self) -> Vec<Arc<FakeNode>> {
        self.nodes.lock().unwrap().clone()
    }

    /// Graphs currently audible
    pub fn live(&self) -> usize {
        self.nodes()
            .iter()
            .filter(|n| n.state() == NodeState::Playing)
            .count()
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub probe: Probe,
}

impl FakeBackend {
    pub fn new() -> (Self, Probe) {
        let backend = Self::default();
        let probe = backend.probe.clone();
        (backend, probe)
    }
}

impl AudioBackend for FakeBackend {
    type Context = FakeContext;

    fn open(&self) -> Result<FakeContext> {
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeContext {
            probe: self.probe.clone(),
        })
    }
}

pub struct FakeContext {
    probe: Probe,
}

impl AudioContext for FakeContext {
    type Buffer = Arc<Vec<u8>>;
    type Graph = FakeGraph;

    fn decode(&self, bytes: Vec<u8>) -> Result<Arc<Vec<u8>>> {
        if bytes.starts_with(b"bad:") {
            return Err(Error::Decode("unrecognized format".to_string()));
        }
        if bytes.starts_with(b"slow:") {
            std::thread::sleep(SLOW_DECODE);
        }
        Ok(Arc::new(bytes))
    }

    fn connect_looping(
        &self,
        buffer: &Arc<Vec<u8>>,
        volume: f32,
        offset: Duration,
    ) -> Result<FakeGraph> {
        let node = Arc::new(FakeNode {
            offset,
            asset: buffer.as_ref().clone(),
            gain: Mutex::new(volume),
            state: Mutex::new(NodeState::Idle),
        });
        self.probe.nodes.lock().unwrap().push(node.clone());
        Ok(FakeGraph { node })
    }

    fn close(&self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeGraph {
    node: Arc<FakeNode>,
}

impl FakeGraph {
    /// Handle onto a node the manager already owned (or discarded)
    pub fn attach(node: &Arc<FakeNode>) -> Self {
        Self { node: node.clone() }
    }
}

impl PlaybackGraph for FakeGraph {
    fn start(&mut self) -> Result<()> {
        let mut state = self.node.state.lock().unwrap();
        if *state != NodeState::Idle {
            return Err(Error::SourceAlreadyUsed);
        }
        *state = NodeState::Playing;
        Ok(())
    }

    fn stop(&mut self) {
        *self.node.state.lock().unwrap() = NodeState::Stopped;
    }

    fn set_gain(&self, level: f32) {
        *self.node.gain.lock().unwrap() = level;
    }

    fn gain(&self) -> f32 {
        self.node.gain()
    }

    fn position(&self) -> Duration {
        match self.node.state() {
            NodeState::Idle => self.node.offset,
            _ => self.node.offset + PLAYED,
        }
    }

    fn is_stopped(&self) -> bool {
        self.node.state() == NodeState::Stopped
    }
}
