use crate::{
    graph::node::NodeId,
    synth::{builder::VoiceGraph, notes::KeyId},
};

/// Where a key is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // Nothing sounding for this key
    Sounding,  // Held, envelope in attack/decay/sustain
    Releasing, // Key released, tail still fading, graph not torn down yet
}

/// One sounding note: its pitch and the graph nodes it owns.
///
/// A `Voice` only exists while it is held in the registry. Taking it out of
/// the registry is the release: from then on only its graph lives on, in the
/// teardown queue.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    key: KeyId,
    frequency: f32,
    started_at: f64,
    graph: VoiceGraph,
}

impl Voice {
    pub fn new(key: KeyId, frequency: f32, graph: VoiceGraph, started_at: f64) -> Self {
        Self {
            key,
            frequency,
            started_at,
            graph,
        }
    }

    pub fn key(&self) -> KeyId {
        self.key
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Audio time the voice was started at.
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    pub fn envelope(&self) -> NodeId {
        self.graph.envelope
    }

    pub fn oscillators(&self) -> &[NodeId] {
        &self.graph.oscillators
    }

    pub fn into_graph(self) -> VoiceGraph {
        self.graph
    }
}
