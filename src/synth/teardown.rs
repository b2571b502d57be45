use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::synth::{builder::VoiceGraph, notes::KeyId};

/*
Deferred Teardown
=================

Two clocks are involved in ending a voice, and they are kept apart on
purpose:

  audio clock   The graph's own time. Release curves and oscillator stops
                are scheduled on it and run inside the renderer.

  wall clock    Process time. Disconnecting nodes has no audible effect, it
                just has to happen after the audio deadline has passed, so
                it goes on a coarse wall-clock timer with some slack:

                    due = wall_now + (deadline − audio_now) + margin

The control side polls the queue (`PolySynth::tick`) and disconnects
whatever is due. A late poll only delays reclaiming memory.
*/

/// Source of wall-clock time, measured from an arbitrary origin.
pub trait WallClock {
    fn now(&self) -> Duration;
}

/// Monotonic process time since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.nanos.store(now.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// A released voice waiting for its graph to be disconnected.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTeardown {
    pub key: KeyId,
    /// Audio time by which the voice's oscillators stop.
    pub deadline: f64,
    /// Wall time at which the graph may be disconnected.
    pub due: Duration,
    pub graph: VoiceGraph,
}

#[derive(Debug, Default)]
pub struct TeardownQueue {
    pending: Vec<PendingTeardown>,
}

impl TeardownQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: KeyId, deadline: f64, due: Duration, graph: VoiceGraph) {
        self.pending.push(PendingTeardown {
            key,
            deadline,
            due,
            graph,
        });
    }

    /// Remove and return every entry due at or before `now`.
    pub fn take_due(&mut self, now: Duration) -> Vec<PendingTeardown> {
        let (due, waiting) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending = waiting;
        due
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingTeardown> {
        self.pending.iter_mut()
    }

    /// Whether any voice for `key` is still waiting to be torn down.
    pub fn is_pending(&self, key: KeyId) -> bool {
        self.pending.iter().any(|p| p.key == key)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Wall-clock delay from now until a voice whose audio deadline is
/// `deadline` can be torn down.
pub fn teardown_delay(deadline: f64, audio_now: f64, margin: f64) -> Duration {
    Duration::from_secs_f64(((deadline - audio_now) + margin).max(0.0))
}
