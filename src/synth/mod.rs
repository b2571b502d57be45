//! Polyphonic voice management on top of a [`GraphBackend`](crate::graph::GraphBackend).
//!
//! Every note builds its own small graph (oscillators, mixing gains, one
//! envelope stage), scheduled entirely as parameter automation. The
//! [`PolySynth`] owns the voices, the shared master/LFO stage, and the
//! deferred teardown of released graphs.

/// Per-mode voice graph construction.
pub mod builder;
/// Attack/decay/sustain and release automation.
pub mod envelope;
/// Control messages and their receivers.
pub mod message;
/// The key → frequency table.
pub mod notes;
/// Active-voice snapshots for visualizers.
pub mod observer;
/// Sound-design parameters and the parameter surface.
pub mod params;
/// The lifecycle manager.
pub mod poly;
pub mod registry;
/// Wall-clock deferred graph teardown.
pub mod teardown;
pub mod voice;

pub use builder::{Vibrato, VoiceGraph, VoiceTopology};
pub use envelope::EnvelopeShape;
pub use message::{MessageReceiver, SynthMessage};
pub use notes::{key_frequency, KeyId, KEYBOARD};
pub use observer::{ActiveVoices, VoiceObserver};
pub use params::{ParamChange, SynthMode, SynthParameters};
pub use poly::PolySynth;
pub use registry::VoiceRegistry;
pub use teardown::{ManualClock, SystemClock, TeardownQueue, WallClock};
pub use voice::{Voice, VoiceState};
