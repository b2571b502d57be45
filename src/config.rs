#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine-wide settings fixed at construction time.
///
/// Unlike [`SynthParameters`](crate::synth::SynthParameters), nothing here is
/// meant to be tweaked while playing, except the master level which also has
/// a runtime setter on the synth.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Initial gain of the master stage every voice feeds into.
    pub master_level: f32,
    /// Number of simultaneous voices the per-voice peak gain leaves headroom
    /// for. Not a cap: more voices may sound, they just get louder.
    pub headroom_voices: usize,
    /// Release time (seconds) used by the panic path.
    pub panic_release: f64,
    /// Wall-clock slack (seconds) between a voice's stop deadline and its
    /// graph teardown.
    pub teardown_margin: f64,
}

impl EngineConfig {
    pub fn with_master_level(mut self, level: f32) -> Self {
        self.master_level = level;
        self
    }

    pub fn with_headroom_voices(mut self, voices: usize) -> Self {
        self.headroom_voices = voices;
        self
    }

    pub fn with_panic_release(mut self, seconds: f64) -> Self {
        self.panic_release = seconds;
        self
    }

    pub fn with_teardown_margin(mut self, seconds: f64) -> Self {
        self.teardown_margin = seconds;
        self
    }

    /// Peak envelope gain for a single voice.
    pub fn voice_gain(&self) -> f32 {
        1.0 / self.headroom_voices.max(1) as f32
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            master_level: 0.7,
            headroom_voices: 8,
            panic_release: 0.02,
            teardown_margin: 0.2,
        }
    }
}
