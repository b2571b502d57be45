use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::oscillator::OscillatorWaveform, error::ParseParamError};

/// Which voice topology new notes are built with.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthMode {
    /// Harmonic partials at 1/i² amplitude
    #[default]
    Additive,
    /// Carrier amplitude driven by a sine modulator
    Am,
    /// Carrier frequency driven by a sine modulator
    Fm,
}

impl SynthMode {
    pub const ALL: [SynthMode; 3] = [SynthMode::Additive, SynthMode::Am, SynthMode::Fm];

    pub fn name(self) -> &'static str {
        match self {
            SynthMode::Additive => "additive",
            SynthMode::Am => "am",
            SynthMode::Fm => "fm",
        }
    }
}

impl fmt::Display for SynthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SynthMode {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "additive" => Ok(SynthMode::Additive),
            "am" => Ok(SynthMode::Am),
            "fm" => Ok(SynthMode::Fm),
            other => Err(ParseParamError::UnknownMode(other.to_string())),
        }
    }
}

/// Sound-design parameters read when a note starts.
///
/// The synth copies this struct at note-on, so changing a field only affects
/// notes started afterwards. Nothing is clamped or cross-checked: extreme
/// values sound extreme, they do not break anything.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParameters {
    pub mode: SynthMode,
    pub waveform: OscillatorWaveform,

    pub additive_partials: u32,

    pub am_mod_frequency: f32,
    /// Above 1.0 the carrier's amplitude swings through zero and inverts.
    pub am_depth: f32,

    pub fm_mod_frequency: f32,
    pub fm_mod_index: f32,

    // Envelope, seconds except sustain (fraction of peak)
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,

    pub lfo_rate: f32,
    /// 0 disables vibrato
    pub lfo_depth: f32,
}

impl Default for SynthParameters {
    fn default() -> Self {
        Self {
            mode: SynthMode::Additive,
            waveform: OscillatorWaveform::Sine,
            additive_partials: 5,
            am_mod_frequency: 100.0,
            am_depth: 0.5,
            fm_mod_frequency: 200.0,
            fm_mod_index: 2.0,
            attack: 0.05,
            decay: 0.2,
            sustain: 0.3,
            release: 0.15,
            lfo_rate: 5.0,
            lfo_depth: 0.0,
        }
    }
}

/// One setter of the parameter surface.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Mode(SynthMode),
    Waveform(OscillatorWaveform),
    Partials(u32),
    AmFrequency(f32),
    AmDepth(f32),
    FmFrequency(f32),
    FmIndex(f32),
    Attack(f64),
    Decay(f64),
    Sustain(f32),
    Release(f64),
    LfoRate(f32),
    LfoDepth(f32),
    /// Lives on the shared master stage, not in [`SynthParameters`].
    MasterLevel(f32),
}

impl SynthParameters {
    /// Store a change. Returns `false` for changes that do not live in this
    /// struct (the master level).
    pub fn apply(&mut self, change: ParamChange) -> bool {
        match change {
            ParamChange::Mode(mode) => self.mode = mode,
            ParamChange::Waveform(waveform) => self.waveform = waveform,
            ParamChange::Partials(count) => self.additive_partials = count,
            ParamChange::AmFrequency(hz) => self.am_mod_frequency = hz,
            ParamChange::AmDepth(depth) => self.am_depth = depth,
            ParamChange::FmFrequency(hz) => self.fm_mod_frequency = hz,
            ParamChange::FmIndex(index) => self.fm_mod_index = index,
            ParamChange::Attack(seconds) => self.attack = seconds,
            ParamChange::Decay(seconds) => self.decay = seconds,
            ParamChange::Sustain(level) => self.sustain = level,
            ParamChange::Release(seconds) => self.release = seconds,
            ParamChange::LfoRate(hz) => self.lfo_rate = hz,
            ParamChange::LfoDepth(depth) => self.lfo_depth = depth,
            ParamChange::MasterLevel(_) => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_stores_values_unclamped() {
        let mut params = SynthParameters::default();
        assert!(params.apply(ParamChange::AmDepth(1.7)));
        assert!(params.apply(ParamChange::Mode(SynthMode::Fm)));
        assert!(params.apply(ParamChange::FmIndex(-3.0)));

        assert_eq!(params.am_depth, 1.7);
        assert_eq!(params.mode, SynthMode::Fm);
        assert_eq!(params.fm_mod_index, -3.0);
    }

    #[test]
    fn master_level_is_not_a_note_parameter() {
        let mut params = SynthParameters::default();
        assert!(!params.apply(ParamChange::MasterLevel(0.2)));
        assert_eq!(params, SynthParameters::default());
    }

    #[test]
    fn mode_round_trips_through_its_name() {
        for mode in SynthMode::ALL {
            assert_eq!(mode.name().parse(), Ok(mode));
        }
        assert_eq!(
            "granular".parse::<SynthMode>(),
            Err(ParseParamError::UnknownMode("granular".into()))
        );
    }
}
