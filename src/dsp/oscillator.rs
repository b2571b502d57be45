use std::{f32::consts::TAU, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseParamError;

/*
Oscillator Waveforms
====================

Every oscillator here is a phase accumulator: a number in [0, 1) that
advances by `frequency / sample_rate` each sample and wraps around. The
waveform is a pure function of that phase.

  Sine      sin(2π·phase)               fundamental only
  Square    +1 for phase < ½, else −1    odd harmonics, 1/n roll-off
  Sawtooth  2·phase − 1                  all harmonics, 1/n roll-off
  Triangle  1 − 4·|phase − ½|            odd harmonics, 1/n² roll-off

The frequency is passed per sample instead of being stored so that callers
can feed an audio-rate frequency signal (FM, vibrato) without the oscillator
knowing where it came from. Negative instantaneous frequencies simply run the
phase backwards, which is what deep FM does to a real oscillator too.

These are naive (non band-limited) waveforms: square and sawtooth alias at
high pitches. For a two-octave keyboard around middle C that is acceptable.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl OscillatorWaveform {
    pub const ALL: [OscillatorWaveform; 4] = [
        OscillatorWaveform::Sine,
        OscillatorWaveform::Square,
        OscillatorWaveform::Sawtooth,
        OscillatorWaveform::Triangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OscillatorWaveform::Sine => "sine",
            OscillatorWaveform::Square => "square",
            OscillatorWaveform::Sawtooth => "sawtooth",
            OscillatorWaveform::Triangle => "triangle",
        }
    }

    /// Evaluate the waveform at a phase in [0, 1).
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Sawtooth => 2.0 * phase - 1.0,
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

impl FromStr for OscillatorWaveform {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(OscillatorWaveform::Sine),
            "square" => Ok(OscillatorWaveform::Square),
            "sawtooth" | "saw" => Ok(OscillatorWaveform::Sawtooth),
            "triangle" => Ok(OscillatorWaveform::Triangle),
            other => Err(ParseParamError::UnknownWaveform(other.to_string())),
        }
    }
}

pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    /// Emit one sample at the current phase, then advance by `frequency`.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase = (self.phase + frequency / sample_rate).rem_euclid(1.0);
        out
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sine() {
        let sample_rate = 48_000.0;
        let frequency = 440.0;
        let mut osc = OscillatorBlock::new(OscillatorWaveform::Sine);

        let buffer: Vec<f32> = (0..128)
            .map(|_| osc.next_sample(frequency, sample_rate))
            .collect();

        let sample_index = 12;
        let expected = (TAU * frequency * sample_index as f32 / sample_rate).sin();
        let actual = buffer[sample_index];
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in OscillatorWaveform::ALL {
            let mut osc = OscillatorBlock::new(waveform);
            for _ in 0..4800 {
                let s = osc.next_sample(997.0, 48_000.0);
                assert!((-1.0..=1.0).contains(&s), "{waveform:?} produced {s}");
            }
        }
    }

    #[test]
    fn negative_frequency_keeps_phase_wrapped() {
        let mut osc = OscillatorBlock::new(OscillatorWaveform::Sawtooth);
        for _ in 0..100 {
            let s = osc.next_sample(-300.0, 8_000.0);
            assert!(s.is_finite() && (-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn parses_selector_names() {
        assert_eq!("saw".parse(), Ok(OscillatorWaveform::Sawtooth));
        assert_eq!("triangle".parse(), Ok(OscillatorWaveform::Triangle));
        assert!("noise".parse::<OscillatorWaveform>().is_err());
    }
}
