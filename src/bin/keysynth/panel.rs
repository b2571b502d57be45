//! Control panel - mode/waveform/partials selectors and the knob cursor
//!
//! The input thread owns a `Panel` and turns panel keys into parameter
//! changes. Which knob is selected is shared with the UI so the status bar
//! can highlight it.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crossterm::event::KeyCode;

use keysynth::{
    dsp::OscillatorWaveform,
    synth::{ParamChange, SynthMode, SynthParameters},
    EngineConfig,
};

const MAX_PARTIALS: u32 = 32;

/// A continuous parameter reachable with `,` and `.`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    AmFrequency,
    AmDepth,
    FmFrequency,
    FmIndex,
    Attack,
    Decay,
    Sustain,
    Release,
    LfoRate,
    LfoDepth,
    Master,
}

impl Knob {
    pub const ALL: [Knob; 11] = [
        Knob::AmFrequency,
        Knob::AmDepth,
        Knob::FmFrequency,
        Knob::FmIndex,
        Knob::Attack,
        Knob::Decay,
        Knob::Sustain,
        Knob::Release,
        Knob::LfoRate,
        Knob::LfoDepth,
        Knob::Master,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Knob::AmFrequency => "AM Hz",
            Knob::AmDepth => "AM depth",
            Knob::FmFrequency => "FM Hz",
            Knob::FmIndex => "FM index",
            Knob::Attack => "Atk",
            Knob::Decay => "Dec",
            Knob::Sustain => "Sus",
            Knob::Release => "Rel",
            Knob::LfoRate => "LFO Hz",
            Knob::LfoDepth => "LFO depth",
            Knob::Master => "Master",
        }
    }

    /// (step, min, max) - the widget's own range, the engine does not clamp
    fn range(self) -> (f32, f32, f32) {
        match self {
            Knob::AmFrequency | Knob::FmFrequency => (10.0, 1.0, 1000.0),
            Knob::AmDepth | Knob::Sustain | Knob::LfoDepth | Knob::Master => (0.05, 0.0, 1.0),
            Knob::FmIndex => (0.5, 0.0, 20.0),
            Knob::Attack => (0.01, 0.0, 2.0),
            Knob::Decay => (0.05, 0.0, 2.0),
            Knob::Release => (0.05, 0.0, 3.0),
            Knob::LfoRate => (0.5, 0.1, 20.0),
        }
    }

    /// The mode this knob shapes, for knobs that only matter in one mode
    pub fn mode(self) -> Option<SynthMode> {
        match self {
            Knob::AmFrequency | Knob::AmDepth => Some(SynthMode::Am),
            Knob::FmFrequency | Knob::FmIndex => Some(SynthMode::Fm),
            _ => None,
        }
    }

    pub fn value(self, params: &SynthParameters, master_level: f32) -> f32 {
        match self {
            Knob::AmFrequency => params.am_mod_frequency,
            Knob::AmDepth => params.am_depth,
            Knob::FmFrequency => params.fm_mod_frequency,
            Knob::FmIndex => params.fm_mod_index,
            Knob::Attack => params.attack as f32,
            Knob::Decay => params.decay as f32,
            Knob::Sustain => params.sustain,
            Knob::Release => params.release as f32,
            Knob::LfoRate => params.lfo_rate,
            Knob::LfoDepth => params.lfo_depth,
            Knob::Master => master_level,
        }
    }

    fn change(self, value: f32) -> ParamChange {
        match self {
            Knob::AmFrequency => ParamChange::AmFrequency(value),
            Knob::AmDepth => ParamChange::AmDepth(value),
            Knob::FmFrequency => ParamChange::FmFrequency(value),
            Knob::FmIndex => ParamChange::FmIndex(value),
            Knob::Attack => ParamChange::Attack(value as f64),
            Knob::Decay => ParamChange::Decay(value as f64),
            Knob::Sustain => ParamChange::Sustain(value),
            Knob::Release => ParamChange::Release(value as f64),
            Knob::LfoRate => ParamChange::LfoRate(value),
            Knob::LfoDepth => ParamChange::LfoDepth(value),
            Knob::Master => ParamChange::MasterLevel(value),
        }
    }

    /// `value` moved by `steps` steps, snapped to the step grid and clamped
    fn stepped(self, value: f32, steps: f32) -> f32 {
        let (step, min, max) = self.range();
        let snapped = ((value + step * steps) / step).round() * step;
        snapped.clamp(min, max)
    }
}

/// The knob cursor, written by the input thread and read by the UI
#[derive(Debug, Clone, Default)]
pub struct KnobCursor(Arc<AtomicUsize>);

impl KnobCursor {
    pub fn get(&self) -> Knob {
        Knob::ALL[self.0.load(Ordering::Relaxed) % Knob::ALL.len()]
    }

    fn move_by(&self, step: isize) {
        let len = Knob::ALL.len() as isize;
        let index = self.0.load(Ordering::Relaxed) as isize;
        self.0
            .store((index + step).rem_euclid(len) as usize, Ordering::Relaxed);
    }
}

/// Panel values mirrored on the input side so stepping keys know where
/// they are.
#[derive(Debug, Clone)]
pub struct Panel {
    params: SynthParameters,
    master_level: f32,
    cursor: KnobCursor,
}

impl Panel {
    pub fn new(config: &EngineConfig, cursor: KnobCursor) -> Self {
        Self {
            params: SynthParameters::default(),
            master_level: config.master_level,
            cursor,
        }
    }

    /// Apply a panel key. Returns the change to send, if the key was one.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<ParamChange> {
        let change = match code {
            KeyCode::F(n @ 1..=3) => ParamChange::Mode(SynthMode::ALL[n as usize - 1]),
            KeyCode::Char('[') => ParamChange::Waveform(cycle(self.params.waveform, -1)),
            KeyCode::Char(']') => ParamChange::Waveform(cycle(self.params.waveform, 1)),
            KeyCode::Char('-') => {
                ParamChange::Partials(self.params.additive_partials.saturating_sub(1).max(1))
            }
            KeyCode::Char('=') => {
                ParamChange::Partials((self.params.additive_partials + 1).min(MAX_PARTIALS))
            }
            KeyCode::Tab => {
                self.cursor.move_by(1);
                return None;
            }
            KeyCode::BackTab => {
                self.cursor.move_by(-1);
                return None;
            }
            KeyCode::Char(',') => self.step_knob(-1.0),
            KeyCode::Char('.') => self.step_knob(1.0),
            _ => return None,
        };

        if let ParamChange::MasterLevel(level) = change {
            self.master_level = level;
        } else {
            self.params.apply(change);
        }
        Some(change)
    }

    fn step_knob(&self, steps: f32) -> ParamChange {
        let knob = self.cursor.get();
        let current = knob.value(&self.params, self.master_level);
        knob.change(knob.stepped(current, steps))
    }
}

fn cycle(current: OscillatorWaveform, step: isize) -> OscillatorWaveform {
    let all = OscillatorWaveform::ALL;
    let index = all.iter().position(|&w| w == current).unwrap_or(0) as isize;
    all[(index + step).rem_euclid(all.len() as isize) as usize]
}
