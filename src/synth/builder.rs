use tracing::trace;

use crate::{
    dsp::oscillator::OscillatorWaveform,
    error::GraphError,
    graph::node::{GraphBackend, NodeId, ParamId},
    synth::{
        envelope::FLOOR,
        params::{SynthMode, SynthParameters},
    },
};

/*
Voice Topologies
================

Each note gets its own little graph, built fresh at note-on and torn down
after its release tail. Three shapes exist; all of them end in a single
envelope gain stage owned by the voice.

Additive
--------

  partial i (1..N) at frequency·i, weighted 1/i²:

    osc(f)  ──→ gain(1)    ──┐
    osc(2f) ──→ gain(1/4)  ──┼──→ envelope ──→ output
    osc(3f) ──→ gain(1/9)  ──┘

  No normalisation: five partials sum to ~1.46 at peak, the per-voice
  envelope peak takes care of headroom.

AM (amplitude modulation)
-------------------------

    carrier(f) ──→ am gain ──→ envelope ──→ output
                      ↑ gain param (intrinsic 1.0)
    sine(mf) ──→ depth gain

  am gain(t) = 1 + depth·sin(2π·mf·t). Depth above 1 makes the gain dip
  below zero, which flips the carrier's phase. That is allowed.

FM (frequency modulation)
-------------------------

    sine(mf) ──→ index gain (index·mf)
                      ↓ frequency param
    carrier(f) ──────────────────────→ envelope ──→ output

  carrier frequency(t) = f + index·mf·sin(2π·mf·t). The modulator is always
  a sine; the selected waveform applies to the carrier only.

Vibrato
-------

When the LFO depth is non-zero the shared LFO is routed through a per-voice
gain of depth·f·0.03 into oscillator frequencies: every partial in additive
mode (so harmonics stay aligned), only the carrier in AM/FM (the
modulator's pitch is part of the timbre, not the melody).
*/

/// Vibrato excursion per unit of LFO depth, as a fraction of the note's pitch.
pub const VIBRATO_SCALE: f32 = 0.03;

/// Handles to everything a voice created in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceGraph {
    /// Signal sources, primary carrier (or fundamental) first.
    pub oscillators: Vec<NodeId>,
    /// The single gain stage all of this voice's energy passes through.
    pub envelope: NodeId,
    /// Mixing and modulation gains owned by this voice alone.
    pub auxiliary: Vec<NodeId>,
}

impl VoiceGraph {
    /// Every node, in teardown order (sources first).
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.oscillators
            .iter()
            .chain(&self.auxiliary)
            .copied()
            .chain(std::iter::once(self.envelope))
    }
}

/// Shared LFO routing for one voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    pub lfo: NodeId,
    pub depth: f32,
}

impl Vibrato {
    /// Frequency excursion (Hz) for a note at `frequency`.
    pub fn excursion(&self, frequency: f32) -> f32 {
        self.depth * frequency * VIBRATO_SCALE
    }
}

/// The per-mode recipe for a voice, copied out of the parameters at note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceTopology {
    Additive { partials: u32 },
    Am { mod_frequency: f32, depth: f32 },
    Fm { mod_frequency: f32, index: f32 },
}

impl VoiceTopology {
    pub fn from_params(params: &SynthParameters) -> Self {
        match params.mode {
            SynthMode::Additive => VoiceTopology::Additive {
                partials: params.additive_partials,
            },
            SynthMode::Am => VoiceTopology::Am {
                mod_frequency: params.am_mod_frequency,
                depth: params.am_depth,
            },
            SynthMode::Fm => VoiceTopology::Fm {
                mod_frequency: params.fm_mod_frequency,
                index: params.fm_mod_index,
            },
        }
    }

    /// Build the graph for one note and start its oscillators at `now`.
    ///
    /// The envelope stage holds [`FLOOR`] and is connected to `output` only
    /// after the rest of the voice is wired; shaping it is up to the caller.
    /// On failure every node created so far is disconnected again.
    pub fn build<B: GraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        output: NodeId,
        frequency: f32,
        waveform: OscillatorWaveform,
        vibrato: Option<Vibrato>,
        now: f64,
    ) -> Result<VoiceGraph, GraphError> {
        let mut assembly = Assembly {
            backend,
            created: Vec::new(),
            now,
        };

        match assembly.build(self, output, frequency, waveform, vibrato) {
            Ok(graph) => Ok(graph),
            Err(err) => {
                for node in assembly.created {
                    let _ = assembly.backend.disconnect(node);
                }
                Err(err)
            }
        }
    }

    fn vibrato_targets<'a>(&self, oscillators: &'a [NodeId]) -> &'a [NodeId] {
        match self {
            VoiceTopology::Additive { .. } => oscillators,
            VoiceTopology::Am { .. } | VoiceTopology::Fm { .. } => {
                &oscillators[..oscillators.len().min(1)]
            }
        }
    }
}

/// Convenience wrapper that remembers what it created.
struct Assembly<'a, B: ?Sized> {
    backend: &'a mut B,
    created: Vec<NodeId>,
    now: f64,
}

impl<B: GraphBackend + ?Sized> Assembly<'_, B> {
    fn oscillator(&mut self, waveform: OscillatorWaveform, frequency: f32) -> Result<NodeId, GraphError> {
        let node = self.backend.create_oscillator(waveform);
        self.created.push(node);
        self.backend
            .set_value_at_time(ParamId::frequency(node), frequency, self.now)?;
        Ok(node)
    }

    fn gain(&mut self, value: f32) -> Result<NodeId, GraphError> {
        let node = self.backend.create_gain();
        self.created.push(node);
        self.backend
            .set_value_at_time(ParamId::gain(node), value, self.now)?;
        Ok(node)
    }

    fn build(
        &mut self,
        topology: &VoiceTopology,
        output: NodeId,
        frequency: f32,
        waveform: OscillatorWaveform,
        vibrato: Option<Vibrato>,
    ) -> Result<VoiceGraph, GraphError> {
        // Silent from the start; connected to the output only once wired
        let envelope = self.gain(FLOOR)?;

        let mut oscillators = Vec::new();
        let mut auxiliary = Vec::new();

        match *topology {
            VoiceTopology::Additive { partials } => {
                for i in 1..=partials {
                    let osc = self.oscillator(waveform, frequency * i as f32)?;
                    let weight = self.gain(1.0 / (i * i) as f32)?;
                    self.backend.connect(osc, weight)?;
                    self.backend.connect(weight, envelope)?;
                    oscillators.push(osc);
                    auxiliary.push(weight);
                }
            }
            VoiceTopology::Am {
                mod_frequency,
                depth,
            } => {
                let carrier = self.oscillator(waveform, frequency)?;
                let am = self.gain(1.0)?;
                let modulator = self.oscillator(OscillatorWaveform::Sine, mod_frequency)?;
                let depth_gain = self.gain(depth)?;

                self.backend.connect(modulator, depth_gain)?;
                self.backend.connect_param(depth_gain, ParamId::gain(am))?;
                self.backend.connect(carrier, am)?;
                self.backend.connect(am, envelope)?;

                oscillators.extend([carrier, modulator]);
                auxiliary.extend([am, depth_gain]);
            }
            VoiceTopology::Fm {
                mod_frequency,
                index,
            } => {
                let carrier = self.oscillator(waveform, frequency)?;
                let modulator = self.oscillator(OscillatorWaveform::Sine, mod_frequency)?;
                let index_gain = self.gain(index * mod_frequency)?;

                self.backend.connect(modulator, index_gain)?;
                self.backend
                    .connect_param(index_gain, ParamId::frequency(carrier))?;
                self.backend.connect(carrier, envelope)?;

                oscillators.extend([carrier, modulator]);
                auxiliary.push(index_gain);
            }
        }

        if let Some(vibrato) = vibrato.filter(|v| v.depth > 0.0) {
            let depth_gain = self.gain(vibrato.excursion(frequency))?;
            self.backend.connect(vibrato.lfo, depth_gain)?;
            for &osc in topology.vibrato_targets(&oscillators) {
                self.backend.connect_param(depth_gain, ParamId::frequency(osc))?;
            }
            auxiliary.push(depth_gain);
        }

        self.backend.connect(envelope, output)?;
        for &osc in &oscillators {
            self.backend.start(osc, self.now)?;
        }

        trace!(
            ?topology,
            frequency,
            oscillators = oscillators.len(),
            "built voice graph"
        );

        Ok(VoiceGraph {
            oscillators,
            envelope,
            auxiliary,
        })
    }
}
