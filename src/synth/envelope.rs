use crate::{
    error::GraphError,
    graph::node::{GraphBackend, NodeId, ParamId},
    synth::params::SynthParameters,
};

/*
Voice Envelope
==============

The envelope is not computed here sample by sample. It is a handful of
automation events scheduled on the voice's envelope gain; the graph
evaluates them while rendering.

The Shape
---------

  gain
  peak ┐      ╱╲
       │     ╱  ╲
       │    ╱    ╲_____________
  S·pk │   ╱                   ╲
       │  ╱                     ╲_
 floor └─╯──────────────────────────‾‾‾──→ time
        now  +A   +A+D         off    off + 5R
             attack decay  sustain    release

  attack   exponential ramp floor → peak over A seconds
  decay    exponential ramp peak → max(peak·sustain, floor) over D seconds
  sustain  holds until note-off
  release  first-order decay towards the floor with τ = R/3

Why a floor
-----------

Exponential ramps are undefined at zero, so "silence" is FLOOR (−80 dB).
A sustain of 0 decays to the floor, not to zero.

Release
-------

Note-off can land anywhere: mid-attack, mid-decay, during a previous release
(the panic path re-releasing a voice). Whatever was scheduled is cancelled,
the live gain is pinned as the new origin, and the decay starts from there.
Skipping the pin would make the gain snap back to whatever the last
surviving event said before the decay starts: an audible click.

After 5τ = 5R/3 the curve is ~0.1% of where it started, but oscillators are
stopped later still, at now + 5R: the tail is well under the floor by then.
*/

/// The envelope's idea of silence. Never exactly zero.
pub const FLOOR: f32 = 0.0001;

/// Release time divided by this gives the decay time constant.
pub const RELEASE_TIME_CONSTANT_DIVISOR: f64 = 3.0;

/// Release time multiplied by this gives the stop deadline offset.
pub const RELEASE_TAIL_FACTOR: f64 = 5.0;

/// Attack, decay and sustain copied from the parameters at note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
}

impl EnvelopeShape {
    pub fn from_params(params: &SynthParameters) -> Self {
        Self {
            attack: params.attack,
            decay: params.decay,
            sustain: params.sustain,
        }
    }

    /// Level the decay settles at for a given peak.
    pub fn sustain_level(&self, peak: f32) -> f32 {
        (peak * self.sustain).max(FLOOR)
    }
}

/// Schedule attack and decay on `envelope`, starting at `now`.
pub fn apply_attack_decay_sustain<B: GraphBackend + ?Sized>(
    backend: &mut B,
    envelope: NodeId,
    peak: f32,
    shape: &EnvelopeShape,
    now: f64,
) -> Result<(), GraphError> {
    let gain = ParamId::gain(envelope);
    let attack_end = now + shape.attack.max(0.0);
    let decay_end = attack_end + shape.decay.max(0.0);

    backend.set_value_at_time(gain, FLOOR, now)?;
    backend.exponential_ramp_to_value_at_time(gain, peak.max(FLOOR), attack_end)?;
    backend.exponential_ramp_to_value_at_time(gain, shape.sustain_level(peak), decay_end)?;
    Ok(())
}

/// Replace whatever `envelope` was doing with a release from `current_gain`.
///
/// Returns the audio-time deadline by which the tail is inaudible.
pub fn apply_release<B: GraphBackend + ?Sized>(
    backend: &mut B,
    envelope: NodeId,
    current_gain: f32,
    release: f64,
    now: f64,
) -> Result<f64, GraphError> {
    let gain = ParamId::gain(envelope);
    let release = release.max(0.0);

    backend.cancel_scheduled_values(gain, now)?;
    backend.set_value_at_time(gain, current_gain, now)?;
    backend.set_target_at_time(gain, FLOOR, now, release / RELEASE_TIME_CONSTANT_DIVISOR)?;

    Ok(stop_deadline(release, now))
}

/// Audio time at which a release started at `now` is judged inaudible.
pub fn stop_deadline(release: f64, now: f64) -> f64 {
    now + release.max(0.0) * RELEASE_TAIL_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::render::RenderGraph;

    const PEAK: f32 = 0.125;

    fn shape() -> EnvelopeShape {
        EnvelopeShape {
            attack: 0.05,
            decay: 0.2,
            sustain: 0.3,
        }
    }

    fn sample(graph: &RenderGraph, envelope: NodeId, from: f64, to: f64) -> Vec<f32> {
        let steps = 200;
        (0..=steps)
            .map(|i| {
                let t = from + (to - from) * i as f64 / steps as f64;
                graph.value_at(ParamId::gain(envelope), t).unwrap()
            })
            .collect()
    }

    fn setup() -> (RenderGraph, NodeId) {
        let mut graph = RenderGraph::new(8_000.0);
        let envelope = graph.create_gain();
        apply_attack_decay_sustain(&mut graph, envelope, PEAK, &shape(), 0.0).unwrap();
        (graph, envelope)
    }

    #[test]
    fn starts_at_floor_not_zero() {
        let (graph, envelope) = setup();
        assert_eq!(graph.value_at(ParamId::gain(envelope), 0.0), Some(FLOOR));
    }

    #[test]
    fn attack_rises_to_peak() {
        let (graph, envelope) = setup();
        let attack = sample(&graph, envelope, 0.0, 0.05);
        assert!(attack.windows(2).all(|w| w[1] >= w[0]), "attack not monotonic");
        assert!((attack.last().unwrap() - PEAK).abs() < 1e-6);
    }

    #[test]
    fn decay_settles_at_sustain_fraction() {
        let (graph, envelope) = setup();
        let decay = sample(&graph, envelope, 0.05, 0.25);
        assert!(decay.windows(2).all(|w| w[1] <= w[0]), "decay not monotonic");

        let held = graph.value_at(ParamId::gain(envelope), 2.0).unwrap();
        assert!((held - PEAK * 0.3).abs() < 1e-6, "sustain held at {held}");
    }

    #[test]
    fn zero_sustain_decays_to_floor() {
        let mut graph = RenderGraph::new(8_000.0);
        let envelope = graph.create_gain();
        let shape = EnvelopeShape {
            sustain: 0.0,
            ..shape()
        };
        apply_attack_decay_sustain(&mut graph, envelope, PEAK, &shape, 0.0).unwrap();
        assert_eq!(graph.value_at(ParamId::gain(envelope), 1.0), Some(FLOOR));
    }

    #[test]
    fn zero_attack_jumps_straight_to_peak() {
        let mut graph = RenderGraph::new(8_000.0);
        let envelope = graph.create_gain();
        let shape = EnvelopeShape {
            attack: 0.0,
            ..shape()
        };
        apply_attack_decay_sustain(&mut graph, envelope, PEAK, &shape, 0.0).unwrap();
        assert_eq!(graph.value_at(ParamId::gain(envelope), 0.0), Some(PEAK));
    }

    #[test]
    fn release_decays_strictly_from_pinned_value() {
        let (mut graph, envelope) = setup();
        // Release in the middle of the attack
        let now = 0.02;
        let current = graph.value_at(ParamId::gain(envelope), now).unwrap();
        let deadline = apply_release(&mut graph, envelope, current, 0.15, now).unwrap();

        assert!((deadline - (now + 0.75)).abs() < 1e-12);
        assert_eq!(graph.value_at(ParamId::gain(envelope), now), Some(current));

        let tail = sample(&graph, envelope, now, now + 0.15);
        assert!(tail.windows(2).all(|w| w[1] < w[0]), "release not strictly decreasing");
        assert!(tail.iter().all(|&g| g > FLOOR));

        let at_deadline = graph.value_at(ParamId::gain(envelope), deadline).unwrap();
        assert!(at_deadline - FLOOR < (current - FLOOR) * 0.001);
    }

    #[test]
    fn second_release_preempts_first_without_jump() {
        let (mut graph, envelope) = setup();
        let first = graph.value_at(ParamId::gain(envelope), 0.3).unwrap();
        apply_release(&mut graph, envelope, first, 1.0, 0.3).unwrap();

        let now = 0.4;
        let live = graph.value_at(ParamId::gain(envelope), now).unwrap();
        apply_release(&mut graph, envelope, live, 0.02, now).unwrap();

        let after = graph.value_at(ParamId::gain(envelope), now).unwrap();
        assert_eq!(after, live);
        assert!(graph.value_at(ParamId::gain(envelope), now + 0.1).unwrap() < live * 0.01);
    }

    #[test]
    fn zero_release_drops_to_floor_immediately() {
        let (mut graph, envelope) = setup();
        let deadline = apply_release(&mut graph, envelope, 0.1, 0.0, 0.5).unwrap();
        assert_eq!(deadline, 0.5);
        assert_eq!(graph.value_at(ParamId::gain(envelope), 0.5), Some(FLOOR));
    }
}
