use std::fmt;

use crate::{
    dsp::{automation::AutomationEvent, oscillator::OscillatorWaveform},
    error::GraphError,
};

/// Opaque handle to a node living inside a [`GraphBackend`].
///
/// Handles are never reused, so a stale handle held by a voice that has
/// already been torn down can only ever produce `UnknownNode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Output gain of a gain node
    Gain,
    /// Frequency (Hz) of an oscillator
    Frequency,
}

/// One automatable parameter of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId {
    pub node: NodeId,
    pub kind: ParamKind,
}

impl ParamId {
    pub fn gain(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Gain,
        }
    }

    pub fn frequency(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Frequency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Destination,
    Oscillator(OscillatorWaveform),
    Gain,
}

/// The signal-graph capability the synth drives.
///
/// All times are on the backend's own audio clock (`current_time`), in
/// seconds. Construction and automation calls are cheap and return
/// immediately; the backend applies them while rendering.
pub trait GraphBackend {
    /// Current position of the audio clock in seconds.
    fn current_time(&self) -> f64;

    /// The sink everything audible eventually connects to.
    fn destination(&self) -> NodeId;

    fn create_oscillator(&mut self, waveform: OscillatorWaveform) -> NodeId;

    fn create_gain(&mut self) -> NodeId;

    /// Route the audio output of `from` into the input of `to`.
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError>;

    /// Route the audio output of `from` into a parameter, summed onto its
    /// intrinsic value at audio rate.
    fn connect_param(&mut self, from: NodeId, to: ParamId) -> Result<(), GraphError>;

    /// Cut every connection touching `node` and release it.
    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError>;

    fn start(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError>;

    fn stop(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError>;

    fn schedule(&mut self, param: ParamId, event: AutomationEvent) -> Result<(), GraphError>;

    /// Remove every automation event stamped at or after `from`.
    fn cancel_scheduled_values(&mut self, param: ParamId, from: f64) -> Result<(), GraphError>;

    /// Intrinsic value of `param` at the current audio time.
    fn param_value(&self, param: ParamId) -> Result<f32, GraphError>;

    /// Run `edit` with exclusive access to the graph: no audio is rendered
    /// part-way through it.
    ///
    /// Backends shared with an audio thread take their lock once for the
    /// whole closure. Multi-step edits (building a voice, re-pinning an
    /// envelope) must go through here, or the renderer can observe a voice
    /// with no envelope or a gain that snapped back after a cancel.
    fn atomically<R>(&mut self, edit: impl FnOnce(&mut dyn GraphBackend) -> R) -> R
    where
        Self: Sized,
    {
        edit(self)
    }

    fn set_value_at_time(&mut self, param: ParamId, value: f32, time: f64) -> Result<(), GraphError> {
        self.schedule(param, AutomationEvent::SetValue { value, time })
    }

    fn linear_ramp_to_value_at_time(
        &mut self,
        param: ParamId,
        value: f32,
        end_time: f64,
    ) -> Result<(), GraphError> {
        self.schedule(param, AutomationEvent::LinearRamp { value, end_time })
    }

    fn exponential_ramp_to_value_at_time(
        &mut self,
        param: ParamId,
        value: f32,
        end_time: f64,
    ) -> Result<(), GraphError> {
        self.schedule(param, AutomationEvent::ExponentialRamp { value, end_time })
    }

    fn set_target_at_time(
        &mut self,
        param: ParamId,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<(), GraphError> {
        self.schedule(
            param,
            AutomationEvent::SetTarget {
                target,
                start_time,
                time_constant,
            },
        )
    }
}
