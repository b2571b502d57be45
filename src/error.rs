use std::fmt;

use crate::graph::node::NodeId;

/// Failures reported by a [`GraphBackend`](crate::graph::GraphBackend).
///
/// The lifecycle layer treats most of these as expected noise (a source that
/// already stopped, a node already torn down) and only logs them.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The node was never created or has already been disconnected.
    UnknownNode(NodeId),
    /// The node exists but has no parameter of the requested kind.
    NoSuchParam(NodeId),
    /// The operation only applies to oscillator nodes.
    NotAnOscillator(NodeId),
    /// Oscillators are sources; they only take parameter inputs.
    NoAudioInput(NodeId),
    AlreadyStarted(NodeId),
    NotStarted(NodeId),
    /// `stop` was called after the oscillator had already stopped itself.
    AlreadyStopped(NodeId),
    /// Exponential ramps are undefined for targets at or below zero.
    NonPositiveRampTarget(f32),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode(id) => write!(f, "unknown graph node {id}"),
            GraphError::NoSuchParam(id) => write!(f, "node {id} has no such parameter"),
            GraphError::NotAnOscillator(id) => write!(f, "node {id} is not an oscillator"),
            GraphError::NoAudioInput(id) => write!(f, "node {id} has no audio input"),
            GraphError::AlreadyStarted(id) => write!(f, "oscillator {id} was already started"),
            GraphError::NotStarted(id) => write!(f, "oscillator {id} was never started"),
            GraphError::AlreadyStopped(id) => write!(f, "oscillator {id} has already stopped"),
            GraphError::NonPositiveRampTarget(v) => {
                write!(f, "exponential ramp target must be positive, got {v}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// A selector string did not name a known mode or waveform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseParamError {
    UnknownMode(String),
    UnknownWaveform(String),
}

impl fmt::Display for ParseParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseParamError::UnknownMode(s) => write!(f, "unknown synthesis mode '{s}'"),
            ParseParamError::UnknownWaveform(s) => write!(f, "unknown waveform '{s}'"),
        }
    }
}

impl std::error::Error for ParseParamError {}
