//! Low-level DSP primitives used by the render graph.
//!
//! These components hold no references to the graph and allocate nothing
//! per sample. They stay focused on the math (waveforms, automation curves)
//! so the graph layer can concentrate on routing.

/// Time-stamped parameter automation (ramps, targets, cancellation).
pub mod automation;
/// Oscillator waveforms driven by a phase accumulator.
pub mod oscillator;

pub use automation::{AutomationEvent, ParamTimeline};
pub use oscillator::{OscillatorBlock, OscillatorWaveform};
