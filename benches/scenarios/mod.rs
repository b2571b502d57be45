//! Real-world scenario benchmarks.
//!
//! These drive a `PolySynth` on a `RenderGraph` the way the keyboard binary
//! does: chords held in each synthesis mode, and rapid note churn.

mod lifecycle;
mod voices;

pub use lifecycle::bench_lifecycle;
pub use voices::bench_voices;
