pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Signal graph backend boundary and the software render graph
pub mod synth; // Voice building, envelopes and polyphonic lifecycle

pub use config::EngineConfig;
pub use error::{GraphError, ParseParamError};
pub use graph::{GraphBackend, NodeId, ParamId, RenderGraph, SharedGraph};
pub use synth::{PolySynth, SynthMode, SynthParameters};

pub const MAX_BLOCK_SIZE: usize = 2048;
