//! The signal-graph boundary the synth drives, and a software graph that
//! implements it.
//!
//! The synth only ever talks to [`GraphBackend`]: it creates oscillators and
//! gain stages, wires them, and schedules parameter automation on the
//! backend's audio clock. [`RenderGraph`] is a block-based implementation
//! that actually produces samples; [`SharedGraph`] lets a control thread and
//! an audio callback use the same one.

/// Handles, parameter ids and the backend trait.
pub mod node;
/// Block-based software render graph.
pub mod render;
/// Mutex-shared render graph for control/audio thread splits.
pub mod shared;

pub use node::{GraphBackend, NodeId, NodeKind, ParamId, ParamKind};
pub use render::RenderGraph;
pub use shared::SharedGraph;
