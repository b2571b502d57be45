use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    dsp::{automation::AutomationEvent, oscillator::OscillatorWaveform},
    error::GraphError,
    graph::{
        node::{GraphBackend, NodeId, ParamId},
        render::RenderGraph,
    },
};

/// A [`RenderGraph`] shared between the control thread and the audio callback.
///
/// Every backend call takes the lock for the duration of that call only.
/// Edits that must land as a whole go through [`GraphBackend::atomically`],
/// which holds the lock for the full closure.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<Mutex<RenderGraph>>,
}

impl SharedGraph {
    pub fn new(graph: RenderGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph. A panic on the other side leaves the graph usable, so
    /// poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, RenderGraph> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }
}

impl GraphBackend for SharedGraph {
    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn destination(&self) -> NodeId {
        self.lock().destination()
    }

    fn create_oscillator(&mut self, waveform: OscillatorWaveform) -> NodeId {
        self.lock().create_oscillator(waveform)
    }

    fn create_gain(&mut self) -> NodeId {
        self.lock().create_gain()
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.lock().connect(from, to)
    }

    fn connect_param(&mut self, from: NodeId, to: ParamId) -> Result<(), GraphError> {
        self.lock().connect_param(from, to)
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        self.lock().disconnect(node)
    }

    fn start(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError> {
        self.lock().start(oscillator, when)
    }

    fn stop(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError> {
        self.lock().stop(oscillator, when)
    }

    fn schedule(&mut self, param: ParamId, event: AutomationEvent) -> Result<(), GraphError> {
        self.lock().schedule(param, event)
    }

    fn cancel_scheduled_values(&mut self, param: ParamId, from: f64) -> Result<(), GraphError> {
        self.lock().cancel_scheduled_values(param, from)
    }

    fn param_value(&self, param: ParamId) -> Result<f32, GraphError> {
        self.lock().param_value(param)
    }

    fn atomically<R>(&mut self, edit: impl FnOnce(&mut dyn GraphBackend) -> R) -> R {
        let mut graph = self.lock();
        edit(&mut *graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_graph() {
        let mut control = SharedGraph::new(RenderGraph::new(8_000.0));
        let audio = control.clone();

        let gain = control.create_gain();
        control.connect(gain, control.destination()).unwrap();
        assert!(audio.lock().contains(gain));

        let mut buffer = vec![0.0; 80];
        audio.render(&mut buffer);
        assert!((control.current_time() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn atomic_edits_hold_the_lock_throughout() {
        let mut control = SharedGraph::new(RenderGraph::new(8_000.0));
        let audio = control.clone();

        let gain = control.atomically(|graph| {
            let gain = graph.create_gain();
            assert!(audio.inner.try_lock().is_err());
            graph.connect(gain, graph.destination()).unwrap();
            assert!(audio.inner.try_lock().is_err());
            gain
        });

        assert!(audio.inner.try_lock().is_ok());
        assert!(audio.lock().contains(gain));
    }
}
