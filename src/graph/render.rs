use std::collections::{HashMap, HashSet};

use crate::{
    dsp::{
        automation::{AutomationEvent, ParamTimeline},
        oscillator::{OscillatorBlock, OscillatorWaveform},
    },
    error::GraphError,
    graph::node::{GraphBackend, NodeId, NodeKind, ParamId, ParamKind},
    MAX_BLOCK_SIZE,
};

/*
Render Graph
============

A small pull-based audio graph: oscillators and gain stages wired together,
ending in a single destination sink. It is the software stand-in for the
kind of graph a browser or a host provides, and implements `GraphBackend` so
the synth cannot tell the difference.

  ┌─────┐   ┌──────┐   ┌──────────┐   ┌──────┐   ┌─────────────┐
  │ osc │──→│ gain │──→│ envelope │──→│master│──→│ destination │
  └─────┘   └──────┘   └──────────┘   └──────┘   └─────────────┘
     ↑ frequency param
  ┌─────┐   ┌──────┐
  │ lfo │──→│depth │
  └─────┘   └──────┘

Two kinds of edges exist:

  audio edges   node → node input. Inputs are summed.
  param edges   node → parameter. The source signal is added, sample by
                sample, on top of the parameter's automation timeline.
                This is how FM, AM and vibrato are built.

Rendering
---------

Each block, nodes are processed in dependency order (a depth-first walk from
the destination, cached until the wiring changes). Every node owns a block
buffer; a node reads its inputs' buffers, which are guaranteed to be filled
already. Nodes the destination cannot reach are skipped entirely.

Time
----

The graph owns the audio clock: `current_time()` is frames rendered divided
by the sample rate. Automation events and start/stop times are evaluated
against it sample by sample.
*/

enum Processor {
    Destination,
    Gain,
    Oscillator {
        block: OscillatorBlock,
        start: Option<f64>,
        stop: Option<f64>,
    },
}

struct Param {
    kind: ParamKind,
    timeline: ParamTimeline,
    inputs: Vec<NodeId>,
}

struct Node {
    processor: Processor,
    inputs: Vec<NodeId>,
    param: Option<Param>,
    buffer: Vec<f32>,
}

impl Node {
    fn new(processor: Processor, param: Option<Param>) -> Self {
        Self {
            processor,
            inputs: Vec::new(),
            param,
            buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    fn kind(&self) -> NodeKind {
        match &self.processor {
            Processor::Destination => NodeKind::Destination,
            Processor::Gain => NodeKind::Gain,
            Processor::Oscillator { block, .. } => NodeKind::Oscillator(block.waveform()),
        }
    }
}

pub struct RenderGraph {
    sample_rate: f32,
    nodes: HashMap<NodeId, Node>,
    next_id: u32,
    destination: NodeId,
    frames_rendered: u64,
    order: Vec<NodeId>,
    order_dirty: bool,
    param_buffer: Vec<f32>,
}

impl RenderGraph {
    pub fn new(sample_rate: f32) -> Self {
        let destination = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(destination, Node::new(Processor::Destination, None));

        Self {
            sample_rate,
            nodes,
            next_id: 1,
            destination,
            frames_rendered: 0,
            order: Vec::new(),
            order_dirty: true,
            param_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Render mono output and advance the audio clock by `out.len()` frames.
    pub fn render(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    /// Number of live nodes, including the destination.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(Node::kind)
    }

    pub fn audio_inputs(&self, node: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&node).map(|n| n.inputs.as_slice())
    }

    pub fn param_inputs(&self, param: ParamId) -> Option<&[NodeId]> {
        self.param(param).ok().map(|p| p.inputs.as_slice())
    }

    /// Intrinsic value of `param` at an arbitrary time, without rendering.
    pub fn value_at(&self, param: ParamId, time: f64) -> Option<f32> {
        self.param(param).ok().map(|p| p.timeline.value_at(time))
    }

    pub fn automation(&self, param: ParamId) -> Option<&[AutomationEvent]> {
        self.param(param).ok().map(|p| p.timeline.events())
    }

    pub fn start_time(&self, node: NodeId) -> Option<f64> {
        match self.nodes.get(&node)?.processor {
            Processor::Oscillator { start, .. } => start,
            _ => None,
        }
    }

    pub fn stop_time(&self, node: NodeId) -> Option<f64> {
        match self.nodes.get(&node)?.processor {
            Processor::Oscillator { stop, .. } => stop,
            _ => None,
        }
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn param(&self, param: ParamId) -> Result<&Param, GraphError> {
        let node = self
            .nodes
            .get(&param.node)
            .ok_or(GraphError::UnknownNode(param.node))?;
        node.param
            .as_ref()
            .filter(|p| p.kind == param.kind)
            .ok_or(GraphError::NoSuchParam(param.node))
    }

    fn param_mut(&mut self, param: ParamId) -> Result<&mut Param, GraphError> {
        let node = self
            .nodes
            .get_mut(&param.node)
            .ok_or(GraphError::UnknownNode(param.node))?;
        node.param
            .as_mut()
            .filter(|p| p.kind == param.kind)
            .ok_or(GraphError::NoSuchParam(param.node))
    }

    fn oscillator_times(
        &mut self,
        node: NodeId,
    ) -> Result<(&mut Option<f64>, &mut Option<f64>), GraphError> {
        match self.nodes.get_mut(&node) {
            None => Err(GraphError::UnknownNode(node)),
            Some(Node {
                processor: Processor::Oscillator { start, stop, .. },
                ..
            }) => Ok((start, stop)),
            Some(_) => Err(GraphError::NotAnOscillator(node)),
        }
    }

    fn rebuild_order(&mut self) {
        fn visit(
            id: NodeId,
            nodes: &HashMap<NodeId, Node>,
            visiting: &mut HashSet<NodeId>,
            done: &mut HashSet<NodeId>,
            order: &mut Vec<NodeId>,
        ) {
            if done.contains(&id) || !visiting.insert(id) {
                // Already placed, or a cycle: the back edge reads last block's buffer
                return;
            }
            if let Some(node) = nodes.get(&id) {
                let param_inputs = node.param.iter().flat_map(|p| p.inputs.iter());
                for &input in node.inputs.iter().chain(param_inputs) {
                    visit(input, nodes, visiting, done, order);
                }
            }
            visiting.remove(&id);
            done.insert(id);
            order.push(id);
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visiting = HashSet::new();
        let mut done = HashSet::new();
        visit(
            self.destination,
            &self.nodes,
            &mut visiting,
            &mut done,
            &mut order,
        );

        self.order = order;
        self.order_dirty = false;
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        if self.order_dirty {
            self.rebuild_order();
        }

        let len = out.len();
        let start_time = self.current_time();
        let dt = 1.0 / self.sample_rate as f64;

        for index in 0..self.order.len() {
            let id = self.order[index];
            let Some(mut node) = self.nodes.remove(&id) else {
                continue;
            };

            // Parameter: timeline value plus any audio-rate inputs
            let params = &mut self.param_buffer[..len];
            if let Some(param) = node.param.as_mut() {
                param.timeline.compact(start_time);
                for (i, value) in params.iter_mut().enumerate() {
                    *value = param.timeline.value_at(start_time + i as f64 * dt);
                }
                for input in &param.inputs {
                    if let Some(source) = self.nodes.get(input) {
                        for (value, s) in params.iter_mut().zip(&source.buffer[..len]) {
                            *value += s;
                        }
                    }
                }
            }

            let is_gain = matches!(node.processor, Processor::Gain);
            let buffer = &mut node.buffer[..len];
            match &mut node.processor {
                Processor::Destination | Processor::Gain => {
                    buffer.fill(0.0);
                    for input in &node.inputs {
                        if let Some(source) = self.nodes.get(input) {
                            for (o, s) in buffer.iter_mut().zip(&source.buffer[..len]) {
                                *o += s;
                            }
                        }
                    }
                    if is_gain {
                        for (o, g) in buffer.iter_mut().zip(params.iter()) {
                            *o *= g;
                        }
                    }
                }
                Processor::Oscillator { block, start, stop } => {
                    for (i, (o, frequency)) in buffer.iter_mut().zip(params.iter()).enumerate() {
                        let t = start_time + i as f64 * dt;
                        let running = start.is_some_and(|s| t >= s) && stop.map_or(true, |s| t < s);
                        *o = if running {
                            block.next_sample(*frequency, self.sample_rate)
                        } else {
                            0.0
                        };
                    }
                }
            }

            self.nodes.insert(id, node);
        }

        if let Some(destination) = self.nodes.get(&self.destination) {
            out.copy_from_slice(&destination.buffer[..len]);
        }
        self.frames_rendered += len as u64;
    }
}

impl GraphBackend for RenderGraph {
    fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(&mut self, waveform: OscillatorWaveform) -> NodeId {
        let param = Param {
            kind: ParamKind::Frequency,
            timeline: ParamTimeline::new(440.0),
            inputs: Vec::new(),
        };
        let processor = Processor::Oscillator {
            block: OscillatorBlock::new(waveform),
            start: None,
            stop: None,
        };
        self.allocate(Node::new(processor, Some(param)))
    }

    fn create_gain(&mut self) -> NodeId {
        let param = Param {
            kind: ParamKind::Gain,
            timeline: ParamTimeline::new(1.0),
            inputs: Vec::new(),
        };
        self.allocate(Node::new(Processor::Gain, Some(param)))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        let target = self.nodes.get_mut(&to).ok_or(GraphError::UnknownNode(to))?;
        if matches!(target.processor, Processor::Oscillator { .. }) {
            return Err(GraphError::NoAudioInput(to));
        }
        if !target.inputs.contains(&from) {
            target.inputs.push(from);
            self.order_dirty = true;
        }
        Ok(())
    }

    fn connect_param(&mut self, from: NodeId, to: ParamId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        let param = self.param_mut(to)?;
        if !param.inputs.contains(&from) {
            param.inputs.push(from);
            self.order_dirty = true;
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        if node == self.destination {
            if let Some(destination) = self.nodes.get_mut(&node) {
                destination.inputs.clear();
            }
            self.order_dirty = true;
            return Ok(());
        }

        self.nodes
            .remove(&node)
            .ok_or(GraphError::UnknownNode(node))?;

        for other in self.nodes.values_mut() {
            other.inputs.retain(|&input| input != node);
            if let Some(param) = other.param.as_mut() {
                param.inputs.retain(|&input| input != node);
            }
        }
        self.order_dirty = true;
        Ok(())
    }

    fn start(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError> {
        let (start, _) = self.oscillator_times(oscillator)?;
        if start.is_some() {
            return Err(GraphError::AlreadyStarted(oscillator));
        }
        *start = Some(when);
        Ok(())
    }

    fn stop(&mut self, oscillator: NodeId, when: f64) -> Result<(), GraphError> {
        let now = self.current_time();
        let (start, stop) = self.oscillator_times(oscillator)?;
        if start.is_none() {
            return Err(GraphError::NotStarted(oscillator));
        }
        if stop.is_some_and(|at| at <= now) {
            return Err(GraphError::AlreadyStopped(oscillator));
        }
        *stop = Some(when);
        Ok(())
    }

    fn schedule(&mut self, param: ParamId, event: AutomationEvent) -> Result<(), GraphError> {
        self.param_mut(param)?.timeline.insert(event)
    }

    fn cancel_scheduled_values(&mut self, param: ParamId, from: f64) -> Result<(), GraphError> {
        self.param_mut(param)?.timeline.cancel_from(from);
        Ok(())
    }

    fn param_value(&self, param: ParamId) -> Result<f32, GraphError> {
        let now = self.current_time();
        Ok(self.param(param)?.timeline.value_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 8_000.0;

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn renders_silence_with_empty_graph() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let mut buffer = vec![1.0; 256];
        graph.render(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
        assert!((graph.current_time() - 256.0 / 8_000.0).abs() < 1e-12);
    }

    #[test]
    fn gain_scales_oscillator() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let osc = graph.create_oscillator(OscillatorWaveform::Square);
        let gain = graph.create_gain();
        graph.set_value_at_time(ParamId::gain(gain), 0.25, 0.0).unwrap();
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        graph.start(osc, 0.0).unwrap();

        let mut buffer = vec![0.0; 512];
        graph.render(&mut buffer);
        assert!((peak(&buffer) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn oscillator_is_silent_outside_start_and_stop() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let osc = graph.create_oscillator(OscillatorWaveform::Square);
        graph.connect(osc, graph.destination()).unwrap();
        graph.start(osc, 0.01).unwrap();
        graph.stop(osc, 0.02).unwrap();

        let mut buffer = vec![0.0; 400]; // 50ms
        graph.render(&mut buffer);

        assert!(peak(&buffer[..80]) == 0.0, "sounded before start");
        assert!(peak(&buffer[80..160]) > 0.9);
        assert!(peak(&buffer[162..]) == 0.0, "sounded after stop");
    }

    #[test]
    fn stop_after_stopped_reports_already_stopped() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let osc = graph.create_oscillator(OscillatorWaveform::Sine);
        assert_eq!(graph.stop(osc, 0.0), Err(GraphError::NotStarted(osc)));

        graph.start(osc, 0.0).unwrap();
        graph.stop(osc, 0.001).unwrap();
        let mut buffer = vec![0.0; 64];
        graph.render(&mut buffer);

        assert_eq!(graph.stop(osc, 1.0), Err(GraphError::AlreadyStopped(osc)));
        assert_eq!(graph.start(osc, 1.0), Err(GraphError::AlreadyStarted(osc)));
    }

    #[test]
    fn param_input_is_summed_onto_frequency() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let carrier = graph.create_oscillator(OscillatorWaveform::Sine);
        let offset = graph.create_oscillator(OscillatorWaveform::Square);
        let depth = graph.create_gain();
        graph.set_value_at_time(ParamId::gain(depth), 100.0, 0.0).unwrap();
        graph.connect(offset, depth).unwrap();
        graph.connect_param(depth, ParamId::frequency(carrier)).unwrap();
        graph.connect(carrier, graph.destination()).unwrap();
        graph.start(carrier, 0.0).unwrap();
        graph.start(offset, 0.0).unwrap();

        assert_eq!(graph.param_inputs(ParamId::frequency(carrier)), Some(&[depth][..]));
        assert_eq!(
            graph.connect_param(depth, ParamId::gain(carrier)),
            Err(GraphError::NoSuchParam(carrier))
        );

        let mut buffer = vec![0.0; 256];
        graph.render(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(peak(&buffer) > 0.5);
    }

    #[test]
    fn disconnect_releases_node_and_its_edges() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let osc = graph.create_oscillator(OscillatorWaveform::Sine);
        let gain = graph.create_gain();
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        assert_eq!(graph.node_count(), 3);

        graph.disconnect(gain).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.audio_inputs(graph.destination()), Some(&[][..]));
        assert_eq!(graph.disconnect(gain), Err(GraphError::UnknownNode(gain)));
        assert_eq!(graph.stop(gain, 0.0), Err(GraphError::UnknownNode(gain)));
    }

    #[test]
    fn param_value_tracks_audio_clock() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let gain = graph.create_gain();
        let param = ParamId::gain(gain);
        graph.set_value_at_time(param, 0.0, 0.0).unwrap();
        graph.linear_ramp_to_value_at_time(param, 1.0, 0.1).unwrap();

        assert_eq!(graph.param_value(param), Ok(0.0));
        let mut buffer = vec![0.0; 400]; // 50ms
        graph.render(&mut buffer);
        let value = graph.param_value(param).unwrap();
        assert!((value - 0.5).abs() < 1e-3, "got {value}");
    }

    #[test]
    fn oscillator_rejects_audio_input() {
        let mut graph = RenderGraph::new(SAMPLE_RATE);
        let a = graph.create_oscillator(OscillatorWaveform::Sine);
        let b = graph.create_oscillator(OscillatorWaveform::Sine);
        assert_eq!(graph.connect(a, b), Err(GraphError::NoAudioInput(b)));
    }
}
