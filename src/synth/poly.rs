use tracing::{debug, trace, warn};

use crate::{
    config::EngineConfig,
    dsp::oscillator::OscillatorWaveform,
    error::GraphError,
    graph::node::{GraphBackend, NodeId, ParamId},
    synth::{
        builder::{Vibrato, VoiceGraph, VoiceTopology},
        envelope::{self, EnvelopeShape, FLOOR},
        message::{MessageReceiver, SynthMessage},
        notes::{key_frequency, KeyId},
        observer::{ActiveVoices, VoiceObserver},
        params::{ParamChange, SynthParameters},
        registry::VoiceRegistry,
        teardown::{teardown_delay, SystemClock, TeardownQueue, WallClock},
        voice::{Voice, VoiceState},
    },
};

/*
Voice Lifecycle
===============

Per key:

    Idle ──note_on──→ Sounding ──note_off──→ Releasing ──tick──→ Idle
                         ↑                       │
                         └──────note_on──────────┘  (new, independent voice)

The registry only tracks Sounding voices. note_off hands the voice over to
the teardown queue straight away, so the key is free again while the old
tail is still fading: a fast re-strike sounds at once, on fresh nodes.

Each transition is one atomic backend edit: a renderer sharing the graph
sees a voice either not at all or fully wired with its envelope scheduled,
and a release either not yet or with the live gain already pinned.

Redundant or unmapped input (key repeat, note-off for a key that is not
held, a non-musical key) does nothing and reports `false`. Backend errors
are logged and swallowed; nothing here returns an error to the caller.

Shared Output
-------------

Created once in the constructor and never torn down:

  master gain  every voice's envelope feeds it, it feeds the destination
  lfo          one sine shared by all voices for vibrato, so they stay in
               phase; each voice scales it through its own depth gain
*/

pub struct PolySynth<B: GraphBackend, C: WallClock = SystemClock> {
    backend: B,
    clock: C,
    config: EngineConfig,
    params: SynthParameters,
    master: NodeId,
    lfo: NodeId,
    registry: VoiceRegistry,
    teardowns: TeardownQueue,
    observer: Option<Box<dyn VoiceObserver>>,
}

impl<B: GraphBackend> PolySynth<B> {
    pub fn new(backend: B, config: EngineConfig) -> Result<Self, GraphError> {
        Self::with_clock(backend, config, SystemClock::new())
    }
}

impl<B: GraphBackend, C: WallClock> PolySynth<B, C> {
    /// Create the shared output stage on `backend`, using `clock` for
    /// deferred teardown.
    pub fn with_clock(mut backend: B, config: EngineConfig, clock: C) -> Result<Self, GraphError> {
        let params = SynthParameters::default();
        let now = backend.current_time();
        let destination = backend.destination();

        let master = backend.create_gain();
        backend.set_value_at_time(ParamId::gain(master), config.master_level, now)?;
        backend.connect(master, destination)?;

        let lfo = backend.create_oscillator(OscillatorWaveform::Sine);
        backend.set_value_at_time(ParamId::frequency(lfo), params.lfo_rate, now)?;
        backend.start(lfo, now)?;

        debug!(?config, "synth ready");

        Ok(Self {
            backend,
            clock,
            config,
            params,
            master,
            lfo,
            registry: VoiceRegistry::new(),
            teardowns: TeardownQueue::new(),
            observer: None,
        })
    }

    pub fn params(&self) -> &SynthParameters {
        &self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The master gain all voices feed into.
    pub fn master(&self) -> NodeId {
        self.master
    }

    /// The shared vibrato LFO.
    pub fn lfo(&self) -> NodeId {
        self.lfo
    }

    /// Apply one setter of the parameter surface.
    ///
    /// LFO rate and master level take effect immediately on the shared
    /// output; everything else is picked up by the next note-on.
    pub fn set_param(&mut self, change: ParamChange) {
        match change {
            ParamChange::MasterLevel(level) => {
                self.config.master_level = level;
                let param = ParamId::gain(self.master);
                self.backend.atomically(|graph| retune(graph, param, level));
            }
            ParamChange::LfoRate(rate) => {
                self.params.apply(change);
                let param = ParamId::frequency(self.lfo);
                self.backend.atomically(|graph| retune(graph, param, rate));
            }
            _ => {
                self.params.apply(change);
            }
        }
        trace!(?change, "parameter changed");
    }

    /// Install the hook told about every change to the active voices.
    pub fn set_observer(&mut self, observer: impl VoiceObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Start a voice for `key`. Returns `false` if the key is already
    /// sounding, is not on the keyboard, or the graph could not be built.
    pub fn note_on(&mut self, key: KeyId) -> bool {
        if !self.registry.try_acquire(key) {
            trace!(%key, "already sounding");
            return false;
        }
        let Some(frequency) = key_frequency(key) else {
            return false;
        };

        // Snapshot: later parameter changes must not reach this voice
        let params = self.params;
        let master = self.master;
        let vibrato = Vibrato {
            lfo: self.lfo,
            depth: params.lfo_depth,
        };
        let peak = self.config.voice_gain();

        let started = self
            .backend
            .atomically(|graph| start_voice(graph, master, frequency, &params, vibrato, peak));
        let (graph, now) = match started {
            Ok(started) => started,
            Err(err) => {
                warn!(%key, %err, "failed to start voice");
                return false;
            }
        };

        self.registry.register(Voice::new(key, frequency, graph, now));
        debug!(%key, frequency, mode = %params.mode, "voice started");

        let count = self.registry.count();
        if count > self.config.headroom_voices {
            debug!(
                count,
                headroom = self.config.headroom_voices,
                "voice count exceeds headroom target"
            );
        }

        self.notify();
        true
    }

    /// Release `key` with the configured release time.
    pub fn note_off(&mut self, key: KeyId) -> bool {
        self.release_voice(key, false)
    }

    /// Release the sounding voice for `key`. `immediate` uses the short
    /// panic release instead of the configured one.
    ///
    /// The key is free for a new note-on as soon as this returns.
    pub fn release_voice(&mut self, key: KeyId, immediate: bool) -> bool {
        let Some(voice) = self.registry.release(key) else {
            return false;
        };

        let release = if immediate {
            self.config.panic_release
        } else {
            self.params.release
        };
        let (now, deadline) = self.backend.atomically(|graph| {
            let now = graph.current_time();
            let deadline = release_envelope(graph, voice.envelope(), release, now);
            stop_all(graph, voice.oscillators(), deadline);
            (now, deadline)
        });

        let due = self.clock.now() + teardown_delay(deadline, now, self.config.teardown_margin);
        debug!(%key, release, deadline, ?due, "voice released");

        self.teardowns.schedule(key, deadline, due, voice.into_graph());
        self.notify();
        true
    }

    /// Release every sounding voice. Returns how many were released.
    ///
    /// With `immediate`, voices already fading out on a longer release are
    /// cut short as well.
    pub fn release_all(&mut self, immediate: bool) -> usize {
        if immediate {
            self.hasten_teardowns();
        }
        let keys: Vec<KeyId> = self.registry.active_ids().collect();
        keys.into_iter()
            .filter(|&key| self.release_voice(key, immediate))
            .count()
    }

    /// Silence everything quickly, e.g. when input focus is lost.
    pub fn panic(&mut self) -> usize {
        let released = self.release_all(true);
        debug!(released, "panic");
        released
    }

    /// Disconnect the graphs of released voices whose teardown is due.
    /// Returns how many voices were torn down.
    pub fn tick(&mut self) -> usize {
        let due = self.teardowns.take_due(self.clock.now());
        if due.is_empty() {
            return 0;
        }
        self.backend.atomically(|graph| {
            for pending in &due {
                disconnect_all(graph, pending.graph.nodes());
                debug!(key = %pending.key, "voice torn down");
            }
        });
        due.len()
    }

    pub fn state(&self, key: KeyId) -> VoiceState {
        if self.registry.get(key).is_some() {
            VoiceState::Sounding
        } else if self.teardowns.is_pending(key) {
            VoiceState::Releasing
        } else {
            VoiceState::Idle
        }
    }

    pub fn voice(&self, key: KeyId) -> Option<&Voice> {
        self.registry.get(key)
    }

    pub fn active_voices(&self) -> ActiveVoices {
        ActiveVoices::from_registry(&self.registry)
    }

    pub fn active_count(&self) -> usize {
        self.registry.count()
    }

    /// Released voices whose graph is still connected.
    pub fn pending_teardowns(&self) -> usize {
        self.teardowns.len()
    }

    /// Handle every queued control message. Returns how many were handled.
    pub fn process_messages<R: MessageReceiver>(&mut self, rx: &mut R) -> usize {
        let mut handled = 0;
        while let Some(message) = rx.pop() {
            match message {
                SynthMessage::NoteOn { key } => {
                    self.note_on(key);
                }
                SynthMessage::NoteOff { key } => {
                    self.note_off(key);
                }
                SynthMessage::Panic => {
                    self.panic();
                }
                SynthMessage::Param(change) => self.set_param(change),
            }
            handled += 1;
        }
        handled
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            let active = ActiveVoices::from_registry(&self.registry);
            observer.voices_changed(&active);
        }
    }

    /// Re-release fading voices whose deadline is later than a panic
    /// release started now would give.
    fn hasten_teardowns(&mut self) {
        let release = self.config.panic_release;
        let margin = self.config.teardown_margin;
        let wall_now = self.clock.now();
        let teardowns = &mut self.teardowns;

        self.backend.atomically(|graph| {
            let now = graph.current_time();
            let deadline = envelope::stop_deadline(release, now);
            let due = wall_now + teardown_delay(deadline, now, margin);

            for pending in teardowns.iter_mut() {
                if pending.deadline <= deadline {
                    continue;
                }
                release_envelope(graph, pending.graph.envelope, release, now);
                stop_all(graph, &pending.graph.oscillators, deadline);
                pending.deadline = deadline;
                pending.due = pending.due.min(due);
                trace!(key = %pending.key, deadline, "release cut short");
            }
        });
    }
}

/// Build a voice and shape its envelope. On failure nothing of the voice is
/// left in the graph. Returns the graph and the audio time it started at.
fn start_voice<B: GraphBackend + ?Sized>(
    backend: &mut B,
    output: NodeId,
    frequency: f32,
    params: &SynthParameters,
    vibrato: Vibrato,
    peak: f32,
) -> Result<(VoiceGraph, f64), GraphError> {
    let now = backend.current_time();
    let graph = VoiceTopology::from_params(params).build(
        backend,
        output,
        frequency,
        params.waveform,
        Some(vibrato),
        now,
    )?;

    let shape = EnvelopeShape::from_params(params);
    if let Err(err) =
        envelope::apply_attack_decay_sustain(backend, graph.envelope, peak, &shape, now)
    {
        disconnect_all(backend, graph.nodes());
        return Err(err);
    }
    Ok((graph, now))
}

/// Start a release from the envelope's live gain. Returns the stop deadline.
fn release_envelope<B: GraphBackend + ?Sized>(
    backend: &mut B,
    envelope: NodeId,
    release: f64,
    now: f64,
) -> f64 {
    let current = backend
        .param_value(ParamId::gain(envelope))
        .unwrap_or_else(|err| {
            warn!(%envelope, %err, "could not read envelope gain");
            FLOOR
        });

    envelope::apply_release(backend, envelope, current, release, now).unwrap_or_else(|err| {
        warn!(%envelope, %err, "failed to schedule release");
        envelope::stop_deadline(release, now)
    })
}

fn stop_all<B: GraphBackend + ?Sized>(backend: &mut B, oscillators: &[NodeId], when: f64) {
    for &osc in oscillators {
        // The backend may have stopped it on its own already
        if let Err(err) = backend.stop(osc, when) {
            trace!(%osc, %err, "ignoring stop failure");
        }
    }
}

fn disconnect_all<B: GraphBackend + ?Sized>(backend: &mut B, nodes: impl Iterator<Item = NodeId>) {
    for node in nodes {
        if let Err(err) = backend.disconnect(node) {
            trace!(%node, %err, "ignoring disconnect failure");
        }
    }
}

/// Jump a shared-stage parameter to `value` from `now` on.
fn retune<B: GraphBackend + ?Sized>(backend: &mut B, param: ParamId, value: f32) {
    let now = backend.current_time();
    let result = backend
        .cancel_scheduled_values(param, now)
        .and_then(|()| backend.set_value_at_time(param, value, now));
    if let Err(err) = result {
        warn!(node = %param.node, %err, "failed to update shared stage");
    }
}
