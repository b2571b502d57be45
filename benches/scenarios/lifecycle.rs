//! Benchmarks for note-on/note-off churn on the control side.
//!
//! Models fast playing: every iteration strikes and releases a key, renders
//! one block and runs due teardowns, so the graph keeps growing and
//! shrinking.

use std::hint::black_box;

use criterion::Criterion;
use keysynth::{
    synth::{ManualClock, KEYBOARD},
    EngineConfig, PolySynth, RenderGraph,
};

use crate::SAMPLE_RATE;

pub fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/lifecycle");

    let clock = ManualClock::new();
    let mut synth = PolySynth::with_clock(
        RenderGraph::new(SAMPLE_RATE),
        EngineConfig::default(),
        clock.clone(),
    )
    .expect("output stage");
    let mut buffer = vec![0.0f32; 128];
    let block = std::time::Duration::from_secs_f64(128.0 / SAMPLE_RATE as f64);
    let mut keys = KEYBOARD.iter().copied().cycle();

    group.bench_function("strike_release_render", |b| {
        b.iter(|| {
            let key = keys.next().unwrap_or('Z');
            synth.note_on(black_box(key));
            synth.backend_mut().render(&mut buffer);
            synth.note_off(key);
            clock.advance(block);
            black_box(synth.tick());
        })
    });

    group.finish();
}
