//! Benchmarks for rendering held chords.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::{
    synth::{ParamChange, SynthMode},
    EngineConfig, PolySynth, RenderGraph,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

/// C major triad plus the octave
const CHORD: [char; 4] = ['Z', 'C', 'B', 'Q'];

fn held_chord(mode: SynthMode, vibrato: bool) -> PolySynth<RenderGraph> {
    let mut synth = PolySynth::new(RenderGraph::new(SAMPLE_RATE), EngineConfig::default())
        .expect("output stage");
    synth.set_param(ParamChange::Mode(mode));
    if vibrato {
        synth.set_param(ParamChange::LfoDepth(0.5));
    }
    for key in CHORD {
        synth.note_on(key);
    }
    synth
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for mode in SynthMode::ALL {
            // === PLAIN CHORD ===
            let mut synth = held_chord(mode, false);
            group.bench_with_input(BenchmarkId::new(mode.name(), size), &size, |b, _| {
                b.iter(|| {
                    synth.backend_mut().render(black_box(&mut buffer));
                })
            });

            // === WITH VIBRATO ===
            // Adds the shared LFO and one param input per voice
            let mut synth = held_chord(mode, true);
            let name = format!("{}_vibrato", mode.name());
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    synth.backend_mut().render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
