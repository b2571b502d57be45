//! Benchmarks for automation timeline evaluation.
//!
//! The render graph evaluates every automated parameter once per sample, so
//! `value_at` sits on the hot path of every voice.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keysynth::dsp::automation::{AutomationEvent, ParamTimeline};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

/// An envelope as a voice schedules it: attack, decay, then a release
fn envelope_timeline() -> ParamTimeline {
    let mut timeline = ParamTimeline::new(1.0);
    let events = [
        AutomationEvent::SetValue { value: 0.0001, time: 0.0 },
        AutomationEvent::ExponentialRamp { value: 0.125, end_time: 0.05 },
        AutomationEvent::ExponentialRamp { value: 0.0375, end_time: 0.25 },
        AutomationEvent::SetValue { value: 0.0375, time: 0.3 },
        AutomationEvent::SetTarget { target: 0.0001, start_time: 0.3, time_constant: 0.05 },
    ];
    for event in events {
        timeline.insert(event).expect("valid envelope event");
    }
    timeline
}

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");
    let timeline = envelope_timeline();
    let dt = 1.0 / SAMPLE_RATE as f64;

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Segment lookups in each phase of the envelope
        for (name, start) in [("attack", 0.01), ("decay", 0.1), ("release", 0.4)] {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for (i, sample) in buffer.iter_mut().enumerate() {
                        *sample = timeline.value_at(black_box(start + i as f64 * dt));
                    }
                    black_box(&buffer);
                })
            });
        }
    }

    group.finish();
}
