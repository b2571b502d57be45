use crate::error::GraphError;

/*
Parameter Automation
====================

A parameter (a gain, an oscillator frequency) is not a single number but a
timeline: a list of time-stamped events that together describe its value at
any instant. This is how envelopes are expressed without touching every
sample from the control side: the control thread schedules a handful of
events, the renderer evaluates the timeline once per sample.

Vocabulary
----------

  intrinsic value   The value the timeline describes, before any audio-rate
                    inputs (FM, vibrato) are summed on top by the graph.

  default value     What the parameter reads before its first event.

  event time        SetValue and SetTarget happen at their `time`. Ramps are
                    stamped with their END time and begin wherever the
                    previous event left off.


The Four Primitives
-------------------

  SetValue        jump to `value` at `time`

  LinearRamp      straight line from the previous (time, value) to
                  (end_time, value)

  ExponentialRamp geometric curve from the previous (time, value) to
                  (end_time, value):

                      v(t) = v0 · (v1 / v0) ^ ((t − t0) / (t1 − t0))

                  Undefined when either end is zero or the signs differ, so
                  targets must be strictly positive. This is why envelopes
                  use a tiny floor instead of true silence.

  SetTarget       first-order approach towards `target` from `start_time`:

                      v(t) = target + (v0 − target) · e^(−(t − t0) / τ)

                  It never arrives. After 5τ it has covered ~99.3% of the
                  distance, which is where callers usually call it done.


Cancellation
------------

cancel_from(t) drops every event stamped at or after t. A ramp that is
halfway through has an end time in the future, so it is dropped too and the
value snaps back to whatever the previous event said. Callers that cancel
mid-curve must read the live value first and pin it with a SetValue, or the
output jumps.


Evaluation
----------

value_at(t) walks the events in order, keeping the current "segment" (a held
value or a running SetTarget curve). Events at or before t update the
segment; the first ramp that ends after t is interpolated; the first
non-ramp event after t stops the walk.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    SetValue {
        value: f32,
        time: f64,
    },
    LinearRamp {
        value: f32,
        end_time: f64,
    },
    ExponentialRamp {
        value: f32,
        end_time: f64,
    },
    SetTarget {
        target: f32,
        start_time: f64,
        time_constant: f64,
    },
}

impl AutomationEvent {
    /// The time this event is ordered by (end time for ramps).
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::LinearRamp { end_time, .. } => end_time,
            AutomationEvent::ExponentialRamp { end_time, .. } => end_time,
            AutomationEvent::SetTarget { start_time, .. } => start_time,
        }
    }

    /// Target value and curve of a ramp event, `None` for the others.
    fn ramp(&self) -> Option<(f32, Curve)> {
        match *self {
            AutomationEvent::LinearRamp { value, .. } => Some((value, Curve::Linear)),
            AutomationEvent::ExponentialRamp { value, .. } => Some((value, Curve::Exponential)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curve {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Hold(f32),
    Target {
        from: f32,
        target: f32,
        start: f64,
        time_constant: f64,
    },
}

impl Segment {
    fn value_at(self, t: f64) -> f32 {
        match self {
            Segment::Hold(value) => value,
            Segment::Target {
                from,
                target,
                start,
                time_constant,
            } => {
                if time_constant <= 0.0 {
                    return target;
                }
                let elapsed = (t - start).max(0.0);
                let decay = (-elapsed / time_constant).exp();
                (target as f64 + (from as f64 - target as f64) * decay) as f32
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    /// Insert an event, keeping the list ordered by time. Events stamped at
    /// the same time keep their insertion order.
    pub fn insert(&mut self, event: AutomationEvent) -> Result<(), GraphError> {
        if let AutomationEvent::ExponentialRamp { value, .. } = event {
            if !(value > 0.0) {
                return Err(GraphError::NonPositiveRampTarget(value));
            }
        }

        let time = event.time();
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
        Ok(())
    }

    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Drop events that can no longer influence values at or after `time`.
    ///
    /// Everything before a SetValue that has already happened is dead, as
    /// long as nothing after it is a ramp reaching back across it.
    pub fn compact(&mut self, time: f64) {
        let keep_from = self
            .events
            .iter()
            .rposition(|e| matches!(e, AutomationEvent::SetValue { time: at, .. } if *at <= time));

        if let Some(index) = keep_from {
            if index > 0 {
                self.events.drain(..index);
            }
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let mut segment = Segment::Hold(self.default_value);
        let mut last_time = 0.0_f64;

        for event in &self.events {
            if let Some((value, curve)) = event.ramp() {
                let start_value = segment.value_at(last_time);
                let end_time = event.time();

                if t < end_time {
                    let span = end_time - last_time;
                    let progress = if span > 0.0 {
                        ((t - last_time) / span).clamp(0.0, 1.0)
                    } else {
                        1.0
                    };
                    return match curve {
                        Curve::Linear => start_value + (value - start_value) * progress as f32,
                        Curve::Exponential => exponential_interpolate(start_value, value, progress),
                    };
                }

                segment = Segment::Hold(value);
                last_time = end_time;
                continue;
            }

            match *event {
                AutomationEvent::SetValue { value, time } => {
                    if time > t {
                        break;
                    }
                    segment = Segment::Hold(value);
                    last_time = time;
                }
                AutomationEvent::SetTarget {
                    target,
                    start_time,
                    time_constant,
                } => {
                    if start_time > t {
                        break;
                    }
                    segment = Segment::Target {
                        from: segment.value_at(start_time),
                        target,
                        start: start_time,
                        time_constant,
                    };
                    last_time = start_time;
                }
                _ => {}
            }
        }

        segment.value_at(t)
    }
}

#[inline]
fn exponential_interpolate(from: f32, to: f32, progress: f64) -> f32 {
    // Geometric interpolation needs both ends on the same side of zero
    if from <= 0.0 || to <= 0.0 {
        return from;
    }
    let ratio = to as f64 / from as f64;
    (from as f64 * ratio.powf(progress)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn reads_default_before_any_event() {
        let timeline = ParamTimeline::new(440.0);
        assert_eq!(timeline.value_at(3.0), 440.0);
    }

    #[test]
    fn set_value_applies_from_its_time() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 0.5, time: 1.0 })
            .unwrap();
        assert_eq!(timeline.value_at(0.5), 1.0);
        assert_eq!(timeline.value_at(1.0), 0.5);
        assert_eq!(timeline.value_at(2.0), 0.5);
    }

    #[test]
    fn linear_ramp_starts_at_previous_event() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 0.0, time: 1.0 })
            .unwrap();
        timeline
            .insert(AutomationEvent::LinearRamp { value: 1.0, end_time: 2.0 })
            .unwrap();
        assert!(close(timeline.value_at(1.5), 0.5));
        assert!(close(timeline.value_at(2.5), 1.0));
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 0.01, time: 0.0 })
            .unwrap();
        timeline
            .insert(AutomationEvent::ExponentialRamp { value: 1.0, end_time: 1.0 })
            .unwrap();
        // Halfway in time is the geometric mean of the endpoints
        assert!(close(timeline.value_at(0.5), 0.1));
    }

    #[test]
    fn exponential_ramp_rejects_zero_target() {
        let mut timeline = ParamTimeline::new(1.0);
        let err = timeline
            .insert(AutomationEvent::ExponentialRamp { value: 0.0, end_time: 1.0 })
            .unwrap_err();
        assert_eq!(err, GraphError::NonPositiveRampTarget(0.0));
        assert!(timeline.events().is_empty());
    }

    #[test]
    fn zero_length_ramp_jumps_to_target() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 0.001, time: 1.0 })
            .unwrap();
        timeline
            .insert(AutomationEvent::ExponentialRamp { value: 0.5, end_time: 1.0 })
            .unwrap();
        assert_eq!(timeline.value_at(1.0), 0.5);
    }

    #[test]
    fn set_target_decays_from_current_value() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 1.0, time: 0.0 })
            .unwrap();
        timeline
            .insert(AutomationEvent::SetTarget {
                target: 0.0,
                start_time: 1.0,
                time_constant: 0.5,
            })
            .unwrap();

        assert_eq!(timeline.value_at(1.0), 1.0);
        let one_tau = timeline.value_at(1.5);
        assert!(close(one_tau, (-1.0f32).exp()), "got {one_tau}");
        assert!(timeline.value_at(3.5) < 0.01);
    }

    #[test]
    fn cancel_drops_ramp_in_progress() {
        let mut timeline = ParamTimeline::new(1.0);
        timeline
            .insert(AutomationEvent::SetValue { value: 0.0, time: 0.0 })
            .unwrap();
        timeline
            .insert(AutomationEvent::LinearRamp { value: 1.0, end_time: 2.0 })
            .unwrap();

        timeline.cancel_from(1.0);

        // The ramp ended after the cancel time, so it is gone entirely
        assert_eq!(timeline.events().len(), 1);
        assert_eq!(timeline.value_at(1.5), 0.0);
    }

    #[test]
    fn compact_keeps_latest_past_set_value() {
        let mut timeline = ParamTimeline::new(5.0);
        for (i, value) in [4.0, 6.0, 7.0].into_iter().enumerate() {
            timeline
                .insert(AutomationEvent::SetValue { value, time: i as f64 })
                .unwrap();
        }
        timeline.compact(1.5);
        assert_eq!(timeline.events().len(), 2);
        assert_eq!(timeline.value_at(1.6), 6.0);
        assert_eq!(timeline.value_at(2.0), 7.0);
    }
}
