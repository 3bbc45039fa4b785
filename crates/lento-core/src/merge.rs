//! Curve merge engine: one parameter set, one block.
//!
//! Three curves are walked in lockstep over offset space:
//!
//! - the **target** curve (`In`), which the output moves toward,
//! - the **speed** curve (`Slowness`), which bounds how fast it may move,
//! - the **override** curve (`Out`), host-supplied points on the very curve
//!   being produced.
//!
//! An emission cursor starts at offset -1 with the previous block's output
//! value and only ever moves forward. The override curve splits the block
//! into intervals. An override point that moves the output is honored
//! verbatim. Everything else is free for smoothing, where the interval is cut
//! further at every target and speed point into sub-steps on which both
//! curves are linear. On each sub-step the output slews toward the target at
//! no more than the slope model allows, lands exactly on the intersection
//! when it catches a moving target, and from there follows the target's own
//! slope clamped to the same bound.
//!
//! Each committed transition also drives the step event emitter, so the
//! discrete stream traces the same path as the curve.
//!
//! A full output sink never stops the merge. The refused points are counted
//! and the state and step events still advance.

use crate::curve::{CurveSink, CurveSource};
use crate::cursor::{OverrideCursor, OverrideSpan, SegmentCursor};
use crate::error::EngineError;
use crate::interpolate::interpolate;
use crate::param_set::{ParamId, ParamOffset, ParamSet, constrain};
use crate::slope::max_slope;
use crate::step_event::{EventSink, StepEvent, emit_ramp, quantize};

/// Curves supplied for one parameter set in one block.
#[derive(Clone, Copy, Default)]
pub(crate) struct SetCurves<'a> {
    pub(crate) target: Option<&'a dyn CurveSource>,
    pub(crate) overrides: Option<&'a dyn CurveSource>,
    pub(crate) speed: Option<&'a dyn CurveSource>,
}

/// Block-wide constants for a merge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MergeParams {
    pub(crate) set: usize,
    pub(crate) last_offset: i32,
    pub(crate) sample_rate: f64,
    pub(crate) half_life_secs: f64,
    pub(crate) epsilon: f64,
    pub(crate) controller: u8,
    pub(crate) initial_flush: bool,
}

/// Writes committed output points and their step events.
struct Emitter<'s, 'e> {
    sink: Option<&'s mut dyn CurveSink>,
    events: &'e mut dyn EventSink,
    controller: u8,
    x0: i32,
    y0: f64,
    refused: usize,
}

impl Emitter<'_, '_> {
    /// Move the emission cursor to `(x, y)`, sending the step events of the
    /// transition and, if `write_point`, the curve point.
    fn commit(&mut self, x: i32, y: f64, write_point: bool) -> usize {
        let sent = emit_ramp(&mut *self.events, self.x0, self.y0, x, y, self.controller);
        if write_point
            && let Some(sink) = self.sink.as_deref_mut()
            && sink.add_point(x, y).is_err()
        {
            self.refused += 1;
        }
        self.x0 = x;
        self.y0 = y;
        sent
    }

    /// Report the current level at offset 0 unless the transition into
    /// offset 0 already did.
    fn flush_initial(&mut self, sent: usize) {
        if sent == 0 {
            self.events
                .send(StepEvent::new(0, self.controller, quantize(self.y0)));
        }
    }
}

/// Run the merge for one parameter set, updating `state` in place.
///
/// Returns the number of output points the sink refused. On error `state`
/// may be partially updated; callers run this on a copy.
pub(crate) fn merge_set(
    state: &mut ParamSet,
    curves: SetCurves<'_>,
    params: &MergeParams,
    sink: Option<&mut dyn CurveSink>,
    events: &mut dyn EventSink,
) -> Result<usize, EngineError> {
    let set = params.set;
    let last = params.last_offset;
    let epsilon = params.epsilon;

    let mut target = SegmentCursor::new(
        curves.target,
        ParamId::new(set, ParamOffset::In),
        state.input(),
        last,
    )?;
    let mut speed = SegmentCursor::new(
        curves.speed,
        ParamId::new(set, ParamOffset::Slowness),
        state.slowness(),
        last,
    )?;
    let mut overrides =
        OverrideCursor::new(curves.overrides, ParamId::new(set, ParamOffset::Out), last);
    let mut emitter = Emitter {
        sink,
        events,
        controller: params.controller,
        x0: -1,
        y0: state.output(),
        refused: 0,
    };
    let mut flush_pending = params.initial_flush;

    while emitter.x0 < last {
        let interval_end = match overrides.next_span(emitter.y0, epsilon)? {
            Some(OverrideSpan::Override { offset, value }) => {
                if flush_pending && offset > 0 {
                    let at_zero = interpolate(
                        f64::from(emitter.x0),
                        emitter.y0,
                        f64::from(offset),
                        value,
                        0.0,
                    );
                    let sent = emitter.commit(0, at_zero, true);
                    emitter.flush_initial(sent);
                    flush_pending = false;
                }
                let sent = emitter.commit(offset, value, true);
                if flush_pending {
                    emitter.flush_initial(sent);
                    flush_pending = false;
                }
                continue;
            }
            Some(OverrideSpan::Restated { end }) => end,
            None => last,
        };

        while emitter.x0 < interval_end {
            let x0 = emitter.x0;
            target.seek(x0)?;
            speed.seek(x0)?;

            let mut x = interval_end;
            if let Some(end) = target.segment_end() {
                x = x.min(end);
            }
            if let Some(end) = speed.segment_end() {
                x = x.min(end);
            }
            let forced = flush_pending && x0 < 0;
            if forced {
                x = x.min(0);
            }

            let rate = max_slope(
                speed.value_at(f64::from(x0)),
                params.sample_rate,
                params.half_life_secs,
            )?;
            let in_y0 = target.value_at(f64::from(x0));
            let in_y1 = target.value_at(f64::from(x));
            let in_slope = (in_y1 - in_y0) / f64::from(x - x0);

            let mut start = x0;
            let diff = in_y0 - emitter.y0;
            if diff.abs() > epsilon {
                let out_slope = rate.copysign(diff);
                // Parallel lines never meet; fall through to the bounded move.
                if out_slope != in_slope {
                    let meet = f64::from(x0) + (diff / (out_slope - in_slope)).round();
                    if f64::from(x0) < meet && meet < f64::from(x) {
                        let meet = meet as i32;
                        let caught = constrain(emitter.y0 + out_slope * f64::from(meet - x0));
                        emitter.commit(meet, caught, true);
                        start = meet;
                    }
                }
            }

            let reach = rate * f64::from(x - start);
            let out_y1 = constrain(in_y1.clamp(emitter.y0 - reach, emitter.y0 + reach));

            let flat_tail = x == last && (out_y1 - emitter.y0).abs() <= epsilon;
            let sent = emitter.commit(x, out_y1, forced || !flat_tail);
            if forced && x == 0 {
                emitter.flush_initial(sent);
                flush_pending = false;
            }
        }
    }

    state.set_input(target.finish(last)?);
    state.set_slowness(speed.finish(last)?);
    state.set_output(emitter.y0);
    Ok(emitter.refused)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{AutomationPoint, PointQueue};
    use crate::step_event::EventBuffer;

    fn params(num_samples: i32) -> MergeParams {
        MergeParams {
            set: 0,
            last_offset: num_samples - 1,
            sample_rate: 48000.0,
            half_life_secs: 2.0,
            epsilon: 1e-5,
            controller: 90,
            initial_flush: false,
        }
    }

    fn curve(raw: &[(i32, f64)]) -> Vec<AutomationPoint> {
        raw.iter().map(|&(x, y)| AutomationPoint::new(x, y)).collect()
    }

    fn run(
        state: &mut ParamSet,
        curves: SetCurves<'_>,
        params: &MergeParams,
    ) -> (Vec<AutomationPoint>, Vec<StepEvent>) {
        let mut queue = PointQueue::with_capacity(256);
        let mut events = EventBuffer::with_capacity(1024);
        merge_set(state, curves, params, Some(&mut queue), &mut events).unwrap();
        (queue.points().to_vec(), events.events().to_vec())
    }

    #[test]
    fn instant_tracking_jumps_in_one_sample() {
        let mut state = ParamSet::new(0.0, 0.0, 0.0);
        let target = curve(&[(0, 1.0)]);
        let curves = SetCurves {
            target: Some(&target),
            ..SetCurves::default()
        };
        let (points, events) = run(&mut state, curves, &params(100));

        assert_eq!(points, vec![AutomationPoint::new(0, 1.0)]);
        assert_eq!(events, vec![StepEvent::new(0, 90, 127)]);
        assert_eq!(state.to_array(), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn settled_output_emits_nothing() {
        let mut state = ParamSet::new(0.5, 0.5, 0.5);
        let (points, events) = run(&mut state, SetCurves::default(), &params(100));
        assert!(points.is_empty());
        assert!(events.is_empty());
        assert_eq!(state.output(), 0.5);
    }

    #[test]
    fn frozen_output_never_moves() {
        let mut state = ParamSet::new(0.5, 0.5, 1.0);
        let target = curve(&[(10, 0.0), (40, 1.0), (70, 0.2)]);
        let curves = SetCurves {
            target: Some(&target),
            ..SetCurves::default()
        };
        let (points, events) = run(&mut state, curves, &params(100));

        assert!(points.iter().all(|p| p.value == 0.5));
        assert!(events.is_empty());
        assert_eq!(state.output(), 0.5);
        assert_eq!(state.input(), 0.2);
    }

    #[test]
    fn slew_respects_max_slope() {
        // Slowness chosen so the full range takes 100 samples.
        let sample_rate = 48000.0;
        let mut p = params(64);
        p.half_life_secs = 100.0 / sample_rate;
        let mut state = ParamSet::new(0.0, 0.0, 0.5);
        let target = curve(&[(0, 1.0)]);
        let curves = SetCurves {
            target: Some(&target),
            ..SetCurves::default()
        };
        let (points, _) = run(&mut state, curves, &p);

        let rate = 0.01;
        let mut previous = AutomationPoint::new(-1, 0.0);
        for point in &points {
            let dx = f64::from(point.offset - previous.offset);
            assert!((point.value - previous.value).abs() <= rate * dx + 1e-12);
            previous = *point;
        }
        assert!((state.output() - 0.64).abs() < 1e-9, "got {}", state.output());
    }

    #[test]
    fn catches_moving_target_at_intersection() {
        // Output at 0 slews up at 0.01/sample, target ramps slowly from 0.2.
        let mut p = params(100);
        p.half_life_secs = 100.0 / p.sample_rate;
        let mut state = ParamSet::new(0.2, 0.0, 0.5);
        let target = curve(&[(99, 0.3)]);
        let curves = SetCurves {
            target: Some(&target),
            ..SetCurves::default()
        };
        let (points, _) = run(&mut state, curves, &p);

        // Lines meet where 0.01 * t = 0.2 + 0.001 * t, i.e. t = 22.2 samples.
        assert!(points.len() >= 2);
        assert_eq!(points[0].offset, 21);
        let end = points.last().unwrap();
        assert_eq!(end.offset, 99);
        assert!((end.value - 0.3).abs() < 1e-3, "got {}", end.value);
    }

    #[test]
    fn override_wins_verbatim() {
        let mut state = ParamSet::new(0.3, 0.3, 0.5);
        let overrides = curve(&[(50, 0.9)]);
        let curves = SetCurves {
            overrides: Some(&overrides),
            ..SetCurves::default()
        };
        let (points, events) = run(&mut state, curves, &params(100));

        assert_eq!(points[0], AutomationPoint::new(50, 0.9));
        assert_eq!(events.last().unwrap(), &StepEvent::new(50, 90, quantize(0.9)));
        assert_eq!(events.first().unwrap().level, quantize(0.3) + 1);
        // Smoothing then pulls the output back toward the 0.3 target.
        assert!(state.output() < 0.9);
    }

    #[test]
    fn restated_overrides_emit_no_events() {
        let mut state = ParamSet::new(0.4, 0.4, 0.5);
        let overrides = curve(&[(10, 0.4), (20, 0.4), (30, 0.400001), (40, 0.4)]);
        let curves = SetCurves {
            overrides: Some(&overrides),
            ..SetCurves::default()
        };
        let (_, events) = run(&mut state, curves, &params(100));
        assert!(events.is_empty());
        assert_eq!(state.output(), 0.4);
    }

    #[test]
    fn initial_flush_reports_unchanged_value() {
        let mut p = params(100);
        p.initial_flush = true;
        let mut state = ParamSet::new(0.5, 0.5, 0.5);
        let (points, events) = run(&mut state, SetCurves::default(), &p);

        assert_eq!(points, vec![AutomationPoint::new(0, 0.5)]);
        assert_eq!(events, vec![StepEvent::new(0, 90, 64)]);
    }

    #[test]
    fn initial_flush_before_late_override() {
        let mut p = params(100);
        p.initial_flush = true;
        let mut state = ParamSet::new(0.0, 0.0, 1.0);
        let overrides = curve(&[(9, 1.0)]);
        let curves = SetCurves {
            overrides: Some(&overrides),
            ..SetCurves::default()
        };
        let (points, events) = run(&mut state, curves, &p);

        assert_eq!(points[0], AutomationPoint::new(0, 0.1));
        assert_eq!(points[1], AutomationPoint::new(9, 1.0));
        assert_eq!(events[0].offset, 0);
    }

    #[test]
    fn speed_curve_changes_rate_mid_block() {
        let mut state = ParamSet::new(1.0, 0.0, 1.0);
        let speed = curve(&[(49, 1.0), (50, 0.0)]);
        let curves = SetCurves {
            speed: Some(&speed),
            ..SetCurves::default()
        };
        let (points, _) = run(&mut state, curves, &params(100));

        // The step from 49 to 50 still runs at slowness 1; the jump starts at 50.
        assert!(points.iter().filter(|p| p.offset <= 50).all(|p| p.value == 0.0));
        assert!(points.contains(&AutomationPoint::new(51, 1.0)));
        assert_eq!(state.output(), 1.0);
        assert_eq!(state.slowness(), 0.0);
    }

    #[test]
    fn rate_comes_from_slowness_at_step_start() {
        // Frozen at the start of the block, instant only at the last sample.
        let mut state = ParamSet::new(1.0, 0.0, 1.0);
        let speed = curve(&[(99, 0.0)]);
        let curves = SetCurves {
            speed: Some(&speed),
            ..SetCurves::default()
        };
        let (points, events) = run(&mut state, curves, &params(100));

        // One sub-step covers the whole block and starts frozen.
        assert!(points.is_empty(), "{points:?}");
        assert!(events.is_empty());
        assert_eq!(state.output(), 0.0);
        assert_eq!(state.slowness(), 0.0);
    }

    #[test]
    fn full_queue_keeps_smoothing() {
        let mut state = ParamSet::new(0.0, 0.0, 0.0);
        let target = curve(&[(0, 1.0), (1, 0.0), (2, 1.0)]);
        let curves = SetCurves {
            target: Some(&target),
            ..SetCurves::default()
        };
        let mut queue = PointQueue::with_capacity(1);
        let mut events = EventBuffer::with_capacity(16);
        let refused =
            merge_set(&mut state, curves, &params(10), Some(&mut queue), &mut events).unwrap();

        assert_eq!(refused, 2);
        assert_eq!(queue.points(), &[AutomationPoint::new(2, 1.0)]);
        assert_eq!(queue.dropped(), 2);
        let levels: Vec<u8> = events.events().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![127, 0, 127]);
        assert_eq!(state.output(), 1.0);
    }
}
