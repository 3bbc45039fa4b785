//! Integration tests for lento-core block processing.
//!
//! Drives [`Smoother`] through whole blocks the way a host would: curves in,
//! output curves and step events out, state saved and restored between
//! sessions.

use lento_core::{
    AutomationPoint, BlockInput, BlockOutput, CurveSource, DEFAULT_SLOWNESS, EngineError,
    EventBuffer, OutputChanges, ParamId, ParamOffset, ParamQueue, ParamSet, RECORD_BYTES,
    Smoother, SmootherConfig, StepEvent, max_slope, quantize,
};

const SAMPLE_RATE: f64 = 48000.0;

fn id(set: usize, offset: ParamOffset) -> ParamId {
    ParamId::new(set, offset)
}

/// Processor whose initial flush has already been consumed.
fn settled_smoother(config: SmootherConfig, sets: &[ParamSet]) -> Smoother {
    let mut smoother = Smoother::new(config).unwrap();
    smoother.sets_mut()[..sets.len()].copy_from_slice(sets);
    smoother
        .process(&BlockInput::new(SAMPLE_RATE, 1), &mut BlockOutput::new())
        .unwrap();
    smoother.sets_mut()[..sets.len()].copy_from_slice(sets);
    assert!(!smoother.needs_initial_flush());
    smoother
}

struct Harness {
    changes: OutputChanges,
    events: EventBuffer,
}

impl Harness {
    fn new(config: &SmootherConfig) -> Self {
        Self {
            changes: OutputChanges::new(config),
            events: EventBuffer::with_capacity(config.max_events_per_block),
        }
    }

    fn run(
        &mut self,
        smoother: &mut Smoother,
        num_samples: usize,
        queues: &[ParamQueue<'_>],
    ) -> Result<(), EngineError> {
        self.changes.clear();
        self.events.clear();
        smoother.process(
            &BlockInput::new(SAMPLE_RATE, num_samples).with_changes(queues),
            &mut BlockOutput::new()
                .with_changes(&mut self.changes)
                .with_events(&mut self.events),
        )
    }
}

// ============================================================================
// 1. Reference scenarios
// ============================================================================

#[test]
fn instant_slowness_jumps_to_target() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[ParamSet::new(0.0, 0.0, 0.0)]);
    let mut harness = Harness::new(&config);

    let target = [AutomationPoint::new(0, 1.0)];
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    harness.run(&mut smoother, 100, &queues).unwrap();

    assert_eq!(
        harness.changes.points(id(0, ParamOffset::Out)),
        &[AutomationPoint::new(0, 1.0)]
    );
    assert_eq!(harness.events.events(), &[StepEvent::new(0, 90, 127)]);
    assert_eq!(smoother.sets()[0].output(), 1.0);
}

#[test]
fn constant_target_at_output_stays_put() {
    let config = SmootherConfig::default();
    let settled = ParamSet::new(0.5, 0.5, DEFAULT_SLOWNESS);
    let mut smoother = settled_smoother(config, &[settled]);
    let mut harness = Harness::new(&config);

    let rate = max_slope(DEFAULT_SLOWNESS, SAMPLE_RATE, config.half_life_secs).unwrap();
    assert!((rate - 1.0 / 96000.0).abs() < 1e-12);

    let target = [AutomationPoint::new(0, 0.5), AutomationPoint::new(99, 0.5)];
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    harness.run(&mut smoother, 100, &queues).unwrap();

    assert!(harness.events.is_empty());
    assert!(
        harness
            .changes
            .points(id(0, ParamOffset::Out))
            .iter()
            .all(|p| p.value == 0.5)
    );
    assert_eq!(smoother.sets()[0], settled);
}

#[test]
fn override_point_wins_verbatim() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[ParamSet::new(0.3, 0.3, DEFAULT_SLOWNESS)]);
    let mut harness = Harness::new(&config);

    let overrides = [AutomationPoint::new(50, 0.9)];
    let queues = [ParamQueue::new(id(0, ParamOffset::Out), &overrides)];
    harness.run(&mut smoother, 100, &queues).unwrap();

    let points = harness.changes.points(id(0, ParamOffset::Out));
    assert_eq!(points[0], AutomationPoint::new(50, 0.9));

    let events = harness.events.events();
    let last_ramp = events.iter().rposition(|e| e.offset == 50).unwrap();
    assert_eq!(events[last_ramp].level, quantize(0.9));
    assert!(events[..=last_ramp].windows(2).all(|w| w[0].level < w[1].level));
    assert!(events[..=last_ramp].iter().all(|e| (0..=50).contains(&e.offset)));
}

#[test]
fn sets_are_independent() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(
        config,
        &[
            ParamSet::new(0.0, 0.0, 0.0),
            ParamSet::new(0.0, 0.0, 1.0),
        ],
    );
    let mut harness = Harness::new(&config);

    let target = [AutomationPoint::new(0, 1.0)];
    let queues = [
        ParamQueue::new(id(0, ParamOffset::In), &target),
        ParamQueue::new(id(1, ParamOffset::In), &target),
    ];
    harness.run(&mut smoother, 64, &queues).unwrap();

    assert_eq!(smoother.sets()[0].output(), 1.0);
    assert_eq!(smoother.sets()[1].output(), 0.0);
    assert_eq!(harness.events.for_controller(90).count(), 1);
    assert_eq!(harness.events.for_controller(91).count(), 0);
}

// ============================================================================
// 2. Flush-only blocks
// ============================================================================

#[test]
fn flush_without_curves_is_idempotent() {
    let config = SmootherConfig::default();
    let sets = [
        ParamSet::new(0.1, 0.2, 0.3),
        ParamSet::new(0.9, 0.4, 0.7),
    ];
    let mut smoother = settled_smoother(config, &sets);
    let before = smoother.sets().to_vec();
    let mut harness = Harness::new(&config);

    for _ in 0..3 {
        harness.run(&mut smoother, 0, &[]).unwrap();
        assert_eq!(smoother.sets(), before.as_slice());
        assert!(harness.events.is_empty());
        assert_eq!(harness.changes.changed().count(), 0);
    }
}

#[test]
fn flush_ignores_sample_rate() {
    let mut smoother = Smoother::new(SmootherConfig::default()).unwrap();
    let target = [AutomationPoint::new(0, 0.6)];
    let queues = [ParamQueue::new(id(3, ParamOffset::In), &target)];
    smoother
        .process(
            &BlockInput::new(f64::NAN, 0).with_changes(&queues),
            &mut BlockOutput::new(),
        )
        .unwrap();
    assert_eq!(smoother.sets()[3].input(), 0.6);
}

// ============================================================================
// 3. Failure handling
// ============================================================================

#[test]
fn aborted_block_leaves_state_unchanged() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[ParamSet::new(1.0, 0.0, 0.0)]);
    let before = smoother.sets().to_vec();
    let mut harness = Harness::new(&config);

    let target = [AutomationPoint::new(10, 0.0)];
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    for rate in [0.0, -44100.0, f64::INFINITY] {
        let err = smoother
            .process(
                &BlockInput::new(rate, 64).with_changes(&queues),
                &mut BlockOutput::new()
                    .with_changes(&mut harness.changes)
                    .with_events(&mut harness.events),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSampleRate(_)));
        assert_eq!(smoother.sets(), before.as_slice());
    }
}

#[test]
fn dense_automation_overflows_without_stalling() {
    let config = SmootherConfig {
        max_points_per_block: 2,
        ..SmootherConfig::default()
    };
    let mut smoother = settled_smoother(config, &[ParamSet::new(0.0, 0.0, 0.0)]);
    let mut harness = Harness::new(&config);

    let target = [
        AutomationPoint::new(0, 1.0),
        AutomationPoint::new(1, 0.0),
        AutomationPoint::new(2, 1.0),
        AutomationPoint::new(3, 0.0),
        AutomationPoint::new(4, 1.0),
    ];
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    harness.run(&mut smoother, 16, &queues).unwrap();

    // The queue keeps its first point and ends on the latest one.
    assert_eq!(
        harness.changes.points(id(0, ParamOffset::Out)),
        &[AutomationPoint::new(0, 1.0), AutomationPoint::new(4, 1.0)]
    );
    assert_eq!(smoother.dropped_points(), 3);
    assert_eq!(harness.changes.dropped(), 3);
    let levels: Vec<u8> = harness.events.events().iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![127, 0, 127, 0, 127]);
    assert_eq!(smoother.sets()[0].to_array(), [1.0, 1.0, 0.0]);

    // The next block starts clean.
    harness.run(&mut smoother, 16, &[]).unwrap();
    assert_eq!(smoother.dropped_points(), 0);
}

#[test]
fn long_dense_curve_still_advances_output() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[ParamSet::new(0.0, 0.0, 0.0)]);
    let mut harness = Harness::new(&config);

    let target: Vec<AutomationPoint> = (0..600)
        .map(|i| AutomationPoint::new(i, if i % 2 == 0 { 1.0 } else { 0.5 }))
        .collect();
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    harness.run(&mut smoother, 1024, &queues).unwrap();

    assert!(smoother.dropped_points() > 0);
    assert_eq!(
        harness.changes.points(id(0, ParamOffset::Out)).len(),
        config.max_points_per_block
    );
    assert_eq!(smoother.sets()[0].output(), 0.5);
}

/// Curve whose points past the first cannot be read.
struct Unreadable;

impl CurveSource for Unreadable {
    fn point_count(&self) -> usize {
        4
    }

    fn point(&self, index: usize) -> Option<AutomationPoint> {
        (index == 0).then_some(AutomationPoint::new(0, 0.5))
    }
}

#[test]
fn failed_block_emits_nothing() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(
        config,
        &[ParamSet::new(0.0, 0.0, 0.0), ParamSet::new(0.0, 0.0, 0.0)],
    );
    let before = smoother.sets().to_vec();
    let mut harness = Harness::new(&config);

    let target = [AutomationPoint::new(0, 1.0)];
    let queues = [
        ParamQueue::new(id(0, ParamOffset::In), &target),
        ParamQueue::new(id(1, ParamOffset::In), &Unreadable),
    ];
    let err = harness.run(&mut smoother, 64, &queues).unwrap_err();

    assert!(matches!(err, EngineError::MalformedPoint { index: 1, .. }));
    assert_eq!(harness.changes.changed().count(), 0);
    assert!(harness.events.is_empty());
    assert_eq!(smoother.sets(), before.as_slice());
}

#[test]
fn malformed_host_feed_is_tolerated() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[ParamSet::new(0.0, 0.0, 0.0)]);
    let mut harness = Harness::new(&config);

    let target = [
        AutomationPoint::new(-20, 0.4),
        AutomationPoint::new(30, 7.0),
        AutomationPoint::new(10, 0.1),
        AutomationPoint::new(5000, f64::NAN),
    ];
    let queues = [ParamQueue::new(id(0, ParamOffset::In), &target)];
    harness.run(&mut smoother, 64, &queues).unwrap();

    let points = harness.changes.points(id(0, ParamOffset::Out));
    assert!(points.windows(2).all(|w| w[0].offset < w[1].offset));
    assert!(points.iter().all(|p| (0.0..=1.0).contains(&p.value)));
    assert!(points.iter().all(|p| (0..64).contains(&p.offset)));
    assert_eq!(smoother.sets()[0].input(), 0.0);
}

// ============================================================================
// 4. Lifecycle and persistence
// ============================================================================

#[test]
fn restart_flushes_current_values() {
    let config = SmootherConfig {
        num_sets: 3,
        ..SmootherConfig::default()
    };
    let mut smoother = settled_smoother(config, &[]);
    let mut harness = Harness::new(&config);

    harness.run(&mut smoother, 32, &[]).unwrap();
    assert!(harness.events.is_empty());

    smoother.set_processing(true);
    harness.run(&mut smoother, 32, &[]).unwrap();
    let controllers: Vec<u8> = harness.events.events().iter().map(|e| e.controller).collect();
    assert_eq!(controllers, vec![90, 91, 92]);
    for set in 0..3 {
        assert_eq!(
            harness.changes.points(id(set, ParamOffset::Out)),
            &[AutomationPoint::new(0, 0.0)]
        );
    }
}

#[test]
fn slowness_echo_reports_accepted_value() {
    let config = SmootherConfig::default();
    let mut smoother = settled_smoother(config, &[]);
    let mut harness = Harness::new(&config);

    let speed = [AutomationPoint::new(0, 0.2), AutomationPoint::new(40, 1.4)];
    let queues = [ParamQueue::new(id(2, ParamOffset::Slowness), &speed)];
    harness.run(&mut smoother, 64, &queues).unwrap();

    assert_eq!(
        harness.changes.points(id(2, ParamOffset::Slowness)),
        &[AutomationPoint::new(0, 1.0)]
    );
    assert_eq!(smoother.sets()[2].slowness(), 1.0);
}

#[test]
fn truncated_state_restores_prefix() {
    let config = SmootherConfig::default();
    let mut source = Smoother::new(config).unwrap();
    for (i, set) in source.sets_mut().iter_mut().enumerate() {
        let v = (i as f64 + 1.0) / 10.0;
        *set = ParamSet::new(v, v / 2.0, v / 3.0);
    }
    let mut blob = Vec::new();
    source.save_state(&mut blob).unwrap();
    assert_eq!(blob.len(), config.num_sets * RECORD_BYTES);

    let mut restored = Smoother::new(config).unwrap();
    let count = restored.load_state(&mut &blob[..]).unwrap();
    assert_eq!(count, config.num_sets);
    assert_eq!(restored.sets(), source.sets());

    let k = 3;
    let mut partial = Smoother::new(config).unwrap();
    let count = partial.load_state(&mut &blob[..k * RECORD_BYTES + 5]).unwrap();
    assert_eq!(count, k);
    assert_eq!(&partial.sets()[..k], &source.sets()[..k]);
    assert!(partial.sets()[k..].iter().all(|s| *s == ParamSet::default()));
}
