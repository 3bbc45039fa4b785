//! Block driver: per-block orchestration around the merge engine.
//!
//! A [`Smoother`] owns the persisted parameter sets of one processor
//! instance. Each [`process`](Smoother::process) call:
//!
//! 1. silences every supplied audio output channel,
//! 2. applies incoming step events as jumps of the matching `In` value,
//! 3. classifies the host's parameter queues into per-set target, override
//!    and speed curves,
//! 4. reads every supplied curve once, so an unreadable point fails the
//!    block before anything is emitted,
//! 5. either synchronizes state from the last point of each curve
//!    (flush-only block, zero samples) or runs the merge engine per set,
//! 6. commits the updated sets.
//!
//! Full output sinks do not fail a block. Refused points are counted in
//! [`Smoother::dropped_points`].
//!
//! # Example
//!
//! ```rust
//! use lento_core::{
//!     AutomationPoint, BlockInput, BlockOutput, EventBuffer, OutputChanges, ParamId,
//!     ParamOffset, ParamQueue, Smoother, SmootherConfig,
//! };
//!
//! let config = SmootherConfig::default();
//! let mut smoother = Smoother::new(config).unwrap();
//! smoother.set_processing(true);
//!
//! let target = vec![AutomationPoint::new(0, 1.0)];
//! let slowness = vec![AutomationPoint::new(0, 0.0)];
//! let queues = [
//!     ParamQueue::new(ParamId::new(0, ParamOffset::In), &target),
//!     ParamQueue::new(ParamId::new(0, ParamOffset::Slowness), &slowness),
//! ];
//! let mut changes = OutputChanges::new(&config);
//! let mut events = EventBuffer::with_capacity(config.max_events_per_block);
//!
//! smoother
//!     .process(
//!         &BlockInput::new(48000.0, 64).with_changes(&queues),
//!         &mut BlockOutput::new().with_changes(&mut changes).with_events(&mut events),
//!     )
//!     .unwrap();
//!
//! assert_eq!(smoother.sets()[0].output(), 1.0);
//! ```

use crate::config::{MAX_PARAM_SETS, SmootherConfig};
use crate::curve::{CurveSource, ParamChanges, ParamQueue};
use crate::cursor::PointReader;
use crate::error::EngineError;
use crate::merge::{MergeParams, SetCurves, merge_set};
use crate::param_set::{ParamId, ParamOffset, ParamSet};
use crate::state::{read_state, write_state};
use crate::step_event::{EventSink, NullEvents, StepEvent, level_to_value};
use std::io::{Read, Write};

/// Everything the host hands in for one block.
#[derive(Debug, Clone, Copy)]
pub struct BlockInput<'a> {
    /// Sample rate in Hz. Must be positive unless `num_samples` is 0.
    pub sample_rate: f64,
    /// Block length. Zero requests a flush-only block.
    pub num_samples: usize,
    /// Parameter curves supplied by the host.
    pub changes: &'a [ParamQueue<'a>],
    /// Incoming step events.
    pub events: &'a [StepEvent],
}

impl<'a> BlockInput<'a> {
    /// Block without curves or events.
    pub fn new(sample_rate: f64, num_samples: usize) -> Self {
        Self {
            sample_rate,
            num_samples,
            changes: &[],
            events: &[],
        }
    }

    /// Attach parameter curves.
    pub fn with_changes(mut self, changes: &'a [ParamQueue<'a>]) -> Self {
        self.changes = changes;
        self
    }

    /// Attach incoming step events.
    pub fn with_events(mut self, events: &'a [StepEvent]) -> Self {
        self.events = events;
        self
    }
}

/// Where the results of one block go. Every part is optional.
#[derive(Default)]
pub struct BlockOutput<'a, 'b> {
    /// Audio output channels, silenced every block.
    pub audio: Option<&'a mut [&'b mut [f32]]>,
    /// Produced parameter curves.
    pub changes: Option<&'a mut dyn ParamChanges>,
    /// Produced step events.
    pub events: Option<&'a mut dyn EventSink>,
}

impl<'a, 'b> BlockOutput<'a, 'b> {
    /// Output that discards everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Silence these channels.
    pub fn with_audio(mut self, audio: &'a mut [&'b mut [f32]]) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Write produced curves here.
    pub fn with_changes(mut self, changes: &'a mut dyn ParamChanges) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Send produced step events here.
    pub fn with_events(mut self, events: &'a mut dyn EventSink) -> Self {
        self.events = Some(events);
        self
    }
}

/// The smoothing processor for `num_sets` independent parameter sets.
#[derive(Debug, Clone)]
pub struct Smoother {
    config: SmootherConfig,
    sets: [ParamSet; MAX_PARAM_SETS],
    active: bool,
    processing: bool,
    initial_flush: bool,
    dropped_points: usize,
}

impl Smoother {
    /// Create a processor with every set at its default values.
    pub fn new(config: SmootherConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            sets: [ParamSet::default(); MAX_PARAM_SETS],
            active: false,
            processing: false,
            initial_flush: true,
            dropped_points: 0,
        })
    }

    /// The configuration this processor was built with.
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// Active parameter sets.
    pub fn sets(&self) -> &[ParamSet] {
        &self.sets[..self.config.num_sets]
    }

    /// Mutable access to the active parameter sets.
    pub fn sets_mut(&mut self) -> &mut [ParamSet] {
        &mut self.sets[..self.config.num_sets]
    }

    /// Current normalized value of a parameter.
    pub fn param_value(&self, id: ParamId) -> Option<f64> {
        self.sets()
            .get(id.set())
            .map(|set| set.normalized(id.offset()))
    }

    /// Jump-assign a parameter outside of block processing.
    ///
    /// Returns `false` for ids outside the configured range.
    pub fn set_param_value(&mut self, id: ParamId, value: f64) -> bool {
        match self.sets_mut().get_mut(id.set()) {
            Some(set) => {
                set.set_normalized(id.offset(), value);
                true
            }
            None => false,
        }
    }

    /// Activate or deactivate the processor.
    ///
    /// Activation arms the initial flush; every set keeps its values.
    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            self.initial_flush = true;
            #[cfg(feature = "tracing")]
            tracing::debug!("smoother activated");
        }
        self.active = active;
    }

    /// True between `set_active(true)` and `set_active(false)`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start or stop processing. Restarting arms the initial flush.
    pub fn set_processing(&mut self, processing: bool) {
        if processing && !self.processing {
            self.initial_flush = true;
        }
        self.processing = processing;
    }

    /// Output points the sinks refused during the last successful block.
    pub fn dropped_points(&self) -> usize {
        self.dropped_points
    }

    /// True if the next block with samples force-emits every set's value.
    pub fn needs_initial_flush(&self) -> bool {
        self.initial_flush
    }

    /// Serialize every active set as little-endian `(in, out, slowness)`.
    pub fn save_state<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), EngineError> {
        write_state(self.sets(), writer)?;
        Ok(())
    }

    /// Restore sets from a stream written by [`save_state`](Self::save_state).
    ///
    /// Every set is reset to its defaults first, so sets missing from a
    /// truncated stream come back as `(0, 0, 0.5)`. Returns the number of
    /// records read.
    pub fn load_state<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize, EngineError> {
        let mut restored = [ParamSet::default(); MAX_PARAM_SETS];
        let num_sets = self.config.num_sets;
        let read = read_state(&mut restored[..num_sets], reader)?;
        self.sets = restored;
        if read < num_sets {
            #[cfg(feature = "tracing")]
            tracing::warn!("state restore stopped early with {read} of {num_sets} records");
        }
        Ok(read)
    }

    /// Process one block.
    ///
    /// On error nothing is committed and no output point or step event has
    /// been written: the persisted sets are exactly as they were before the
    /// call. Audio channels are silenced either way.
    pub fn process(
        &mut self,
        input: &BlockInput<'_>,
        output: &mut BlockOutput<'_, '_>,
    ) -> Result<(), EngineError> {
        if let Some(audio) = output.audio.as_deref_mut() {
            silence(audio, input.num_samples);
        }

        let num_sets = self.config.num_sets;
        let curves = self.classify(input.changes);
        if let Err(err) = check_readable(&curves[..num_sets]) {
            #[cfg(feature = "tracing")]
            tracing::warn!("block aborted: {err}");
            return Err(err);
        }
        let mut next = self.sets;
        self.apply_events(&mut next, input.events);

        if input.num_samples == 0 {
            flush_state(&mut next[..num_sets], &curves[..num_sets])?;
            let refused = self.echo_slowness(&next, &curves, output);
            self.commit(next, refused);
            #[cfg(feature = "tracing")]
            tracing::debug!("flush-only block applied");
            return Ok(());
        }

        if !(input.sample_rate.is_finite() && input.sample_rate > 0.0) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                sample_rate = input.sample_rate,
                "block aborted: invalid sample rate"
            );
            return Err(EngineError::InvalidSampleRate(input.sample_rate));
        }

        let last_offset = i32::try_from(input.num_samples - 1).unwrap_or(i32::MAX);
        let mut null_events = NullEvents;
        let mut refused = 0;
        for (set, state) in next[..num_sets].iter_mut().enumerate() {
            let params = MergeParams {
                set,
                last_offset,
                sample_rate: input.sample_rate,
                half_life_secs: self.config.half_life_secs,
                epsilon: self.config.epsilon,
                controller: self.config.controller_for(set),
                initial_flush: self.initial_flush,
            };
            let sink = output
                .changes
                .as_deref_mut()
                .and_then(|changes| changes.queue(ParamId::new(set, ParamOffset::Out)));
            let events: &mut dyn EventSink = match output.events.as_deref_mut() {
                Some(events) => events,
                None => &mut null_events,
            };
            refused += merge_set(state, curves[set], &params, sink, events)?;
        }
        refused += self.echo_slowness(&next, &curves, output);

        #[cfg(feature = "tracing")]
        if self.initial_flush {
            tracing::debug!("initial values flushed for {num_sets} sets");
        }
        self.commit(next, refused);
        self.initial_flush = false;
        Ok(())
    }

    fn commit(&mut self, sets: [ParamSet; MAX_PARAM_SETS], refused: usize) {
        self.sets = sets;
        self.dropped_points = refused;
        #[cfg(feature = "tracing")]
        if refused > 0 {
            tracing::warn!("output queues full, {refused} points dropped");
        }
    }

    fn apply_events(&self, sets: &mut [ParamSet; MAX_PARAM_SETS], events: &[StepEvent]) {
        for event in events {
            if let Some(set) = self.config.set_for_controller(event.controller) {
                sets[set].set_input(level_to_value(event.level));
            }
        }
    }

    fn classify<'a>(&self, changes: &[ParamQueue<'a>]) -> [SetCurves<'a>; MAX_PARAM_SETS] {
        let mut curves = [SetCurves::default(); MAX_PARAM_SETS];
        let param_count = self.config.param_count();
        for queue in changes {
            if queue.id.0 as usize >= param_count {
                continue;
            }
            let slot = &mut curves[queue.id.set()];
            match queue.id.offset() {
                ParamOffset::In => slot.target = Some(queue.points),
                ParamOffset::Out => slot.overrides = Some(queue.points),
                ParamOffset::Slowness => slot.speed = Some(queue.points),
            }
        }
        curves
    }

    /// Report the accepted slowness of every set whose speed curve was
    /// supplied. Returns the number of refused points.
    fn echo_slowness(
        &self,
        sets: &[ParamSet; MAX_PARAM_SETS],
        curves: &[SetCurves<'_>; MAX_PARAM_SETS],
        output: &mut BlockOutput<'_, '_>,
    ) -> usize {
        let Some(changes) = output.changes.as_deref_mut() else {
            return 0;
        };
        let mut refused = 0;
        for set in 0..self.config.num_sets {
            let supplied = curves[set].speed.is_some_and(|c| c.point_count() > 0);
            if !supplied {
                continue;
            }
            let id = ParamId::new(set, ParamOffset::Slowness);
            if let Some(queue) = changes.queue(id)
                && queue.add_point(0, sets[set].slowness()).is_err()
            {
                refused += 1;
            }
        }
        refused
    }
}

/// Zero the first `num_samples` samples of every channel.
fn silence(audio: &mut [&mut [f32]], num_samples: usize) {
    for channel in audio.iter_mut() {
        let len = num_samples.min(channel.len());
        channel[..len].fill(0.0);
    }
}

/// Flush-only block: adopt the last point of each supplied curve.
fn flush_state(sets: &mut [ParamSet], curves: &[SetCurves<'_>]) -> Result<(), EngineError> {
    for (set, (state, curves)) in sets.iter_mut().zip(curves).enumerate() {
        if let Some(value) = last_value(curves.target, ParamId::new(set, ParamOffset::In))? {
            state.set_input(value);
        }
        if let Some(value) = last_value(curves.overrides, ParamId::new(set, ParamOffset::Out))? {
            state.set_output(value);
        }
        if let Some(value) = last_value(curves.speed, ParamId::new(set, ParamOffset::Slowness))? {
            state.set_slowness(value);
        }
    }
    Ok(())
}

fn last_value(source: Option<&dyn CurveSource>, id: ParamId) -> Result<Option<f64>, EngineError> {
    PointReader::new(source, id, 0).last_value()
}

/// Read every point of every supplied curve once.
fn check_readable(curves: &[SetCurves<'_>]) -> Result<(), EngineError> {
    for (set, curves) in curves.iter().enumerate() {
        for (source, offset) in [
            (curves.target, ParamOffset::In),
            (curves.overrides, ParamOffset::Out),
            (curves.speed, ParamOffset::Slowness),
        ] {
            let Some(source) = source else {
                continue;
            };
            for index in 0..source.point_count() {
                if source.point(index).is_none() {
                    return Err(EngineError::MalformedPoint {
                        id: ParamId::new(set, offset),
                        index,
                    });
                }
            }
        }
    }
    Ok(())
}
