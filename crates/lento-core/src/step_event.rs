//! Quantized step events approximating the continuous output curve.
//!
//! Consumers that cannot read automation curves (typically MIDI CC
//! receivers) get a stream of 7-bit levels instead. A transition between
//! two committed output points is projected onto the discrete scale by
//! [`emit_ramp`], which picks one of two stepping strategies:
//!
//! - **Per-sample**, when the ramp climbs at least half a level per sample:
//!   walk every sample and emit whenever the rounded level changes.
//! - **Per-level**, for shallow ramps: walk every intermediate level and
//!   place it at the rounded offset where the line crosses it, so long
//!   slow glides still report every level.

/// Highest quantized level.
pub const MAX_LEVEL: u8 = 127;

/// Steepness, in levels per sample, at which stepping switches to per-sample.
const PER_SAMPLE_THRESHOLD: f64 = 0.5;

/// One discrete control-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepEvent {
    /// Sample index inside the block.
    pub offset: i32,
    /// Controller number, `controller_base + set`.
    pub controller: u8,
    /// Quantized level in `[0, 127]`.
    pub level: u8,
}

impl StepEvent {
    /// Create an event, clamping `level` to [`MAX_LEVEL`].
    pub fn new(offset: i32, controller: u8, level: u8) -> Self {
        Self {
            offset,
            controller,
            level: level.min(MAX_LEVEL),
        }
    }

    /// Level mapped back to the normalized scale.
    pub fn normalized(&self) -> f64 {
        level_to_value(self.level)
    }
}

/// Receiver of step events.
pub trait EventSink {
    /// Deliver one event. Events arrive in non-decreasing offset order per
    /// controller.
    fn send(&mut self, event: StepEvent);
}

/// Sink that discards everything, for hosts without an event output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl EventSink for NullEvents {
    fn send(&mut self, _event: StepEvent) {}
}

/// Fixed-capacity event buffer.
///
/// Events past capacity are counted and dropped instead of reallocating.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: Vec<StepEvent>,
    capacity: usize,
    dropped: usize,
}

impl EventBuffer {
    /// Reserve room for `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Events received since the last [`clear`](Self::clear).
    pub fn events(&self) -> &[StepEvent] {
        &self.events
    }

    /// Events of a single controller, in arrival order.
    pub fn for_controller(&self, controller: u8) -> impl Iterator<Item = &StepEvent> {
        self.events.iter().filter(move |e| e.controller == controller)
    }

    /// Number of events dropped because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing was buffered.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forget all events, keeping the reserved storage.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

impl EventSink for EventBuffer {
    fn send(&mut self, event: StepEvent) {
        if self.events.len() < self.capacity {
            self.events.push(event);
        } else {
            self.dropped += 1;
        }
    }
}

/// Quantize a normalized value to a level: `round(127 * value)`, clamped.
///
/// ```rust
/// use lento_core::quantize;
///
/// assert_eq!(quantize(0.0), 0);
/// assert_eq!(quantize(0.9), 114);
/// assert_eq!(quantize(1.7), 127);
/// ```
#[inline]
pub fn quantize(value: f64) -> u8 {
    let scaled = (f64::from(MAX_LEVEL) * value).round();
    if scaled.is_nan() {
        0
    } else {
        scaled.clamp(0.0, f64::from(MAX_LEVEL)) as u8
    }
}

/// Normalized value of a level.
#[inline]
pub fn level_to_value(level: u8) -> f64 {
    f64::from(level.min(MAX_LEVEL)) / f64::from(MAX_LEVEL)
}

/// Emit the step events of the transition `(first_offset, first_value)` to
/// `(last_offset, last_value)` on `controller`.
///
/// Events land in `(first_offset, last_offset]`; the level at `first_offset`
/// is assumed to have been reported already. Nothing is emitted when the
/// offsets do not advance or both endpoints quantize to the same level.
///
/// Returns the number of events sent.
///
/// # Example
///
/// ```rust
/// use lento_core::{EventBuffer, StepEvent, emit_ramp};
///
/// let mut sink = EventBuffer::with_capacity(8);
/// // A vertical jump over one sample becomes a single event.
/// assert_eq!(emit_ramp(&mut sink, -1, 0.0, 0, 1.0, 90), 1);
/// assert_eq!(sink.events(), &[StepEvent::new(0, 90, 127)]);
/// ```
pub fn emit_ramp<E: EventSink + ?Sized>(
    sink: &mut E,
    first_offset: i32,
    first_value: f64,
    last_offset: i32,
    last_value: f64,
    controller: u8,
) -> usize {
    if last_offset <= first_offset {
        return 0;
    }
    let first = quantize(first_value);
    let last = quantize(last_value);
    if first == last {
        return 0;
    }

    let xrange = i64::from(last_offset) - i64::from(first_offset);
    let yrange = i32::from(last) - i32::from(first);
    let slope = f64::from(yrange) / xrange as f64;
    let mut sent = 0;

    if slope.abs() >= PER_SAMPLE_THRESHOLD {
        let mut previous = first;
        for i in 1..=xrange {
            let stepped = f64::from(first) + (i as f64 * slope).round();
            let level = stepped.clamp(0.0, f64::from(MAX_LEVEL)) as u8;
            if level != previous {
                sink.send(StepEvent::new(first_offset + i as i32, controller, level));
                previous = level;
                sent += 1;
            }
        }
    } else {
        let direction = yrange.signum();
        let per_level = 1.0 / slope.abs();
        for j in 1..=yrange.abs() {
            let advance = (f64::from(j) * per_level).round() as i64;
            let offset = (i64::from(first_offset) + advance).min(i64::from(last_offset)) as i32;
            let level = (i32::from(first) + direction * j) as u8;
            sink.send(StepEvent::new(offset, controller, level));
            sent += 1;
        }
    }
    sent
}
