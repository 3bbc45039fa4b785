//! Automation curves and the capability seams the engine reads and writes
//! them through.
//!
//! The engine never touches a host ABI. Hosts hand it curves through
//! [`CurveSource`] and receive the produced curves through [`ParamChanges`]
//! and [`CurveSink`]. The in-crate [`PointQueue`] and [`OutputChanges`]
//! implement the sink side with storage reserved up front, so writing a
//! point never allocates.
//!
//! # Example
//!
//! ```rust
//! use lento_core::{AutomationPoint, CurveSink, CurveSource, PointQueue};
//!
//! let mut queue = PointQueue::with_capacity(4);
//! queue.add_point(10, 0.25).unwrap();
//! queue.add_point(20, 0.5).unwrap();
//! assert_eq!(queue.point_count(), 2);
//! assert_eq!(queue.point(1), Some(AutomationPoint::new(20, 0.5)));
//! ```

use crate::config::SmootherConfig;
use crate::param_set::ParamId;

/// A single `(offset, value)` point of a curve within one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationPoint {
    /// Sample index inside the block.
    pub offset: i32,
    /// Normalized value (nominally `[0, 1]`).
    pub value: f64,
}

impl AutomationPoint {
    /// Create a point.
    pub const fn new(offset: i32, value: f64) -> Self {
        Self { offset, value }
    }
}

/// Read access to one host-supplied curve.
///
/// `point` returns `None` when the host cannot deliver the point, which
/// aborts the block.
pub trait CurveSource {
    /// Number of points in the curve.
    fn point_count(&self) -> usize;

    /// Point at `index`, or `None` if it cannot be read.
    fn point(&self, index: usize) -> Option<AutomationPoint>;
}

impl CurveSource for [AutomationPoint] {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point(&self, index: usize) -> Option<AutomationPoint> {
        self.get(index).copied()
    }
}

impl CurveSource for Vec<AutomationPoint> {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point(&self, index: usize) -> Option<AutomationPoint> {
        self.get(index).copied()
    }
}

impl<const N: usize> CurveSource for [AutomationPoint; N] {
    fn point_count(&self) -> usize {
        N
    }

    fn point(&self, index: usize) -> Option<AutomationPoint> {
        self.get(index).copied()
    }
}

/// The sink ran out of room for another point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull {
    /// Capacity of the rejecting queue.
    pub capacity: usize,
}

/// Write access to one produced curve.
///
/// Offsets arrive strictly increasing, except that a second point at the
/// same offset as the previous one replaces it. A refused point is counted
/// by the engine and smoothing carries on.
pub trait CurveSink {
    /// Append a point, or report that no new point fits.
    fn add_point(&mut self, offset: i32, value: f64) -> Result<(), QueueFull>;
}

/// Write access to the produced curves of every parameter, keyed by id.
pub trait ParamChanges {
    /// Sink for `id`, or `None` if the host does not accept changes for it.
    fn queue(&mut self, id: ParamId) -> Option<&mut dyn CurveSink>;
}

/// One host-supplied curve tagged with the parameter it automates.
#[derive(Clone, Copy)]
pub struct ParamQueue<'a> {
    /// Parameter the curve belongs to.
    pub id: ParamId,
    /// The curve itself.
    pub points: &'a dyn CurveSource,
}

impl<'a> ParamQueue<'a> {
    /// Tag `points` with `id`.
    pub fn new(id: ParamId, points: &'a dyn CurveSource) -> Self {
        Self { id, points }
    }
}

impl core::fmt::Debug for ParamQueue<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParamQueue")
            .field("id", &self.id)
            .field("points", &self.points.point_count())
            .finish()
    }
}

/// Fixed-capacity point queue.
///
/// Once full, each further point overwrites the last stored one, so the
/// queue always ends on the most recent value. Overwritten points are
/// counted in [`dropped`](Self::dropped).
#[derive(Debug, Clone, PartialEq)]
pub struct PointQueue {
    points: Vec<AutomationPoint>,
    capacity: usize,
    dropped: usize,
}

impl PointQueue {
    /// Reserve room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Points written so far.
    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    /// Maximum number of points.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if no point has been written.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last point written, if any.
    pub fn last(&self) -> Option<AutomationPoint> {
        self.points.last().copied()
    }

    /// Points lost to overwriting since the last [`clear`](Self::clear).
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Drop all points, keeping the reserved storage.
    pub fn clear(&mut self) {
        self.points.clear();
        self.dropped = 0;
    }
}

impl CurveSink for PointQueue {
    fn add_point(&mut self, offset: i32, value: f64) -> Result<(), QueueFull> {
        if let Some(last) = self.points.last_mut()
            && last.offset == offset
        {
            last.value = value;
            return Ok(());
        }
        if self.points.len() >= self.capacity {
            if let Some(last) = self.points.last_mut() {
                *last = AutomationPoint::new(offset, value);
            }
            self.dropped += 1;
            return Err(QueueFull {
                capacity: self.capacity,
            });
        }
        self.points.push(AutomationPoint::new(offset, value));
        Ok(())
    }
}

impl CurveSource for PointQueue {
    fn point_count(&self) -> usize {
        self.points.len()
    }

    fn point(&self, index: usize) -> Option<AutomationPoint> {
        self.points.get(index).copied()
    }
}

/// One [`PointQueue`] per parameter id.
#[derive(Debug, Clone)]
pub struct OutputChanges {
    queues: Vec<PointQueue>,
}

impl OutputChanges {
    /// Queues for every parameter of `config`, each holding
    /// `max_points_per_block` points.
    pub fn new(config: &SmootherConfig) -> Self {
        Self {
            queues: (0..config.param_count())
                .map(|_| PointQueue::with_capacity(config.max_points_per_block))
                .collect(),
        }
    }

    /// Points written for `id` during the last block.
    pub fn points(&self, id: ParamId) -> &[AutomationPoint] {
        self.queues
            .get(id.0 as usize)
            .map(PointQueue::points)
            .unwrap_or(&[])
    }

    /// Iterate over `(id, points)` for every parameter that received points.
    pub fn changed(&self) -> impl Iterator<Item = (ParamId, &[AutomationPoint])> {
        self.queues
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_empty())
            .map(|(i, q)| (ParamId(i as u32), q.points()))
    }

    /// Points lost to full queues during the last block.
    pub fn dropped(&self) -> usize {
        self.queues.iter().map(PointQueue::dropped).sum()
    }

    /// Empty every queue before the next block.
    pub fn clear(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}

impl ParamChanges for OutputChanges {
    fn queue(&mut self, id: ParamId) -> Option<&mut dyn CurveSink> {
        self.queues
            .get_mut(id.0 as usize)
            .map(|q| q as &mut dyn CurveSink)
    }
}
