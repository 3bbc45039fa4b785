//! Sanitizing scan cursors over host-supplied curves.
//!
//! Host feeds are trusted for nothing: offsets are clamped into the block,
//! values into `[0, 1]`, a point sharing the previous point's offset
//! replaces it (a vertical step), and a point whose offset goes backwards is
//! skipped. Points are read lazily, one at a time, so a scan is bounded by
//! the queue length and never allocates.

use crate::curve::CurveSource;
use crate::error::EngineError;
use crate::interpolate::interpolate;
use crate::param_set::{ParamId, constrain};

/// Yields the distinct-offset points of a curve in strictly increasing
/// offset order.
pub(crate) struct PointReader<'a> {
    source: Option<&'a dyn CurveSource>,
    id: ParamId,
    next: usize,
    floor: i32,
    last_offset: i32,
    lookahead: Option<(i32, f64)>,
}

impl<'a> PointReader<'a> {
    pub(crate) fn new(source: Option<&'a dyn CurveSource>, id: ParamId, last_offset: i32) -> Self {
        Self {
            source,
            id,
            next: 0,
            floor: 0,
            last_offset,
            lookahead: None,
        }
    }

    fn raw(&mut self) -> Result<Option<(i32, f64)>, EngineError> {
        let Some(source) = self.source else {
            return Ok(None);
        };
        while self.next < source.point_count() {
            let index = self.next;
            self.next += 1;
            let point = source
                .point(index)
                .ok_or(EngineError::MalformedPoint { id: self.id, index })?;
            let offset = point.offset.clamp(0, self.last_offset);
            if offset < self.floor {
                continue;
            }
            return Ok(Some((offset, constrain(point.value))));
        }
        Ok(None)
    }

    /// Next point, coalescing every following point at the same offset.
    pub(crate) fn next_point(&mut self) -> Result<Option<(i32, f64)>, EngineError> {
        let first = match self.lookahead.take() {
            Some(point) => Some(point),
            None => self.raw()?,
        };
        let Some((offset, mut value)) = first else {
            return Ok(None);
        };
        self.floor = offset;
        loop {
            match self.raw()? {
                Some((next_offset, next_value)) if next_offset == offset => value = next_value,
                other => {
                    self.lookahead = other;
                    break;
                }
            }
        }
        self.floor = offset.saturating_add(1);
        Ok(Some((offset, value)))
    }

    /// Value of the last point in the curve, ignoring ordering.
    ///
    /// Used by flush-only blocks, which synchronize state without walking
    /// the curve.
    pub(crate) fn last_value(&self) -> Result<Option<f64>, EngineError> {
        let Some(source) = self.source else {
            return Ok(None);
        };
        let count = source.point_count();
        if count == 0 {
            return Ok(None);
        }
        let index = count - 1;
        let point = source
            .point(index)
            .ok_or(EngineError::MalformedPoint { id: self.id, index })?;
        Ok(Some(constrain(point.value)))
    }
}

/// Piecewise-linear view of a curve that starts at offset -1 with the value
/// carried over from the previous block and holds its last value to the end
/// of the block.
pub(crate) struct SegmentCursor<'a> {
    reader: PointReader<'a>,
    x0: i32,
    y0: f64,
    end: Option<(i32, f64)>,
}

impl<'a> SegmentCursor<'a> {
    pub(crate) fn new(
        source: Option<&'a dyn CurveSource>,
        id: ParamId,
        start_value: f64,
        last_offset: i32,
    ) -> Result<Self, EngineError> {
        let mut reader = PointReader::new(source, id, last_offset);
        let end = reader.next_point()?;
        Ok(Self {
            reader,
            x0: -1,
            y0: start_value,
            end,
        })
    }

    /// Advance until the active segment covers `x`, i.e. `x0 <= x < x1`.
    pub(crate) fn seek(&mut self, x: i32) -> Result<(), EngineError> {
        while let Some((end_x, end_y)) = self.end {
            if end_x > x {
                break;
            }
            self.x0 = end_x;
            self.y0 = end_y;
            self.end = self.reader.next_point()?;
        }
        Ok(())
    }

    /// Offset where the active segment ends, `None` for the final hold.
    pub(crate) fn segment_end(&self) -> Option<i32> {
        self.end.map(|(x, _)| x)
    }

    /// Value of the active segment at `x`.
    pub(crate) fn value_at(&self, x: f64) -> f64 {
        match self.end {
            Some((end_x, end_y)) => {
                interpolate(f64::from(self.x0), self.y0, f64::from(end_x), end_y, x)
            }
            None => self.y0,
        }
    }

    /// Value held after the last point of the curve.
    pub(crate) fn finish(&mut self, last_offset: i32) -> Result<f64, EngineError> {
        self.seek(last_offset)?;
        Ok(self.y0)
    }
}

/// What the next stretch of the output-override curve asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum OverrideSpan {
    /// The host moved the output: draw a segment to `offset` verbatim.
    Override {
        /// Offset of the host point.
        offset: i32,
        /// Value of the host point.
        value: f64,
    },
    /// The host only restated values; smoothing owns the output up to `end`.
    Restated {
        /// Offset of the last restating point.
        end: i32,
    },
}

/// Scans the output-override curve, merging runs of near-equal points.
pub(crate) struct OverrideCursor<'a> {
    reader: PointReader<'a>,
    peeked: Option<(i32, f64)>,
}

impl<'a> OverrideCursor<'a> {
    pub(crate) fn new(source: Option<&'a dyn CurveSource>, id: ParamId, last_offset: i32) -> Self {
        Self {
            reader: PointReader::new(source, id, last_offset),
            peeked: None,
        }
    }

    /// Classify the next stretch against the currently committed value.
    ///
    /// Returns `None` once the curve is exhausted.
    pub(crate) fn next_span(
        &mut self,
        committed: f64,
        epsilon: f64,
    ) -> Result<Option<OverrideSpan>, EngineError> {
        let first = match self.peeked.take() {
            Some(point) => Some(point),
            None => self.reader.next_point()?,
        };
        let Some((offset, value)) = first else {
            return Ok(None);
        };
        if (value - committed).abs() > epsilon {
            return Ok(Some(OverrideSpan::Override { offset, value }));
        }

        let mut end = offset;
        loop {
            match self.reader.next_point()? {
                Some((next_offset, next_value)) if (next_value - value).abs() <= epsilon => {
                    end = next_offset;
                }
                other => {
                    self.peeked = other;
                    break;
                }
            }
        }
        Ok(Some(OverrideSpan::Restated { end }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::AutomationPoint;
    use crate::param_set::ParamOffset;

    const ID: ParamId = ParamId(0);

    fn points(raw: &[(i32, f64)]) -> Vec<AutomationPoint> {
        raw.iter().map(|&(x, y)| AutomationPoint::new(x, y)).collect()
    }

    fn drain(reader: &mut PointReader<'_>) -> Vec<(i32, f64)> {
        let mut out = Vec::new();
        while let Some(point) = reader.next_point().unwrap() {
            out.push(point);
        }
        out
    }

    #[test]
    fn reader_sanitizes_host_feed() {
        let curve = points(&[(-5, 0.2), (3, 1.4), (3, 0.6), (1, 0.9), (200, 0.3)]);
        let mut reader = PointReader::new(Some(&curve), ID, 99);
        assert_eq!(drain(&mut reader), vec![(0, 0.2), (3, 0.6), (99, 0.3)]);
    }

    #[test]
    fn reader_without_source_is_empty() {
        let mut reader = PointReader::new(None, ID, 99);
        assert_eq!(reader.next_point().unwrap(), None);
        assert_eq!(reader.last_value().unwrap(), None);
    }

    struct Broken;

    impl CurveSource for Broken {
        fn point_count(&self) -> usize {
            2
        }

        fn point(&self, index: usize) -> Option<AutomationPoint> {
            (index == 0).then_some(AutomationPoint::new(0, 0.5))
        }
    }

    #[test]
    fn reader_reports_malformed_points() {
        let id = ParamId::new(1, ParamOffset::In);
        let mut reader = PointReader::new(Some(&Broken), id, 99);
        let err = reader.next_point().unwrap_err();
        assert!(matches!(err, EngineError::MalformedPoint { index: 1, .. }));
    }

    #[test]
    fn segment_cursor_walks_segments() {
        let curve = points(&[(9, 1.0), (19, 0.0)]);
        let mut cursor = SegmentCursor::new(Some(&curve), ID, 0.0, 99).unwrap();

        cursor.seek(-1).unwrap();
        assert_eq!(cursor.segment_end(), Some(9));
        assert_eq!(cursor.value_at(4.0), 0.5);

        cursor.seek(9).unwrap();
        assert_eq!(cursor.segment_end(), Some(19));
        assert_eq!(cursor.value_at(14.0), 0.5);

        cursor.seek(50).unwrap();
        assert_eq!(cursor.segment_end(), None);
        assert_eq!(cursor.value_at(80.0), 0.0);
        assert_eq!(cursor.finish(99).unwrap(), 0.0);
    }

    #[test]
    fn segment_cursor_without_points_holds_start() {
        let mut cursor = SegmentCursor::new(None, ID, 0.3, 99).unwrap();
        assert_eq!(cursor.segment_end(), None);
        assert_eq!(cursor.value_at(50.0), 0.3);
        assert_eq!(cursor.finish(99).unwrap(), 0.3);
    }

    #[test]
    fn override_cursor_merges_restated_runs() {
        let curve = points(&[(10, 0.5), (20, 0.500001), (30, 0.5), (40, 0.8), (50, 0.8)]);
        let mut cursor = OverrideCursor::new(Some(&curve), ID, 99);

        assert_eq!(
            cursor.next_span(0.5, 1e-5).unwrap(),
            Some(OverrideSpan::Restated { end: 30 })
        );
        assert_eq!(
            cursor.next_span(0.5, 1e-5).unwrap(),
            Some(OverrideSpan::Override {
                offset: 40,
                value: 0.8
            })
        );
        assert_eq!(
            cursor.next_span(0.8, 1e-5).unwrap(),
            Some(OverrideSpan::Restated { end: 50 })
        );
        assert_eq!(cursor.next_span(0.8, 1e-5).unwrap(), None);
    }
}
