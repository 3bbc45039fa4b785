//! Two-point linear segment evaluation in offset space.

use crate::param_set::constrain;

/// Value of the segment `(x0, y0)`-`(x1, y1)` at offset `x`, clamped to
/// `[0, 1]`.
///
/// Hosts may legally submit two points at the same offset, which makes the
/// segment vertical. In that case the result is `y0` when both values agree,
/// otherwise `y1` exactly at `x0` and the clamped limit of an infinitely
/// steep line elsewhere: the side the step points to yields its rail (`1`
/// for an upward step right of `x0`), the other side the opposite rail.
///
/// # Example
///
/// ```rust
/// use lento_core::interpolate;
///
/// assert_eq!(interpolate(0.0, 0.0, 10.0, 1.0, 5.0), 0.5);
/// // Extrapolation stays in range.
/// assert_eq!(interpolate(0.0, 0.0, 10.0, 1.0, 20.0), 1.0);
/// // Vertical upward step.
/// assert_eq!(interpolate(4.0, 0.2, 4.0, 0.8, 4.0), 0.8);
/// assert_eq!(interpolate(4.0, 0.2, 4.0, 0.8, 5.0), 1.0);
/// assert_eq!(interpolate(4.0, 0.2, 4.0, 0.8, 3.0), 0.0);
/// ```
#[inline]
pub fn interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x1 != x0 {
        return constrain(y0 + (y1 - y0) * (x - x0) / (x1 - x0));
    }
    if y1 == y0 {
        return y0;
    }
    if x == x0 {
        return constrain(y1);
    }
    let rising = y1 > y0;
    if (x > x0) == rising { 1.0 } else { 0.0 }
}
