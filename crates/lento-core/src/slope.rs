//! Slowness to slew-rate mapping.
//!
//! Slowness is a normalized coefficient in `[0, 1]`:
//!
//! - `0.0` - the output follows the target instantly
//! - `0.5` - the output crosses the full range in `half_life_secs`
//! - `1.0` - the output never moves
//!
//! The rate in value-per-second is `(1 - s) / s / h`, so the time to
//! traverse the whole range is `s * h / (1 - s)`. Solving for `s` gives
//! [`slowness_for_traverse_time`], convenient for picking a slowness from a
//! desired glide time.

use crate::error::EngineError;

/// Maximum change in normalized value per sample.
///
/// Returns `1.0` (unbounded within one sample) for `slowness <= 0` and `0.0`
/// for `slowness >= 1`.
///
/// # Errors
///
/// [`EngineError::InvalidSampleRate`] if `sample_rate` is not a positive
/// finite number.
///
/// # Example
///
/// ```rust
/// use lento_core::max_slope;
///
/// let rate = max_slope(0.5, 48000.0, 2.0).unwrap();
/// assert!((rate - 1.0 / 96000.0).abs() < 1e-12);
/// assert_eq!(max_slope(0.0, 48000.0, 2.0).unwrap(), 1.0);
/// ```
pub fn max_slope(slowness: f64, sample_rate: f64, half_life_secs: f64) -> Result<f64, EngineError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EngineError::InvalidSampleRate(sample_rate));
    }
    if slowness <= 0.0 {
        return Ok(1.0);
    }
    if slowness >= 1.0 {
        return Ok(0.0);
    }
    Ok((1.0 - slowness) / slowness / half_life_secs / sample_rate)
}

/// Seconds the output needs to cross `[0, 1]` at the given slowness.
///
/// Infinite for `slowness >= 1`.
pub fn traverse_time_secs(slowness: f64, half_life_secs: f64) -> f64 {
    if slowness <= 0.0 {
        0.0
    } else if slowness >= 1.0 {
        f64::INFINITY
    } else {
        slowness * half_life_secs / (1.0 - slowness)
    }
}

/// Slowness that makes a full-range traverse take `secs` seconds.
pub fn slowness_for_traverse_time(secs: f64, half_life_secs: f64) -> f64 {
    if secs <= 0.0 {
        0.0
    } else if secs.is_infinite() {
        1.0
    } else {
        secs / (secs + half_life_secs)
    }
}
