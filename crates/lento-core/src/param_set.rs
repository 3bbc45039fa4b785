//! Persisted per-parameter-set state and parameter addressing.
//!
//! Every parameter set exposes three host parameters laid out contiguously:
//!
//! | offset | parameter  | meaning                          |
//! |--------|------------|----------------------------------|
//! | 0      | `In`       | target the output moves toward   |
//! | 1      | `Out`      | smoothed, slew-limited value     |
//! | 2      | `Slowness` | smoothing coefficient            |
//!
//! so the [`ParamId`] of a parameter is `set * 3 + offset`.

use core::fmt;

/// Slowness a freshly activated parameter set starts with.
pub const DEFAULT_SLOWNESS: f64 = 0.5;

/// Position of a parameter inside its parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamOffset {
    /// Target ("input") value.
    In = 0,
    /// Smoothed ("output") value.
    Out = 1,
    /// Smoothing coefficient.
    Slowness = 2,
}

impl ParamOffset {
    /// Number of parameters per set.
    pub const COUNT: u32 = 3;

    /// All offsets in id order.
    pub const ALL: [ParamOffset; 3] = [ParamOffset::In, ParamOffset::Out, ParamOffset::Slowness];

    /// Map `id % 3` back to an offset.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::In),
            1 => Some(Self::Out),
            2 => Some(Self::Slowness),
            _ => None,
        }
    }

    /// Lowercase name used in scenario files and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Slowness => "slowness",
        }
    }
}

/// Stable host parameter id.
///
/// Maps directly to a VST3 `ParamID` or CLAP `clap_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

impl ParamId {
    /// Id of `offset` inside parameter set `set`.
    pub fn new(set: usize, offset: ParamOffset) -> Self {
        Self(set as u32 * ParamOffset::COUNT + offset as u32)
    }

    /// Parameter set this id belongs to.
    pub fn set(self) -> usize {
        (self.0 / ParamOffset::COUNT) as usize
    }

    /// Which of the three parameters of the set this id addresses.
    pub fn offset(self) -> ParamOffset {
        match self.0 % ParamOffset::COUNT {
            0 => ParamOffset::In,
            1 => ParamOffset::Out,
            _ => ParamOffset::Slowness,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.offset().name(), self.set() + 1)
    }
}

/// Clamp a normalized value into `[0, 1]`. NaN collapses to 0.
#[inline]
pub fn constrain(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The three scalars carried by a parameter set across blocks.
///
/// All setters constrain their argument, so every field is always in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSet {
    input: f64,
    output: f64,
    slowness: f64,
}

impl ParamSet {
    /// Build a set from raw values, constraining each.
    pub fn new(input: f64, output: f64, slowness: f64) -> Self {
        Self {
            input: constrain(input),
            output: constrain(output),
            slowness: constrain(slowness),
        }
    }

    /// Current target value.
    #[inline]
    pub fn input(&self) -> f64 {
        self.input
    }

    /// Current smoothed value.
    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }

    /// Current smoothing coefficient.
    #[inline]
    pub fn slowness(&self) -> f64 {
        self.slowness
    }

    /// Jump-assign the target value.
    pub fn set_input(&mut self, value: f64) {
        self.input = constrain(value);
    }

    /// Jump-assign the smoothed value.
    pub fn set_output(&mut self, value: f64) {
        self.output = constrain(value);
    }

    /// Jump-assign the smoothing coefficient.
    pub fn set_slowness(&mut self, value: f64) {
        self.slowness = constrain(value);
    }

    /// Read a value by its offset within the set.
    pub fn normalized(&self, offset: ParamOffset) -> f64 {
        match offset {
            ParamOffset::In => self.input,
            ParamOffset::Out => self.output,
            ParamOffset::Slowness => self.slowness,
        }
    }

    /// Jump-assign a value by its offset within the set.
    pub fn set_normalized(&mut self, offset: ParamOffset, value: f64) {
        match offset {
            ParamOffset::In => self.set_input(value),
            ParamOffset::Out => self.set_output(value),
            ParamOffset::Slowness => self.set_slowness(value),
        }
    }

    /// `(in, out, slowness)` in persisted order.
    pub fn to_array(&self) -> [f64; 3] {
        [self.input, self.output, self.slowness]
    }

    /// Inverse of [`to_array`](Self::to_array).
    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            input: 0.0,
            output: 0.0,
            slowness: DEFAULT_SLOWNESS,
        }
    }
}
