//! Lento Core - slew-limited parameter smoothing for block-based audio hosts
//!
//! This crate turns host parameter automation into rate-limited output
//! curves, one block at a time, with no allocation in the processing path.
//! Each parameter set has three parameters:
//!
//! - **In**: the target value the output moves toward
//! - **Out**: the smoothed output; host points on it override smoothing
//! - **Slowness**: how fast the output may move, from instant to frozen
//!
//! Every output transition is also reported as a stream of 7-bit step
//! events for consumers that only understand discrete controllers.
//!
//! # Core Abstractions
//!
//! ## Block Processing
//!
//! - [`Smoother`] - Owns the persisted parameter sets and drives blocks
//! - [`BlockInput`] / [`BlockOutput`] - Everything going in and out of one block
//! - [`SmootherConfig`] - Set count, slope model and per-block capacities
//!
//! ## Curves
//!
//! - [`AutomationPoint`] - One `(offset, value)` breakpoint
//! - [`CurveSource`] / [`CurveSink`] - Read and write sides of a point queue
//! - [`ParamQueue`] - A host curve tagged with its [`ParamId`]
//! - [`PointQueue`] / [`OutputChanges`] - Preallocated output storage
//!
//! ## Step Events
//!
//! - [`StepEvent`] - One quantized control change
//! - [`EventSink`] / [`EventBuffer`] - Event delivery
//! - [`emit_ramp`] - Projection of a linear transition onto 128 levels
//!
//! ## Utilities
//!
//! - Slope model: [`max_slope`], [`traverse_time_secs`], [`slowness_for_traverse_time`]
//! - Clamped linear interpolation: [`interpolate`]
//! - State persistence: [`write_state`], [`read_state`]
//!
//! # Features
//!
//! - `tracing` - Emit lifecycle and abort diagnostics through the `tracing` crate
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
//! let mut changes = OutputChanges::new(&config);
//! let mut events = EventBuffer::with_capacity(config.max_events_per_block);
//!
//! // Ask set 0 to glide to 1.0 with moderate slowness.
//! let target = [AutomationPoint::new(0, 1.0)];
//! let queues = [ParamQueue::new(ParamId::new(0, ParamOffset::In), &target)];
//!
//! smoother
//!     .process(
//!         &BlockInput::new(48000.0, 512).with_changes(&queues),
//!         &mut BlockOutput::new().with_changes(&mut changes).with_events(&mut events),
//!     )
//!     .unwrap();
//!
//! let out = smoother.sets()[0].output();
//! assert!(out > 0.0 && out < 1.0);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations while processing a block
//! - **Sample accurate**: Output points land on exact sample offsets
//! - **Transactional**: A block that fails emits nothing and leaves the persisted state untouched

pub mod config;
mod cursor;
pub mod curve;
pub mod error;
pub mod interpolate;
mod merge;
pub mod param_set;
pub mod slope;
pub mod smoother;
pub mod state;
pub mod step_event;

// Re-export main types at crate root
pub use config::{CONTROLLER_LIMIT, MAX_PARAM_SETS, SmootherConfig};
pub use curve::{
    AutomationPoint, CurveSink, CurveSource, OutputChanges, ParamChanges, ParamQueue, PointQueue,
    QueueFull,
};
pub use error::EngineError;
pub use interpolate::interpolate;
pub use param_set::{DEFAULT_SLOWNESS, ParamId, ParamOffset, ParamSet, constrain};
pub use slope::{max_slope, slowness_for_traverse_time, traverse_time_secs};
pub use smoother::{BlockInput, BlockOutput, Smoother};
pub use state::{RECORD_BYTES, read_state, write_state};
pub use step_event::{
    EventBuffer, EventSink, MAX_LEVEL, NullEvents, StepEvent, emit_ramp, level_to_value, quantize,
};
