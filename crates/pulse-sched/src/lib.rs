//! pulse-sched: Update coalescing primitives
//!
//! Three independent tools, each with its own timing contract:
//! - `FrameBatcher` merges patches and applies them once per frame
//! - `Debounce` only settles after input goes quiet for `delay`
//! - `Throttle` fires on the leading edge, at most once per `delay`
//!
//! All timing goes through `tokio::time`, so tests can pause the clock.

pub mod debounce;
pub mod frame;
pub mod throttle;

pub use debounce::Debounce;
pub use frame::{FrameBatcher, FrameState, Patch, Submitter};
pub use throttle::Throttle;
