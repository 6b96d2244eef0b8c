//! Cadence Animation Scheduler
//!
//! Time-based tweens advanced by a shared, single-threaded frame loop.
//!
//! # Features
//!
//! - **Eased Tweens**: Cubic bezier easing solved by bounded bisection
//! - **Loop & Yoyo**: Finite or infinite legs, alternating direction
//! - **Lifecycle Hooks**: Start, update, tick, finish and cancel callbacks
//! - **Re-entrancy Safe**: Callbacks may play, stop, cancel or kill anything,
//!   including the animation that is calling them
//! - **Owner Liveness**: Runs end on their own when their owner goes away
//! - **Host Agnostic**: Frames come from any [`FrameSource`] or manual ticks
//!
//! # Example
//!
//! ```ignore
//! use cadence_animation::{Animation, ManualClock, Owner, Scheduler, SchedulerConfig};
//!
//! let clock = ManualClock::new();
//! let scheduler = Scheduler::new(SchedulerConfig::default()).with_clock(clock.clone());
//! let owner = Owner::new();
//!
//! let slide = Animation::new(scheduler.handle(), owner.token());
//! slide.duration(80).on_tick(|v| println!("x = {v:.3}"));
//! slide.play();
//!
//! for _ in 0..100 {
//!     clock.advance(1);
//!     scheduler.tick_once();
//! }
//! assert_eq!(slide.progress(), 1.0);
//! ```

pub mod animation;
pub mod clock;
pub mod config;
pub mod easing;
pub mod error;
pub mod owner;
mod run;
pub mod runtime;
pub mod scheduler;
pub mod spec;

pub use animation::Animation;
pub use clock::{Clock, FrameCallback, FrameSource, ManualClock, PumpedFrameSource, SystemClock};
pub use config::{RunDefaults, SchedulerConfig};
pub use easing::CubicBezier;
pub use error::{ConfigError, Result, SchedulerError};
pub use owner::{Owner, OwnerToken};
pub use scheduler::{RunId, Scheduler, SchedulerHandle};
pub use spec::{HookFn, RunSpec, TickFlow, TickFn, UpdateFn};
