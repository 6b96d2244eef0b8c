//! Run specifications
//!
//! A [`RunSpec`] is the recipe for one run: timing, easing and callbacks. It
//! is staged on an [`Animation`](crate::Animation), then copied into the
//! scheduler on `play()` and never mutated while the run is live.

use crate::config::RunDefaults;
use crate::easing::CubicBezier;
use std::fmt;
use std::rc::Rc;

/// What a per-frame tick wants the scheduler to do next
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickFlow {
    /// Keep the run scheduled
    #[default]
    Continue,
    /// End the run now (no `on_finish`, no `on_cancel`)
    Stop,
    /// The tick failed; the run is logged and ended like `Stop`
    Error,
}

impl From<bool> for TickFlow {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            TickFlow::Continue
        } else {
            TickFlow::Stop
        }
    }
}

impl From<()> for TickFlow {
    fn from(_: ()) -> Self {
        TickFlow::Continue
    }
}

/// Per-frame tick, receives the eased value
pub type TickFn = Rc<dyn Fn(f64) -> TickFlow>;
/// `on_update` hook, receives the eased value
pub type UpdateFn = Rc<dyn Fn(f64)>;
/// Lifecycle hook (`on_start`, `on_finish`, `on_cancel`)
pub type HookFn = Rc<dyn Fn()>;

/// Parameters and callbacks for one run
#[derive(Clone)]
pub struct RunSpec {
    /// Duration of one leg in milliseconds (0 is treated as 1)
    pub duration_ms: u32,
    /// Wait before each leg starts
    pub delay_ms: u32,
    /// Number of legs; negative means infinite
    pub loop_count: i32,
    /// Alternate forward and reverse legs
    pub yoyo: bool,
    pub easing: CubicBezier,
    pub tick: Option<TickFn>,
    pub on_start: Option<HookFn>,
    pub on_finish: Option<HookFn>,
    pub on_cancel: Option<HookFn>,
    pub on_update: Option<UpdateFn>,
}

impl RunSpec {
    pub fn from_defaults(defaults: &RunDefaults) -> Self {
        Self {
            duration_ms: defaults.duration_ms,
            delay_ms: defaults.delay_ms,
            loop_count: defaults.loop_count,
            yoyo: defaults.yoyo,
            easing: defaults.easing,
            tick: None,
            on_start: None,
            on_finish: None,
            on_cancel: None,
            on_update: None,
        }
    }

    /// Leg duration used for stepping, never zero
    pub fn effective_duration_ms(&self) -> u32 {
        self.duration_ms.max(1)
    }

    /// Cycles this run may consume before it finishes; `None` is unbounded.
    ///
    /// Without yoyo a cycle is one leg. With yoyo a cycle is a full
    /// forward+back round-trip, so `loop_count` legs round up to
    /// `(loop_count + 1) / 2` round-trips.
    pub fn cycle_budget(&self) -> Option<u32> {
        if self.loop_count < 0 {
            return None;
        }
        let legs = self.loop_count as u32;
        Some(if self.yoyo { legs.div_ceil(2) } else { legs })
    }
}

impl Default for RunSpec {
    fn default() -> Self {
        Self::from_defaults(&RunDefaults::default())
    }
}

impl fmt::Debug for RunSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSpec")
            .field("duration_ms", &self.duration_ms)
            .field("delay_ms", &self.delay_ms)
            .field("loop_count", &self.loop_count)
            .field("yoyo", &self.yoyo)
            .field("easing", &self.easing)
            .field("tick", &self.tick.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}
