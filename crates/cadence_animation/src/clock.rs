//! Time and frame sources
//!
//! The scheduler reads time from a [`Clock`] and asks a [`FrameSource`] to
//! call it back after `step_ms`. Hosts plug in their own event-loop timer;
//! [`PumpedFrameSource`] covers loops that poll, and tests.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock measured from the moment it was created
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for deterministic playback
///
/// Clones share the same time, so a test can keep one and give another to
/// the scheduler.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

/// Callback handed to a frame source; runs one scheduler frame
pub type FrameCallback = Box<dyn FnOnce()>;

/// One-shot timer supplied by the host
///
/// The scheduler arms it with `schedule` and re-arms after every frame.
/// `schedule` must not invoke the callback synchronously.
pub trait FrameSource {
    /// Run `callback` once, `after_ms` from now, replacing any pending one
    fn schedule(&self, after_ms: u32, callback: FrameCallback);

    /// Drop the pending callback, if any
    fn cancel(&self);
}

/// Frame source for hosts that poll
///
/// The host calls [`pump`](Self::pump) from its loop (or sleeps until
/// [`next_deadline_ms`](Self::next_deadline_ms)); a due callback fires from
/// inside `pump`.
#[derive(Clone)]
pub struct PumpedFrameSource {
    clock: Rc<dyn Clock>,
    pending: Rc<RefCell<Option<(i64, FrameCallback)>>>,
}

impl PumpedFrameSource {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Rc::new(clock),
            pending: Rc::new(RefCell::new(None)),
        }
    }

    /// Fire the pending callback if it is due. Returns whether it fired.
    pub fn pump(&self) -> bool {
        let now = self.clock.now_ms();
        let due = matches!(self.pending.borrow().as_ref(), Some((at, _)) if *at <= now);
        if !due {
            return false;
        }
        // Release the slot before running: the callback re-arms through schedule()
        let fired = self.pending.borrow_mut().take();
        match fired {
            Some((_, callback)) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.borrow().is_some()
    }

    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.pending.borrow().as_ref().map(|(at, _)| *at)
    }
}

impl FrameSource for PumpedFrameSource {
    fn schedule(&self, after_ms: u32, callback: FrameCallback) {
        let at = self.clock.now_ms() + i64::from(after_ms);
        *self.pending.borrow_mut() = Some((at, callback));
    }

    fn cancel(&self) {
        self.pending.borrow_mut().take();
    }
}

impl fmt::Debug for PumpedFrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PumpedFrameSource")
            .field("next_deadline_ms", &self.next_deadline_ms())
            .finish()
    }
}
