//! Live run state
//!
//! A [`RunState`] is what the scheduler steps every frame. Stepping is split
//! in two halves around the user callbacks: [`RunState::sample`] turns time
//! into eased progress, [`RunState::complete_leg`] does the loop and yoyo
//! bookkeeping once the callbacks have returned.

use crate::owner::OwnerToken;
use crate::scheduler::RunId;
use crate::spec::RunSpec;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Weak;

/// Shared cell between an `Animation` and its live run
///
/// The scheduler reports a run's end through [`settle`](Self::settle); the
/// report only lands if the binding still names that run.
#[derive(Debug, Default)]
pub(crate) struct Binding {
    live: Cell<Option<RunId>>,
    progress: Cell<f64>,
}

impl Binding {
    pub(crate) fn live(&self) -> Option<RunId> {
        self.live.get()
    }

    pub(crate) fn attach(&self, id: RunId) {
        self.live.set(Some(id));
    }

    /// Forget the live run without touching the cache
    pub(crate) fn release(&self) -> Option<RunId> {
        self.live.take()
    }

    pub(crate) fn cached(&self) -> f64 {
        self.progress.get()
    }

    pub(crate) fn set_cached(&self, progress: f64) {
        self.progress.set(progress.clamp(0.0, 1.0));
    }

    /// Record the end of run `id`. Stale reports are ignored.
    pub(crate) fn settle(&self, id: RunId, progress: f64) -> bool {
        if self.live.get() != Some(id) {
            return false;
        }
        self.live.set(None);
        self.set_cached(progress);
        true
    }
}

/// Result of the time half of a step
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Sample {
    /// The owner is gone; the run must end with progress 0.0
    OwnerLost,
    /// Paused or still inside the delay window
    Idle,
    /// Deliver `eased` to the callbacks
    Frame { leg_progress: f64, eased: f64 },
}

/// Result of the bookkeeping half of a step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LegOutcome {
    Running,
    Finished,
}

/// Why a run left the scheduler during a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Termination {
    Finished,
    /// The tick returned `TickFlow::Stop`
    Stopped,
    /// `TickFlow::Error` or a panicking callback
    Failed,
    OwnerLost,
}

impl Termination {
    /// Progress the animation caches once the run is gone
    pub(crate) fn cached_progress(self) -> f64 {
        match self {
            Termination::OwnerLost => 0.0,
            Termination::Finished | Termination::Stopped | Termination::Failed => 1.0,
        }
    }
}

pub(crate) struct RunState {
    pub(crate) owner: OwnerToken,
    pub(crate) spec: RunSpec,
    start_ms: i64,
    elapsed_ms: i64,
    paused: bool,
    reverse: bool,
    remaining_cycles: Option<u32>,
    pub(crate) binding: Option<Weak<Binding>>,
    pub(crate) pending_removal: bool,
}

impl RunState {
    pub(crate) fn new(
        owner: OwnerToken,
        spec: RunSpec,
        now: i64,
        binding: Option<Weak<Binding>>,
    ) -> Self {
        let remaining_cycles = spec.cycle_budget();
        Self {
            owner,
            spec,
            start_ms: now,
            elapsed_ms: 0,
            paused: false,
            reverse: false,
            remaining_cycles,
            binding,
            pending_removal: false,
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Needs the tick source: not paused and not on its way out
    pub(crate) fn is_active(&self) -> bool {
        !self.paused && !self.pending_removal
    }

    pub(crate) fn pause(&mut self, now: i64) -> bool {
        if self.paused {
            return false;
        }
        self.elapsed_ms += now - self.start_ms;
        self.paused = true;
        true
    }

    pub(crate) fn resume(&mut self, now: i64) -> bool {
        if !self.paused {
            return false;
        }
        self.start_ms = now;
        self.paused = false;
        true
    }

    /// Time progress of the current leg, ignoring easing and direction
    pub(crate) fn forward_progress(&self, now: i64) -> f64 {
        let running = if self.paused {
            self.elapsed_ms
        } else {
            self.elapsed_ms + (now - self.start_ms)
        };
        let active = (running - i64::from(self.spec.delay_ms)).max(0);
        (active as f64 / f64::from(self.spec.effective_duration_ms())).clamp(0.0, 1.0)
    }

    pub(crate) fn sample(&self, now: i64) -> Sample {
        if !self.owner.is_alive() {
            return Sample::OwnerLost;
        }
        if self.paused {
            return Sample::Idle;
        }

        let local = now - self.start_ms + self.elapsed_ms;
        let delay = i64::from(self.spec.delay_ms);
        if local < delay {
            return Sample::Idle;
        }

        let duration = f64::from(self.spec.effective_duration_ms());
        let leg_progress = ((local - delay) as f64 / duration).clamp(0.0, 1.0);
        let input = if self.reverse {
            1.0 - leg_progress
        } else {
            leg_progress
        };

        Sample::Frame {
            leg_progress,
            eased: self.spec.easing.evaluate(input),
        }
    }

    /// Advance loop/yoyo state after a delivered frame
    pub(crate) fn complete_leg(&mut self, leg_progress: f64, now: i64) -> LegOutcome {
        if leg_progress < 1.0 {
            return LegOutcome::Running;
        }

        if self.spec.yoyo {
            self.reverse = !self.reverse;
            // A round-trip ends when we flip back to forward
            if !self.reverse && self.consume_cycle() {
                return LegOutcome::Finished;
            }
        } else if self.consume_cycle() {
            return LegOutcome::Finished;
        }

        // Next leg, delay included
        self.start_ms = now;
        self.elapsed_ms = 0;
        LegOutcome::Running
    }

    /// Returns true when the budget is spent
    fn consume_cycle(&mut self) -> bool {
        match self.remaining_cycles {
            None => false,
            Some(left) => {
                let left = left.saturating_sub(1);
                self.remaining_cycles = Some(left);
                left == 0
            }
        }
    }
}

/// Run a user callback, containing any panic
///
/// Returns `None` if the callback panicked. The panic is logged and not
/// propagated.
pub(crate) fn guarded<R>(hook: &'static str, callback: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(value) => Some(value),
        Err(payload) => {
            tracing::error!(
                hook,
                message = %panic_message(payload.as_ref()),
                "animation callback panicked"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::CubicBezier;
    use crate::owner::Owner;
    use slotmap::SlotMap;

    // LINEAR is solved by bisection too, so eased values are compared loosely
    fn linear(duration_ms: u32) -> RunSpec {
        RunSpec {
            duration_ms,
            easing: CubicBezier::LINEAR,
            ..RunSpec::default()
        }
    }

    fn eased(sample: Sample) -> f64 {
        match sample {
            Sample::Frame { eased, .. } => eased,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_delay_window_is_idle() {
        let owner = Owner::new();
        let spec = RunSpec {
            delay_ms: 50,
            ..linear(100)
        };
        let run = RunState::new(owner.token(), spec, 0, None);

        assert_eq!(run.sample(49), Sample::Idle);
        assert_eq!(eased(run.sample(50)), 0.0);
        assert_eq!(run.forward_progress(25), 0.0);
        assert!((run.forward_progress(100) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_owner_loss_is_reported() {
        let owner = Owner::new();
        let run = RunState::new(owner.token(), linear(100), 0, None);
        drop(owner);
        assert_eq!(run.sample(10), Sample::OwnerLost);
    }

    #[test]
    fn test_single_leg_finishes() {
        let owner = Owner::new();
        let mut run = RunState::new(owner.token(), linear(100), 0, None);

        let Sample::Frame { leg_progress, .. } = run.sample(40) else {
            panic!("expected a frame");
        };
        assert_eq!(run.complete_leg(leg_progress, 40), LegOutcome::Running);

        let Sample::Frame {
            leg_progress,
            eased,
        } = run.sample(120)
        else {
            panic!("expected a frame");
        };
        assert_eq!(leg_progress, 1.0);
        assert_eq!(eased, 1.0);
        assert_eq!(run.complete_leg(leg_progress, 120), LegOutcome::Finished);
    }

    #[test]
    fn test_loop_restarts_legs() {
        let owner = Owner::new();
        let spec = RunSpec {
            loop_count: 3,
            ..linear(10)
        };
        let mut run = RunState::new(owner.token(), spec, 0, None);

        assert_eq!(run.complete_leg(1.0, 10), LegOutcome::Running);
        assert!((eased(run.sample(15)) - 0.5).abs() < 0.01);
        assert_eq!(run.complete_leg(1.0, 20), LegOutcome::Running);
        assert_eq!(run.complete_leg(1.0, 30), LegOutcome::Finished);
    }

    #[test]
    fn test_infinite_loop_never_finishes() {
        let owner = Owner::new();
        let spec = RunSpec {
            loop_count: -1,
            ..linear(10)
        };
        let mut run = RunState::new(owner.token(), spec, 0, None);
        for leg in 1..=100 {
            assert_eq!(run.complete_leg(1.0, leg * 10), LegOutcome::Running);
        }
    }

    #[test]
    fn test_yoyo_reverses_then_finishes() {
        let owner = Owner::new();
        let spec = RunSpec {
            loop_count: 2,
            yoyo: true,
            ..linear(100)
        };
        let mut run = RunState::new(owner.token(), spec, 0, None);

        assert!((eased(run.sample(25)) - 0.25).abs() < 0.01);
        assert_eq!(run.complete_leg(1.0, 100), LegOutcome::Running);
        assert!(run.is_reverse());
        assert!((eased(run.sample(125)) - 0.75).abs() < 0.01);
        assert_eq!(run.complete_leg(1.0, 200), LegOutcome::Finished);
    }

    #[test]
    fn test_zero_budget_behaves_like_one() {
        let owner = Owner::new();
        let spec = RunSpec {
            loop_count: 0,
            ..linear(10)
        };
        let mut run = RunState::new(owner.token(), spec, 0, None);
        assert_eq!(run.complete_leg(1.0, 10), LegOutcome::Finished);
    }

    #[test]
    fn test_pause_banks_elapsed_time() {
        let owner = Owner::new();
        let mut run = RunState::new(owner.token(), linear(100), 0, None);

        assert!(run.pause(30));
        assert!(!run.pause(35));
        assert_eq!(run.sample(500), Sample::Idle);
        assert!((run.forward_progress(500) - 0.3).abs() < 1e-9);

        assert!(run.resume(1000));
        assert!((eased(run.sample(1020)) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_binding_ignores_stale_runs() {
        let mut ids: SlotMap<RunId, ()> = SlotMap::with_key();
        let first = ids.insert(());
        let second = ids.insert(());

        let binding = Binding::default();
        binding.attach(second);
        assert!(!binding.settle(first, 0.0));
        assert_eq!(binding.live(), Some(second));

        assert!(binding.settle(second, 1.0));
        assert_eq!(binding.live(), None);
        assert_eq!(binding.cached(), 1.0);
    }

    #[test]
    fn test_guarded_contains_panics() {
        assert_eq!(guarded("test", || 7), Some(7));
        assert_eq!(guarded("test", || -> i32 { panic!("boom") }), None);
    }
}
