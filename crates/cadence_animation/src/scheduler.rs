//! Animation scheduler
//!
//! Owns every live run and advances them once per frame. Frames come either
//! from a host [`FrameSource`] (armed only while some run needs time to pass)
//! or from explicit manual ticks.
//!
//! # Re-entrancy
//!
//! Callbacks may call back into the scheduler or into any animation while a
//! frame is in progress. No `RefCell` borrow is held across user code, and the
//! active-run list is only compacted once the sweep has returned: removal
//! during a sweep marks the run `pending_removal` instead.

use crate::clock::{Clock, FrameSource, SystemClock};
use crate::config::{RunDefaults, SchedulerConfig, MAX_FPS, MIN_FPS};
use crate::owner::OwnerToken;
use crate::run::{guarded, Binding, LegOutcome, RunState, Sample, Termination};
use crate::spec::TickFlow;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Generational handle to a live run
    pub struct RunId;
}

pub(crate) struct SchedulerInner {
    runs: SlotMap<RunId, RunState>,
    /// Insertion order; the sweep walks this
    order: Vec<RunId>,
    clock: Rc<dyn Clock>,
    frame_source: Option<Rc<dyn FrameSource>>,
    defaults: RunDefaults,
    max_manual_step_ms: u32,
    fps: u32,
    step_ms: u32,
    running: bool,
    /// Bumped on every arm/disarm so stale timer callbacks can tell
    timer_generation: u64,
    sweeping: bool,
    /// `order` was cleared mid-sweep; restart the sweep cursor
    order_reset: bool,
    /// Time clamped away by manual ticks
    suspended_ms: i64,
    manual_last_now: Option<i64>,
}

impl SchedulerInner {
    fn has_active_runs(&self) -> bool {
        self.runs.values().any(RunState::is_active)
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms() - self.suspended_ms
    }
}

fn step_for(fps: u32) -> u32 {
    (1000 / fps).max(1)
}

/// Strong reference to the shared scheduler state
///
/// Dropping a `Core` never finalizes; only [`Scheduler`] does.
#[derive(Clone)]
pub(crate) struct Core(Rc<RefCell<SchedulerInner>>);

impl Core {
    fn downgrade(&self) -> Weak<RefCell<SchedulerInner>> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.0.borrow().now_ms()
    }

    pub(crate) fn defaults(&self) -> RunDefaults {
        self.0.borrow().defaults
    }

    pub(crate) fn add(&self, state: RunState) -> RunId {
        let id = {
            let mut inner = self.0.borrow_mut();
            let id = inner.runs.insert(state);
            inner.order.push(id);
            id
        };
        self.ensure_running();
        id
    }

    /// Remove a run, or mark it for removal if a sweep is in progress
    pub(crate) fn remove(&self, id: RunId) {
        let removed = {
            let mut inner = self.0.borrow_mut();
            if inner.sweeping {
                if let Some(run) = inner.runs.get_mut(id) {
                    run.pending_removal = true;
                    run.binding = None;
                }
                None
            } else {
                inner.order.retain(|other| *other != id);
                inner.runs.remove(id)
            }
        };
        // Dropping a run drops user closures; keep that outside the borrow
        drop(removed);
        self.stop_if_idle();
    }

    /// Read a run that is still scheduled
    pub(crate) fn with_run<R>(&self, id: RunId, read: impl FnOnce(&RunState) -> R) -> Option<R> {
        let inner = self.0.borrow();
        inner
            .runs
            .get(id)
            .filter(|run| !run.pending_removal)
            .map(read)
    }

    pub(crate) fn run_progress(&self, id: RunId) -> Option<f64> {
        let inner = self.0.borrow();
        let now = inner.now_ms();
        inner
            .runs
            .get(id)
            .filter(|run| !run.pending_removal)
            .map(|run| run.forward_progress(now))
    }

    pub(crate) fn pause(&self, id: RunId) {
        let paused = {
            let mut inner = self.0.borrow_mut();
            let now = inner.now_ms();
            match inner.runs.get_mut(id) {
                Some(run) if !run.pending_removal => run.pause(now),
                _ => false,
            }
        };
        if paused {
            self.stop_if_idle();
        }
    }

    pub(crate) fn resume(&self, id: RunId) {
        let resumed = {
            let mut inner = self.0.borrow_mut();
            let now = inner.now_ms();
            match inner.runs.get_mut(id) {
                Some(run) if !run.pending_removal => run.resume(now),
                _ => false,
            }
        };
        if resumed {
            self.ensure_running();
        }
    }

    /// Step every run to `now`, then compact the ones that ended
    pub(crate) fn run_frame(&self, now: i64) {
        {
            let mut inner = self.0.borrow_mut();
            if inner.sweeping {
                tracing::warn!("nested animation frame ignored");
                return;
            }
            inner.sweeping = true;
            tracing::trace!(now, runs = inner.order.len(), "animation frame");
        }

        // Runs added by callbacks land at the end and are stepped this frame
        let mut index = 0;
        loop {
            let id = {
                let mut inner = self.0.borrow_mut();
                if std::mem::take(&mut inner.order_reset) {
                    index = 0;
                }
                match inner.order.get(index) {
                    Some(id) => *id,
                    None => break,
                }
            };
            index += 1;
            self.step(id, now);
        }

        self.compact();
    }

    fn step(&self, id: RunId, now: i64) {
        let (sample, on_update, tick) = {
            let inner = self.0.borrow();
            let Some(run) = inner.runs.get(id) else {
                return;
            };
            if run.pending_removal {
                return;
            }
            (
                run.sample(now),
                run.spec.on_update.clone(),
                run.spec.tick.clone(),
            )
        };

        let (leg_progress, eased) = match sample {
            Sample::Idle => return,
            Sample::OwnerLost => {
                tracing::trace!(?id, "animation owner gone");
                self.terminate(id, Termination::OwnerLost);
                return;
            }
            Sample::Frame {
                leg_progress,
                eased,
            } => (leg_progress, eased),
        };

        if let Some(on_update) = on_update {
            if guarded("on_update", || on_update(eased)).is_none() {
                self.terminate(id, Termination::Failed);
                return;
            }
            if self.with_run(id, |_| ()).is_none() {
                return;
            }
        }

        if let Some(tick) = tick {
            match guarded("tick", || tick(eased)) {
                Some(TickFlow::Continue) => {}
                Some(TickFlow::Stop) => {
                    self.terminate(id, Termination::Stopped);
                    return;
                }
                Some(TickFlow::Error) => {
                    tracing::warn!(?id, "animation tick reported an error, ending run");
                    self.terminate(id, Termination::Failed);
                    return;
                }
                None => {
                    self.terminate(id, Termination::Failed);
                    return;
                }
            }
        }

        // Callbacks may have cancelled or replaced this run
        let (outcome, on_finish) = {
            let mut inner = self.0.borrow_mut();
            let Some(run) = inner.runs.get_mut(id) else {
                return;
            };
            if run.pending_removal {
                return;
            }
            (
                run.complete_leg(leg_progress, now),
                run.spec.on_finish.clone(),
            )
        };

        if outcome == LegOutcome::Finished {
            self.terminate(id, Termination::Finished);
            if let Some(on_finish) = on_finish {
                guarded("on_finish", || on_finish());
            }
        }
    }

    /// Mark a run ended and report it to its animation
    fn terminate(&self, id: RunId, why: Termination) {
        let binding = {
            let mut inner = self.0.borrow_mut();
            let Some(run) = inner.runs.get_mut(id) else {
                return;
            };
            if run.pending_removal {
                return;
            }
            run.pending_removal = true;
            run.binding.take()
        };
        if let Some(binding) = binding.and_then(|weak| weak.upgrade()) {
            binding.settle(id, why.cached_progress());
        }
    }

    fn compact(&self) {
        let removed = {
            let mut inner = self.0.borrow_mut();
            inner.sweeping = false;
            inner.order_reset = false;
            let SchedulerInner { runs, order, .. } = &mut *inner;
            let mut removed: SmallVec<[RunState; 4]> = SmallVec::new();
            order.retain(|id| match runs.get(*id).map(|run| run.pending_removal) {
                Some(true) => {
                    removed.extend(runs.remove(*id));
                    false
                }
                Some(false) => true,
                None => false,
            });
            removed
        };
        drop(removed);
        self.stop_if_idle();
    }

    /// Force-end every run of `owner` and every run whose owner is gone
    pub(crate) fn kill_all_for(&self, owner: &OwnerToken) -> usize {
        let (killed, sweeping) = {
            let mut inner = self.0.borrow_mut();
            let mut killed: SmallVec<[(RunId, Option<Weak<Binding>>); 8]> = SmallVec::new();
            for (id, run) in inner.runs.iter_mut() {
                if run.pending_removal {
                    continue;
                }
                if run.owner == *owner || !run.owner.is_alive() {
                    run.pending_removal = true;
                    killed.push((id, run.binding.take()));
                }
            }
            (killed, inner.sweeping)
        };

        for (id, binding) in &killed {
            if let Some(binding) = binding.as_ref().and_then(Weak::upgrade) {
                binding.settle(*id, 0.0);
            }
        }
        tracing::debug!(killed = killed.len(), "killed animations for owner");
        // A running sweep compacts on its own
        if !sweeping {
            self.compact();
        }
        killed.len()
    }

    /// Stop ticking and drop every run, snapshotting progress into bindings
    pub(crate) fn finalize(&self) {
        self.disarm();
        let (drained, now) = {
            let mut inner = self.0.borrow_mut();
            let now = inner.now_ms();
            inner.order.clear();
            inner.order_reset = inner.sweeping;
            inner.manual_last_now = None;
            let drained: Vec<(RunId, RunState)> = inner.runs.drain().collect();
            (drained, now)
        };
        if drained.is_empty() {
            return;
        }

        tracing::debug!(runs = drained.len(), "finalizing animation scheduler");
        for (id, run) in &drained {
            if let Some(binding) = run.binding.as_ref().and_then(Weak::upgrade) {
                binding.settle(*id, run.forward_progress(now));
            }
        }
        drop(drained);
    }

    pub(crate) fn set_fps(&self, fps: u32) {
        let (fps, step_ms, running) = {
            let mut inner = self.0.borrow_mut();
            inner.fps = fps.clamp(MIN_FPS, MAX_FPS);
            inner.step_ms = step_for(inner.fps);
            (inner.fps, inner.step_ms, inner.running)
        };
        tracing::debug!(fps, step_ms, "animation fps changed");
        if running {
            self.disarm();
            self.arm();
        }
    }

    pub(crate) fn fps(&self) -> u32 {
        self.0.borrow().fps
    }

    /// One manual frame; `max_clamp_ms > 0` limits how far time may jump
    pub(crate) fn tick_manual_once(&self, max_clamp_ms: u32) {
        let frame_now = {
            let mut inner = self.0.borrow_mut();
            let wall = inner.now_ms();
            let last = inner.manual_last_now.unwrap_or(wall);
            let mut dt = wall - last;
            if dt < 0 {
                // Clock went backwards; hold time at the last frame
                inner.suspended_ms += dt;
                dt = 0;
            }
            let clamp = i64::from(max_clamp_ms);
            if clamp > 0 && dt > clamp {
                // Bank the excess so now_ms() agrees with the frame time
                inner.suspended_ms += dt - clamp;
                dt = clamp;
            }
            let now = last + dt;
            inner.manual_last_now = Some(now);
            now
        };
        self.run_frame(frame_now);
    }

    pub(crate) fn tick(&self, frames: u32, max_clamp_ms: u32) {
        for _ in 0..frames {
            self.tick_manual_once(max_clamp_ms);
        }
    }

    pub(crate) fn tick_once(&self) {
        let clamp = self.0.borrow().max_manual_step_ms;
        self.tick_manual_once(clamp);
    }

    pub(crate) fn active_count(&self) -> usize {
        let inner = self.0.borrow();
        inner.runs.values().filter(|run| !run.pending_removal).count()
    }

    pub(crate) fn is_ticking(&self) -> bool {
        self.0.borrow().running
    }

    fn stop_if_idle(&self) {
        let idle = {
            let inner = self.0.borrow();
            inner.running && !inner.has_active_runs()
        };
        if idle {
            self.disarm();
        }
    }

    fn ensure_running(&self) {
        let wake = {
            let inner = self.0.borrow();
            !inner.running && inner.has_active_runs()
        };
        if wake {
            self.arm();
        }
    }

    fn arm(&self) {
        let (source, step_ms, generation) = {
            let mut inner = self.0.borrow_mut();
            if inner.running {
                return;
            }
            let Some(source) = inner.frame_source.clone() else {
                return;
            };
            inner.running = true;
            inner.timer_generation += 1;
            (source, inner.step_ms, inner.timer_generation)
        };
        tracing::debug!(step_ms, "animation tick source armed");
        self.schedule_frame(&source, step_ms, generation);
    }

    fn disarm(&self) {
        let source = {
            let mut inner = self.0.borrow_mut();
            if !inner.running {
                return;
            }
            inner.running = false;
            inner.timer_generation += 1;
            inner.frame_source.clone()
        };
        tracing::debug!("animation tick source disarmed");
        if let Some(source) = source {
            source.cancel();
        }
    }

    fn schedule_frame(&self, source: &Rc<dyn FrameSource>, step_ms: u32, generation: u64) {
        let weak = self.downgrade();
        source.schedule(
            step_ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Core(inner).on_timer(generation);
                }
            }),
        );
    }

    fn on_timer(&self, generation: u64) {
        let now = {
            let inner = self.0.borrow();
            if !inner.running || inner.timer_generation != generation {
                return;
            }
            inner.now_ms()
        };

        self.run_frame(now);

        let next = {
            let mut inner = self.0.borrow_mut();
            if !inner.running || inner.timer_generation != generation {
                None
            } else if inner.order.is_empty() {
                inner.running = false;
                None
            } else {
                inner
                    .frame_source
                    .clone()
                    .map(|source| (source, inner.step_ms))
            }
        };
        if let Some((source, step_ms)) = next {
            self.schedule_frame(&source, step_ms, generation);
        }
    }
}

/// The animation scheduler
///
/// Owns the run arena. Dropping it finalizes: every live animation gets its
/// progress snapshot and no callback fires afterwards. Animations hold a
/// [`SchedulerHandle`], never the scheduler itself.
///
/// Without a frame source the scheduler only advances on
/// [`tick`](Self::tick)/[`tick_once`](Self::tick_once).
pub struct Scheduler {
    core: Core,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let fps = config.clamped_fps();
        let inner = SchedulerInner {
            runs: SlotMap::with_key(),
            order: Vec::new(),
            clock: Rc::new(SystemClock::new()),
            frame_source: None,
            defaults: config.defaults,
            max_manual_step_ms: config.max_manual_step_ms,
            fps,
            step_ms: step_for(fps),
            running: false,
            timer_generation: 0,
            sweeping: false,
            order_reset: false,
            suspended_ms: 0,
            manual_last_now: None,
        };
        Self {
            core: Core(Rc::new(RefCell::new(inner))),
        }
    }

    /// Replace the time source
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        {
            let mut inner = self.core.0.borrow_mut();
            inner.clock = Rc::new(clock);
            inner.suspended_ms = 0;
            inner.manual_last_now = None;
        }
        self
    }

    /// Drive frames from a host timer instead of manual ticks
    pub fn with_frame_source(self, source: impl FrameSource + 'static) -> Self {
        self.core.disarm();
        self.core.0.borrow_mut().frame_source = Some(Rc::new(source));
        self.core.ensure_running();
        self
    }

    /// A weak handle for animations and callbacks
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: self.core.downgrade(),
        }
    }

    pub(crate) fn core(&self) -> &Core {
        &self.core
    }

    /// Set the target frame rate, clamped to [1, 240]
    pub fn set_fps(&self, fps: u32) {
        self.core.set_fps(fps);
    }

    pub fn fps(&self) -> u32 {
        self.core.fps()
    }

    /// End every run bound to `owner` (and every orphaned run) with
    /// progress 0.0. Returns how many runs were ended.
    pub fn kill_all_for(&self, owner: &OwnerToken) -> usize {
        self.core.kill_all_for(owner)
    }

    /// Stop ticking and drop every run. Safe to call repeatedly.
    pub fn finalize(&self) {
        self.core.finalize();
    }

    /// Advance `frames` manual frames, clamping each step to `max_clamp_ms`
    /// when it is non-zero
    pub fn tick(&self, frames: u32, max_clamp_ms: u32) {
        self.core.tick(frames, max_clamp_ms);
    }

    /// One manual frame using the configured `max_manual_step_ms`
    pub fn tick_once(&self) {
        self.core.tick_once();
    }

    /// Runs still scheduled (pending removals excluded)
    pub fn active_count(&self) -> usize {
        self.core.active_count()
    }

    /// Whether the frame source is armed
    pub fn is_ticking(&self) -> bool {
        self.core.is_ticking()
    }

    /// Scheduler time in milliseconds
    pub fn now_ms(&self) -> i64 {
        self.core.now_ms()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.core.finalize();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("fps", &self.fps())
            .field("active", &self.active_count())
            .field("ticking", &self.is_ticking())
            .finish()
    }
}

/// Non-owning handle to a [`Scheduler`]
///
/// Every operation is a no-op (or returns an empty value) once the scheduler
/// has been dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    pub(crate) fn core(&self) -> Option<Core> {
        self.inner.upgrade().map(Core)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn set_fps(&self, fps: u32) {
        if let Some(core) = self.core() {
            core.set_fps(fps);
        }
    }

    pub fn fps(&self) -> Option<u32> {
        self.core().map(|core| core.fps())
    }

    pub fn kill_all_for(&self, owner: &OwnerToken) -> usize {
        self.core()
            .map(|core| core.kill_all_for(owner))
            .unwrap_or(0)
    }

    pub fn finalize(&self) {
        if let Some(core) = self.core() {
            core.finalize();
        }
    }

    pub fn tick(&self, frames: u32, max_clamp_ms: u32) {
        if let Some(core) = self.core() {
            core.tick(frames, max_clamp_ms);
        }
    }

    pub fn tick_once(&self) {
        if let Some(core) = self.core() {
            core.tick_once();
        }
    }

    pub fn active_count(&self) -> usize {
        self.core().map(|core| core.active_count()).unwrap_or(0)
    }

    pub fn is_ticking(&self) -> bool {
        self.core().is_some_and(|core| core.is_ticking())
    }

    pub fn now_ms(&self) -> Option<i64> {
        self.core().map(|core| core.now_ms())
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, PumpedFrameSource};
    use crate::owner::Owner;
    use crate::spec::RunSpec;
    use std::cell::Cell;

    fn manual() -> (Scheduler, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = Scheduler::default().with_clock(clock.clone());
        (scheduler, clock)
    }

    fn counting_spec(duration_ms: u32, ticks: &Rc<Cell<u32>>) -> RunSpec {
        let ticks = ticks.clone();
        RunSpec {
            duration_ms,
            tick: Some(Rc::new(move |_: f64| {
                ticks.set(ticks.get() + 1);
                TickFlow::Continue
            })),
            ..RunSpec::default()
        }
    }

    #[test]
    fn test_fps_is_clamped() {
        let scheduler = Scheduler::default();
        assert_eq!(scheduler.fps(), 60);
        scheduler.set_fps(0);
        assert_eq!(scheduler.fps(), 1);
        scheduler.set_fps(10_000);
        assert_eq!(scheduler.fps(), 240);
        assert_eq!(scheduler.core().0.borrow().step_ms, 4);
    }

    #[test]
    fn test_manual_frames_step_runs() {
        let (scheduler, clock) = manual();
        let owner = Owner::new();
        let ticks = Rc::new(Cell::new(0));
        let core = scheduler.core();
        core.add(RunState::new(owner.token(), counting_spec(20, &ticks), 0, None));

        // Manual mode never arms a timer
        assert!(!scheduler.is_ticking());

        for _ in 0..30 {
            clock.advance(1);
            scheduler.tick_once();
        }
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(ticks.get(), 20);
    }

    #[test]
    fn test_removal_during_sweep_is_deferred() {
        let (scheduler, clock) = manual();
        let owner = Owner::new();
        let core = scheduler.core().clone();
        let victim_ticks = Rc::new(Cell::new(0));
        let victim = core.add(RunState::new(
            owner.token(),
            counting_spec(1000, &victim_ticks),
            0,
            None,
        ));

        let remover = core.clone();
        let spec = RunSpec {
            duration_ms: 1000,
            tick: Some(Rc::new(move |_: f64| {
                remover.remove(victim);
                TickFlow::Continue
            })),
            ..RunSpec::default()
        };
        // Insert the remover first so it runs before the victim
        {
            let mut inner = core.0.borrow_mut();
            let id = inner.runs.insert(RunState::new(owner.token(), spec, 0, None));
            inner.order.insert(0, id);
        }

        clock.advance(5);
        scheduler.tick_once();
        assert_eq!(victim_ticks.get(), 0);
        assert_eq!(scheduler.active_count(), 1);
        assert!(!core.0.borrow().runs.contains_key(victim));
    }

    #[test]
    fn test_clamped_manual_tick_banks_time() {
        let (scheduler, clock) = manual();
        scheduler.tick_once();
        clock.advance(500);
        scheduler.tick(1, 16);
        assert_eq!(scheduler.now_ms(), 16);
        clock.advance(4);
        scheduler.tick(1, 16);
        assert_eq!(scheduler.now_ms(), 20);
    }

    #[test]
    fn test_backwards_clock_holds_frame_time() {
        let (scheduler, clock) = manual();
        clock.set(100);
        scheduler.tick_once();
        assert_eq!(scheduler.now_ms(), 100);

        clock.set(40);
        scheduler.tick_once();
        assert_eq!(scheduler.now_ms(), 100);

        clock.advance(5);
        scheduler.tick_once();
        assert_eq!(scheduler.now_ms(), 105);
    }

    #[test]
    fn test_finalize_mid_frame_steps_later_runs() {
        let (scheduler, clock) = manual();
        let owner = Owner::new();
        let token = owner.token();
        let core = scheduler.core().clone();
        let late_ticks = Rc::new(Cell::new(0));

        let inner_core = core.clone();
        let late = late_ticks.clone();
        let fired = Rc::new(Cell::new(false));
        let spec = RunSpec {
            duration_ms: 100,
            tick: Some(Rc::new(move |_: f64| {
                if !fired.replace(true) {
                    inner_core.finalize();
                    let spec = counting_spec(100, &late);
                    inner_core.add(RunState::new(token.clone(), spec, 0, None));
                }
                TickFlow::Continue
            })),
            ..RunSpec::default()
        };
        let ticks = Rc::new(Cell::new(0));
        core.add(RunState::new(owner.token(), spec, 0, None));
        core.add(RunState::new(owner.token(), counting_spec(100, &ticks), 0, None));

        clock.advance(10);
        scheduler.tick_once();
        assert_eq!(ticks.get(), 0);
        assert_eq!(late_ticks.get(), 1);
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_timer_arms_only_while_runs_are_active() {
        let clock = ManualClock::new();
        let source = PumpedFrameSource::new(clock.clone());
        let scheduler = Scheduler::default()
            .with_clock(clock.clone())
            .with_frame_source(source.clone());
        assert!(!scheduler.is_ticking());

        let owner = Owner::new();
        let ticks = Rc::new(Cell::new(0));
        let id = scheduler
            .core()
            .add(RunState::new(owner.token(), counting_spec(50, &ticks), 0, None));
        assert!(scheduler.is_ticking());
        assert_eq!(source.next_deadline_ms(), Some(16));

        scheduler.core().pause(id);
        assert!(!scheduler.is_ticking());
        assert!(!source.is_armed());

        scheduler.core().resume(id);
        assert!(scheduler.is_ticking());

        for _ in 0..200 {
            clock.advance(1);
            source.pump();
        }
        assert_eq!(scheduler.active_count(), 0);
        assert!(!scheduler.is_ticking());
        assert!(ticks.get() > 0);
    }

    #[test]
    fn test_nested_frame_is_ignored() {
        let (scheduler, clock) = manual();
        let owner = Owner::new();
        let core = scheduler.core().clone();
        let inner_core = core.clone();
        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();
        let spec = RunSpec {
            duration_ms: 100,
            tick: Some(Rc::new(move |_: f64| {
                counter.set(counter.get() + 1);
                inner_core.run_frame(1_000);
                TickFlow::Continue
            })),
            ..RunSpec::default()
        };
        core.add(RunState::new(owner.token(), spec, 0, None));

        clock.advance(10);
        scheduler.tick_once();
        assert_eq!(ticks.get(), 1);
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_drop_finalizes() {
        let (scheduler, _clock) = manual();
        let owner = Owner::new();
        let ticks = Rc::new(Cell::new(0));
        scheduler
            .core()
            .add(RunState::new(owner.token(), counting_spec(50, &ticks), 0, None));
        let handle = scheduler.handle();
        assert_eq!(handle.active_count(), 1);

        drop(scheduler);
        assert!(!handle.is_alive());
        assert_eq!(handle.active_count(), 0);
        assert_eq!(handle.fps(), None);
        assert_eq!(handle.kill_all_for(&owner.token()), 0);
    }
}
