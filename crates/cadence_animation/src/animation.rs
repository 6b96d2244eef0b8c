//! Animation handle
//!
//! An [`Animation`] keeps the spec being configured ("staging") apart from the
//! run currently executing in the scheduler. Setters only ever touch staging;
//! `play()` commits it.
//!
//! ```ignore
//! let owner = Owner::new();
//! let fade = Animation::new(scheduler.handle(), owner.token());
//! fade.duration(250)
//!     .ease(CubicBezier::LINEAR)
//!     .on_tick(|v| widget.set_opacity(v))
//!     .on_finish(|| println!("done"));
//! fade.play();
//! ```

use crate::config::RunDefaults;
use crate::easing::CubicBezier;
use crate::owner::OwnerToken;
use crate::run::{guarded, Binding, RunState};
use crate::scheduler::{Core, RunId, SchedulerHandle};
use crate::spec::{RunSpec, TickFlow};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A replayable tween bound to an owner
///
/// All methods take `&self`, so an `Rc<Animation>` can be driven from inside
/// its own callbacks. Control methods without a live run are no-ops.
pub struct Animation {
    scheduler: SchedulerHandle,
    owner: OwnerToken,
    staging: RefCell<Option<RunSpec>>,
    /// Setters were used since the last play
    edited: Cell<bool>,
    last_spec: RefCell<Option<RunSpec>>,
    binding: Rc<Binding>,
}

impl Animation {
    pub fn new(scheduler: SchedulerHandle, owner: OwnerToken) -> Self {
        let defaults = scheduler
            .core()
            .map(|core| core.defaults())
            .unwrap_or_default();
        Self {
            scheduler,
            owner,
            staging: RefCell::new(Some(RunSpec::from_defaults(&defaults))),
            edited: Cell::new(false),
            last_spec: RefCell::new(None),
            binding: Rc::new(Binding::default()),
        }
    }

    fn defaults(&self) -> RunDefaults {
        self.scheduler
            .core()
            .map(|core| core.defaults())
            .unwrap_or_default()
    }

    fn stage(&self, edit: impl FnOnce(&mut RunSpec)) -> &Self {
        let mut staging = self.staging.borrow_mut();
        edit(staging.get_or_insert_with(|| RunSpec::from_defaults(&self.defaults())));
        drop(staging);
        self.edited.set(true);
        self
    }

    /// Duration of one leg in milliseconds
    pub fn duration(&self, ms: u32) -> &Self {
        self.stage(|spec| spec.duration_ms = ms)
    }

    /// Wait before each leg
    pub fn delay(&self, ms: u32) -> &Self {
        self.stage(|spec| spec.delay_ms = ms)
    }

    /// Number of legs; negative loops forever
    pub fn loop_count(&self, count: i32) -> &Self {
        self.stage(|spec| spec.loop_count = count)
    }

    pub fn loop_infinite(&self) -> &Self {
        self.loop_count(-1)
    }

    pub fn yoyo(&self, yoyo: bool) -> &Self {
        self.stage(|spec| spec.yoyo = yoyo)
    }

    pub fn ease(&self, easing: CubicBezier) -> &Self {
        self.stage(|spec| spec.easing = easing)
    }

    /// Per-frame callback with the eased value.
    ///
    /// The closure may return `bool` (`false` ends the run), a [`TickFlow`],
    /// or `()`.
    pub fn on_tick<F, R>(&self, tick: F) -> &Self
    where
        F: Fn(f64) -> R + 'static,
        R: Into<TickFlow> + 'static,
    {
        self.stage(|spec| {
            spec.tick = Some(Rc::new(move |value: f64| -> TickFlow { tick(value).into() }))
        })
    }

    pub fn on_start(&self, hook: impl Fn() + 'static) -> &Self {
        self.stage(|spec| spec.on_start = Some(Rc::new(hook)))
    }

    pub fn on_finish(&self, hook: impl Fn() + 'static) -> &Self {
        self.stage(|spec| spec.on_finish = Some(Rc::new(hook)))
    }

    pub fn on_cancel(&self, hook: impl Fn() + 'static) -> &Self {
        self.stage(|spec| spec.on_cancel = Some(Rc::new(hook)))
    }

    /// Called with the eased value every frame, before the tick
    pub fn on_update(&self, hook: impl Fn(f64) + 'static) -> &Self {
        self.stage(|spec| spec.on_update = Some(Rc::new(hook)))
    }

    /// Commit staging (or the last committed spec) and start a run.
    ///
    /// A still-live run is interrupted silently first.
    pub fn play(&self) {
        let Some(core) = self.scheduler.core() else {
            return;
        };
        let staged = self.staging.borrow_mut().take();
        let Some(spec) = staged.or_else(|| self.last_spec.borrow().clone()) else {
            return;
        };

        self.detach(false);
        self.edited.set(false);

        let on_start = spec.on_start.clone();
        *self.last_spec.borrow_mut() = Some(spec.clone());
        self.binding.set_cached(0.0);

        let now = core.now_ms();
        let state = RunState::new(
            self.owner.clone(),
            spec,
            now,
            Some(Rc::downgrade(&self.binding)),
        );
        let id = core.add(state);
        self.binding.attach(id);

        if let Some(on_start) = on_start {
            guarded("on_start", || on_start());
        }
    }

    /// Freeze time for the live run
    pub fn pause(&self) {
        if let Some((core, id)) = self.live() {
            core.pause(id);
        }
    }

    pub fn resume(&self) {
        if let Some((core, id)) = self.live() {
            core.resume(id);
        }
    }

    /// Complete the run now: progress becomes 1.0, the boundary value is
    /// delivered and `on_finish` fires. `on_cancel` never fires.
    pub fn stop(&self) {
        let Some((core, id)) = self.live() else {
            return;
        };
        let Some((reverse, on_update, tick, on_finish)) = core.with_run(id, |run| {
            (
                run.is_reverse(),
                run.spec.on_update.clone(),
                run.spec.tick.clone(),
                run.spec.on_finish.clone(),
            )
        }) else {
            self.binding.release();
            return;
        };

        self.binding.release();
        core.remove(id);
        self.binding.set_cached(1.0);

        let boundary = if reverse { 0.0 } else { 1.0 };
        if let Some(on_update) = on_update {
            guarded("on_update", || on_update(boundary));
        }
        if let Some(tick) = tick {
            guarded("tick", || tick(boundary));
        }
        if let Some(on_finish) = on_finish {
            guarded("on_finish", || on_finish());
        }
    }

    /// Abort the run, keeping its forward progress. `on_cancel` fires once
    /// when `fire` is set.
    pub fn cancel(&self, fire: bool) {
        self.detach(fire);
    }

    /// Silent cancel, fresh staging, progress 0. The last spec stays
    /// available to [`replay`](Self::replay).
    pub fn reset(&self) {
        self.detach(false);
        let mut staging = self.staging.borrow_mut();
        if staging.is_none() {
            *staging = Some(RunSpec::from_defaults(&self.defaults()));
        }
        drop(staging);
        self.binding.set_cached(0.0);
    }

    /// Run again: fresh staging if setters were used since the last play,
    /// otherwise the last committed spec
    pub fn replay(&self) {
        if !self.edited.get() {
            if !self.has_replay() {
                return;
            }
            // Untouched staging is only primed defaults
            self.staging.borrow_mut().take();
        }
        self.detach(false);
        self.play();
    }

    /// Forward time progress of the current leg, or the cached value when
    /// nothing is live. Always in [0, 1].
    pub fn progress(&self) -> f64 {
        self.live()
            .and_then(|(core, id)| core.run_progress(id))
            .unwrap_or_else(|| self.binding.cached())
    }

    /// Live and not paused
    pub fn is_playing(&self) -> bool {
        self.live()
            .and_then(|(core, id)| core.with_run(id, |run| !run.is_paused()))
            .unwrap_or(false)
    }

    pub fn is_paused(&self) -> bool {
        self.live()
            .and_then(|(core, id)| core.with_run(id, |run| run.is_paused()))
            .unwrap_or(false)
    }

    /// Whether a spec has ever been committed
    pub fn has_replay(&self) -> bool {
        self.last_spec.borrow().is_some()
    }

    pub fn owner(&self) -> &OwnerToken {
        &self.owner
    }

    fn live(&self) -> Option<(Core, RunId)> {
        let id = self.binding.live()?;
        let core = self.scheduler.core()?;
        Some((core, id))
    }

    /// Unschedule the live run, caching its forward progress
    fn detach(&self, fire_cancel: bool) {
        let Some(id) = self.binding.live() else {
            return;
        };
        let progress = self.progress();
        self.binding.release();

        let on_cancel = match self.scheduler.core() {
            Some(core) => {
                let on_cancel = core.with_run(id, |run| run.spec.on_cancel.clone()).flatten();
                core.remove(id);
                on_cancel
            }
            None => None,
        };
        self.binding.set_cached(progress);

        if fire_cancel {
            if let Some(on_cancel) = on_cancel {
                guarded("on_cancel", || on_cancel());
            }
        }
    }
}

impl Drop for Animation {
    fn drop(&mut self) {
        self.detach(false);
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("owner", &self.owner)
            .field("live", &self.binding.live().is_some())
            .field("progress", &self.progress())
            .field("has_replay", &self.has_replay())
            .finish()
    }
}
