//! Per-thread scheduler
//!
//! Hosts that want a single scheduler per UI thread install it here once and
//! reach it from anywhere on that thread. There is no implicit instance:
//! every operation fails with [`SchedulerError::NotInitialized`] until
//! [`init_scheduler`] or [`install_scheduler`] has run.

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::owner::OwnerToken;
use crate::scheduler::{Scheduler, SchedulerHandle};
use std::cell::RefCell;

thread_local! {
    static SCHEDULER: RefCell<Option<Scheduler>> = const { RefCell::new(None) };
}

/// Create and install the thread's scheduler (manual ticking, system clock)
pub fn init_scheduler(config: SchedulerConfig) -> Result<SchedulerHandle> {
    config.validate()?;
    install_scheduler(Scheduler::new(config))
}

/// Install a pre-built scheduler, e.g. one wired to a host frame source
pub fn install_scheduler(instance: Scheduler) -> Result<SchedulerHandle> {
    let rejected = SCHEDULER.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Some(instance);
        }
        *slot = Some(instance);
        None
    });
    if let Some(rejected) = rejected {
        // Finalize the rejected scheduler with the slot released
        drop(rejected);
        return Err(SchedulerError::AlreadyInitialized);
    }

    tracing::debug!("animation scheduler initialized");
    scheduler()
}

/// Handle to the thread's scheduler
pub fn scheduler() -> Result<SchedulerHandle> {
    try_scheduler().ok_or(SchedulerError::NotInitialized)
}

pub fn try_scheduler() -> Option<SchedulerHandle> {
    SCHEDULER.with(|slot| slot.borrow().as_ref().map(Scheduler::handle))
}

pub fn is_scheduler_initialized() -> bool {
    SCHEDULER.with(|slot| slot.borrow().is_some())
}

/// Finalize and drop the thread's scheduler
///
/// Live animations keep their progress snapshot; their handles go dead.
/// Returns false if nothing was installed.
pub fn shutdown_scheduler() -> bool {
    let taken = SCHEDULER.with(|slot| slot.borrow_mut().take());
    match taken {
        Some(instance) => {
            instance.finalize();
            drop(instance);
            tracing::debug!("animation scheduler shut down");
            true
        }
        None => false,
    }
}

pub fn set_fps(fps: u32) -> Result<()> {
    scheduler()?.set_fps(fps);
    Ok(())
}

pub fn fps() -> Result<u32> {
    scheduler()?.fps().ok_or(SchedulerError::NotInitialized)
}

pub fn kill_all_for(owner: &OwnerToken) -> Result<usize> {
    Ok(scheduler()?.kill_all_for(owner))
}

pub fn finalize() -> Result<()> {
    scheduler()?.finalize();
    Ok(())
}

/// Advance `frames` manual frames on the thread's scheduler
pub fn tick(frames: u32, max_clamp_ms: u32) -> Result<()> {
    scheduler()?.tick(frames, max_clamp_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::CubicBezier;

    // Each #[test] runs on its own thread, so the slot starts empty

    #[test]
    fn test_operations_need_init() {
        assert!(!is_scheduler_initialized());
        assert!(matches!(scheduler(), Err(SchedulerError::NotInitialized)));
        assert!(matches!(fps(), Err(SchedulerError::NotInitialized)));
        assert!(matches!(tick(1, 0), Err(SchedulerError::NotInitialized)));
        assert!(!shutdown_scheduler());
    }

    #[test]
    fn test_init_and_shutdown() {
        let handle = init_scheduler(SchedulerConfig::default()).unwrap();
        assert!(is_scheduler_initialized());
        assert!(matches!(
            init_scheduler(SchedulerConfig::default()),
            Err(SchedulerError::AlreadyInitialized)
        ));

        set_fps(30).unwrap();
        assert_eq!(fps().unwrap(), 30);

        assert!(shutdown_scheduler());
        assert!(!handle.is_alive());
        assert!(try_scheduler().is_none());

        // Can be initialized again after shutdown
        init_scheduler(SchedulerConfig::default()).unwrap();
        assert!(shutdown_scheduler());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SchedulerConfig::default();
        config.defaults.easing = CubicBezier::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(matches!(
            init_scheduler(config),
            Err(SchedulerError::Config(_))
        ));
        assert!(!is_scheduler_initialized());
    }
}
