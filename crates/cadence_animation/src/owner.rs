//! Animation owners
//!
//! An animation is bound to an owner it never keeps alive. The scheduler only
//! needs two things from an owner: whether it is still alive, and whether two
//! tokens refer to the same owner (for `kill_all_for`).

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// Liveness anchor for animations
///
/// Dropping the `Owner` makes every token handed out by [`Owner::token`] dead;
/// runs bound to it stop on their next step.
///
/// ```ignore
/// let owner = Owner::new();
/// let anim = Animation::new(handle, owner.token());
/// drop(owner); // anim's run ends at the next frame with progress 0.0
/// ```
pub struct Owner {
    anchor: Rc<Anchor>,
}

struct Anchor;

impl Owner {
    pub fn new() -> Self {
        Self {
            anchor: Rc::new(Anchor),
        }
    }

    /// A non-owning token for binding animations to this owner
    pub fn token(&self) -> OwnerToken {
        OwnerToken::from_rc(&self.anchor)
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("tokens", &Rc::weak_count(&self.anchor))
            .finish()
    }
}

/// Weak observer of an owner
///
/// Tokens compare equal when they observe the same allocation, so a token
/// taken from a host object twice still matches in `kill_all_for`.
#[derive(Clone)]
pub struct OwnerToken {
    target: Weak<dyn Any>,
}

impl OwnerToken {
    /// Observe any `Rc`-owned host object (a widget, a view model, ...)
    pub fn from_rc<T: Any>(owner: &Rc<T>) -> Self {
        let strong: Rc<dyn Any> = owner.clone();
        Self {
            target: Rc::downgrade(&strong),
        }
    }

    /// A token that was never alive; runs bound to it end on their first step
    pub fn detached() -> Self {
        let strong: Rc<dyn Any> = Rc::new(Anchor);
        Self {
            target: Rc::downgrade(&strong),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl PartialEq for OwnerToken {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl Eq for OwnerToken {}

impl fmt::Debug for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerToken")
            .field("alive", &self.is_alive())
            .finish()
    }
}
