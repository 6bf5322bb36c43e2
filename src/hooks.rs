//! Hook store - per-component persistent state, addressed by call order.
//!
//! The Nth `use_state` call of a component in one pass must line up with the
//! Nth call in the previous pass; that is the whole addressing scheme, so
//! conditional hook calls are a hard error. The engine checks the hook count
//! against the alternate fiber after every component invocation and fails the
//! pass on a mismatch rather than silently misattributing state.
//!
//! State lives in reference-counted cells shared between a hook and its
//! alternate from the previous pass. Setters hold the cell directly, so a
//! setter captured by an event listener keeps working across any number of
//! commits. A setter never touches the engine: it queues a functional update
//! on the cell and raises the re-render signal, and the scheduler picks that
//! up at the next pass boundary.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::error::EngineError;

/// A queued functional update: old state in, new state out.
pub type UpdateFn = Box<dyn FnOnce(Box<dyn Any>) -> Box<dyn Any>>;

/// The shared backing store of one hook.
struct HookCell {
    state: Box<dyn Any>,
    pending: Vec<UpdateFn>,
}

/// One positional state cell on a component fiber.
///
/// Cloning a hook shares the cell; the fiber for a tree position in pass K
/// holds a clone of the hook from pass K-1's alternate, which is how state
/// survives commits.
#[derive(Clone)]
pub struct Hook {
    cell: Rc<RefCell<HookCell>>,
}

impl Hook {
    fn fresh(initial: Box<dyn Any>) -> Self {
        Self {
            cell: Rc::new(RefCell::new(HookCell {
                state: initial,
                pending: Vec::new(),
            })),
        }
    }

    /// Apply every queued update in call order.
    fn drain_pending(&self) {
        let mut cell = self.cell.borrow_mut();
        let pending = std::mem::take(&mut cell.pending);
        for action in pending {
            let old = std::mem::replace(&mut cell.state, Box::new(()));
            cell.state = action(old);
        }
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hook(..)")
    }
}

// =============================================================================
// Re-render signal
// =============================================================================

/// Coalesced "state changed, schedule a pass" flag shared between the engine
/// and every setter it hands out.
#[derive(Clone, Default)]
pub(crate) struct UpdateSignal {
    requested: Rc<Cell<bool>>,
}

impl UpdateSignal {
    pub(crate) fn request(&self) {
        self.requested.set(true);
    }

    /// Consume the signal, returning whether it was raised.
    pub(crate) fn take(&self) -> bool {
        self.requested.replace(false)
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.requested.get()
    }
}

// =============================================================================
// Hook context
// =============================================================================

/// Hook access handed to a component for the duration of one invocation.
///
/// The cursor starts at zero for every invocation so hook calls re-bind to
/// the same positional cells as the previous pass.
pub struct HookContext<'a> {
    prev: Option<&'a [Hook]>,
    hooks: SmallVec<[Hook; 4]>,
    cursor: usize,
    signal: UpdateSignal,
    violation: Option<EngineError>,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(prev: Option<&'a [Hook]>, signal: UpdateSignal) -> Self {
        Self {
            prev,
            hooks: SmallVec::new(),
            cursor: 0,
            signal,
            violation: None,
        }
    }

    /// Persistent component state.
    ///
    /// Returns the current state (after applying all updates queued since the
    /// last pass, in call order) and a setter that schedules a re-render.
    /// With no intervening setter call this is idempotent across re-renders.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let index = self.cursor;
        self.cursor += 1;

        let hook = match self.prev.and_then(|prev| prev.get(index)) {
            Some(old) => old.clone(),
            None => Hook::fresh(Box::new(initial.clone())),
        };
        hook.drain_pending();

        let state = hook.cell.borrow().state.downcast_ref::<T>().cloned();
        let state = match state {
            Some(state) => state,
            None => {
                // A different type at the same position means the call order
                // shifted between passes. The cell is left untouched: this
                // pass is abandoned, and later passes over the committed
                // tree must still find the original state.
                self.violation = Some(EngineError::HookType { index });
                initial
            }
        };

        let setter = StateSetter {
            cell: hook.cell.clone(),
            signal: self.signal.clone(),
            _state: PhantomData,
        };
        self.hooks.push(hook);
        (state, setter)
    }

    /// Close the invocation: verify the call count against the previous pass
    /// and hand the hook list back to the fiber.
    pub(crate) fn finish(self) -> Result<SmallVec<[Hook; 4]>, EngineError> {
        if let Some(violation) = self.violation {
            return Err(violation);
        }
        if let Some(prev) = self.prev
            && prev.len() != self.cursor
        {
            return Err(EngineError::HookOrder {
                expected: prev.len(),
                found: self.cursor,
            });
        }
        Ok(self.hooks)
    }
}

// =============================================================================
// Setters
// =============================================================================

/// Queues state updates against one hook and requests a re-render.
///
/// Cloneable and `'static`, so it can be captured by event listeners and
/// outlive the pass that created it. Updates queued before the engine runs
/// again are all honored, in call order, in the single resulting pass.
pub struct StateSetter<T> {
    cell: Rc<RefCell<HookCell>>,
    signal: UpdateSignal,
    _state: PhantomData<fn(T) -> T>,
}

impl<T: 'static> StateSetter<T> {
    /// Replace the state.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Queue a functional update.
    pub fn update(&self, f: impl FnOnce(T) -> T + 'static) {
        let action: UpdateFn = Box::new(move |old| match old.downcast::<T>() {
            Ok(value) => Box::new(f(*value)),
            // Type drifted underneath the setter; drop the update rather
            // than clobber foreign state. The pass that caused the drift
            // already failed with a hook violation.
            Err(old) => old,
        });
        self.cell.borrow_mut().pending.push(action);
        self.signal.request();
        trace!("state update queued");
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            signal: self.signal.clone(),
            _state: PhantomData,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_call_uses_initial() {
        let signal = UpdateSignal::default();
        let mut cx = HookContext::new(None, signal);
        let (state, _set) = cx.use_state(7i32);
        assert_eq!(state, 7);
        assert_eq!(cx.finish().map(|h| h.len()), Ok(1));
    }

    #[test]
    fn test_updates_compose_in_call_order() {
        let signal = UpdateSignal::default();
        let mut cx = HookContext::new(None, signal.clone());
        let (_, set) = cx.use_state(1i32);
        let hooks = cx.finish().unwrap();

        set.update(|n| n * 10);
        set.update(|n| n + 1);
        assert!(signal.is_raised());

        // Next pass re-binds positionally to the same cell.
        let mut cx = HookContext::new(Some(hooks.as_slice()), signal);
        let (state, _) = cx.use_state(1i32);
        assert_eq!(state, 11);
    }

    #[test]
    fn test_idempotent_without_updates() {
        let signal = UpdateSignal::default();
        let mut cx = HookContext::new(None, signal.clone());
        let (_, set) = cx.use_state(3i32);
        set.set(9);
        let hooks = cx.finish().unwrap();

        for _ in 0..3 {
            let mut cx = HookContext::new(Some(hooks.as_slice()), signal.clone());
            let (state, _) = cx.use_state(3i32);
            assert_eq!(state, 9);
            cx.finish().unwrap();
        }
    }

    #[test]
    fn test_hook_count_mismatch_fails() {
        let signal = UpdateSignal::default();
        let mut cx = HookContext::new(None, signal.clone());
        let _ = cx.use_state(0i32);
        let _ = cx.use_state(0i32);
        let hooks = cx.finish().unwrap();

        let mut cx = HookContext::new(Some(hooks.as_slice()), signal);
        let _ = cx.use_state(0i32);
        assert!(matches!(
            cx.finish(),
            Err(EngineError::HookOrder {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_hook_type_change_fails_without_clobbering_state() {
        let signal = UpdateSignal::default();
        let mut cx = HookContext::new(None, signal.clone());
        let _ = cx.use_state(7i32);
        let hooks = cx.finish().unwrap();

        let mut cx = HookContext::new(Some(hooks.as_slice()), signal.clone());
        let (state, _) = cx.use_state("text".to_string());
        assert_eq!(state, "text");
        assert!(matches!(cx.finish(), Err(EngineError::HookType { index: 0 })));

        // The failed invocation must not have written into the shared cell:
        // a later pass over the same hooks still sees the original state.
        let mut cx = HookContext::new(Some(hooks.as_slice()), signal);
        let (state, _) = cx.use_state(0i32);
        assert_eq!(state, 7);
        cx.finish().unwrap();
    }
}
