//! Scoped-resource registry and recovery (spec §4.F): a thread-local stack of
//! disposables with LIFO cleanup, plus a setjmp/longjmp-style escape built on
//! top of it.
//!
//! Grounded on `nebula-memory/src/arena/local.rs`'s `thread_local!` pattern
//! for per-thread state, and on spec.md §9's own direction to "catch an
//! unwinding control-flow mechanism that runs scoped destructors" — so the
//! escape in [`panic_in`]/[`recover`] rides on `std::panic::panic_any` and
//! `catch_unwind` rather than reimplementing setjmp/longjmp.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

thread_local! {
    static REGISTRY: RefCell<Vec<Option<Rc<Disposable>>>> = RefCell::new(Vec::new());
    static CONTEXT_STACK: RefCell<Vec<Rc<Disposable>>> = RefCell::new(Vec::new());
}

/// A scoped resource with a dispose function, registered in the thread-local
/// registry (spec §3 "Disposable").
pub struct Disposable {
    dispose_fn: RefCell<Option<Box<dyn FnOnce()>>>,
    mark: Cell<usize>,
}

impl Disposable {
    /// Whether `self` is currently secured (its `mark` is a valid registry
    /// index whose slot points back to `self`).
    pub fn is_secured(self: &Rc<Self>) -> bool {
        REGISTRY.with(|r| {
            let reg = r.borrow();
            matches!(reg.get(self.mark.get()), Some(Some(slot)) if Rc::ptr_eq(slot, self))
        })
    }

    /// Appends `self` to the registry if it is not already secured, and
    /// records the new index as its mark (spec §4.F: `secure`).
    pub fn secure(self: &Rc<Self>) {
        if self.is_secured() {
            return;
        }
        REGISTRY.with(|r| {
            let mut reg = r.borrow_mut();
            let idx = reg.len();
            reg.push(Some(Rc::clone(self)));
            self.mark.set(idx);
        });
    }

    /// Clears the registry slot at `self`'s mark if it still points back to
    /// `self`, transferring ownership of the resource back to the caller
    /// (spec §4.F: `unsecure`). Does not shift other entries, leaving a null
    /// gap.
    pub fn unsecure(self: &Rc<Self>) {
        REGISTRY.with(|r| {
            let mut reg = r.borrow_mut();
            if let Some(slot) = reg.get_mut(self.mark.get()) {
                if matches!(slot, Some(s) if Rc::ptr_eq(s, self)) {
                    *slot = None;
                }
            }
        });
    }

    /// Walks the registry from the top down to (and including) `self`'s
    /// mark, invoking each non-null entry's dispose function, then
    /// truncates (spec §4.F: `dispose`). LIFO by construction: this just
    /// pops.
    ///
    /// Each entry's closure runs with the registry borrow released, so a
    /// dispose function that itself calls `secure`/`unsecure`/`dispose` does
    /// not deadlock against the `RefCell` (spec §4.F: "may itself
    /// recursively shrink the registry").
    pub fn dispose(self: &Rc<Self>) {
        let mark = self.mark.get();
        loop {
            let popped = REGISTRY.with(|r| {
                let mut reg = r.borrow_mut();
                if reg.len() <= mark {
                    None
                } else {
                    reg.pop()
                }
            });
            match popped {
                None => break,
                Some(None) => {}
                Some(Some(slot)) => {
                    if let Some(f) = slot.dispose_fn.borrow_mut().take() {
                        f();
                    }
                }
            }
        }
    }
}

/// Builds a disposable wrapping `f`, not yet inserted into the registry
/// (spec §4.F: `make_disposable`). Its mark is provisionally the registry's
/// current length; [`Disposable::secure`] fixes this up if anything else was
/// secured in between.
pub fn make_disposable(f: impl FnOnce() + 'static) -> Rc<Disposable> {
    let mark = REGISTRY.with(|r| r.borrow().len());
    Rc::new(Disposable { dispose_fn: RefCell::new(Some(Box::new(f))), mark: Cell::new(mark) })
}

/// Current length of the thread-local registry. Exposed for tests and for
/// callers that want to snapshot a mark without creating a disposable.
pub fn registry_len() -> usize {
    REGISTRY.with(|r| r.borrow().len())
}

/// The escape payload carried by [`panic_in`] across `catch_unwind`.
#[derive(Debug, Clone)]
pub struct RecoveryEscape {
    pub message: String,
}

/// Installs a fresh recovery context, secures it, and runs `body` as the
/// protected region, combining install + secure + "arm the jump buffer" into
/// one call (spec §4.F: these three steps "must preserve atomicity").
///
/// If `body` (or anything it calls) invokes [`panic_in`], the registry is
/// unwound down to this context's mark and `Err` is returned with the
/// escape's message. Any other panic propagates unchanged.
pub fn recover<F, T>(body: F) -> Result<T, RecoveryEscape>
where
    F: FnOnce() -> T,
{
    let ctx = make_disposable(|| {});
    ctx.secure();
    CONTEXT_STACK.with(|c| c.borrow_mut().push(Rc::clone(&ctx)));

    // The disposables this protects typically hold `Rc`/`RefCell` state that
    // is not `UnwindSafe` by the stdlib's conservative default; `panic_in`
    // already disposes everything down to `ctx`'s mark before unwinding, so
    // there is no torn state left for the caller to observe afterwards.
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(body));

    CONTEXT_STACK.with(|c| {
        c.borrow_mut().pop();
    });

    match result {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<RecoveryEscape>() {
            Ok(escape) => Err(*escape),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// Non-local exit to the innermost active [`recover`] call (spec §4.F:
/// `panic(ctx)`). Disposes the registry down to that context's mark, then
/// unwinds. Never returns.
///
/// # Panics
/// Panics (a plain Rust panic, not a [`RecoveryEscape`]) if called with no
/// active recovery context.
pub fn panic_in(message: impl Into<String>) -> ! {
    let ctx = CONTEXT_STACK
        .with(|c| c.borrow().last().cloned())
        .expect("panic_in called with no active recovery context");
    ctx.dispose();
    std::panic::panic_any(RecoveryEscape { message: message.into() });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_is_lifo_and_resilient_to_mid_stack_marks() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let push = |log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str| {
            let log = Rc::clone(log);
            let d = make_disposable(move || log.borrow_mut().push(name));
            d.secure();
            d
        };

        let a = push(&log, "a");
        let mark_b = registry_len();
        let b = push(&log, "b");
        let _c = push(&log, "c");

        // Disposing from b's mark tears down b and c, in that order, but
        // leaves a untouched.
        b.dispose();
        assert_eq!(*log.borrow(), vec!["c", "b"]);
        assert_eq!(registry_len(), mark_b);

        a.dispose();
        assert_eq!(*log.borrow(), vec!["c", "b", "a"]);
        assert_eq!(registry_len(), 0);
    }

    #[test]
    fn unsecure_leaves_a_gap_that_dispose_skips() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = |name: &'static str| {
            let log = Rc::clone(&log);
            let d = make_disposable(move || log.borrow_mut().push(name));
            d.secure();
            d
        };

        let mark = registry_len();
        let a = make("a");
        let b = make("b");
        a.unsecure();
        assert!(!a.is_secured());

        b.dispose();
        assert_eq!(*log.borrow(), vec!["b"]);
        assert_eq!(registry_len(), mark);
    }

    #[test]
    fn recovery_unwind_matches_scenario() {
        // spec §8 scenario 6: a, b, c secured; then a recovery context r is
        // installed; then d is secured; panic_in unwinds d and r, in that
        // order, leaving a, b, c intact and the registry back to its
        // pre-`r` length.
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = |name: &'static str| {
            let log = Rc::clone(&log);
            let d = make_disposable(move || log.borrow_mut().push(name));
            d.secure();
            d
        };

        let _a = make("a");
        let _b = make("b");
        let _c = make("c");
        let mark_before_r = registry_len();

        let result = recover(|| {
            let _d = make("d");
            panic_in("boom");
        });

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().message, "boom");
        assert_eq!(*log.borrow(), vec!["d"]);
        assert_eq!(registry_len(), mark_before_r);
    }

    #[test]
    fn recover_passes_through_ordinary_panics() {
        let outcome = std::panic::catch_unwind(|| {
            let _ = recover(|| -> () { panic!("not a recovery escape") });
        });
        assert!(outcome.is_err());
    }
}
