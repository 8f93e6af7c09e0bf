use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassPhase {
    #[default]
    Idle,
    Scheduled,
    Applying,
}

/// Single-flight gate for reconcile passes.
///
/// Call `request()` whenever state changes. Requests coalesce into one
/// scheduled pass that the frame loop picks up with `begin()`. A request
/// arriving while a pass is applying is remembered, and the gate goes back to
/// `Scheduled` when that pass finishes so exactly one more pass runs.
#[derive(Clone, Default)]
pub struct PassGate {
    inner: Rc<Inner>,
}

#[derive(Default)]
struct Inner {
    phase: Cell<PassPhase>,
    rerun: Cell<bool>,
    requests: Cell<u64>,
    passes: Cell<u64>,
}

impl PassGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a pass. Returns `true` when this call scheduled a new one.
    pub fn request(&self) -> bool {
        let inner = &self.inner;
        inner.requests.set(inner.requests.get() + 1);
        match inner.phase.get() {
            PassPhase::Idle => {
                inner.phase.set(PassPhase::Scheduled);
                true
            }
            PassPhase::Scheduled => false,
            PassPhase::Applying => {
                inner.rerun.set(true);
                false
            }
        }
    }

    /// Start the scheduled pass, if any. The pass ends when the guard drops.
    pub fn begin(&self) -> Option<PassGuard> {
        if self.inner.phase.get() != PassPhase::Scheduled {
            return None;
        }
        self.inner.phase.set(PassPhase::Applying);
        Some(PassGuard {
            inner: self.inner.clone(),
        })
    }

    pub fn phase(&self) -> PassPhase {
        self.inner.phase.get()
    }

    pub fn is_scheduled(&self) -> bool {
        self.phase() == PassPhase::Scheduled
    }

    /// Number of passes completed so far.
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    pub fn requests(&self) -> u64 {
        self.inner.requests.get()
    }

    /// Drop any pending pass.
    pub fn cancel(&self) {
        if self.inner.phase.get() == PassPhase::Scheduled {
            self.inner.phase.set(PassPhase::Idle);
        }
        self.inner.rerun.set(false);
    }
}

impl fmt::Debug for PassGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassGate")
            .field("phase", &self.phase())
            .field("rerun", &self.inner.rerun.get())
            .field("passes", &self.passes())
            .finish()
    }
}

/// Held for the duration of one pass.
pub struct PassGuard {
    inner: Rc<Inner>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        let inner = &self.inner;
        inner.passes.set(inner.passes.get() + 1);
        if inner.rerun.replace(false) {
            inner.phase.set(PassPhase::Scheduled);
        } else {
            inner.phase.set(PassPhase::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_coalesce_while_scheduled() {
        let gate = PassGate::new();
        assert!(gate.request());
        assert!(!gate.request());
        assert!(!gate.request());
        assert_eq!(gate.phase(), PassPhase::Scheduled);

        drop(gate.begin());
        assert_eq!(gate.phase(), PassPhase::Idle);
        assert_eq!(gate.passes(), 1);
        assert_eq!(gate.requests(), 3);
        assert!(gate.begin().is_none());
    }

    #[test]
    fn requests_during_a_pass_schedule_exactly_one_more() {
        let gate = PassGate::new();
        gate.request();
        let guard = gate.begin().unwrap();
        assert_eq!(gate.phase(), PassPhase::Applying);
        assert!(gate.begin().is_none());

        gate.request();
        gate.request();
        drop(guard);
        assert_eq!(gate.phase(), PassPhase::Scheduled);

        drop(gate.begin());
        assert_eq!(gate.phase(), PassPhase::Idle);
        assert_eq!(gate.passes(), 2);
    }

    #[test]
    fn cancel_clears_pending_work() {
        let gate = PassGate::new();
        gate.request();
        gate.cancel();
        assert!(gate.begin().is_none());
        assert_eq!(gate.phase(), PassPhase::Idle);
    }
}
