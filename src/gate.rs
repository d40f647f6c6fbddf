//! Startup gate
//!
//! Readiness barrier between producers and the drain loop. Closed until the
//! loop is actually executing, so early log calls wait instead of racing the
//! creation of output files. Producers only pay for this once: after a wait
//! times out, later producer waits return at once until the gate opens.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Gate position as seen by a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Pipeline not running yet
    Closed,
    /// Drain loop is running
    Open,
    /// Pipeline has shut down; nothing will consume new records
    Sealed,
}

struct GateInner {
    state: GateState,
    /// A producer already waited the full startup wait while closed
    expired: bool,
}

pub struct StartupGate {
    inner: Mutex<GateInner>,
    changed: Condvar,
}

impl StartupGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::Closed,
                expired: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    /// Whether a producer wait has already timed out on the closed gate
    pub fn is_expired(&self) -> bool {
        self.inner.lock().expired
    }

    /// Let producers through
    pub fn open(&self) {
        self.set(GateState::Open);
    }

    /// Permanently release waiters; records arriving afterwards are dropped
    pub fn seal(&self) {
        self.set(GateState::Sealed);
    }

    fn set(&self, next: GateState) {
        let mut inner = self.inner.lock();
        if inner.state != GateState::Sealed {
            inner.state = next;
        }
        self.changed.notify_all();
    }

    /// Producer wait: block while the gate is closed, for at most `timeout`
    ///
    /// Returns the state observed on exit, which is still `Closed` if the
    /// wait timed out. The first timeout latches the gate as expired and every
    /// later producer wait on the closed gate returns immediately.
    pub fn wait(&self, timeout: Duration) -> GateState {
        self.block(timeout, true)
    }

    /// Block until the gate leaves `Closed` or `timeout` passes, ignoring the
    /// expired latch
    pub fn wait_open(&self, timeout: Duration) -> GateState {
        self.block(timeout, false)
    }

    fn block(&self, timeout: Duration, producer: bool) -> GateState {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        if producer && inner.expired {
            return inner.state;
        }
        while inner.state == GateState::Closed {
            if self.changed.wait_until(&mut inner, deadline).timed_out() {
                if producer && inner.state == GateState::Closed {
                    inner.expired = true;
                }
                break;
            }
        }
        inner.state
    }
}

impl Default for StartupGate {
    fn default() -> Self {
        Self::new()
    }
}
