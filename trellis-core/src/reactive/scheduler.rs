//! Render Scheduler
//!
//! The scheduler is the meeting point between state writes and render
//! passes. Writes never render anything themselves; they mark the owning
//! component dirty and ask the host for a pass.
//!
//! # How It Works
//!
//! 1. A write outside a batch marks its component dirty and requests a
//!    pass. If a pass was already requested and has not started yet, the
//!    request coalesces with it.
//!
//! 2. Inside a batch, writes only mark components dirty. When the outermost
//!    batch ends, one pass is requested for everything that was marked.
//!
//! 3. The root drains the dirty set at the start of each pass, which also
//!    clears the outstanding request.
//!
//! # Thread Safety
//!
//! The scheduler is a cheap, cloneable handle around a mutex so that
//! setters can be called from any thread. The waker is always invoked after
//! the lock is released.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::trace;

use crate::tree::NodeId;

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Counters describing how requests were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Passes requested from the host.
    pub requests: u64,

    /// Requests folded into one that was already outstanding.
    pub coalesced: u64,
}

#[derive(Default)]
struct SchedulerState {
    dirty: IndexSet<NodeId>,
    batch_depth: usize,
    requested: bool,
    waker: Option<Waker>,
    stats: SchedulerStats,
}

impl SchedulerState {
    /// Record a request; returns the waker to call if the host must be woken.
    fn request(&mut self) -> Option<Waker> {
        if self.requested {
            self.stats.coalesced += 1;
            return None;
        }
        self.requested = true;
        self.stats.requests += 1;
        self.waker.clone()
    }
}

/// Handle to the render scheduler of one root.
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a component dirty.
    ///
    /// Outside a batch this also requests a pass.
    pub fn mark_dirty(&self, node: NodeId) {
        let wake = {
            let mut state = self.state.lock();
            state.dirty.insert(node);
            if state.batch_depth > 0 {
                None
            } else {
                state.request()
            }
        };

        trace!(node = %node, "component marked dirty");

        if let Some(wake) = wake {
            wake();
        }
    }

    /// Run `f` with writes batched into a single pass request.
    ///
    /// Batches nest; only the outermost one issues the request.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.state.lock().batch_depth += 1;
        let _guard = BatchGuard { scheduler: self };
        f()
    }

    fn end_batch(&self) {
        let wake = {
            let mut state = self.state.lock();
            state.batch_depth = state.batch_depth.saturating_sub(1);
            if state.batch_depth == 0 && !state.dirty.is_empty() {
                state.request()
            } else {
                None
            }
        };

        if let Some(wake) = wake {
            wake();
        }
    }

    pub fn is_batching(&self) -> bool {
        self.state.lock().batch_depth > 0
    }

    /// Whether any component is waiting for a pass.
    pub fn has_pending(&self) -> bool {
        !self.state.lock().dirty.is_empty()
    }

    /// Whether a pass has been requested and not yet started.
    pub fn is_requested(&self) -> bool {
        self.state.lock().requested
    }

    /// Drain the dirty set at the start of a pass.
    pub(crate) fn take_dirty(&self) -> Option<IndexSet<NodeId>> {
        let mut state = self.state.lock();
        state.requested = false;
        if state.dirty.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut state.dirty))
        }
    }

    /// Forget every pending component, e.g. after the tree was torn down.
    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.dirty.clear();
        state.requested = false;
    }

    /// Install the callback used to ask the host for a pass.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state.lock().waker = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        self.state.lock().waker = None;
    }

    pub fn stats(&self) -> SchedulerStats {
        self.state.lock().stats
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Scheduler")
            .field("dirty", &state.dirty.len())
            .field("batch_depth", &state.batch_depth)
            .field("requested", &state.requested)
            .field("stats", &state.stats)
            .finish()
    }
}

/// Ends the batch even if the batched closure panics.
struct BatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.end_batch();
    }
}
