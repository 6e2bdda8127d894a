//! State Cell Implementation
//!
//! A state cell holds one committed value plus a queue of pending updates.
//!
//! # How State Cells Work
//!
//! 1. `read()` returns the committed value. It never observes pending
//!    updates, so every read within one synchronous turn sees the same value.
//!
//! 2. `write()` and `update()` only enqueue. A cell owned by a component
//!    also marks that component dirty on the render scheduler.
//!
//! 3. `commit()` folds the queue in call order: a plain value replaces the
//!    running value, an updater receives the running value. The result
//!    becomes the committed value and subscribers are notified. Components
//!    commit their cells when they re-render, so a cell never changes
//!    outside a scheduled render.
//!
//! # Thread Safety
//!
//! The cell is protected by a mutex so that setters can be moved into
//! callbacks that run on other threads. Updaters and subscribers are always
//! invoked with the lock released.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::context::RenderFrame;
use super::scheduler::Scheduler;
use super::subscriber::{Subscriber, SubscriberId};
use crate::tree::NodeId;

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A queued write.
pub enum Update<T> {
    /// Replace the running value.
    Replace(T),

    /// Compute the next value from the running value.
    Apply(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(_) => f.write_str("Update::Replace"),
            Update::Apply(_) => f.write_str("Update::Apply"),
        }
    }
}

/// The component a cell belongs to.
#[derive(Clone)]
pub(crate) struct Owner {
    pub node: NodeId,
    pub scheduler: Scheduler,
    /// Cleared when the component unmounts.
    pub alive: Arc<AtomicBool>,
}

struct CellInner<T> {
    committed: T,
    pending: Vec<Update<T>>,
    subscribers: Vec<Subscriber<T>>,
    owner: Option<Owner>,
}

/// A single unit of component state.
pub struct StateCell<T>
where
    T: Clone + Send + 'static,
{
    id: u64,
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> StateCell<T>
where
    T: Clone + Send + 'static,
{
    /// Create a standalone cell.
    ///
    /// Standalone cells are committed explicitly with [`StateCell::commit`].
    pub fn new(value: T) -> Self {
        Self::with_owner(value, None)
    }

    pub(crate) fn owned(value: T, owner: Owner) -> Self {
        Self::with_owner(value, Some(owner))
    }

    fn with_owner(value: T, owner: Option<Owner>) -> Self {
        Self {
            id: next_cell_id(),
            inner: Arc::new(Mutex::new(CellInner {
                committed: value,
                pending: Vec::new(),
                subscribers: Vec::new(),
                owner,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The committed value.
    pub fn read(&self) -> T {
        self.inner.lock().committed.clone()
    }

    /// Enqueue a replacement value.
    pub fn write(&self, value: T) {
        self.enqueue(Update::Replace(value));
    }

    /// Enqueue an updater. It receives the latest pending value when the
    /// queue is folded.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.enqueue(Update::Apply(Box::new(f)));
    }

    fn enqueue(&self, update: Update<T>) {
        let owner = {
            let mut inner = self.inner.lock();
            if let Some(owner) = &inner.owner {
                if !owner.alive.load(Ordering::Acquire) {
                    warn!(cell = self.id, node = %owner.node, "write to state of an unmounted component ignored");
                    return;
                }
            }
            inner.pending.push(update);
            inner.owner.clone()
        };

        if RenderFrame::is_active() {
            RenderFrame::record_write();
            debug!(
                cell = self.id,
                component = RenderFrame::current_component().unwrap_or("?"),
                "state written during render"
            );
        }

        if let Some(owner) = owner {
            owner.scheduler.mark_dirty(owner.node);
        }
    }

    /// Number of updates waiting for the next commit.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Fold pending updates into the committed value.
    ///
    /// Returns false if nothing was pending.
    pub fn commit(&self) -> bool {
        let (pending, mut value) = {
            let mut inner = self.inner.lock();
            if inner.pending.is_empty() {
                return false;
            }
            (std::mem::take(&mut inner.pending), inner.committed.clone())
        };

        for update in pending {
            value = match update {
                Update::Replace(next) => next,
                Update::Apply(f) => f(&value),
            };
        }

        let subscribers = {
            let mut inner = self.inner.lock();
            inner.committed = value.clone();
            inner.subscribers.clone()
        };

        for subscriber in &subscribers {
            subscriber.notify(&value);
        }

        true
    }

    /// Register a callback invoked after each commit.
    pub fn subscribe<F>(&self, subscriber_id: SubscriberId, notify: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .subscribers
            .push(Subscriber::new(subscriber_id, notify));
    }

    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.inner
            .lock()
            .subscribers
            .retain(|subscriber| subscriber.id() != subscriber_id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// A write-only handle to this cell.
    pub fn setter(&self) -> SetState<T> {
        SetState { cell: self.clone() }
    }
}

impl<T> Clone for StateCell<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for StateCell<T>
where
    T: Clone + Send + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateCell")
            .field("id", &self.id)
            .field("value", &inner.committed)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

/// Write-only handle returned by `use_state`.
///
/// Cheap to clone and `Send + Sync`, so it can be moved into event handlers,
/// effects, or other threads.
pub struct SetState<T>
where
    T: Clone + Send + 'static,
{
    cell: StateCell<T>,
}

impl<T> SetState<T>
where
    T: Clone + Send + 'static,
{
    pub fn set(&self, value: T) {
        self.cell.write(value);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.cell.update(f);
    }

    /// Whether two handles write to the same cell.
    pub fn same_cell(&self, other: &SetState<T>) -> bool {
        Arc::ptr_eq(&self.cell.inner, &other.cell.inner)
    }
}

impl<T> Clone for SetState<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> PartialEq for SetState<T>
where
    T: Clone + Send + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        self.same_cell(other)
    }
}

impl<T> Debug for SetState<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState").field("cell", &self.cell.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
