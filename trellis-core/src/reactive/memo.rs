//! Memo Implementation
//!
//! A Memo caches a computed value keyed by the dependency list it was
//! computed with.
//!
//! # How Memos Work
//!
//! 1. On the first call there is no previous record, so the memo always
//!    computes and stores the result together with the dependency list.
//!
//! 2. On later calls the new dependency list is compared with the stored
//!    one. If they match, the cached `Rc` is returned as-is (same identity).
//!
//! 3. Otherwise the computation runs again and both the result and the list
//!    are replaced.
//!
//! An empty list matches itself forever, so the value is computed exactly
//! once. `Deps::always()` never matches, so the value is recomputed on every
//! call.

use std::fmt::{self, Debug};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::deps::Deps;

/// Counter for generating unique memo IDs.
static MEMO_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_memo_id() -> u64 {
    MEMO_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Outcome of the most recent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// Never computed.
    Empty,

    /// The last call reused the cached value.
    Reused,

    /// The last call ran the computation.
    Computed,
}

/// A dependency-keyed cache for a single value.
pub struct Memo<T> {
    id: u64,

    /// Dependencies the cached value was computed with.
    deps: Option<Deps>,

    /// The cached value (None if never computed).
    value: Option<Rc<T>>,

    state: MemoState,

    /// How many times the computation ran.
    computations: usize,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            id: next_memo_id(),
            deps: None,
            value: None,
            state: MemoState::Empty,
            computations: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return the cached value if `deps` match the previous call, otherwise
    /// run `compute` and cache its result.
    pub fn get_or_compute<F>(&mut self, deps: Deps, compute: F) -> Rc<T>
    where
        F: FnOnce() -> T,
    {
        let reusable = match (&self.deps, &self.value) {
            (Some(prev), Some(value)) if prev.matches(&deps) => Some(Rc::clone(value)),
            _ => None,
        };

        if let Some(value) = reusable {
            debug!(memo = self.id, "memo reused");
            self.state = MemoState::Reused;
            return value;
        }

        let value = Rc::new(compute());
        self.value = Some(Rc::clone(&value));
        self.deps = Some(deps);
        self.state = MemoState::Computed;
        self.computations += 1;
        trace!(memo = self.id, computations = self.computations, "memo computed");
        value
    }

    /// The cached value without touching the dependency record.
    pub fn peek(&self) -> Option<Rc<T>> {
        self.value.clone()
    }

    /// Drop the cached value so the next call recomputes.
    pub fn invalidate(&mut self) {
        self.deps = None;
        self.value = None;
        self.state = MemoState::Empty;
    }

    pub fn state(&self) -> MemoState {
        self.state
    }

    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("has_value", &self.has_value())
            .field("computations", &self.computations)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
