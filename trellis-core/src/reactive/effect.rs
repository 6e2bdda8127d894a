//! Effect Implementation
//!
//! An effect record stores one side effect declared by a component, the
//! dependency list it last ran with, and the cleanup it returned.
//!
//! # How Effects Work
//!
//! 1. During render, `schedule` compares the new dependency list with the
//!    one from the last run. If they differ (or there is no list at all)
//!    the effect function is stored and the record becomes `Scheduled`.
//!
//! 2. During commit, `run` executes the stored cleanup first, then the new
//!    effect function, and keeps whatever cleanup it returns.
//!
//! 3. When the component unmounts, `dispose` hands back the last cleanup so
//!    it can run during teardown. A disposed record never runs again.
//!
//! # Phases
//!
//! Layout effects run after the renderer has applied the output but before
//! it is presented. Passive effects run after presentation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::deps::Deps;
use crate::error::{catch_panic, EffectError};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Teardown returned by an effect.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect function may return.
///
/// `()` means no cleanup. A `Result` reports its error through the effect
/// error path.
pub trait EffectResult {
    fn into_outcome(self) -> Result<Option<Cleanup>, String>;
}

impl EffectResult for () {
    fn into_outcome(self) -> Result<Option<Cleanup>, String> {
        Ok(None)
    }
}

impl EffectResult for Cleanup {
    fn into_outcome(self) -> Result<Option<Cleanup>, String> {
        Ok(Some(self))
    }
}

impl EffectResult for Option<Cleanup> {
    fn into_outcome(self) -> Result<Option<Cleanup>, String> {
        Ok(self)
    }
}

impl<T, E> EffectResult for Result<T, E>
where
    T: EffectResult,
    E: fmt::Display,
{
    fn into_outcome(self) -> Result<Option<Cleanup>, String> {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Err(err.to_string()),
        }
    }
}

/// When an effect runs relative to presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// Before the output becomes visible; blocks presentation.
    Layout,

    /// After the output is visible.
    Passive,
}

/// Scheduling state of an effect record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Idle,
    Scheduled,
    Running,
}

type EffectFn = Box<dyn FnOnce() -> Result<Option<Cleanup>, String>>;

/// One `use_effect` slot.
pub struct EffectRecord {
    id: u64,
    phase: EffectPhase,
    state: EffectState,

    /// Dependencies of the last run.
    deps: Option<Deps>,

    /// Effect function and dependencies waiting for commit.
    pending: Option<(EffectFn, Deps)>,

    cleanup: Option<Cleanup>,
    runs: usize,
    disposed: bool,
}

impl EffectRecord {
    pub fn new(phase: EffectPhase) -> Self {
        Self {
            id: next_effect_id(),
            phase,
            state: EffectState::Idle,
            deps: None,
            pending: None,
            cleanup: None,
            runs: 0,
            disposed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> EffectPhase {
        self.phase
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    /// Number of times the effect function ran.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Offer this render's effect. Returns true if it was scheduled.
    pub fn schedule<F, R>(&mut self, deps: Deps, effect: F) -> bool
    where
        F: FnOnce() -> R + 'static,
        R: EffectResult,
    {
        if self.disposed {
            return false;
        }

        let changed = match &self.deps {
            Some(prev) => !prev.matches(&deps),
            None => true,
        };

        if changed {
            self.pending = Some((Box::new(move || effect().into_outcome()), deps));
            self.state = EffectState::Scheduled;
        } else {
            self.pending = None;
            self.state = EffectState::Idle;
        }

        changed
    }

    /// Run the previous cleanup and then the scheduled effect.
    ///
    /// Failures are returned rather than propagated so that the remaining
    /// effects of the commit still run.
    pub fn run(&mut self, component: &'static str, catch_panics: bool) -> Vec<EffectError> {
        let mut errors = Vec::new();

        let Some((effect, deps)) = self.pending.take() else {
            return errors;
        };
        if self.disposed {
            return errors;
        }

        self.state = EffectState::Running;

        if let Some(cleanup) = self.cleanup.take() {
            if let Err(message) = catch_panic(catch_panics, || cleanup.run()) {
                errors.push(EffectError::CleanupPanicked { component, message });
            }
        }

        match catch_panic(catch_panics, effect) {
            Ok(Ok(cleanup)) => self.cleanup = cleanup,
            Ok(Err(message)) => errors.push(EffectError::Failed { component, message }),
            Err(message) => errors.push(EffectError::Panicked { component, message }),
        }

        self.deps = Some(deps);
        self.runs += 1;
        self.state = EffectState::Idle;
        errors
    }

    /// Retire the record and hand back the cleanup that still has to run.
    pub fn dispose(&mut self) -> Option<Cleanup> {
        self.disposed = true;
        self.pending = None;
        self.state = EffectState::Idle;
        self.cleanup.take()
    }
}

impl fmt::Debug for EffectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRecord")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("runs", &self.runs)
            .field("has_cleanup", &self.has_cleanup())
            .field("disposed", &self.disposed)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
