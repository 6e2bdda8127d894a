//! Reactive Primitives
//!
//! This module implements the building blocks that component hooks are made
//! of: state cells, dependency lists, memos, effect records, and the render
//! scheduler that turns state writes into render passes.
//!
//! # Concepts
//!
//! ## State cells
//!
//! A state cell holds a committed value and a queue of pending writes.
//! Writes are folded into the committed value only when the owning
//! component re-renders, so reads within one turn always agree.
//!
//! ## Dependency lists
//!
//! An ordered list of inputs compared shallowly and positionally. Memos and
//! effects consult it to decide whether previous work can be reused.
//!
//! ## Memos
//!
//! A memo caches a value together with the dependency list it was computed
//! from and returns the same `Rc` for as long as the list is unchanged.
//!
//! ## Effects
//!
//! An effect record stores a side effect to run after commit, plus the
//! cleanup it returned last time. Cleanups run before the next run and on
//! unmount.
//!
//! ## Scheduler
//!
//! The scheduler collects dirty components and coalesces pass requests,
//! batching every write issued inside one event into a single pass.
//!
//! # Implementation Notes
//!
//! Dependency tracking is explicit: callers hand a `Deps` list to each
//! memo and effect rather than having reads recorded automatically. This is
//! the model hook-based component frameworks use.

mod subscriber;
mod context;
mod deps;
mod memo;
mod state;
mod effect;
mod scheduler;

pub use subscriber::{Subscriber, SubscriberId};
pub use context::RenderFrame;
pub use deps::{shallow_equal, ByArc, ByRef, DepValue, Deps};
pub use memo::{Memo, MemoState};
pub use state::{SetState, StateCell, Update};
pub(crate) use state::Owner;
pub use effect::{Cleanup, EffectPhase, EffectRecord, EffectResult, EffectState};
pub use scheduler::{Scheduler, SchedulerStats};
