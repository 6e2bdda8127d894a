//! Component Tree
//!
//! This module implements the element model, components and hooks, and
//! the reconciler that keeps a mounted tree of fibers in step with the
//! elements components render.
//!
//! # Overview
//!
//! - Elements describe output. They are cheap values rebuilt on every
//!   render.
//! - Fibers are the mounted nodes. They own hook state, component
//!   instances and the last host attributes, and are identified by a
//!   stable [`NodeId`].
//! - The reconciler matches elements to fibers by key and position and
//!   records the host patches the changes require.
//!
//! # Design Decisions
//!
//! 1. Fibers live in an arena indexed by node id rather than in an owning
//!    tree, so that hooks can walk parents while their own fiber is being
//!    rendered.
//!
//! 2. Dirty components are processed shallowest first. A component
//!    rendered by its parent in the same pass is not rendered again.
//!
//! 3. Only host and text fibers produce host nodes; every other fiber kind
//!    is transparent to the renderer.

mod boundary;
mod component;
mod element;
mod hooks;
mod node;
mod provider;
mod queue;
mod reconcile;

pub use boundary::{boundary, BoundaryElement, ErrorHandler, Fallback};
pub use component::{Component, Lifecycle, Memoized, Rendered, Stateful};
pub use element::{host, Attrs, Element, Event, Handler, HostElement, Key};
pub use hooks::{Callback, Dispatch, HookKind, RefHandle, Scope, Updater};
pub use node::{NodeId, NodeKind};
pub use provider::{create_context, Context, ContextId};

pub(crate) use reconcile::{CommitTask, Deletion, PassWork, Tree};
