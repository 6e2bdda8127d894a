//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis component model.
//! It implements:
//!
//! - Component state, memoized values and effects driven by hooks
//! - Batched render scheduling that coalesces writes into passes
//! - Keyed reconciliation of element trees against a mounted tree
//! - Context providers, error boundaries and portals
//! - A patch protocol and renderer boundary for host output
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: State cells, dependency lists, memos, effect records and
//!   the render scheduler
//! - `tree`: Elements, components, hooks and the reconciler
//! - `render`: Patches, the `Renderer` trait and the in-memory `HostTree`
//! - `root`: The owner of a mounted tree and its commit phase
//! - `host`: A tokio loop that flushes a root whenever a pass is requested
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{host, Component, Element, HostTree, Rendered, Root, Scope};
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     type Props = ();
//!
//!     fn render(cx: &mut Scope<'_>, _props: &()) -> Rendered {
//!         let (count, set_count) = cx.use_state(|| 0);
//!         Ok(host("button")
//!             .on("click", move |_| set_count.update(|n| n + 1))
//!             .child(count.to_string())
//!             .into())
//!     }
//! }
//!
//! let mut root = Root::new(HostTree::new());
//! root.render(Element::component::<Counter>(()))?;
//! assert_eq!(root.renderer().markup(), "<button>0</button>");
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod reactive;
pub mod render;
pub mod root;
pub mod tree;

pub use config::{DuplicateKeyPolicy, RuntimeConfig};
pub use error::{ConfigError, DispatchError, EffectError, RenderError};
pub use reactive::{Cleanup, Deps, SetState};
pub use render::{HostTree, NullRenderer, Parent, Patch, PatchBatch, RecordingRenderer, Renderer};
pub use root::{FlushReport, Root};
pub use tree::{
    boundary, create_context, host, Component, Context, Element, Event, Key, NodeId, Rendered, Scope, Stateful,
};
