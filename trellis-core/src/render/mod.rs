//! Rendering Pipeline
//!
//! The output side of a root: the patch protocol a render pass produces,
//! the [`Renderer`] trait that receives it, and an in-memory renderer.
//!
//! A pass never touches host output directly. The reconciler records
//! patches; the root hands them to its renderer as one batch at commit
//! time, then calls `present` once layout effects have run.

mod host_tree;
mod patch;
mod renderer;

pub use host_tree::HostTree;
pub use patch::{Parent, Patch, PatchBatch};
pub use renderer::{NullRenderer, RecordingRenderer, Renderer};
