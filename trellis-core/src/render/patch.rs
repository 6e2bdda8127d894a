//! Patch Protocol
//!
//! A render pass ends with a batch of patches: the minimal set of host
//! mutations that turns the previous output into the new one. Batches are
//! plain data so they can cross a process or network boundary.
//!
//! # Wire Format
//!
//! Patches are internally tagged by `op`:
//!
//! ```json
//! { "op": "create", "id": 3, "parent": { "kind": "root" }, "tag": "ul", "attrs": {} }
//! { "op": "set_text", "id": 5, "text": "2 items" }
//! { "op": "reorder", "parent": { "kind": "node", "id": 3 }, "children": [7, 6] }
//! ```
//!
//! MessagePack encoding uses named fields so both encodings share one
//! schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::Attrs;

/// Where a host node is placed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Parent {
    /// The top-level container of the root.
    Root,

    /// Another host node.
    Node(u64),

    /// A named portal container.
    Portal(String),
}

/// One host mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Patch {
    /// Create an element and append it to `parent`.
    Create {
        id: u64,
        parent: Parent,
        tag: String,
        attrs: Attrs,
    },

    /// Create a text node and append it to `parent`.
    CreateText { id: u64, parent: Parent, text: String },

    SetAttrs {
        id: u64,
        set: Attrs,
        removed: Vec<String>,
    },

    SetText { id: u64, text: String },

    /// Detach a node together with everything below it.
    Remove { id: u64 },

    /// Put the listed children of `parent` in this order.
    Reorder { parent: Parent, children: Vec<u64> },
}

impl Patch {
    /// The node a patch creates or mutates. `None` for reorders.
    pub fn target(&self) -> Option<u64> {
        match self {
            Patch::Create { id, .. }
            | Patch::CreateText { id, .. }
            | Patch::SetAttrs { id, .. }
            | Patch::SetText { id, .. }
            | Patch::Remove { id } => Some(*id),
            Patch::Reorder { .. } => None,
        }
    }
}

/// The patches of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchBatch {
    /// Sequence number of the pass that produced the batch.
    pub pass: u64,
    pub patches: Vec<Patch>,
}

impl PatchBatch {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// Attribute value as it appears in markup.
pub(crate) fn attr_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
