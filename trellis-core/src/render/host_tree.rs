//! In-memory host output.
//!
//! `HostTree` materializes patch batches into a tree of elements and text
//! nodes. It is what tests and headless hosts render into, and it can print
//! itself as markup:
//!
//! ```text
//! <ul class="list"><li>a</li><li>b</li></ul>
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use super::patch::{attr_text, Parent, Patch, PatchBatch};
use super::renderer::Renderer;
use crate::tree::Attrs;

#[derive(Debug, Clone)]
enum HostNode {
    Element {
        tag: String,
        attrs: Attrs,
        children: Vec<u64>,
        parent: Parent,
    },
    Text {
        text: String,
        parent: Parent,
    },
}

impl HostNode {
    fn parent(&self) -> &Parent {
        match self {
            HostNode::Element { parent, .. } | HostNode::Text { parent, .. } => parent,
        }
    }
}

/// A renderer that keeps the output in memory.
#[derive(Debug, Default)]
pub struct HostTree {
    nodes: HashMap<u64, HostNode>,
    root: Vec<u64>,
    portals: IndexMap<String, Vec<u64>>,
    batches: usize,
    presents: usize,
}

impl HostTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live host nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of batches applied.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Number of times the output was presented.
    pub fn presents(&self) -> usize {
        self.presents
    }

    /// Markup of the root container.
    pub fn markup(&self) -> String {
        self.markup_of(&self.root)
    }

    /// Markup of a named portal container.
    pub fn portal_markup(&self, name: &str) -> String {
        self.portals
            .get(name)
            .map(|children| self.markup_of(children))
            .unwrap_or_default()
    }

    /// Ids of the top-level host nodes.
    pub fn root_children(&self) -> &[u64] {
        &self.root
    }

    /// Child ids of a host element.
    pub fn children_of(&self, id: u64) -> Option<&[u64]> {
        match self.nodes.get(&id)? {
            HostNode::Element { children, .. } => Some(children),
            HostNode::Text { .. } => None,
        }
    }

    pub fn attr(&self, id: u64, name: &str) -> Option<&Value> {
        match self.nodes.get(&id)? {
            HostNode::Element { attrs, .. } => attrs.get(name),
            HostNode::Text { .. } => None,
        }
    }

    pub fn text(&self, id: u64) -> Option<&str> {
        match self.nodes.get(&id)? {
            HostNode::Text { text, .. } => Some(text),
            HostNode::Element { .. } => None,
        }
    }

    /// First element, in document order, whose attribute `name` equals
    /// `value`. Portals are searched after the root.
    pub fn find_by_attr(&self, name: &str, value: impl Into<Value>) -> Option<u64> {
        let value = value.into();
        let mut stack: Vec<u64> = self
            .portals
            .values()
            .rev()
            .flat_map(|children| children.iter().rev())
            .chain(self.root.iter().rev())
            .copied()
            .collect();

        while let Some(id) = stack.pop() {
            if let Some(HostNode::Element { attrs, children, .. }) = self.nodes.get(&id) {
                if attrs.get(name) == Some(&value) {
                    return Some(id);
                }
                stack.extend(children.iter().rev().copied());
            }
        }
        None
    }

    fn markup_of(&self, ids: &[u64]) -> String {
        let mut out = String::new();
        for id in ids {
            self.write_node(*id, &mut out);
        }
        out
    }

    fn write_node(&self, id: u64, out: &mut String) {
        match self.nodes.get(&id) {
            Some(HostNode::Text { text, .. }) => out.push_str(text),
            Some(HostNode::Element {
                tag, attrs, children, ..
            }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {name}=\"{}\"", attr_text(value)));
                }
                out.push('>');
                for child in children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            None => {}
        }
    }

    fn container_mut(&mut self, parent: &Parent) -> Option<&mut Vec<u64>> {
        match parent {
            Parent::Root => Some(&mut self.root),
            Parent::Portal(name) => Some(self.portals.entry(name.clone()).or_default()),
            Parent::Node(id) => match self.nodes.get_mut(id) {
                Some(HostNode::Element { children, .. }) => Some(children),
                _ => None,
            },
        }
    }

    fn insert(&mut self, id: u64, node: HostNode) {
        let parent = node.parent().clone();
        match self.container_mut(&parent) {
            Some(children) => {
                children.push(id);
                self.nodes.insert(id, node);
            }
            None => warn!(id, ?parent, "create under an unknown parent ignored"),
        }
    }

    fn remove(&mut self, id: u64) {
        let Some(node) = self.nodes.remove(&id) else {
            warn!(id, "remove of an unknown node ignored");
            return;
        };
        if let Some(children) = self.container_mut(node.parent()) {
            children.retain(|child| *child != id);
        }
        self.drop_subtree(node);
    }

    fn drop_subtree(&mut self, node: HostNode) {
        if let HostNode::Element { children, .. } = node {
            for child in children {
                if let Some(child) = self.nodes.remove(&child) {
                    self.drop_subtree(child);
                }
            }
        }
    }

    fn reorder(&mut self, parent: &Parent, order: &[u64]) {
        let Some(children) = self.container_mut(parent) else {
            warn!(?parent, "reorder of an unknown parent ignored");
            return;
        };
        let mut next: Vec<u64> = order.iter().copied().filter(|id| children.contains(id)).collect();
        next.extend(children.iter().copied().filter(|id| !order.contains(id)));
        *children = next;
    }

    fn apply_patch(&mut self, patch: &Patch) {
        match patch {
            Patch::Create {
                id,
                parent,
                tag,
                attrs,
            } => self.insert(
                *id,
                HostNode::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                    children: Vec::new(),
                    parent: parent.clone(),
                },
            ),
            Patch::CreateText { id, parent, text } => self.insert(
                *id,
                HostNode::Text {
                    text: text.clone(),
                    parent: parent.clone(),
                },
            ),
            Patch::SetAttrs { id, set, removed } => match self.nodes.get_mut(id) {
                Some(HostNode::Element { attrs, .. }) => {
                    for name in removed {
                        attrs.shift_remove(name);
                    }
                    for (name, value) in set {
                        attrs.insert(name.clone(), value.clone());
                    }
                }
                _ => warn!(id, "set_attrs on a missing element ignored"),
            },
            Patch::SetText { id, text } => match self.nodes.get_mut(id) {
                Some(HostNode::Text { text: current, .. }) => *current = text.clone(),
                _ => warn!(id, "set_text on a missing text node ignored"),
            },
            Patch::Remove { id } => self.remove(*id),
            Patch::Reorder { parent, children } => self.reorder(parent, children),
        }
    }
}

impl Renderer for HostTree {
    fn apply(&mut self, batch: &PatchBatch) {
        for patch in &batch.patches {
            self.apply_patch(patch);
        }
        self.batches += 1;
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
