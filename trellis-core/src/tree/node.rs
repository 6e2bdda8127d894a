//! Tree Nodes
//!
//! This module defines the fibers that make up the mounted component tree.
//! A fiber is the persistent counterpart of an element: elements are thrown
//! away after every render, fibers live from mount to unmount and carry the
//! state that has to survive between renders (hook slots, component
//! instances, the last host attributes).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::boundary::{ErrorHandler, Fallback};
use super::component::Lifecycle;
use super::element::{Attrs, CreateFn, Handler, Key};
use super::hooks::HookList;
use super::provider::ContextId;
use crate::error::RenderError;
use crate::reactive::Deps;

/// Unique identifier for a node in the mounted tree.
///
/// Host nodes use the raw value as their id in patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a mounted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The container every root element is mounted into.
    Root,
    Empty,
    Text,
    Host,
    Fragment,
    Component,
    Provider,
    Boundary,
    Portal,
}

pub(crate) type Arena = HashMap<NodeId, Fiber>;

/// A mounted node.
pub(crate) struct Fiber {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub key: Option<Key>,
    pub kind: FiberKind,

    /// Direct children in output order.
    pub children: Vec<NodeId>,

    /// Host nodes directly inside this container, in the order the renderer
    /// last saw them. Only used by the root, host and portal fibers.
    pub host_children: Vec<NodeId>,
}

pub(crate) enum FiberKind {
    Root,
    Empty,
    Text(String),
    Host(HostFiber),
    Fragment,
    Component(ComponentFiber),
    Provider(ProviderFiber),
    Boundary(BoundaryFiber),
    Portal(PortalFiber),
}

pub(crate) struct HostFiber {
    pub tag: String,
    pub attrs: Attrs,
    pub handlers: IndexMap<String, Handler>,
}

pub(crate) struct ComponentFiber {
    pub type_id: TypeId,
    pub name: &'static str,
    pub props: Rc<dyn Any>,
    pub create: CreateFn,

    /// Taken out while the component renders.
    pub instance: Option<Box<dyn Lifecycle>>,
    pub hooks: HookList,

    /// Shared with every state cell of the component; cleared on unmount.
    pub alive: Arc<AtomicBool>,
    pub renders: usize,

    /// Providers read during the last render.
    pub consumes: Vec<NodeId>,

    /// Set once `on_mount` has been delivered.
    pub mounted: bool,
}

pub(crate) struct ProviderFiber {
    pub context: ContextId,
    pub value: Arc<dyn Any + Send + Sync>,
    pub same: fn(&dyn Any, &dyn Any) -> bool,

    /// Components that read this provider during their last render.
    pub consumers: IndexSet<NodeId>,
}

pub(crate) struct BoundaryFiber {
    pub fallback: Fallback,
    pub on_error: Option<ErrorHandler>,
    pub reset_keys: Option<Rc<Deps>>,

    /// The error whose fallback is currently shown.
    pub failure: Option<RenderError>,
    pub fallback_renders: usize,
}

pub(crate) struct PortalFiber {
    pub target: String,
}

impl Fiber {
    pub fn new(parent: Option<NodeId>, depth: usize, key: Option<Key>, kind: FiberKind) -> Self {
        Self {
            id: NodeId::new(),
            parent,
            depth,
            key,
            kind,
            children: Vec::new(),
            host_children: Vec::new(),
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            FiberKind::Root => NodeKind::Root,
            FiberKind::Empty => NodeKind::Empty,
            FiberKind::Text(_) => NodeKind::Text,
            FiberKind::Host(_) => NodeKind::Host,
            FiberKind::Fragment => NodeKind::Fragment,
            FiberKind::Component(_) => NodeKind::Component,
            FiberKind::Provider(_) => NodeKind::Provider,
            FiberKind::Boundary(_) => NodeKind::Boundary,
            FiberKind::Portal(_) => NodeKind::Portal,
        }
    }

    /// Whether this fiber is a node the renderer knows about.
    pub fn is_host(&self) -> bool {
        matches!(self.kind, FiberKind::Host(_) | FiberKind::Text(_))
    }

    /// Whether host children of this fiber are placed directly inside it.
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            FiberKind::Root | FiberKind::Host(_) | FiberKind::Portal(_)
        )
    }

    pub fn component(&self) -> Option<&ComponentFiber> {
        match &self.kind {
            FiberKind::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn component_mut(&mut self) -> Option<&mut ComponentFiber> {
        match &mut self.kind {
            FiberKind::Component(component) => Some(component),
            _ => None,
        }
    }

    /// A short label for logs and errors.
    pub fn describe(&self) -> String {
        match &self.kind {
            FiberKind::Root => "root".to_string(),
            FiberKind::Empty => "empty".to_string(),
            FiberKind::Text(_) => "text".to_string(),
            FiberKind::Host(host) => format!("<{}>", host.tag),
            FiberKind::Fragment => "fragment".to_string(),
            FiberKind::Component(component) => component.name.to_string(),
            FiberKind::Provider(_) => "provider".to_string(),
            FiberKind::Boundary(_) => "error boundary".to_string(),
            FiberKind::Portal(portal) => format!("portal({})", portal.target),
        }
    }
}

impl ComponentFiber {
    pub fn new(type_id: TypeId, name: &'static str, props: Rc<dyn Any>, create: CreateFn) -> Self {
        Self {
            type_id,
            name,
            props,
            create,
            instance: None,
            hooks: HookList::default(),
            alive: Arc::new(AtomicBool::new(true)),
            renders: 0,
            consumes: Vec::new(),
            mounted: false,
        }
    }
}
