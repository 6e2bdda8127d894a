//! Elements
//!
//! An element is the description of one node of output: its type, its
//! props, an optional key, and its children. Components return a fresh
//! element tree on every render; the reconciler compares it with the
//! previous one to decide what to mount, update, and unmount.
//!
//! Host elements (`host("div")`) and text are the only elements that reach
//! the renderer. Components, fragments, providers, boundaries and portals
//! structure the tree but produce no host node of their own.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::boundary::BoundaryElement;
use super::component::{create_function, create_stateful, display_name, Component, Lifecycle, Memoized, Stateful};
use super::provider::ContextId;
use crate::error::RenderError;

/// Attributes of a host node.
pub type Attrs = IndexMap<String, Value>;

/// Identity of a list-rendered sibling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key(key)
    }
}

impl From<&String> for Key {
    fn from(key: &String) -> Self {
        Key(key.clone())
    }
}

macro_rules! key_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(key: $ty) -> Self {
                    Key(key.to_string())
                }
            }
        )*
    };
}

key_from_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// An event delivered to a host handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,

    /// Host node the event was dispatched to.
    pub target: u64,

    pub payload: Value,
}

/// Event handler attached to a host element.
pub type Handler = Rc<dyn Fn(&Event)>;

pub(crate) type CreateFn = fn(&dyn Any) -> Result<Box<dyn Lifecycle>, RenderError>;

/// A node of output description.
#[derive(Clone)]
pub struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) key: Option<Key>,
}

#[derive(Clone)]
pub(crate) enum ElementKind {
    Empty,
    Text(String),
    Host(HostElement),
    Fragment(Vec<Element>),
    Component(ComponentElement),
    Provider(ProviderElement),
    Boundary(BoundaryElement),
    Portal(PortalElement),
}

#[derive(Clone)]
pub(crate) struct ComponentElement {
    pub type_id: TypeId,
    pub name: &'static str,
    pub props: Rc<dyn Any>,
    pub create: CreateFn,
}

#[derive(Clone)]
pub(crate) struct ProviderElement {
    pub context: ContextId,
    pub value: Arc<dyn Any + Send + Sync>,
    pub same: fn(&dyn Any, &dyn Any) -> bool,
    pub children: Vec<Element>,
}

#[derive(Clone)]
pub(crate) struct PortalElement {
    pub target: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Renders nothing but keeps its position among siblings.
    pub fn empty() -> Self {
        ElementKind::Empty.into()
    }

    pub fn text(text: impl Into<String>) -> Self {
        ElementKind::Text(text.into()).into()
    }

    pub fn fragment(children: impl IntoIterator<Item = Element>) -> Self {
        ElementKind::Fragment(children.into_iter().collect()).into()
    }

    /// A function component.
    pub fn component<C: Component>(props: C::Props) -> Self {
        ElementKind::Component(ComponentElement {
            type_id: TypeId::of::<C>(),
            name: display_name(std::any::type_name::<C>()),
            props: Rc::new(props),
            create: create_function::<C>,
        })
        .into()
    }

    /// A function component that skips re-rendering when its props are
    /// equal to the previous ones.
    pub fn memo<C>(props: C::Props) -> Self
    where
        C: Component,
        C::Props: PartialEq,
    {
        ElementKind::Component(ComponentElement {
            type_id: TypeId::of::<Memoized<C>>(),
            name: display_name(std::any::type_name::<C>()),
            props: Rc::new(props),
            create: create_function::<Memoized<C>>,
        })
        .into()
    }

    /// A component with an instance and lifecycle methods.
    pub fn stateful<S: Stateful>(props: S::Props) -> Self {
        ElementKind::Component(ComponentElement {
            type_id: TypeId::of::<S>(),
            name: display_name(std::any::type_name::<S>()),
            props: Rc::new(props),
            create: create_stateful::<S>,
        })
        .into()
    }

    /// Render `children` into the named host container instead of the
    /// parent's.
    pub fn portal(target: impl Into<String>, children: impl IntoIterator<Item = Element>) -> Self {
        ElementKind::Portal(PortalElement {
            target: target.into(),
            children: children.into_iter().collect(),
        })
        .into()
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Short description used in logs and error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            ElementKind::Empty => "empty".to_string(),
            ElementKind::Text(_) => "text".to_string(),
            ElementKind::Host(host) => format!("<{}>", host.tag),
            ElementKind::Fragment(_) => "fragment".to_string(),
            ElementKind::Component(component) => component.name.to_string(),
            ElementKind::Provider(_) => "provider".to_string(),
            ElementKind::Boundary(_) => "error boundary".to_string(),
            ElementKind::Portal(portal) => format!("portal({})", portal.target),
        }
    }
}

impl From<ElementKind> for Element {
    fn from(kind: ElementKind) -> Self {
        Element { kind, key: None }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::text(text)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Element");
        debug.field("type", &self.describe());
        if let Some(key) = &self.key {
            debug.field("key", key);
        }
        match &self.kind {
            ElementKind::Text(text) => {
                debug.field("text", text);
            }
            ElementKind::Host(host) => {
                debug.field("attrs", &host.attrs).field("children", &host.children);
            }
            ElementKind::Fragment(children) => {
                debug.field("children", children);
            }
            _ => {}
        }
        debug.finish()
    }
}

/// Builder for a host element.
#[derive(Clone)]
pub struct HostElement {
    pub(crate) tag: String,
    pub(crate) attrs: Attrs,
    pub(crate) handlers: IndexMap<String, Handler>,
    pub(crate) children: Vec<Element>,
    key: Option<Key>,
}

/// Start building a host element with the given tag.
pub fn host(tag: impl Into<String>) -> HostElement {
    HostElement {
        tag: tag.into(),
        attrs: Attrs::new(),
        handlers: IndexMap::new(),
        children: Vec::new(),
        key: None,
    }
}

impl HostElement {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        self.handlers.insert(event.into(), Rc::new(handler));
        self
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl From<HostElement> for Element {
    fn from(mut host: HostElement) -> Self {
        let key = host.key.take();
        Element {
            kind: ElementKind::Host(host),
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_from_numbers_and_strings() {
        assert_eq!(Key::from(7u32), Key::from("7"));
        assert_eq!(Key::from(String::from("row")).as_str(), "row");
        assert_eq!(Key::from(-3i64).to_string(), "-3");
    }

    #[test]
    fn host_builder_collects_parts() {
        let element: Element = host("button")
            .attr("class", "primary")
            .attr("disabled", false)
            .on("click", |_| {})
            .child("Save")
            .key("save")
            .into();

        assert_eq!(element.key(), Some(&Key::from("save")));
        let ElementKind::Host(host) = &element.kind else {
            panic!("expected a host element");
        };
        assert_eq!(host.tag, "button");
        assert_eq!(host.attrs.get("class"), Some(&json!("primary")));
        assert_eq!(host.attrs.get("disabled"), Some(&json!(false)));
        assert!(host.handlers.contains_key("click"));
        assert_eq!(host.children.len(), 1);
    }

    #[test]
    fn describe_names_the_element() {
        assert_eq!(Element::text("hi").describe(), "text");
        assert_eq!(Element::from(host("ul")).describe(), "<ul>");
        assert_eq!(Element::portal("modal", []).describe(), "portal(modal)");
    }
}
