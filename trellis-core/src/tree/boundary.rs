//! Error boundaries.
//!
//! A boundary catches render errors raised anywhere in its subtree, unmounts
//! the subtree and renders a fallback in its place. The fallback stays until
//! the boundary's reset keys change.

use std::rc::Rc;

use super::element::{Element, ElementKind, Key};
use crate::error::RenderError;
use crate::reactive::Deps;

/// Renders the replacement for a failed subtree.
pub type Fallback = Rc<dyn Fn(&RenderError) -> Element>;

/// Observes caught errors, e.g. for reporting.
pub type ErrorHandler = Rc<dyn Fn(&RenderError)>;

/// Builder for an error boundary element.
#[derive(Clone)]
pub struct BoundaryElement {
    pub(crate) fallback: Fallback,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) reset_keys: Option<Rc<Deps>>,
    pub(crate) children: Vec<Element>,
    key: Option<Key>,
}

/// Start building an error boundary with the given fallback.
pub fn boundary<F>(fallback: F) -> BoundaryElement
where
    F: Fn(&RenderError) -> Element + 'static,
{
    BoundaryElement {
        fallback: Rc::new(fallback),
        on_error: None,
        reset_keys: None,
        children: Vec::new(),
        key: None,
    }
}

impl BoundaryElement {
    /// Inputs that, when changed, clear a shown fallback and retry the
    /// children.
    pub fn reset_keys(mut self, keys: Deps) -> Self {
        self.reset_keys = Some(Rc::new(keys));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RenderError) + 'static,
    {
        self.on_error = Some(Rc::new(handler));
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

impl From<BoundaryElement> for Element {
    fn from(mut boundary: BoundaryElement) -> Self {
        let key = boundary.key.take();
        Element {
            kind: ElementKind::Boundary(boundary),
            key,
        }
    }
}

/// Whether a boundary showing a fallback should retry its children.
pub(crate) fn keys_changed(prev: Option<&Rc<Deps>>, next: Option<&Rc<Deps>>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => !prev.matches(next),
        (None, None) => false,
        _ => true,
    }
}
