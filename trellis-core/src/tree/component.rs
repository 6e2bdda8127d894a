//! Components
//!
//! Two authoring styles share one stage-transition interface:
//!
//! - [`Component`]: a render function over props. State and side effects
//!   come from hooks on the [`Scope`].
//! - [`Stateful`]: an instance created on mount that receives `on_mount`,
//!   `on_update` and `on_unmount` calls and may veto re-renders with
//!   `should_update`.
//!
//! The reconciler only ever sees [`Lifecycle`] trait objects.

use std::any::Any;
use std::marker::PhantomData;

use super::element::Element;
use super::hooks::Scope;
use crate::error::RenderError;

/// Result of a render function.
pub type Rendered = Result<Element, RenderError>;

/// A function component.
///
/// ```rust,ignore
/// struct Greeting;
///
/// impl Component for Greeting {
///     type Props = String;
///
///     fn render(_cx: &mut Scope<'_>, name: &String) -> Rendered {
///         Ok(host("p").child(format!("Hello, {name}")).into())
///     }
/// }
/// ```
pub trait Component: 'static {
    type Props: 'static;

    fn render(cx: &mut Scope<'_>, props: &Self::Props) -> Rendered;

    /// Whether new props require a re-render. Pending state always does.
    fn should_update(prev: &Self::Props, next: &Self::Props) -> bool {
        let _ = (prev, next);
        true
    }
}

/// Wraps a component so that it re-renders only when props change.
pub struct Memoized<C>(PhantomData<C>);

impl<C> Component for Memoized<C>
where
    C: Component,
    C::Props: PartialEq,
{
    type Props = C::Props;

    fn render(cx: &mut Scope<'_>, props: &Self::Props) -> Rendered {
        C::render(cx, props)
    }

    fn should_update(prev: &Self::Props, next: &Self::Props) -> bool {
        prev != next
    }
}

/// A component backed by an instance with lifecycle methods.
pub trait Stateful: 'static {
    type Props: 'static;

    fn create(props: &Self::Props) -> Self
    where
        Self: Sized;

    fn render(&self, cx: &mut Scope<'_>, props: &Self::Props) -> Rendered;

    fn should_update(&self, prev: &Self::Props, next: &Self::Props) -> bool {
        let _ = (prev, next);
        true
    }

    /// Called after the first commit that contains this instance.
    fn on_mount(&mut self, props: &Self::Props) {
        let _ = props;
    }

    /// Called after each later commit that re-rendered this instance.
    fn on_update(&mut self, prev: &Self::Props, props: &Self::Props) {
        let _ = (prev, props);
    }

    /// Called during the commit that removes this instance.
    fn on_unmount(&mut self) {}
}

/// The stage-transition interface every mounted component exposes.
pub trait Lifecycle {
    fn render(&mut self, cx: &mut Scope<'_>, props: &dyn Any) -> Rendered;

    fn should_update(&self, prev: &dyn Any, next: &dyn Any) -> bool;

    /// Whether the commit phase has to call the transition methods below.
    fn has_transitions(&self) -> bool {
        false
    }

    fn on_mount(&mut self, props: &dyn Any) {
        let _ = props;
    }

    fn on_update(&mut self, prev: &dyn Any, next: &dyn Any) {
        let _ = (prev, next);
    }

    fn on_unmount(&mut self) {}
}

struct FunctionInstance<C>(PhantomData<C>);

impl<C: Component> Lifecycle for FunctionInstance<C> {
    fn render(&mut self, cx: &mut Scope<'_>, props: &dyn Any) -> Rendered {
        let props = props
            .downcast_ref::<C::Props>()
            .ok_or(RenderError::PropsMismatch {
                component: cx.component(),
            })?;
        C::render(cx, props)
    }

    fn should_update(&self, prev: &dyn Any, next: &dyn Any) -> bool {
        match (prev.downcast_ref::<C::Props>(), next.downcast_ref::<C::Props>()) {
            (Some(prev), Some(next)) => C::should_update(prev, next),
            _ => true,
        }
    }
}

struct ClassInstance<S> {
    inner: S,
}

impl<S: Stateful> Lifecycle for ClassInstance<S> {
    fn render(&mut self, cx: &mut Scope<'_>, props: &dyn Any) -> Rendered {
        let props = props
            .downcast_ref::<S::Props>()
            .ok_or(RenderError::PropsMismatch {
                component: cx.component(),
            })?;
        self.inner.render(cx, props)
    }

    fn should_update(&self, prev: &dyn Any, next: &dyn Any) -> bool {
        match (prev.downcast_ref::<S::Props>(), next.downcast_ref::<S::Props>()) {
            (Some(prev), Some(next)) => self.inner.should_update(prev, next),
            _ => true,
        }
    }

    fn has_transitions(&self) -> bool {
        true
    }

    fn on_mount(&mut self, props: &dyn Any) {
        if let Some(props) = props.downcast_ref::<S::Props>() {
            self.inner.on_mount(props);
        }
    }

    fn on_update(&mut self, prev: &dyn Any, next: &dyn Any) {
        if let (Some(prev), Some(next)) = (prev.downcast_ref::<S::Props>(), next.downcast_ref::<S::Props>()) {
            self.inner.on_update(prev, next);
        }
    }

    fn on_unmount(&mut self) {
        self.inner.on_unmount();
    }
}

pub(crate) fn create_function<C: Component>(_props: &dyn Any) -> Result<Box<dyn Lifecycle>, RenderError> {
    Ok(Box::new(FunctionInstance::<C>(PhantomData)))
}

pub(crate) fn create_stateful<S: Stateful>(props: &dyn Any) -> Result<Box<dyn Lifecycle>, RenderError> {
    let props = props
        .downcast_ref::<S::Props>()
        .ok_or(RenderError::PropsMismatch {
            component: display_name(std::any::type_name::<S>()),
        })?;
    Ok(Box::new(ClassInstance {
        inner: S::create(props),
    }))
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn display_name(type_name: &'static str) -> &'static str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}
