//! Context
//!
//! A context is a typed channel from a provider to every component below it.
//! There is no global registry: a consumer finds its value by walking its
//! ancestors to the nearest provider for the same context, and falls back
//! to the context's default when there is none.
//!
//! ```rust,ignore
//! fn theme() -> &'static Context<String> {
//!     static THEME: OnceLock<Context<String>> = OnceLock::new();
//!     THEME.get_or_init(|| create_context("light".to_string()))
//! }
//!
//! theme().provide("dark".to_string(), [Element::component::<Toolbar>(())])
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::element::{Element, ElementKind, ProviderElement};

/// Counter for generating unique context IDs.
static CONTEXT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_context_id() -> u64 {
    CONTEXT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// A typed context with a default value.
pub struct Context<T> {
    id: ContextId,
    default: Arc<T>,
}

/// Create a new context. Every call creates a distinct context.
pub fn create_context<T>(default: T) -> Context<T>
where
    T: Send + Sync + 'static,
{
    Context {
        id: ContextId(next_context_id()),
        default: Arc::new(default),
    }
}

impl<T> Context<T>
where
    T: Send + Sync + 'static,
{
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The value consumers see when no provider is above them.
    pub fn default_value(&self) -> Arc<T> {
        Arc::clone(&self.default)
    }

    /// Publish `value` to every component rendered inside `children`.
    ///
    /// Consumers re-render when a later render provides a value that is not
    /// equal to the previous one, even if the components between them and
    /// the provider skip their render.
    pub fn provide(&self, value: T, children: impl IntoIterator<Item = Element>) -> Element
    where
        T: PartialEq,
    {
        ElementKind::Provider(ProviderElement {
            context: self.id,
            value: Arc::new(value),
            same: value_eq::<T>,
            children: children.into_iter().collect(),
        })
        .into()
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Arc::clone(&self.default),
        }
    }
}

impl<T> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

fn value_eq<T: PartialEq + 'static>(prev: &dyn Any, next: &dyn Any) -> bool {
    match (prev.downcast_ref::<T>(), next.downcast_ref::<T>()) {
        (Some(prev), Some(next)) => prev == next,
        _ => false,
    }
}
