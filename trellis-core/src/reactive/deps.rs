//! Dependency Lists
//!
//! A dependency list is the ordered set of inputs that governs whether a
//! memoized value or an effect has to be recomputed. Lists are compared
//! shallowly and positionally: two lists are equal only if they have the
//! same length and every element compares equal to the element at the same
//! index in the other list.
//!
//! Elements compare by value (`PartialEq`) unless wrapped in [`ByRef`], in
//! which case they compare by pointer identity.
//!
//! ```rust,ignore
//! let prev = deps![count, name.clone()];
//! let next = deps![count, name.clone()];
//! assert!(prev.matches(&next));
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

/// A single tracked input.
///
/// Implemented for every `PartialEq + Debug + 'static` type, so plain values
/// can be used directly.
pub trait DepValue: Any + fmt::Debug {
    /// Compare with another dependency of possibly different type.
    ///
    /// Values of different types are never equal.
    fn dep_eq(&self, other: &dyn DepValue) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<T> DepValue for T
where
    T: PartialEq + fmt::Debug + 'static,
{
    fn dep_eq(&self, other: &dyn DepValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reference-identity wrapper.
///
/// Two `ByRef` values are equal only when they point at the same allocation.
pub struct ByRef<T: ?Sized>(pub Rc<T>);

impl<T: ?Sized> ByRef<T> {
    pub fn new(value: &Rc<T>) -> Self {
        Self(Rc::clone(value))
    }
}

impl<T: ?Sized> PartialEq for ByRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> fmt::Debug for ByRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByRef({:p})", Rc::as_ptr(&self.0))
    }
}

/// Reference-identity wrapper for shared, thread-safe values.
pub struct ByArc<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> ByArc<T> {
    pub fn new(value: &Arc<T>) -> Self {
        Self(Arc::clone(value))
    }
}

impl<T: ?Sized> PartialEq for ByArc<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> fmt::Debug for ByArc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByArc({:p})", Arc::as_ptr(&self.0))
    }
}

/// An ordered dependency list.
#[derive(Debug)]
pub enum Deps {
    /// No list at all: never equal to anything, so work reruns every time.
    Always,

    /// Tracked inputs. An empty list means "compute once".
    List(SmallVec<[Box<dyn DepValue>; 4]>),
}

impl Deps {
    /// A missing dependency list.
    pub fn always() -> Self {
        Deps::Always
    }

    /// An empty dependency list.
    pub fn once() -> Self {
        Deps::List(SmallVec::new())
    }

    /// Append a tracked input.
    pub fn with<V: DepValue>(self, value: V) -> Self {
        let mut list = match self {
            Deps::Always => SmallVec::new(),
            Deps::List(list) => list,
        };
        list.push(Box::new(value));
        Deps::List(list)
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Deps::Always)
    }

    /// Number of tracked inputs (zero for `Always`).
    pub fn len(&self) -> usize {
        match self {
            Deps::Always => 0,
            Deps::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decide whether work keyed by `self` can be reused for `next`.
    pub fn matches(&self, next: &Deps) -> bool {
        match (self, next) {
            (Deps::List(prev), Deps::List(next)) => {
                if prev.len() != next.len() {
                    warn!(
                        previous = prev.len(),
                        next = next.len(),
                        "dependency list changed length between calls"
                    );
                }
                shallow_equal(prev, next)
            }
            _ => false,
        }
    }
}

impl Default for Deps {
    fn default() -> Self {
        Deps::once()
    }
}

/// Positional shallow equality over two dependency slices.
pub fn shallow_equal(prev: &[Box<dyn DepValue>], next: &[Box<dyn DepValue>]) -> bool {
    prev.len() == next.len()
        && prev
            .iter()
            .zip(next.iter())
            .all(|(a, b)| a.dep_eq(b.as_ref()))
}

/// Build a [`Deps`] list from expressions.
///
/// `deps![]` is the empty ("compute once") list.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::reactive::Deps::once()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::reactive::Deps::once()$(.with($value))+
    };
}
