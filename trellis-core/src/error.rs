//! Error types.
//!
//! Render errors travel up the component tree to the nearest error boundary.
//! Effect errors happen after commit, so no boundary can catch them; they go
//! to the root's effect error path instead.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::tree::{HookKind, Key};

/// Errors raised while rendering or reconciling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// A component returned an error from its render function.
    #[error("{component} failed to render: {message}")]
    Thrown {
        component: &'static str,
        message: String,
    },

    #[error("{component} panicked while rendering: {message}")]
    Panicked {
        component: &'static str,
        message: String,
    },

    /// A hook slot holds a different kind of hook than the previous render.
    #[error("hook #{index} in {component} is {found}, but the previous render used {expected}")]
    HookOrder {
        component: &'static str,
        index: usize,
        expected: HookKind,
        found: HookKind,
    },

    /// A `use_context` slot reads a different context than the previous render.
    #[error("hook #{index} in {component} reads a different context than the previous render")]
    ContextOrder { component: &'static str, index: usize },

    #[error("{component} called {found} hooks, but the previous render called {expected}")]
    HookCount {
        component: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("duplicate key `{key}` among the children of {parent}")]
    DuplicateKey { parent: String, key: Key },

    #[error("props passed to {component} do not have its declared type")]
    PropsMismatch { component: &'static str },

    #[error("gave up after {limit} render passes in one flush; updates keep scheduling more updates")]
    NestedUpdateLimit { limit: usize },
}

impl RenderError {
    /// An error thrown by component code.
    ///
    /// The component name is filled in by the reconciler.
    pub fn msg(message: impl Into<String>) -> Self {
        RenderError::Thrown {
            component: "",
            message: message.into(),
        }
    }

    pub(crate) fn attributed(self, name: &'static str) -> Self {
        match self {
            RenderError::Thrown {
                component: "",
                message,
            } => RenderError::Thrown {
                component: name,
                message,
            },
            other => other,
        }
    }
}

/// Errors raised by effects, cleanups and commit-time lifecycle methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("effect in {component} failed: {message}")]
    Failed {
        component: &'static str,
        message: String,
    },

    #[error("effect in {component} panicked: {message}")]
    Panicked {
        component: &'static str,
        message: String,
    },

    #[error("effect cleanup in {component} panicked: {message}")]
    CleanupPanicked {
        component: &'static str,
        message: String,
    },

    #[error("lifecycle method {method} of {component} panicked: {message}")]
    LifecyclePanicked {
        component: &'static str,
        method: &'static str,
        message: String,
    },
}

/// Errors from dispatching a host event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no mounted host node with id {0}")]
    UnknownNode(u64),

    #[error("host node {node} has no `{event}` handler")]
    NoHandler { node: u64, event: String },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors from loading a runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_nested_updates must be at least 1")]
    ZeroNestedUpdates,
}

/// Run `f`, turning a panic into its message when `enabled`.
pub(crate) fn catch_panic<R>(enabled: bool, f: impl FnOnce() -> R) -> Result<R, String> {
    if !enabled {
        return Ok(f());
    }
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_is_attributed_once() {
        let err = RenderError::msg("bad input").attributed("Form");
        assert_eq!(err.to_string(), "Form failed to render: bad input");

        let again = err.attributed("Other");
        assert_eq!(again.to_string(), "Form failed to render: bad input");
    }

    #[test]
    fn catch_panic_extracts_messages() {
        assert_eq!(catch_panic(true, || 5), Ok(5));
        assert_eq!(
            catch_panic(true, || -> i32 { panic!("static message") }),
            Err("static message".to_string())
        );
        assert_eq!(
            catch_panic(true, || -> i32 { panic!("{} message", "formatted") }),
            Err("formatted message".to_string())
        );
    }
}
