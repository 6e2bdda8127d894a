//! Render Frames
//!
//! A render frame records which component is currently executing its render
//! function. State writes consult the frame stack so that updates issued
//! during a render (rather than from an event or effect) can be recognised
//! and logged.
//!
//! # Implementation
//!
//! We use a thread-local stack. Rendering a component pushes a frame;
//! dropping the returned guard pops it. Nested frames never happen inside a
//! single pass today, but the stack keeps the guard honest if a host ever
//! renders a second root from inside a component.

use std::cell::RefCell;

use crate::tree::NodeId;

thread_local! {
    static FRAME_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the render frame stack.
#[derive(Debug, Clone)]
struct Frame {
    node: NodeId,
    component: &'static str,
    /// State writes issued while this frame was on top of the stack.
    writes: usize,
}

/// Guard that pops the frame when dropped.
///
/// The frame is popped even if the render panics and the panic is caught
/// further up.
pub struct RenderFrame {
    node: NodeId,
}

impl RenderFrame {
    /// Enter a render frame for the given component instance.
    pub fn enter(node: NodeId, component: &'static str) -> Self {
        FRAME_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                node,
                component,
                writes: 0,
            });
        });

        Self { node }
    }

    /// Check if a component is currently rendering on this thread.
    pub fn is_active() -> bool {
        FRAME_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The node currently rendering, if any.
    pub fn current() -> Option<NodeId> {
        FRAME_STACK.with(|stack| stack.borrow().last().map(|frame| frame.node))
    }

    /// The name of the component currently rendering, if any.
    pub fn current_component() -> Option<&'static str> {
        FRAME_STACK.with(|stack| stack.borrow().last().map(|frame| frame.component))
    }

    /// Record a state write issued during the current render.
    pub fn record_write() {
        FRAME_STACK.with(|stack| {
            if let Some(frame) = stack.borrow_mut().last_mut() {
                frame.writes += 1;
            }
        });
    }

    /// Number of writes issued so far during the current render.
    pub fn writes() -> usize {
        FRAME_STACK.with(|stack| stack.borrow().last().map_or(0, |frame| frame.writes))
    }
}

impl Drop for RenderFrame {
    fn drop(&mut self) {
        FRAME_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.node, self.node,
                    "RenderFrame mismatch: expected {:?}, got {:?}",
                    self.node, frame.node
                );
            }
        });
    }
}
