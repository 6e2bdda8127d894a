//! Hooks
//!
//! Hooks give function components state and side effects. They are methods
//! on the [`Scope`] passed to every render.
//!
//! # How Hooks Are Stored
//!
//! 1. Every component owns an ordered list of hook slots. The n-th hook
//!    call of a render is served by the n-th slot.
//!
//! 2. On the first render each call appends a slot. Later renders must call
//!    the same kinds of hooks in the same order; a different kind at an
//!    index or a different number of calls fails the render with
//!    [`RenderError::HookOrder`] or [`RenderError::HookCount`].
//!
//! 3. After a violation, the remaining calls of that render are served from
//!    throwaway slots so the previous records (and their cleanups) stay
//!    intact until the component is unmounted.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use super::node::{Arena, FiberKind, NodeId};
use super::provider::{Context, ContextId};
use crate::error::RenderError;
use crate::reactive::{Deps, EffectPhase, EffectRecord, EffectResult, Memo, Owner, SetState, StateCell};

/// The kind of hook occupying a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    State,
    Reducer,
    Memo,
    Callback,
    Ref,
    Effect,
    LayoutEffect,
    Context,
    ForceUpdate,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::State => "use_state",
            HookKind::Reducer => "use_reducer",
            HookKind::Memo => "use_memo",
            HookKind::Callback => "use_callback",
            HookKind::Ref => "use_ref",
            HookKind::Effect => "use_effect",
            HookKind::LayoutEffect => "use_layout_effect",
            HookKind::Context => "use_context",
            HookKind::ForceUpdate => "use_force_update",
        };
        f.write_str(name)
    }
}

pub(crate) struct Slot {
    pub kind: HookKind,
    pub data: Box<dyn Any>,
}

/// The hook slots of one component.
#[derive(Default)]
pub(crate) struct HookList {
    pub slots: Vec<Slot>,
}

impl HookList {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// The effect record in `index`, if that slot holds one.
    pub fn effect_mut(&mut self, index: usize) -> Option<&mut EffectRecord> {
        self.slots.get_mut(index)?.data.downcast_mut::<EffectRecord>()
    }

    /// Indices of effect slots scheduled to run during the next commit.
    pub fn scheduled_effects(&self) -> Vec<(usize, EffectPhase)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let record = slot.data.downcast_ref::<EffectRecord>()?;
                (record.state() == crate::reactive::EffectState::Scheduled).then_some((index, record.phase()))
            })
            .collect()
    }
}

/// Dispatches actions to a `use_reducer` state.
pub struct Dispatch<A> {
    send: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        (self.send)(action)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            send: Arc::clone(&self.send),
        }
    }
}

impl<A> PartialEq for Dispatch<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.send, &other.send)
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch")
    }
}

type Reducer<S, A> = Arc<dyn Fn(&S, A) -> S + Send + Sync>;

struct ReducerSlot<S, A>
where
    S: Clone + Send + 'static,
{
    cell: StateCell<S>,
    reducer: Arc<Mutex<Reducer<S, A>>>,
    dispatch: Dispatch<A>,
}

/// A memoized callback. Equal (by identity) for as long as its dependencies
/// are unchanged.
pub struct Callback<A> {
    f: Rc<dyn Fn(A)>,
}

impl<A> Callback<A> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) + 'static,
    {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self, arg: A) {
        (self.f)(arg)
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self { f: Rc::clone(&self.f) }
    }
}

impl<A> PartialEq for Callback<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.f))
    }
}

/// A mutable box that survives re-renders. Writing to it never schedules a
/// render.
pub struct RefHandle<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> RefHandle<T> {
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> PartialEq for RefHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: fmt::Debug> fmt::Debug for RefHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefHandle").field(&self.cell.borrow()).finish()
    }
}

/// Schedules a re-render of its component without changing any state.
#[derive(Clone)]
pub struct Updater {
    owner: Owner,
}

impl Updater {
    pub fn schedule(&self) {
        if self.owner.alive.load(Ordering::Acquire) {
            self.owner.scheduler.mark_dirty(self.owner.node);
        }
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater").field("node", &self.owner.node).finish()
    }
}

struct ContextSlot(ContextId);

/// Render context of one component.
pub struct Scope<'a> {
    node: NodeId,
    component: &'static str,
    hooks: &'a mut HookList,
    cursor: usize,
    mounting: bool,
    arena: &'a Arena,
    owner: Owner,

    /// Providers read during this render.
    consumed: Vec<NodeId>,
    violation: Option<RenderError>,
    scratch: Vec<Box<dyn Any>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        component: &'static str,
        hooks: &'a mut HookList,
        mounting: bool,
        arena: &'a Arena,
        owner: Owner,
    ) -> Self {
        Self {
            node: owner.node,
            component,
            hooks,
            cursor: 0,
            mounting,
            arena,
            owner,
            consumed: Vec::new(),
            violation: None,
            scratch: Vec::new(),
        }
    }

    /// Stable identity of the rendering component.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Name of the rendering component.
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Whether this is the component's first render.
    pub fn is_mounting(&self) -> bool {
        self.mounting
    }

    fn slot<T: 'static>(&mut self, kind: HookKind, init: impl FnOnce() -> T) -> &mut T {
        let index = self.cursor;
        self.cursor += 1;

        let fits = self.violation.is_none()
            && match self.hooks.slots.get(index) {
                Some(slot) => slot.kind == kind && slot.data.is::<T>(),
                None => self.mounting,
            };

        let data = if fits {
            if index == self.hooks.slots.len() {
                self.hooks.slots.push(Slot {
                    kind,
                    data: Box::new(init()),
                });
            }
            &mut self.hooks.slots[index].data
        } else {
            if self.violation.is_none() {
                if let Some(slot) = self.hooks.slots.get(index) {
                    self.violation = Some(RenderError::HookOrder {
                        component: self.component,
                        index,
                        expected: slot.kind,
                        found: kind,
                    });
                }
            }
            let at = self.scratch.len();
            self.scratch.push(Box::new(init()));
            &mut self.scratch[at]
        };

        data.downcast_mut::<T>()
            .expect("hook slot holds the type it was checked for")
    }

    /// A piece of state. Returns the committed value and its setter.
    ///
    /// Writes through the setter are applied on the next render, in call
    /// order.
    pub fn use_state<T>(&mut self, init: impl FnOnce() -> T) -> (T, SetState<T>)
    where
        T: Clone + Send + 'static,
    {
        let owner = self.owner.clone();
        let mounting = self.mounting;
        let cell = self.slot(HookKind::State, move || StateCell::owned(init(), owner));
        if !mounting {
            cell.commit();
        }
        (cell.read(), cell.setter())
    }

    /// State managed by a reducer. Actions are folded in dispatch order with
    /// the reducer of the latest render.
    pub fn use_reducer<S, A, R>(&mut self, reducer: R, init: impl FnOnce() -> S) -> (S, Dispatch<A>)
    where
        S: Clone + Send + 'static,
        A: Send + 'static,
        R: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        let owner = self.owner.clone();
        let mounting = self.mounting;
        let reducer: Reducer<S, A> = Arc::new(reducer);
        let initial = Arc::clone(&reducer);

        let slot = self.slot(HookKind::Reducer, move || {
            let cell = StateCell::owned(init(), owner);
            let reducer = Arc::new(Mutex::new(initial));
            let send = {
                let cell = cell.clone();
                let reducer = Arc::clone(&reducer);
                move |action: A| {
                    let reducer = Arc::clone(&reducer);
                    cell.update(move |state| {
                        let reduce = reducer.lock().clone();
                        reduce(state, action)
                    });
                }
            };
            ReducerSlot {
                cell,
                reducer,
                dispatch: Dispatch { send: Arc::new(send) },
            }
        });

        *slot.reducer.lock() = reducer;
        if !mounting {
            slot.cell.commit();
        }
        (slot.cell.read(), slot.dispatch.clone())
    }

    /// A value recomputed only when `deps` change.
    pub fn use_memo<T: 'static>(&mut self, deps: Deps, compute: impl FnOnce() -> T) -> Rc<T> {
        self.slot(HookKind::Memo, Memo::new).get_or_compute(deps, compute)
    }

    /// A callback whose identity changes only when `deps` change.
    pub fn use_callback<A, F>(&mut self, deps: Deps, f: F) -> Callback<A>
    where
        A: 'static,
        F: Fn(A) + 'static,
    {
        let memo = self.slot(HookKind::Callback, Memo::<Callback<A>>::new);
        memo.get_or_compute(deps, || Callback::new(f)).as_ref().clone()
    }

    /// A mutable box that keeps its contents across renders.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> RefHandle<T> {
        self.slot(HookKind::Ref, || RefHandle {
            cell: Rc::new(RefCell::new(init())),
        })
        .clone()
    }

    /// Run `effect` after the output is presented whenever `deps` change.
    pub fn use_effect<F, R>(&mut self, deps: Deps, effect: F)
    where
        F: FnOnce() -> R + 'static,
        R: EffectResult,
    {
        self.slot(HookKind::Effect, || EffectRecord::new(EffectPhase::Passive))
            .schedule(deps, effect);
    }

    /// Run `effect` after the output is applied but before it is presented.
    pub fn use_layout_effect<F, R>(&mut self, deps: Deps, effect: F)
    where
        F: FnOnce() -> R + 'static,
        R: EffectResult,
    {
        self.slot(HookKind::LayoutEffect, || EffectRecord::new(EffectPhase::Layout))
            .schedule(deps, effect);
    }

    /// The value of the nearest provider of `context` above this component.
    pub fn use_context<T>(&mut self, context: &Context<T>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let id = context.id();
        let index = self.cursor;
        let bound = self.slot(HookKind::Context, || ContextSlot(id)).0;
        if bound != id && self.violation.is_none() {
            self.violation = Some(RenderError::ContextOrder {
                component: self.component,
                index,
            });
        }

        let mut current = self.arena.get(&self.node).and_then(|fiber| fiber.parent);
        while let Some(node) = current {
            let Some(fiber) = self.arena.get(&node) else {
                break;
            };
            if let FiberKind::Provider(provider) = &fiber.kind {
                if provider.context == id {
                    if let Ok(value) = Arc::clone(&provider.value).downcast::<T>() {
                        self.consumed.push(node);
                        return value;
                    }
                }
            }
            current = fiber.parent;
        }

        context.default_value()
    }

    /// A handle that re-renders this component on demand.
    pub fn use_force_update(&mut self) -> Updater {
        let owner = self.owner.clone();
        self.slot(HookKind::ForceUpdate, move || Updater { owner }).clone()
    }

    /// End the render: report hook violations and hand back the providers
    /// that were read.
    pub(crate) fn finish(self) -> (Vec<NodeId>, Result<(), RenderError>) {
        let result = match self.violation {
            Some(violation) => Err(violation),
            None if self.cursor != self.hooks.len() => Err(RenderError::HookCount {
                component: self.component,
                expected: self.hooks.len(),
                found: self.cursor,
            }),
            None => Ok(()),
        };
        (self.consumed, result)
    }
}
