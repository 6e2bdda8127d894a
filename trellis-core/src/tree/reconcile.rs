//! Reconciliation
//!
//! The tree walker turns a new element tree into mount, update and unmount
//! operations on the mounted fibers, and collects the host patches and
//! commit work those operations produce.
//!
//! # How a Pass Works
//!
//! 1. Components marked dirty by the scheduler are queued by depth. If the
//!    root element changed, the root is reconciled first.
//!
//! 2. New children are matched against previous children by key, or by
//!    position when they have no key. A match of the same type is updated
//!    in place and keeps its hook state; a match of another type is
//!    unmounted and replaced. Unmatched previous children are unmounted,
//!    unmatched new children mounted.
//!
//! 3. A component re-renders when it is invalidated (pending state, a forced
//!    update, or a changed context it reads) or when `should_update` accepts
//!    the new props. Otherwise its previous output stays.
//!
//! 4. Queued components that were not already rendered by an ancestor are
//!    rendered from the queue, shallowest first.
//!
//! 5. Render errors unwind to the nearest error boundary that is not
//!    already showing a fallback. Without one, the pass fails and the whole
//!    tree is unmounted.
//!
//! 6. Finally every host container whose children were touched compares
//!    the order the renderer will end up with against the new output order
//!    and emits a `Reorder` patch when they differ.

use std::any::Any;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use super::boundary::{keys_changed, BoundaryElement};
use super::component::Lifecycle;
use super::element::{ComponentElement, Element, ElementKind, Handler, HostElement, Key, PortalElement, ProviderElement};
use super::hooks::Scope;
use super::node::{Arena, BoundaryFiber, ComponentFiber, Fiber, FiberKind, HostFiber, NodeId, NodeKind, PortalFiber, ProviderFiber};
use super::queue::WorkQueue;
use crate::config::{DuplicateKeyPolicy, RuntimeConfig};
use crate::error::{catch_panic, DispatchError, EffectError, RenderError};
use crate::reactive::{Cleanup, EffectPhase, EffectRecord, Owner, RenderFrame, Scheduler};
use crate::render::{Parent, Patch};

/// Cleanups and lifecycle calls owed by an unmounted component.
pub(crate) struct Deletion {
    pub component: &'static str,

    /// Present only if the instance has received `on_mount`.
    pub instance: Option<Box<dyn Lifecycle>>,
    pub layout: Vec<Cleanup>,
    pub passive: Vec<Cleanup>,
}

/// Work that runs in the layout phase of the commit.
pub(crate) enum CommitTask {
    Effect { node: NodeId, slot: usize },
    Mounted(NodeId),
    Updated { node: NodeId, prev: Rc<dyn Any> },
}

/// Everything a pass produced for the commit phase.
#[derive(Default)]
pub(crate) struct PassWork {
    pub patches: Vec<Patch>,
    pub deletions: Vec<Deletion>,
    pub layout: Vec<CommitTask>,
    pub passive: Vec<(NodeId, usize)>,
    pub renders: usize,

    /// Host nodes created during the pass, in patch order.
    created: IndexSet<NodeId>,

    /// Host containers whose children may have changed.
    touched: IndexSet<NodeId>,
    rendered: HashSet<NodeId>,
    invalidated: HashSet<NodeId>,
    queue: WorkQueue,
}

/// Where a previous child sits among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Position {
    Keyed(Key),
    Index(usize),
}

/// The mounted tree of one root.
pub(crate) struct Tree {
    arena: Arena,
    root: NodeId,
    scheduler: Scheduler,
    config: RuntimeConfig,
    work: PassWork,
}

impl Tree {
    pub fn new(scheduler: Scheduler, config: RuntimeConfig) -> Self {
        let root = Fiber::new(None, 0, None, FiberKind::Root);
        let id = root.id;
        let mut arena = Arena::new();
        arena.insert(id, root);

        Self {
            arena,
            root: id,
            scheduler,
            config,
            work: PassWork::default(),
        }
    }

    /// Number of mounted fibers, the root container included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.arena
            .get(&self.root)
            .map_or(false, |root| !root.children.is_empty())
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.arena.get(&id).map(Fiber::node_kind)
    }

    /// Run one render pass.
    ///
    /// On failure the tree has already been unmounted; the returned work
    /// holds the removals and cleanups that still have to be committed.
    pub fn render_pass(
        &mut self,
        element: Option<Element>,
        dirty: IndexSet<NodeId>,
    ) -> (PassWork, Result<(), RenderError>) {
        self.work = PassWork::default();

        for node in dirty {
            self.invalidate(node);
        }
        debug!(queued = self.work.queue.len(), root = element.is_some(), "render pass started");

        let mut result = match element {
            Some(element) => self.reconcile_children(self.root, vec![element]),
            None => Ok(()),
        };

        while result.is_ok() {
            let Some(node) = self.work.queue.pop() else {
                break;
            };
            if self.work.rendered.contains(&node) {
                continue;
            }
            let Some(props) = self
                .arena
                .get(&node)
                .and_then(Fiber::component)
                .map(|component| Rc::clone(&component.props))
            else {
                continue;
            };
            if let Err(err) = self.render_component(node, Some(props)) {
                result = self.recover(node, err);
            }
        }

        if result.is_err() {
            self.work.layout.clear();
            self.work.passive.clear();
            let _ = self.reconcile_children(self.root, Vec::new());
        }

        self.emit_reorders();
        (std::mem::take(&mut self.work), result)
    }

    /// Unmount everything.
    pub fn teardown(&mut self) -> PassWork {
        self.work = PassWork::default();
        let _ = self.reconcile_children(self.root, Vec::new());
        self.emit_reorders();
        std::mem::take(&mut self.work)
    }

    fn invalidate(&mut self, node: NodeId) {
        let Some(fiber) = self.arena.get(&node) else {
            return;
        };
        if fiber.component().is_some() {
            self.work.invalidated.insert(node);
            self.work.queue.push(node, fiber.depth);
        }
    }

    /// Hand an error that escaped `origin` to the nearest boundary that can
    /// take it.
    fn recover(&mut self, origin: NodeId, mut err: RenderError) -> Result<(), RenderError> {
        let mut from = origin;
        loop {
            let Some(boundary) = self.nearest_boundary(from) else {
                return Err(err);
            };
            match self.show_fallback(boundary, err) {
                Ok(()) => return Ok(()),
                Err(next) => {
                    err = next;
                    from = boundary;
                }
            }
        }
    }

    fn nearest_boundary(&self, from: NodeId) -> Option<NodeId> {
        let mut current = self.arena.get(&from)?.parent;
        while let Some(id) = current {
            let fiber = self.arena.get(&id)?;
            if let FiberKind::Boundary(boundary) = &fiber.kind {
                if boundary.failure.is_none() {
                    return Some(id);
                }
            }
            current = fiber.parent;
        }
        None
    }

    fn same_type(&self, id: NodeId, element: &Element) -> bool {
        let Some(fiber) = self.arena.get(&id) else {
            return false;
        };
        match (&fiber.kind, &element.kind) {
            (FiberKind::Empty, ElementKind::Empty)
            | (FiberKind::Text(_), ElementKind::Text(_))
            | (FiberKind::Fragment, ElementKind::Fragment(_))
            | (FiberKind::Boundary(_), ElementKind::Boundary(_)) => true,
            (FiberKind::Host(current), ElementKind::Host(next)) => current.tag == next.tag,
            (FiberKind::Component(current), ElementKind::Component(next)) => current.type_id == next.type_id,
            (FiberKind::Provider(current), ElementKind::Provider(next)) => current.context == next.context,
            (FiberKind::Portal(current), ElementKind::Portal(next)) => current.target == next.target,
            _ => false,
        }
    }

    fn describe(&self, id: NodeId) -> String {
        self.arena
            .get(&id)
            .map_or_else(|| id.to_string(), Fiber::describe)
    }

    fn check_keys(&self, parent: NodeId, elements: &[Element]) -> Result<(), RenderError> {
        let mut seen = HashSet::new();
        for key in elements.iter().filter_map(Element::key) {
            if seen.insert(key) {
                continue;
            }
            match self.config.duplicate_keys {
                DuplicateKeyPolicy::Error => {
                    return Err(RenderError::DuplicateKey {
                        parent: self.describe(parent),
                        key: key.clone(),
                    });
                }
                DuplicateKeyPolicy::Warn => warn!(
                    parent = %self.describe(parent),
                    key = %key,
                    "duplicate key among siblings; later duplicates mount fresh"
                ),
            }
        }
        Ok(())
    }

    fn reconcile_children(&mut self, parent: NodeId, elements: Vec<Element>) -> Result<(), RenderError> {
        let Some(fiber) = self.arena.get_mut(&parent) else {
            return Ok(());
        };
        let previous = std::mem::take(&mut fiber.children);
        if let Some(container) = self.container_of(parent) {
            self.work.touched.insert(container);
        }

        if let Err(err) = self.check_keys(parent, &elements) {
            self.set_children(parent, previous);
            return Err(err);
        }

        let mut unmatched: IndexMap<Position, NodeId> = IndexMap::with_capacity(previous.len());
        let mut leftovers = Vec::new();
        for (index, id) in previous.into_iter().enumerate() {
            let position = match self.arena.get(&id).and_then(|fiber| fiber.key.clone()) {
                Some(key) => Position::Keyed(key),
                None => Position::Index(index),
            };
            if unmatched.contains_key(&position) {
                leftovers.push(id);
            } else {
                unmatched.insert(position, id);
            }
        }

        let mut children = Vec::with_capacity(elements.len());
        let mut result = Ok(());
        for (index, element) in elements.into_iter().enumerate() {
            let position = match &element.key {
                Some(key) => Position::Keyed(key.clone()),
                None => Position::Index(index),
            };

            let step = match unmatched.shift_remove(&position) {
                Some(old) if self.same_type(old, &element) => {
                    children.push(old);
                    self.update(old, element)
                }
                Some(old) => {
                    self.unmount(old, true);
                    let (id, mounted) = self.mount(parent, element);
                    children.push(id);
                    mounted
                }
                None => {
                    let (id, mounted) = self.mount(parent, element);
                    children.push(id);
                    mounted
                }
            };

            if let Err(err) = step {
                result = Err(err);
                break;
            }
        }

        leftovers.extend(unmatched.into_values());
        if result.is_ok() {
            for id in leftovers {
                self.unmount(id, true);
            }
        } else {
            // Keep everything linked so that whoever handles the error can
            // unmount it.
            children.extend(leftovers);
        }

        self.set_children(parent, children);
        result
    }

    fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        if let Some(fiber) = self.arena.get_mut(&parent) {
            fiber.children = children;
        }
    }

    fn clear_children(&mut self, parent: NodeId) {
        let children = self
            .arena
            .get_mut(&parent)
            .map(|fiber| std::mem::take(&mut fiber.children))
            .unwrap_or_default();
        for child in children {
            self.unmount(child, true);
        }
    }

    fn insert_fiber(&mut self, parent: NodeId, key: Option<Key>, kind: FiberKind) -> NodeId {
        let depth = self.arena.get(&parent).map_or(0, |fiber| fiber.depth + 1);
        let fiber = Fiber::new(Some(parent), depth, key, kind);
        let id = fiber.id;
        self.arena.insert(id, fiber);
        id
    }

    fn mount(&mut self, parent: NodeId, element: Element) -> (NodeId, Result<(), RenderError>) {
        let Element { kind, key } = element;

        match kind {
            ElementKind::Empty => (self.insert_fiber(parent, key, FiberKind::Empty), Ok(())),
            ElementKind::Text(text) => {
                let id = self.insert_fiber(parent, key, FiberKind::Text(text.clone()));
                let host_parent = self.host_parent(parent);
                self.work.patches.push(Patch::CreateText {
                    id: id.raw(),
                    parent: host_parent,
                    text,
                });
                self.work.created.insert(id);
                (id, Ok(()))
            }
            ElementKind::Host(host) => {
                let HostElement {
                    tag,
                    attrs,
                    handlers,
                    children,
                    ..
                } = host;
                let id = self.insert_fiber(
                    parent,
                    key,
                    FiberKind::Host(HostFiber {
                        tag: tag.clone(),
                        attrs: attrs.clone(),
                        handlers,
                    }),
                );
                let host_parent = self.host_parent(parent);
                self.work.patches.push(Patch::Create {
                    id: id.raw(),
                    parent: host_parent,
                    tag,
                    attrs,
                });
                self.work.created.insert(id);
                (id, self.reconcile_children(id, children))
            }
            ElementKind::Fragment(children) => {
                let id = self.insert_fiber(parent, key, FiberKind::Fragment);
                (id, self.reconcile_children(id, children))
            }
            ElementKind::Component(component) => {
                let ComponentElement {
                    type_id,
                    name,
                    props,
                    create,
                } = component;
                let id = self.insert_fiber(
                    parent,
                    key,
                    FiberKind::Component(ComponentFiber::new(type_id, name, props, create)),
                );
                debug!(node = %id, component = name, "mounting component");
                (id, self.render_component(id, None))
            }
            ElementKind::Provider(provider) => {
                let ProviderElement {
                    context,
                    value,
                    same,
                    children,
                } = provider;
                let id = self.insert_fiber(
                    parent,
                    key,
                    FiberKind::Provider(ProviderFiber {
                        context,
                        value,
                        same,
                        consumers: IndexSet::new(),
                    }),
                );
                (id, self.reconcile_children(id, children))
            }
            ElementKind::Boundary(boundary) => {
                let BoundaryElement {
                    fallback,
                    on_error,
                    reset_keys,
                    children,
                    ..
                } = boundary;
                let id = self.insert_fiber(
                    parent,
                    key,
                    FiberKind::Boundary(BoundaryFiber {
                        fallback,
                        on_error,
                        reset_keys,
                        failure: None,
                        fallback_renders: 0,
                    }),
                );
                let result = match self.reconcile_children(id, children) {
                    Ok(()) => Ok(()),
                    Err(err) => self.show_fallback(id, err),
                };
                (id, result)
            }
            ElementKind::Portal(portal) => {
                let PortalElement { target, children } = portal;
                let id = self.insert_fiber(parent, key, FiberKind::Portal(PortalFiber { target }));
                (id, self.reconcile_children(id, children))
            }
        }
    }

    fn update(&mut self, id: NodeId, element: Element) -> Result<(), RenderError> {
        let Element { kind, key } = element;
        if let Some(fiber) = self.arena.get_mut(&id) {
            fiber.key = key;
        }

        match kind {
            ElementKind::Empty => Ok(()),
            ElementKind::Text(text) => {
                if let Some(Fiber {
                    kind: FiberKind::Text(current),
                    ..
                }) = self.arena.get_mut(&id)
                {
                    if *current != text {
                        current.clone_from(&text);
                        self.work.patches.push(Patch::SetText { id: id.raw(), text });
                    }
                }
                Ok(())
            }
            ElementKind::Host(host) => {
                let HostElement {
                    attrs,
                    handlers,
                    children,
                    ..
                } = host;
                if let Some(Fiber {
                    kind: FiberKind::Host(current),
                    ..
                }) = self.arena.get_mut(&id)
                {
                    let set: super::element::Attrs = attrs
                        .iter()
                        .filter(|(name, value)| current.attrs.get(*name) != Some(*value))
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect();
                    let removed: Vec<String> = current
                        .attrs
                        .keys()
                        .filter(|name| !attrs.contains_key(*name))
                        .cloned()
                        .collect();
                    if !set.is_empty() || !removed.is_empty() {
                        self.work.patches.push(Patch::SetAttrs {
                            id: id.raw(),
                            set,
                            removed,
                        });
                    }
                    current.attrs = attrs;
                    current.handlers = handlers;
                }
                self.reconcile_children(id, children)
            }
            ElementKind::Fragment(children) => self.reconcile_children(id, children),
            ElementKind::Component(component) => {
                let forced = self.work.invalidated.contains(&id);
                let Some(current) = self.arena.get_mut(&id).and_then(Fiber::component_mut) else {
                    return Ok(());
                };
                let prev = std::mem::replace(&mut current.props, component.props);
                current.create = component.create;
                let name = current.name;
                let accepts = current.instance.as_ref().map_or(true, |instance| {
                    instance.should_update(prev.as_ref(), current.props.as_ref())
                });

                if forced || accepts {
                    self.render_component(id, Some(prev))
                } else {
                    debug!(node = %id, component = name, "render skipped");
                    Ok(())
                }
            }
            ElementKind::Provider(provider) => {
                let ProviderElement {
                    value,
                    same,
                    children,
                    ..
                } = provider;
                let mut changed = Vec::new();
                if let Some(Fiber {
                    kind: FiberKind::Provider(current),
                    ..
                }) = self.arena.get_mut(&id)
                {
                    if !(current.same)(current.value.as_ref(), value.as_ref()) {
                        changed.extend(current.consumers.iter().copied());
                    }
                    current.value = value;
                    current.same = same;
                }
                for consumer in changed {
                    debug!(node = %consumer, provider = %id, "context changed");
                    self.invalidate(consumer);
                }
                self.reconcile_children(id, children)
            }
            ElementKind::Boundary(boundary) => {
                let BoundaryElement {
                    fallback,
                    on_error,
                    reset_keys,
                    children,
                    ..
                } = boundary;
                let Some(Fiber {
                    kind: FiberKind::Boundary(current),
                    ..
                }) = self.arena.get_mut(&id)
                else {
                    return Ok(());
                };

                let failed = current.failure.is_some();
                let reset = failed && keys_changed(current.reset_keys.as_ref(), reset_keys.as_ref());
                current.fallback = fallback;
                current.on_error = on_error;
                current.reset_keys = reset_keys;

                if failed && !reset {
                    return Ok(());
                }
                if reset {
                    current.failure = None;
                    debug!(node = %id, "error boundary reset");
                    self.clear_children(id);
                }

                match self.reconcile_children(id, children) {
                    Ok(()) => Ok(()),
                    Err(err) => self.show_fallback(id, err),
                }
            }
            ElementKind::Portal(portal) => self.reconcile_children(id, portal.children),
        }
    }

    /// Replace the children of a boundary with its fallback.
    ///
    /// Errors raised by the fallback are returned to the caller; the
    /// boundary itself stays failed.
    fn show_fallback(&mut self, id: NodeId, err: RenderError) -> Result<(), RenderError> {
        let catch_panics = self.config.catch_panics;
        let Some(Fiber {
            kind: FiberKind::Boundary(boundary),
            ..
        }) = self.arena.get_mut(&id)
        else {
            return Err(err);
        };

        boundary.failure = Some(err.clone());
        boundary.fallback_renders += 1;
        warn!(
            node = %id,
            error = %err,
            fallbacks = boundary.fallback_renders,
            "error boundary caught a render error"
        );
        let fallback = Rc::clone(&boundary.fallback);
        let on_error = boundary.on_error.clone();

        self.clear_children(id);

        let element = catch_panic(catch_panics, || {
            if let Some(on_error) = &on_error {
                on_error(&err);
            }
            fallback(&err)
        })
        .map_err(|message| RenderError::Panicked {
            component: "ErrorBoundary",
            message,
        })?;

        self.reconcile_children(id, vec![element])
    }

    fn render_component(&mut self, id: NodeId, prev: Option<Rc<dyn Any>>) -> Result<(), RenderError> {
        let catch_panics = self.config.catch_panics;
        let Some(component) = self.arena.get_mut(&id).and_then(Fiber::component_mut) else {
            return Ok(());
        };
        let name = component.name;
        let props = Rc::clone(&component.props);
        let create = component.create;
        let mounting = component.renders == 0;
        let mut hooks = std::mem::take(&mut component.hooks);
        let instance = component.instance.take();
        let alive = Arc::clone(&component.alive);

        self.work.rendered.insert(id);
        self.work.renders += 1;

        let mut instance = match instance {
            Some(instance) => instance,
            None => match catch_panic(catch_panics, || create(props.as_ref())) {
                Ok(Ok(instance)) => instance,
                Ok(Err(err)) => {
                    self.restore(id, None, hooks);
                    return Err(err);
                }
                Err(message) => {
                    self.restore(id, None, hooks);
                    return Err(RenderError::Panicked { component: name, message });
                }
            },
        };

        let owner = Owner {
            node: id,
            scheduler: self.scheduler.clone(),
            alive,
        };
        let (consumed, outcome) = {
            let _frame = RenderFrame::enter(id, name);
            let mut scope = Scope::new(name, &mut hooks, mounting, &self.arena, owner);
            let rendered = catch_panic(catch_panics, || instance.render(&mut scope, props.as_ref()));
            let (consumed, hooks_checked) = scope.finish();
            let outcome = match rendered {
                Err(message) => Err(RenderError::Panicked { component: name, message }),
                Ok(Err(err)) => Err(err.attributed(name)),
                Ok(Ok(element)) => hooks_checked.map(|()| element),
            };
            (consumed, outcome)
        };

        self.restore(id, Some(instance), hooks);
        self.track_consumers(id, consumed);

        let element = outcome?;
        self.reconcile_children(id, vec![element])?;
        self.queue_commit_work(id, prev);
        Ok(())
    }

    fn restore(&mut self, id: NodeId, instance: Option<Box<dyn Lifecycle>>, hooks: super::hooks::HookList) {
        if let Some(component) = self.arena.get_mut(&id).and_then(Fiber::component_mut) {
            if instance.is_some() {
                component.instance = instance;
            }
            component.hooks = hooks;
            component.renders += 1;
        }
    }

    fn track_consumers(&mut self, id: NodeId, consumed: Vec<NodeId>) {
        let previous = self
            .arena
            .get_mut(&id)
            .and_then(Fiber::component_mut)
            .map(|component| std::mem::replace(&mut component.consumes, consumed.clone()))
            .unwrap_or_default();

        for provider in previous.iter().filter(|provider| !consumed.contains(provider)) {
            if let Some(Fiber {
                kind: FiberKind::Provider(provider),
                ..
            }) = self.arena.get_mut(provider)
            {
                provider.consumers.shift_remove(&id);
            }
        }
        for provider in &consumed {
            if let Some(Fiber {
                kind: FiberKind::Provider(provider),
                ..
            }) = self.arena.get_mut(provider)
            {
                provider.consumers.insert(id);
            }
        }
    }

    /// Queue the effects and lifecycle calls of a component that rendered
    /// successfully. Runs after its children, so children commit first.
    fn queue_commit_work(&mut self, id: NodeId, prev: Option<Rc<dyn Any>>) {
        let Some(component) = self.arena.get(&id).and_then(Fiber::component) else {
            return;
        };

        for (slot, phase) in component.hooks.scheduled_effects() {
            match phase {
                EffectPhase::Layout => self.work.layout.push(CommitTask::Effect { node: id, slot }),
                EffectPhase::Passive => self.work.passive.push((id, slot)),
            }
        }

        let has_transitions = component
            .instance
            .as_ref()
            .map_or(false, |instance| instance.has_transitions());
        if has_transitions {
            let task = match prev {
                Some(prev) if component.mounted => CommitTask::Updated { node: id, prev },
                _ => CommitTask::Mounted(id),
            };
            self.work.layout.push(task);
        }
    }

    fn unmount(&mut self, id: NodeId, remove_host: bool) {
        let Some(fiber) = self.arena.remove(&id) else {
            return;
        };
        let Fiber { kind, children, .. } = fiber;

        let remove_children = match &kind {
            FiberKind::Host(_) | FiberKind::Text(_) => {
                if self.work.created.shift_remove(&id) {
                    let raw = id.raw();
                    self.work.patches.retain(|patch| patch.target() != Some(raw));
                } else if remove_host {
                    self.work.patches.push(Patch::Remove { id: id.raw() });
                }
                false
            }
            FiberKind::Portal(_) => true,
            _ => remove_host,
        };

        for child in children {
            self.unmount(child, remove_children);
        }

        if let FiberKind::Component(mut component) = kind {
            component.alive.store(false, Ordering::Release);

            let mut layout = Vec::new();
            let mut passive = Vec::new();
            for slot in component.hooks.slots.iter_mut() {
                if let Some(record) = slot.data.downcast_mut::<EffectRecord>() {
                    let phase = record.phase();
                    if let Some(cleanup) = record.dispose() {
                        match phase {
                            EffectPhase::Layout => layout.push(cleanup),
                            EffectPhase::Passive => passive.push(cleanup),
                        }
                    }
                }
            }

            for provider in &component.consumes {
                if let Some(Fiber {
                    kind: FiberKind::Provider(provider),
                    ..
                }) = self.arena.get_mut(provider)
                {
                    provider.consumers.shift_remove(&id);
                }
            }

            let instance = if component.mounted {
                component.instance.take()
            } else {
                None
            };

            debug!(node = %id, component = component.name, "unmounted component");
            self.work.deletions.push(Deletion {
                component: component.name,
                instance,
                layout,
                passive,
            });
        }
    }

    /// The nearest fiber, starting at `id` itself, whose host children are
    /// placed directly inside it.
    fn container_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            let fiber = self.arena.get(&node)?;
            if fiber.is_container() {
                return Some(node);
            }
            current = fiber.parent;
        }
        None
    }

    fn parent_ref(&self, container: NodeId) -> Parent {
        match self.arena.get(&container).map(|fiber| &fiber.kind) {
            Some(FiberKind::Host(_)) => Parent::Node(container.raw()),
            Some(FiberKind::Portal(portal)) => Parent::Portal(portal.target.clone()),
            _ => Parent::Root,
        }
    }

    fn host_parent(&self, parent: NodeId) -> Parent {
        self.container_of(parent)
            .map_or(Parent::Root, |container| self.parent_ref(container))
    }

    /// Host nodes directly inside `container`, in output order.
    fn host_children(&self, container: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(fiber) = self.arena.get(&container) {
            for child in &fiber.children {
                self.collect_host(*child, &mut out);
            }
        }
        out
    }

    fn collect_host(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(fiber) = self.arena.get(&id) else {
            return;
        };
        if fiber.is_host() {
            out.push(id);
        } else if !matches!(fiber.kind, FiberKind::Portal(_)) {
            for child in &fiber.children {
                self.collect_host(*child, out);
            }
        }
    }

    fn emit_reorders(&mut self) {
        let touched = std::mem::take(&mut self.work.touched);
        for container in touched {
            let Some(fiber) = self.arena.get(&container) else {
                continue;
            };
            let desired = self.host_children(container);

            // The order the renderer ends up with: surviving nodes where
            // they were, new nodes appended in creation order.
            let mut expected: Vec<NodeId> = fiber
                .host_children
                .iter()
                .copied()
                .filter(|id| self.arena.contains_key(id) && !self.work.created.contains(id))
                .collect();
            expected.extend(self.work.created.iter().copied().filter(|id| {
                self.arena
                    .get(id)
                    .and_then(|fiber| fiber.parent)
                    .and_then(|parent| self.container_of(parent))
                    == Some(container)
            }));

            if desired != expected {
                let parent = self.parent_ref(container);
                self.work.patches.push(Patch::Reorder {
                    parent,
                    children: desired.iter().map(NodeId::raw).collect(),
                });
            }

            if let Some(fiber) = self.arena.get_mut(&container) {
                fiber.host_children = desired;
            }
        }
    }

    /// Run a scheduled effect. `None` if its component is gone.
    pub fn run_effect(&mut self, node: NodeId, slot: usize) -> Option<Vec<EffectError>> {
        let catch_panics = self.config.catch_panics;
        let component = self.arena.get_mut(&node)?.component_mut()?;
        let name = component.name;
        let record = component.hooks.effect_mut(slot)?;
        Some(record.run(name, catch_panics))
    }

    /// Deliver `on_mount` to a class instance.
    pub fn deliver_mount(&mut self, node: NodeId) -> Option<EffectError> {
        let catch_panics = self.config.catch_panics;
        let component = self.arena.get_mut(&node)?.component_mut()?;
        component.mounted = true;
        let name = component.name;
        let props = Rc::clone(&component.props);
        let instance = component.instance.as_mut()?;

        catch_panic(catch_panics, || instance.on_mount(props.as_ref()))
            .err()
            .map(|message| EffectError::LifecyclePanicked {
                component: name,
                method: "on_mount",
                message,
            })
    }

    /// Deliver `on_update` to a class instance.
    pub fn deliver_update(&mut self, node: NodeId, prev: Rc<dyn Any>) -> Option<EffectError> {
        let catch_panics = self.config.catch_panics;
        let component = self.arena.get_mut(&node)?.component_mut()?;
        let name = component.name;
        let props = Rc::clone(&component.props);
        let instance = component.instance.as_mut()?;

        catch_panic(catch_panics, || instance.on_update(prev.as_ref(), props.as_ref()))
            .err()
            .map(|message| EffectError::LifecyclePanicked {
                component: name,
                method: "on_update",
                message,
            })
    }

    /// The handler for `event` on a mounted host node.
    pub fn handler(&self, node: u64, event: &str) -> Result<Handler, DispatchError> {
        match self.arena.get(&NodeId::from(node)).map(|fiber| &fiber.kind) {
            Some(FiberKind::Host(host)) => host
                .handlers
                .get(event)
                .cloned()
                .ok_or_else(|| DispatchError::NoHandler {
                    node,
                    event: event.to_string(),
                }),
            _ => Err(DispatchError::UnknownNode(node)),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{host, Component, Rendered};
    use std::cell::Cell;

    thread_local! {
        static ROW_RENDERS: Cell<usize> = const { Cell::new(0) };
    }

    struct Row;

    impl Component for Row {
        type Props = String;

        fn render(_cx: &mut Scope<'_>, label: &String) -> Rendered {
            ROW_RENDERS.with(|renders| renders.set(renders.get() + 1));
            Ok(host("li").child(label.clone()).into())
        }
    }

    fn tree() -> Tree {
        Tree::new(Scheduler::new(), RuntimeConfig::default())
    }

    fn list(keys: &[&str]) -> Element {
        host("ul")
            .children(
                keys.iter()
                    .map(|key| Element::component::<Row>(key.to_string()).with_key(*key)),
            )
            .into()
    }

    fn pass(tree: &mut Tree, element: Element) -> Vec<Patch> {
        let (work, result) = tree.render_pass(Some(element), IndexSet::new());
        assert!(result.is_ok(), "pass failed: {result:?}");
        work.patches
    }

    #[test]
    fn first_pass_creates_everything_in_order() {
        let mut tree = tree();
        let patches = pass(&mut tree, list(&["a", "b"]));

        let creates = patches
            .iter()
            .filter(|patch| matches!(patch, Patch::Create { .. } | Patch::CreateText { .. }))
            .count();
        assert_eq!(creates, 5);
        assert!(!patches.iter().any(|patch| matches!(patch, Patch::Reorder { .. })));
        assert!(tree.is_mounted());
    }

    #[test]
    fn keyed_swap_only_reorders() {
        let mut tree = tree();
        pass(&mut tree, list(&["a", "b"]));

        let patches = pass(&mut tree, list(&["b", "a"]));
        assert_eq!(patches.len(), 1);
        assert!(matches!(
            &patches[0],
            Patch::Reorder { parent: Parent::Node(_), children } if children.len() == 2
        ));
    }

    #[test]
    fn insertion_in_the_middle_creates_and_reorders() {
        let mut tree = tree();
        pass(&mut tree, list(&["a", "c"]));

        let patches = pass(&mut tree, list(&["a", "b", "c"]));
        assert!(matches!(patches[0], Patch::Create { .. }));
        assert!(matches!(patches.last(), Some(Patch::Reorder { .. })));
    }

    #[test]
    fn text_change_is_a_single_set_text() {
        let mut tree = tree();
        pass(&mut tree, host("p").child("one").into());

        let patches = pass(&mut tree, host("p").child("two").into());
        assert!(matches!(&patches[..], [Patch::SetText { text, .. }] if text == "two"));
    }

    #[test]
    fn attribute_diff_sets_and_removes() {
        let mut tree = tree();
        pass(&mut tree, host("div").attr("a", 1).attr("b", 2).into());

        let patches = pass(&mut tree, host("div").attr("a", 1).attr("c", 3).into());
        match &patches[..] {
            [Patch::SetAttrs { set, removed, .. }] => {
                assert_eq!(set.len(), 1);
                assert!(set.contains_key("c"));
                assert_eq!(removed, &vec!["b".to_string()]);
            }
            other => panic!("unexpected patches: {other:?}"),
        }
    }

    #[test]
    fn type_change_replaces_the_node() {
        let mut tree = tree();
        pass(&mut tree, host("div").child(host("span")).into());

        let patches = pass(&mut tree, host("div").child(host("b")).into());
        assert!(matches!(patches[0], Patch::Remove { .. }));
        assert!(matches!(&patches[1], Patch::Create { tag, .. } if tag == "b"));
    }

    #[test]
    fn duplicate_keys_fail_by_default() {
        let mut tree = tree();
        let (_, result) = tree.render_pass(Some(list(&["a", "a"])), IndexSet::new());

        assert!(matches!(
            result,
            Err(RenderError::DuplicateKey { key, .. }) if key.as_str() == "a"
        ));
        assert!(!tree.is_mounted());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn duplicate_keys_mount_fresh_under_warn() {
        let config = RuntimeConfig {
            duplicate_keys: DuplicateKeyPolicy::Warn,
            ..RuntimeConfig::default()
        };
        let mut tree = Tree::new(Scheduler::new(), config);

        let (work, result) = tree.render_pass(Some(list(&["a", "a"])), IndexSet::new());
        assert!(result.is_ok());
        assert_eq!(work.renders, 2);
    }

    #[test]
    fn teardown_removes_top_level_nodes_only() {
        let mut tree = tree();
        pass(&mut tree, list(&["a", "b"]));

        let work = tree.teardown();
        assert_eq!(work.patches.len(), 1);
        assert!(matches!(work.patches[0], Patch::Remove { .. }));
        assert_eq!(work.deletions.len(), 2);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn dirty_component_rerenders_alone() {
        let mut tree = tree();
        pass(&mut tree, list(&["a", "b"]));

        let ul = tree.arena[&tree.root].children[0];
        let first_row = tree.arena[&ul].children[0];

        let before = ROW_RENDERS.with(Cell::get);
        let mut dirty = IndexSet::new();
        dirty.insert(first_row);
        let (work, result) = tree.render_pass(None, dirty);

        assert!(result.is_ok());
        assert_eq!(work.renders, 1);
        assert!(work.patches.is_empty());
        assert_eq!(ROW_RENDERS.with(Cell::get), before + 1);
    }

    #[test]
    fn unknown_handlers_are_reported() {
        let mut tree = tree();
        pass(&mut tree, host("button").on("click", |_| {}).into());
        let button = tree.arena[&tree.root].children[0];

        assert!(tree.handler(button.raw(), "click").is_ok());
        assert_eq!(
            tree.handler(button.raw(), "hover").err(),
            Some(DispatchError::NoHandler {
                node: button.raw(),
                event: "hover".into()
            })
        );
        assert_eq!(tree.handler(0, "click").err(), Some(DispatchError::UnknownNode(0)));
    }
}
