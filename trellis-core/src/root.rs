//! Roots
//!
//! A root owns one mounted tree, its scheduler, and the renderer that
//! receives its output.
//!
//! # How a Flush Works
//!
//! 1. A flush runs render passes for as long as there is a new root
//!    element or dirty components. Each pass runs inside a `render_pass`
//!    span.
//!
//! 2. Every pass is committed before the next one starts:
//!    - the patch batch is applied to the renderer
//!    - unmounted instances receive `on_unmount`, then layout cleanups run
//!    - layout effects and class lifecycle methods run
//!    - the renderer presents the output
//!    - passive cleanups run, then passive effects
//!
//! 3. Updates scheduled by effects are picked up by the next pass of the
//!    same flush. After `max_nested_updates` passes the tree is unmounted
//!    and the flush fails.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::{debug, error, info_span};

use crate::config::RuntimeConfig;
use crate::error::{catch_panic, DispatchError, EffectError, RenderError};
use crate::reactive::{Cleanup, Scheduler};
use crate::render::{PatchBatch, Renderer};
use crate::tree::{CommitTask, Deletion, Element, Event, NodeId, NodeKind, PassWork, Tree};

/// What one flush did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Render passes run.
    pub passes: usize,

    /// Component renders across all passes.
    pub renders: usize,

    /// Patches handed to the renderer.
    pub patches: usize,

    /// Effects run, layout and passive.
    pub effects_run: usize,
}

impl FlushReport {
    pub fn merge(&mut self, other: FlushReport) {
        self.passes += other.passes;
        self.renders += other.renders;
        self.patches += other.patches;
        self.effects_run += other.effects_run;
    }

    /// Whether the flush found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.passes == 0
    }
}

type EffectErrorHandler = Box<dyn FnMut(&EffectError)>;

/// Effect errors kept for [`Root::take_effect_errors`]. Older ones are dropped.
const EFFECT_ERROR_BUFFER: usize = 64;

/// The owner of one mounted tree.
///
/// ```rust,ignore
/// let mut root = Root::new(HostTree::new());
/// root.render(Element::component::<App>(()))?;
/// assert_eq!(root.renderer().markup(), "<p>Hello</p>");
/// ```
pub struct Root<R: Renderer> {
    tree: Tree,
    renderer: R,
    scheduler: Scheduler,
    config: RuntimeConfig,

    /// Root element waiting for the next pass.
    pending: Option<Element>,
    passes: u64,
    effect_errors: VecDeque<EffectError>,
    on_effect_error: Option<EffectErrorHandler>,
}

impl<R: Renderer> Root<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_config(renderer, RuntimeConfig::default())
    }

    pub fn with_config(renderer: R, config: RuntimeConfig) -> Self {
        let scheduler = Scheduler::new();
        Self {
            tree: Tree::new(scheduler.clone(), config.clone()),
            renderer,
            scheduler,
            config,
            pending: None,
            passes: 0,
            effect_errors: VecDeque::new(),
            on_effect_error: None,
        }
    }

    /// Replace the root element and flush.
    pub fn render(&mut self, element: impl Into<Element>) -> Result<FlushReport, RenderError> {
        self.pending = Some(element.into());
        self.flush()
    }

    /// Run render passes until nothing is pending.
    ///
    /// An uncaught render error unmounts the whole tree and is returned.
    pub fn flush(&mut self) -> Result<FlushReport, RenderError> {
        let mut report = FlushReport::default();
        let limit = self.config.max_nested_updates.max(1);

        loop {
            let element = self.pending.take();
            let dirty = self.scheduler.take_dirty();
            if element.is_none() && dirty.is_none() {
                return Ok(report);
            }

            if report.passes >= limit {
                error!(limit, "too many nested updates; unmounting the tree");
                self.passes += 1;
                let work = self.tree.teardown();
                self.commit(work, &mut report);
                self.scheduler.clear();
                return Err(RenderError::NestedUpdateLimit { limit });
            }

            let dirty = dirty.unwrap_or_default();
            self.passes += 1;
            report.passes += 1;

            let span = info_span!("render_pass", pass = self.passes, dirty = dirty.len());
            let _enter = span.enter();

            let (work, result) = self.tree.render_pass(element, dirty);
            report.renders += work.renders;
            self.commit(work, &mut report);

            if let Err(err) = result {
                error!(error = %err, "uncaught render error; tree unmounted");
                self.scheduler.clear();
                return Err(err);
            }
        }
    }

    /// Run `f` with every state write it issues batched into one pass.
    ///
    /// The pass runs on the next [`Root::flush`].
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.scheduler.batch(f)
    }

    /// Deliver an event to a host node's handler and flush the writes it
    /// issued as one pass.
    pub fn dispatch_event(&mut self, node: u64, name: &str, payload: Value) -> Result<FlushReport, DispatchError> {
        let handler = self.tree.handler(node, name)?;
        let event = Event {
            name: name.to_string(),
            target: node,
            payload,
        };

        debug!(node, event = name, "dispatching event");
        self.scheduler.batch(|| handler(&event));
        Ok(self.flush()?)
    }

    /// Unmount the whole tree.
    pub fn unmount(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        self.pending = None;
        self.passes += 1;
        let work = self.tree.teardown();
        self.commit(work, &mut report);
        self.scheduler.clear();
        report
    }

    fn commit(&mut self, work: PassWork, report: &mut FlushReport) {
        let PassWork {
            patches,
            deletions,
            layout,
            passive,
            ..
        } = work;
        let catch_panics = self.config.catch_panics;
        let mut errors = Vec::new();

        let present = !patches.is_empty();
        if present {
            report.patches += patches.len();
            let batch = PatchBatch {
                pass: self.passes,
                patches,
            };
            debug!(patches = batch.len(), "applying patch batch");
            self.renderer.apply(&batch);
        }

        let mut passive_cleanups = Vec::new();
        for deletion in deletions {
            let Deletion {
                component,
                instance,
                layout,
                passive,
            } = deletion;

            if let Some(mut instance) = instance {
                if let Err(message) = catch_panic(catch_panics, || instance.on_unmount()) {
                    errors.push(EffectError::LifecyclePanicked {
                        component,
                        method: "on_unmount",
                        message,
                    });
                }
            }
            for cleanup in layout {
                errors.extend(run_cleanup(component, cleanup, catch_panics));
            }
            passive_cleanups.extend(passive.into_iter().map(|cleanup| (component, cleanup)));
        }

        for task in layout {
            match task {
                CommitTask::Effect { node, slot } => {
                    if let Some(failed) = self.tree.run_effect(node, slot) {
                        report.effects_run += 1;
                        errors.extend(failed);
                    }
                }
                CommitTask::Mounted(node) => errors.extend(self.tree.deliver_mount(node)),
                CommitTask::Updated { node, prev } => errors.extend(self.tree.deliver_update(node, prev)),
            }
        }

        if present {
            self.renderer.present();
        }

        for (component, cleanup) in passive_cleanups {
            errors.extend(run_cleanup(component, cleanup, catch_panics));
        }
        for (node, slot) in passive {
            if let Some(failed) = self.tree.run_effect(node, slot) {
                report.effects_run += 1;
                errors.extend(failed);
            }
        }

        for err in errors {
            self.report_effect_error(err);
        }
    }

    fn report_effect_error(&mut self, err: EffectError) {
        error!(error = %err, "effect failed");
        if let Some(handler) = self.on_effect_error.as_mut() {
            handler(&err);
        }
        if self.effect_errors.len() == EFFECT_ERROR_BUFFER {
            self.effect_errors.pop_front();
            debug!(capacity = EFFECT_ERROR_BUFFER, "dropped oldest buffered effect error");
        }
        self.effect_errors.push_back(err);
    }

    /// Install a handler for errors raised by effects, cleanups and
    /// lifecycle methods.
    pub fn on_effect_error<F>(&mut self, handler: F)
    where
        F: FnMut(&EffectError) + 'static,
    {
        self.on_effect_error = Some(Box::new(handler));
    }

    /// Take the effect errors collected so far, oldest first.
    ///
    /// Only the most recent errors are kept between calls.
    pub fn take_effect_errors(&mut self) -> Vec<EffectError> {
        self.effect_errors.drain(..).collect()
    }

    /// Install the callback invoked when a pass is requested.
    ///
    /// The callback may be called from any thread that writes state.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Whether a pass is waiting to run.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some() || self.scheduler.has_pending()
    }

    pub fn is_mounted(&self) -> bool {
        self.tree.is_mounted()
    }

    pub fn node_kind(&self, node: u64) -> Option<NodeKind> {
        self.tree.node_kind(NodeId::from(node))
    }

    /// Mounted nodes, not counting the root container.
    pub fn node_count(&self) -> usize {
        self.tree.len() - 1
    }

    /// Passes run over the lifetime of the root.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

fn run_cleanup(component: &'static str, cleanup: Cleanup, catch_panics: bool) -> Option<EffectError> {
    catch_panic(catch_panics, || cleanup.run())
        .err()
        .map(|message| EffectError::CleanupPanicked { component, message })
}
