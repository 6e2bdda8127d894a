//! Integration Tests for the Component Runtime
//!
//! These tests mount real component trees into a `HostTree` and verify that
//! state, effects, reconciliation, context and error boundaries work
//! together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;

use trellis_core::deps;
use trellis_core::reactive::SchedulerStats;
use trellis_core::tree::{HookKind, Updater};
use trellis_core::{
    boundary, create_context, host, Cleanup, Component, Context, Deps, DuplicateKeyPolicy, EffectError, Element, HostTree,
    Key, Patch, PatchBatch, RecordingRenderer, RenderError, Renderer, Rendered, Root, RuntimeConfig, Scope,
    SetState, Stateful,
};

type Log = Rc<RefCell<Vec<String>>>;

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ---- Counter ----

#[derive(Clone, Default)]
struct CounterProps {
    renders: Rc<Cell<usize>>,
    setter: Rc<RefCell<Option<SetState<i32>>>>,
}

struct Counter;

impl Component for Counter {
    type Props = CounterProps;

    fn render(cx: &mut Scope<'_>, props: &CounterProps) -> Rendered {
        props.renders.set(props.renders.get() + 1);
        let (count, set_count) = cx.use_state(|| 0);
        *props.setter.borrow_mut() = Some(set_count);
        Ok(host("span").attr("id", "count").child(count.to_string()).into())
    }
}

fn mount_counter() -> (Root<HostTree>, CounterProps, SetState<i32>) {
    let props = CounterProps::default();
    let mut root = Root::new(HostTree::new());
    root.render(Element::component::<Counter>(props.clone())).unwrap();
    let setter = props.setter.borrow().clone().unwrap();
    (root, props, setter)
}

/// Three updaters issued in one batch fold into one render.
#[test]
fn batched_updaters_render_once() {
    let (mut root, props, set) = mount_counter();

    root.batch(|| {
        for _ in 0..3 {
            set.update(|n| n + 1);
        }
    });
    let report = root.flush().unwrap();

    assert_eq!(report.passes, 1);
    assert_eq!(report.renders, 1);
    assert_eq!(props.renders.get(), 2);
    assert_eq!(root.renderer().markup(), r#"<span id="count">3</span>"#);
}

/// Plain writes in one batch commit to the last value.
#[test]
fn batched_plain_writes_keep_the_last_value() {
    let (mut root, _props, set) = mount_counter();

    root.batch(|| {
        set.set(5);
        set.update(|n| n * 2);
        set.set(7);
    });
    root.flush().unwrap();

    assert_eq!(root.renderer().markup(), r#"<span id="count">7</span>"#);
}

/// Writes outside a batch coalesce while a pass is outstanding.
#[test]
fn unbatched_writes_coalesce() {
    let (mut root, props, set) = mount_counter();

    set.set(1);
    set.set(2);
    assert_eq!(
        root.scheduler().stats(),
        SchedulerStats {
            requests: 1,
            coalesced: 1
        }
    );

    let report = root.flush().unwrap();
    assert_eq!(report.passes, 1);
    assert_eq!(props.renders.get(), 2);
    assert_eq!(root.renderer().markup(), r#"<span id="count">2</span>"#);
}

/// Writes to an unmounted component are dropped.
#[test]
fn writes_after_unmount_are_ignored() {
    let (mut root, _props, set) = mount_counter();
    root.unmount();

    set.set(9);
    assert!(!root.has_pending());
    assert!(root.flush().unwrap().is_idle());
    assert_eq!(root.renderer().markup(), "");
}

// ---- Events ----

struct Form;

impl Component for Form {
    type Props = Rc<Cell<usize>>;

    fn render(cx: &mut Scope<'_>, renders: &Rc<Cell<usize>>) -> Rendered {
        renders.set(renders.get() + 1);
        let (clicks, set_clicks) = cx.use_state(|| 0);
        let (label, set_label) = cx.use_state(String::new);

        Ok(host("button")
            .attr("id", "go")
            .on("click", move |event| {
                set_clicks.update(|n| n + 1);
                set_clicks.update(|n| n + 1);
                set_label.set(event.payload["label"].as_str().unwrap_or_default().to_string());
            })
            .child(format!("{clicks}:{label}"))
            .into())
    }
}

/// Every write issued by one event handler lands in a single pass.
#[test]
fn event_handlers_are_batched() {
    let renders = Rc::new(Cell::new(0));
    let mut root = Root::new(HostTree::new());
    root.render(Element::component::<Form>(Rc::clone(&renders))).unwrap();

    let button = root.renderer().find_by_attr("id", "go").unwrap();
    let report = root.dispatch_event(button, "click", json!({ "label": "x" })).unwrap();

    assert_eq!(report.passes, 1);
    assert_eq!(report.renders, 1);
    assert_eq!(renders.get(), 2);
    assert_eq!(root.renderer().markup(), r#"<button id="go">2:x</button>"#);
}

// ---- Effects ----

#[derive(Clone)]
struct EffectProps {
    dep: i32,
    log: Log,
}

struct Effectful;

impl Component for Effectful {
    type Props = EffectProps;

    fn render(cx: &mut Scope<'_>, props: &EffectProps) -> Rendered {
        let dep = props.dep;
        let log = Rc::clone(&props.log);
        cx.use_effect(deps![dep], move || {
            log.borrow_mut().push(format!("effect({dep})"));
            Cleanup::new(move || log.borrow_mut().push(format!("cleanup({dep})")))
        });
        Ok(Element::empty())
    }
}

/// Mount, update with changed deps, unmount.
#[test]
fn effect_cleanup_ordering() {
    let log = Log::default();
    let mut root = Root::new(HostTree::new());
    let props = |dep| EffectProps {
        dep,
        log: Rc::clone(&log),
    };

    root.render(Element::component::<Effectful>(props(1))).unwrap();
    root.render(Element::component::<Effectful>(props(1))).unwrap();
    root.render(Element::component::<Effectful>(props(2))).unwrap();
    root.unmount();

    assert_eq!(entries(&log), ["effect(1)", "cleanup(1)", "effect(2)", "cleanup(2)"]);
}

struct BrokenCleanup;

impl Component for BrokenCleanup {
    type Props = EffectProps;

    fn render(cx: &mut Scope<'_>, props: &EffectProps) -> Rendered {
        let dep = props.dep;
        let log = Rc::clone(&props.log);
        cx.use_effect(deps![dep], move || {
            log.borrow_mut().push(format!("effect({dep})"));
            Cleanup::new(move || panic!("cleanup({dep}) exploded"))
        });
        Ok(Element::empty())
    }
}

/// Panicking cleanups are reported, both before a rerun and at teardown.
#[test]
fn cleanup_panics_are_reported() {
    let log = Log::default();
    let mut root = Root::new(HostTree::new());
    let props = |dep| EffectProps {
        dep,
        log: Rc::clone(&log),
    };

    root.render(Element::component::<BrokenCleanup>(props(1))).unwrap();
    assert!(root.take_effect_errors().is_empty());

    root.render(Element::component::<BrokenCleanup>(props(2))).unwrap();
    assert_eq!(
        root.take_effect_errors(),
        vec![EffectError::CleanupPanicked {
            component: "BrokenCleanup",
            message: "cleanup(1) exploded".into()
        }]
    );
    assert_eq!(entries(&log), ["effect(1)", "effect(2)"]);

    root.unmount();
    assert_eq!(
        root.take_effect_errors(),
        vec![EffectError::CleanupPanicked {
            component: "BrokenCleanup",
            message: "cleanup(2) exploded".into()
        }]
    );
    assert!(!root.is_mounted());
}

struct LoggingRenderer {
    log: Log,
}

impl Renderer for LoggingRenderer {
    fn apply(&mut self, _batch: &PatchBatch) {
        self.log.borrow_mut().push("apply".into());
    }

    fn present(&mut self) {
        self.log.borrow_mut().push("present".into());
    }
}

fn log_effects(cx: &mut Scope<'_>, log: &Log, name: &'static str) {
    let layout = Rc::clone(log);
    cx.use_layout_effect(deps![], move || layout.borrow_mut().push(format!("layout {name}")));
    let passive = Rc::clone(log);
    cx.use_effect(deps![], move || passive.borrow_mut().push(format!("passive {name}")));
}

struct Leaf;

impl Component for Leaf {
    type Props = Log;

    fn render(cx: &mut Scope<'_>, log: &Log) -> Rendered {
        log_effects(cx, log, "leaf");
        Ok(host("i").into())
    }
}

struct Branch;

impl Component for Branch {
    type Props = Log;

    fn render(cx: &mut Scope<'_>, log: &Log) -> Rendered {
        log_effects(cx, log, "branch");
        Ok(host("div").child(Element::component::<Leaf>(Rc::clone(log))).into())
    }
}

/// Layout effects run between apply and present, passive effects after,
/// children before parents.
#[test]
fn commit_phases_run_in_order() {
    let log = Log::default();
    let mut root = Root::new(LoggingRenderer { log: Rc::clone(&log) });

    let report = root.render(Element::component::<Branch>(Rc::clone(&log))).unwrap();

    assert_eq!(report.effects_run, 4);
    assert_eq!(
        entries(&log),
        [
            "apply",
            "layout leaf",
            "layout branch",
            "present",
            "passive leaf",
            "passive branch"
        ]
    );
}

// ---- Reconciliation ----

#[derive(Clone)]
struct ItemProps {
    label: &'static str,
    mounts: Rc<Cell<usize>>,
}

struct Item;

impl Component for Item {
    type Props = ItemProps;

    fn render(cx: &mut Scope<'_>, props: &ItemProps) -> Rendered {
        let mounts = Rc::clone(&props.mounts);
        cx.use_effect(deps![], move || mounts.set(mounts.get() + 1));
        Ok(host("li").child(props.label).into())
    }
}

fn items(order: &[&'static str], mounts: &Rc<Cell<usize>>) -> Element {
    host("ul")
        .children(order.iter().map(|&label| {
            Element::component::<Item>(ItemProps {
                label,
                mounts: Rc::clone(mounts),
            })
            .with_key(label)
        }))
        .into()
}

/// Swapping keyed siblings reuses both instances and only reorders output.
#[test]
fn keyed_swap_reuses_instances() {
    let mounts = Rc::new(Cell::new(0));

    let mut root = Root::new(HostTree::new());
    root.render(items(&["1", "2"], &mounts)).unwrap();
    root.render(items(&["2", "1"], &mounts)).unwrap();
    assert_eq!(mounts.get(), 2);
    assert_eq!(root.renderer().markup(), "<ul><li>2</li><li>1</li></ul>");

    let mut recorded = Root::new(RecordingRenderer::new());
    recorded.render(items(&["1", "2"], &mounts)).unwrap();
    recorded.renderer_mut().drain();
    recorded.render(items(&["2", "1"], &mounts)).unwrap();

    let batches = recorded.renderer_mut().drain();
    assert_eq!(batches.len(), 1);
    assert!(matches!(&batches[0].patches[..], [Patch::Reorder { .. }]));
}

/// Removing from the middle and appending keeps the right instances.
#[test]
fn keyed_insert_and_remove() {
    let mounts = Rc::new(Cell::new(0));
    let mut root = Root::new(HostTree::new());

    root.render(items(&["a", "b", "c"], &mounts)).unwrap();
    root.render(items(&["a", "c", "d"], &mounts)).unwrap();

    assert_eq!(mounts.get(), 4);
    assert_eq!(root.renderer().markup(), "<ul><li>a</li><li>c</li><li>d</li></ul>");

    root.render(items(&["d", "a"], &mounts)).unwrap();
    assert_eq!(mounts.get(), 4);
    assert_eq!(root.renderer().markup(), "<ul><li>d</li><li>a</li></ul>");
}

fn duplicated() -> Element {
    host("ul")
        .child(host("li").key("a").child("1"))
        .child(host("li").key("a").child("2"))
        .into()
}

#[test]
fn duplicate_keys_fail_by_default() {
    let mut root = Root::new(HostTree::new());

    let err = root.render(duplicated()).unwrap_err();
    assert_eq!(
        err,
        RenderError::DuplicateKey {
            parent: "<ul>".into(),
            key: Key::from("a")
        }
    );
    assert_eq!(root.renderer().markup(), "");
}

#[test]
fn duplicate_keys_can_be_tolerated() {
    let config = RuntimeConfig::from_json(r#"{ "duplicate_keys": "warn" }"#).unwrap();
    assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Warn);

    let mut root = Root::with_config(HostTree::new(), config);
    root.render(duplicated()).unwrap();
    assert_eq!(root.renderer().markup(), "<ul><li>1</li><li>2</li></ul>");
}

// ---- Memoization ----

#[derive(Clone, Default)]
struct LabelProps {
    text: String,
    renders: Rc<Cell<usize>>,
    updater: Rc<RefCell<Option<Updater>>>,
}

impl PartialEq for LabelProps {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

struct Label;

impl Component for Label {
    type Props = LabelProps;

    fn render(cx: &mut Scope<'_>, props: &LabelProps) -> Rendered {
        props.renders.set(props.renders.get() + 1);
        *props.updater.borrow_mut() = Some(cx.use_force_update());
        Ok(host("label").child(props.text.clone()).into())
    }
}

#[test]
fn memoized_components_skip_equal_props() {
    let props = LabelProps {
        text: "a".into(),
        ..LabelProps::default()
    };
    let page = |props: &LabelProps| -> Element { host("div").child(Element::memo::<Label>(props.clone())).into() };

    let mut root = Root::new(HostTree::new());
    root.render(page(&props)).unwrap();
    root.render(page(&props)).unwrap();
    assert_eq!(props.renders.get(), 1);

    let changed = LabelProps {
        text: "b".into(),
        ..props.clone()
    };
    root.render(page(&changed)).unwrap();
    assert_eq!(props.renders.get(), 2);
    assert_eq!(root.renderer().markup(), "<div><label>b</label></div>");

    // A forced update re-renders despite equal props.
    props.updater.borrow().as_ref().unwrap().schedule();
    let report = root.flush().unwrap();
    assert_eq!(report.renders, 1);
    assert_eq!(props.renders.get(), 3);
}

// ---- Context ----

#[derive(Clone)]
struct ThemedProps {
    theme: Context<String>,
    themed_renders: Rc<Cell<usize>>,
    shell_renders: Rc<Cell<usize>>,
}

impl PartialEq for ThemedProps {
    fn eq(&self, other: &Self) -> bool {
        self.theme == other.theme
    }
}

struct Themed;

impl Component for Themed {
    type Props = ThemedProps;

    fn render(cx: &mut Scope<'_>, props: &ThemedProps) -> Rendered {
        props.themed_renders.set(props.themed_renders.get() + 1);
        let theme = cx.use_context(&props.theme);
        Ok(host("p").child(theme.as_str()).into())
    }
}

struct Shell;

impl Component for Shell {
    type Props = ThemedProps;

    fn render(_cx: &mut Scope<'_>, props: &ThemedProps) -> Rendered {
        props.shell_renders.set(props.shell_renders.get() + 1);
        Ok(host("main").child(Element::memo::<Themed>(props.clone())).into())
    }
}

/// A changed provider value reaches consumers below components that skip.
#[test]
fn context_changes_pass_memoized_components() {
    let props = ThemedProps {
        theme: create_context("light".to_string()),
        themed_renders: Rc::new(Cell::new(0)),
        shell_renders: Rc::new(Cell::new(0)),
    };
    let provide = |value: &str| props.theme.provide(value.to_string(), [Element::memo::<Shell>(props.clone())]);

    let mut root = Root::new(HostTree::new());
    root.render(Element::memo::<Themed>(props.clone())).unwrap();
    assert_eq!(root.renderer().markup(), "<p>light</p>");

    root.render(provide("dark")).unwrap();
    assert_eq!(root.renderer().markup(), "<main><p>dark</p></main>");
    assert_eq!(props.themed_renders.get(), 2);

    root.render(provide("dark")).unwrap();
    assert_eq!(props.themed_renders.get(), 2);

    root.render(provide("solar")).unwrap();
    assert_eq!(root.renderer().markup(), "<main><p>solar</p></main>");
    assert_eq!(props.themed_renders.get(), 3);
    assert_eq!(props.shell_renders.get(), 1);
}

// ---- Error boundaries ----

struct Thrower;

impl Component for Thrower {
    type Props = bool;

    fn render(_cx: &mut Scope<'_>, throws: &bool) -> Rendered {
        if *throws {
            return Err(RenderError::msg("broken"));
        }
        Ok(host("b").child("fine").into())
    }
}

struct Sibling;

impl Component for Sibling {
    type Props = ();

    fn render(_cx: &mut Scope<'_>, _props: &()) -> Rendered {
        Ok(host("span").child("ok").into())
    }
}

fn guarded_page(throws: bool, attempt: i32, fallbacks: &Rc<Cell<usize>>, caught: &Rc<Cell<usize>>) -> Element {
    let fallbacks = Rc::clone(fallbacks);
    let caught = Rc::clone(caught);

    host("div")
        .child(
            boundary(move |err| {
                fallbacks.set(fallbacks.get() + 1);
                host("p").child(err.to_string()).into()
            })
            .on_error(move |_| caught.set(caught.get() + 1))
            .reset_keys(deps![attempt])
            .child(Element::component::<Thrower>(throws)),
        )
        .child(Element::component::<Sibling>(()))
        .into()
}

#[test]
fn boundary_isolates_siblings_and_recovers() {
    let fallbacks = Rc::new(Cell::new(0));
    let caught = Rc::new(Cell::new(0));
    let mut root = Root::new(HostTree::new());

    root.render(guarded_page(true, 0, &fallbacks, &caught)).unwrap();
    assert_eq!(
        root.renderer().markup(),
        "<div><p>Thrower failed to render: broken</p><span>ok</span></div>"
    );
    assert_eq!(fallbacks.get(), 1);
    assert_eq!(caught.get(), 1);

    // Same reset keys: the fallback stays and is not rendered again.
    root.render(guarded_page(true, 0, &fallbacks, &caught)).unwrap();
    assert_eq!(fallbacks.get(), 1);

    root.render(guarded_page(false, 1, &fallbacks, &caught)).unwrap();
    assert_eq!(root.renderer().markup(), "<div><b>fine</b><span>ok</span></div>");
    assert_eq!(fallbacks.get(), 1);
    assert_eq!(caught.get(), 1);
}

/// Errors thrown by a fallback go to the next boundary up.
#[test]
fn fallback_errors_reach_the_outer_boundary() {
    let tree = boundary(|_| host("p").child("outer").into()).child(
        boundary(|_| Element::component::<Thrower>(true)).child(Element::component::<Thrower>(true)),
    );

    let mut root = Root::new(HostTree::new());
    root.render(tree).unwrap();
    assert_eq!(root.renderer().markup(), "<p>outer</p>");
}

#[test]
fn uncaught_errors_unmount_everything() {
    let mut root = Root::new(HostTree::new());
    root.render(host("div").child(Element::component::<Thrower>(false))).unwrap();
    assert_eq!(root.renderer().markup(), "<div><b>fine</b></div>");

    let err = root
        .render(host("div").child(Element::component::<Thrower>(true)))
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::Thrown {
            component: "Thrower",
            message: "broken".into()
        }
    );
    assert_eq!(root.renderer().markup(), "");
    assert_eq!(root.renderer().node_count(), 0);
    assert!(!root.is_mounted());
}

struct Panicky;

impl Component for Panicky {
    type Props = ();

    fn render(_cx: &mut Scope<'_>, _props: &()) -> Rendered {
        panic!("render exploded");
    }
}

#[test]
fn render_panics_become_errors() {
    let mut root = Root::new(HostTree::new());
    let tree = boundary(|err| host("p").child(err.to_string()).into()).child(Element::component::<Panicky>(()));

    root.render(tree).unwrap();
    assert_eq!(root.renderer().markup(), "<p>Panicky panicked while rendering: render exploded</p>");
}

// ---- Hooks ----

struct Fickle;

impl Component for Fickle {
    type Props = u8;

    fn render(cx: &mut Scope<'_>, variant: &u8) -> Rendered {
        match variant {
            0 => {
                cx.use_state(|| 0);
            }
            1 => {
                cx.use_ref(|| 0);
            }
            _ => {
                cx.use_state(|| 0);
                cx.use_memo(deps![], || 1);
            }
        }
        Ok(Element::empty())
    }
}

#[test]
fn hook_order_violations_fail_the_render() {
    let mut root = Root::new(HostTree::new());
    root.render(Element::component::<Fickle>(0)).unwrap();

    let err = root.render(Element::component::<Fickle>(1)).unwrap_err();
    assert_eq!(
        err,
        RenderError::HookOrder {
            component: "Fickle",
            index: 0,
            expected: HookKind::State,
            found: HookKind::Ref
        }
    );

    root.render(Element::component::<Fickle>(0)).unwrap();
    let err = root.render(Element::component::<Fickle>(2)).unwrap_err();
    assert_eq!(
        err,
        RenderError::HookCount {
            component: "Fickle",
            expected: 1,
            found: 2
        }
    );
}

struct Runaway;

impl Component for Runaway {
    type Props = ();

    fn render(cx: &mut Scope<'_>, _props: &()) -> Rendered {
        let (count, set_count) = cx.use_state(|| 0);
        cx.use_effect(Deps::always(), move || set_count.update(|n| n + 1));
        Ok(host("p").child(count.to_string()).into())
    }
}

#[test]
fn runaway_updates_hit_the_limit() {
    let config = RuntimeConfig {
        max_nested_updates: 5,
        ..RuntimeConfig::default()
    };
    let mut root = Root::with_config(HostTree::new(), config);

    let err = root.render(Element::component::<Runaway>(())).unwrap_err();
    assert_eq!(err, RenderError::NestedUpdateLimit { limit: 5 });
    assert_eq!(root.renderer().markup(), "");
    assert!(!root.has_pending());
}

// ---- Class components ----

#[derive(Clone)]
struct TrackerProps {
    value: i32,
    log: Log,
}

struct Tracker {
    log: Log,
}

impl Stateful for Tracker {
    type Props = TrackerProps;

    fn create(props: &TrackerProps) -> Self {
        Tracker {
            log: Rc::clone(&props.log),
        }
    }

    fn render(&self, _cx: &mut Scope<'_>, props: &TrackerProps) -> Rendered {
        self.log.borrow_mut().push(format!("render {}", props.value));
        Ok(host("output").child(props.value.to_string()).into())
    }

    fn should_update(&self, prev: &TrackerProps, next: &TrackerProps) -> bool {
        prev.value != next.value
    }

    fn on_mount(&mut self, props: &TrackerProps) {
        self.log.borrow_mut().push(format!("mount {}", props.value));
    }

    fn on_update(&mut self, prev: &TrackerProps, props: &TrackerProps) {
        self.log
            .borrow_mut()
            .push(format!("update {} -> {}", prev.value, props.value));
    }

    fn on_unmount(&mut self) {
        self.log.borrow_mut().push("unmount".into());
    }
}

#[test]
fn class_lifecycle() {
    let log = Log::default();
    let props = |value| TrackerProps {
        value,
        log: Rc::clone(&log),
    };
    let mut root = Root::new(HostTree::new());

    root.render(Element::stateful::<Tracker>(props(1))).unwrap();
    root.render(Element::stateful::<Tracker>(props(1))).unwrap();
    root.render(Element::stateful::<Tracker>(props(2))).unwrap();
    assert_eq!(root.renderer().markup(), "<output>2</output>");
    root.unmount();

    assert_eq!(
        entries(&log),
        ["render 1", "mount 1", "render 2", "update 1 -> 2", "unmount"]
    );
}

// ---- Portals ----

#[test]
fn portals_render_into_named_containers() {
    let clicked = Rc::new(Cell::new(false));
    let flag = Rc::clone(&clicked);
    let page = host("div").child(Element::portal(
        "modal",
        [host("dialog")
            .attr("id", "dlg")
            .on("close", move |_| flag.set(true))
            .child("hi")
            .into()],
    ));

    let mut root = Root::new(HostTree::new());
    root.render(page).unwrap();
    assert_eq!(root.renderer().markup(), "<div></div>");
    assert_eq!(root.renderer().portal_markup("modal"), r#"<dialog id="dlg">hi</dialog>"#);

    let dialog = root.renderer().find_by_attr("id", "dlg").unwrap();
    root.dispatch_event(dialog, "close", json!(null)).unwrap();
    assert!(clicked.get());

    root.unmount();
    assert_eq!(root.renderer().portal_markup("modal"), "");
}

// ---- Wire format ----

#[test]
fn recorded_batches_survive_both_encodings() {
    let mut root = Root::new(RecordingRenderer::new());
    root.render(host("ul").attr("class", "list").child(host("li").child("a")))
        .unwrap();

    let batch = root.renderer_mut().drain().remove(0);
    assert_eq!(batch.len(), 3);

    let json = batch.to_json().unwrap();
    assert!(json.contains(r#""op":"create""#));
    assert_eq!(PatchBatch::from_json(&json).unwrap(), batch);
    assert_eq!(PatchBatch::from_msgpack(&batch.to_msgpack().unwrap()).unwrap(), batch);
}
