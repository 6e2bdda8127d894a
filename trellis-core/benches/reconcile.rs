//! Reconciliation benchmarks
//!
//! Measures keyed list updates against a mounted tree.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trellis_core::{host, Component, Element, NullRenderer, Rendered, Root, Scope};

struct Row;

impl Component for Row {
    type Props = usize;

    fn render(_cx: &mut Scope<'_>, id: &usize) -> Rendered {
        Ok(host("li").attr("data-id", *id).child(id.to_string()).into())
    }
}

fn list(ids: &[usize]) -> Element {
    host("ul")
        .children(ids.iter().map(|&id| Element::memo::<Row>(id).with_key(id)))
        .into()
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_reverse");

    for size in [10, 100, 1000] {
        let forward: Vec<usize> = (0..size).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut root = Root::new(NullRenderer);
            root.render(list(&forward)).unwrap();
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                let ids = if flip { &reversed } else { &forward };
                black_box(root.render(list(ids)).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("keyed_append_1000", |b| {
        let base: Vec<usize> = (0..1000).collect();
        let mut grown = base.clone();
        grown.push(1000);

        b.iter(|| {
            let mut root = Root::new(NullRenderer);
            root.render(list(&base)).unwrap();
            black_box(root.render(list(&grown)).unwrap());
        });
    });
}

criterion_group!(benches, bench_reverse, bench_append);
criterion_main!(benches);
