use criterion::{criterion_group, criterion_main, Criterion};
use prism_core::scene::AssetId;
use prism_lanes::render_list_lane::{
    painter_sort_stable, reverse_painter_sort_stable, RenderItem, RenderList,
};
use std::hint::black_box;

fn item(program: u32, depth: f32) -> RenderItem {
    RenderItem {
        id: 0,
        object: AssetId::generate(),
        object_index: 0,
        geometry: AssetId::generate(),
        material: AssetId::generate(),
        program_sort_id: program % 16,
        group_order: 0,
        render_order: 0,
        depth,
        group: None,
    }
}

fn bench_sorting(c: &mut Criterion) {
    // 10,000 draws spread over 16 programs at pseudo-random depths.
    let items: Vec<RenderItem> = (0..10_000u32)
        .map(|i| {
            let depth = (i.wrapping_mul(40_503) % 1000) as f32 * 0.1;
            item(i.wrapping_mul(2_654_435_761) % 64, depth)
        })
        .collect();

    let mut group = c.benchmark_group("Render List");

    group.bench_function("Opaque sort (10k)", |b| {
        let mut list = RenderList::new();
        b.iter(|| {
            list.init();
            for item in &items {
                list.push(*item, false);
            }
            list.sort(painter_sort_stable, reverse_painter_sort_stable);
            list.finish();
            black_box(list.opaque().next());
        });
    });

    group.bench_function("Transparent sort (10k)", |b| {
        let mut list = RenderList::new();
        b.iter(|| {
            list.init();
            for item in &items {
                list.push(*item, true);
            }
            list.sort(painter_sort_stable, reverse_painter_sort_stable);
            list.finish();
            black_box(list.transparent().next());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_sorting);
criterion_main!(benches);
