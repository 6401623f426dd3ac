use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use orgdesk_catalog::{Item, ItemInput, ItemStatus, items_config};
use orgdesk_crud::memory::evaluate;
use orgdesk_crud::pipeline::compose;
use orgdesk_crud::{CrudParams, Paginator, RequestContext, Row};

fn item_rows(n: usize) -> Vec<Row> {
    let start = Utc::now();
    (0..n)
        .map(|i| {
            let input = ItemInput {
                name: format!("Item {:05} {}", i, if i % 7 == 0 { "widget" } else { "gadget" }),
                status: if i % 3 == 0 { ItemStatus::Inactive } else { ItemStatus::Active },
            };
            Item::new(input, start - Duration::minutes(i as i64)).to_row()
        })
        .collect()
}

fn bench_list_evaluation(c: &mut Criterion) {
    let config = items_config().expect("items descriptor");
    let ctx = RequestContext::anonymous();
    let params = CrudParams::parse(
        [("q", "widget"), ("status", "active"), ("sort", "name"), ("dir", "desc")],
        &[],
    );
    let query = compose(&config, &params, &ctx);

    let mut group = c.benchmark_group("list_evaluation");
    for size in [1_000usize, 10_000, 50_000] {
        let rows = item_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("filter_sort_page", size), &rows, |b, rows| {
            b.iter(|| {
                let matched = evaluate(rows.iter().cloned(), black_box(&query));
                let page = Paginator::new(matched.len() as u64, config.page_size).page("2");
                black_box(
                    matched
                        .into_iter()
                        .skip(page.offset() as usize)
                        .take(page.per_page as usize)
                        .count(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_list_evaluation);
criterion_main!(benches);
