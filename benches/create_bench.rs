use criterion::{black_box, criterion_group, criterion_main, Criterion};

use columnar_marshal::{
    AttributeFilter, ColumnsHandler, DataframeMapper, DataframeMapperBuilder, NativeHandler,
};

struct Point {
    id: String,
    count: i32,
    value: f64,
}

struct Store {
    points: Vec<Point>,
}

fn all_points<'a>(store: &'a Store, _ctx: &()) -> Vec<&'a Point> {
    store.points.iter().collect()
}

fn point_mapper() -> DataframeMapper<Store, Point, ()> {
    DataframeMapperBuilder::new()
        .items_provider(all_points)
        .strings_index("id", |p: &Point, _: &()| p.id.clone())
        .ints("count", |p: &Point, _: &()| p.count)
        .doubles("value", |p: &Point, _: &()| p.value)
        .build()
        .expect("bench mapper builds")
}

fn sample_store(rows: usize) -> Store {
    Store {
        points: (0..rows)
            .map(|i| Point {
                id: format!("p{i}"),
                count: i as i32,
                value: i as f64 * 0.5,
            })
            .collect(),
    }
}

fn bench_create(c: &mut Criterion) {
    let mapper = point_mapper();
    let store = sample_store(10_000);

    c.bench_function("create_dataframe/columns_10k", |b| {
        b.iter(|| {
            let mut handler = ColumnsHandler::new();
            mapper
                .create_dataframe(&store, &mut handler, &AttributeFilter::All, &())
                .expect("create succeeds");
            black_box(handler.into_series())
        })
    });

    c.bench_function("create_dataframe/native_10k", |b| {
        b.iter(|| {
            let mut handler = NativeHandler::new();
            mapper
                .create_dataframe(&store, &mut handler, &AttributeFilter::All, &())
                .expect("create succeeds");
            let frame = handler.into_buffer().expect("transfer succeeds");
            unsafe { frame.free() };
        })
    });
}

criterion_group!(benches, bench_create);
criterion_main!(benches);
