use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlbuilder::{NumberedValues, SqlBuilder, Value, from_numbered};

/// Build a statement with `n` bound columns and `n` arguments:
/// select ${c0}, ${c1}, ... from ${t} where c0 = ? and c1 = ? ...
fn build_select(n: usize) -> SqlBuilder {
    let mut sb = SqlBuilder::new("select");
    let cols: Vec<String> = (0..n).map(|i| format!("${{c{i}}}")).collect();
    sb.append(&cols.join(", ")).append("from ${t} where");
    for i in 0..n {
        let clause = if i == 0 {
            format!("col{i} = ?")
        } else {
            format!("and col{i} = ?")
        };
        sb.append_args(&clause, [i as i64]);
    }
    for i in 0..n {
        sb.bind(&format!("c{i}"), &format!("col{i}")).unwrap();
    }
    sb.bind("t", "t").unwrap();
    sb
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/render");

    for n in [1, 5, 10, 50, 100] {
        let sb = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sb, |b, sb| {
            b.iter(|| black_box(sb.render().unwrap()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let sb = build_select(n);
                black_box(sb.to_sql().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_expand_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/expand_collection");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let sb = SqlBuilder::with_args(
                    "select * from t where id in (?) and kind = ?",
                    [Value::from(values.clone()), Value::from("a")],
                );
                black_box(sb.to_sql().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_from_numbered(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/from_numbered");

    for n in [1, 5, 10, 50] {
        let params = NumberedValues::positional(0..n as i64);
        let template = (1..=n)
            .map(|i| format!("c{i} = :{i} and d{i} <> ':{i}'"))
            .collect::<Vec<_>>()
            .join(" and ");
        let template = format!("select * from t where {template}");
        group.bench_with_input(BenchmarkId::from_parameter(n), &template, |b, template| {
            b.iter(|| black_box(from_numbered(template, &params)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render,
    bench_build_and_render,
    bench_expand_collection,
    bench_from_numbered
);
criterion_main!(benches);
