//! Benchmarks for tablestack core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tablestack::core::construct::App;
use tablestack::core::stack::StackProps;
use tablestack::core::{parser, planner, synth};
use tablestack::stacks::users::UsersTableStack;

fn make_app(stacks: usize) -> App {
    let mut app = App::new();
    for i in 0..stacks {
        let s = UsersTableStack::new(&app, &format!("Stack{i}"), StackProps::default());
        app.add_stack(s);
    }
    app
}

fn bench_declare(c: &mut Criterion) {
    c.bench_function("declare_users_stack", |b| {
        let app = App::new();
        b.iter(|| {
            let s = UsersTableStack::new(black_box(&app), black_box("Dev"), StackProps::default());
            black_box(s);
        });
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    for size in [1, 10, 100] {
        let app = make_app(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &app, |b, app| {
            b.iter(|| {
                let assembly = synth::synthesize(black_box(app)).unwrap();
                black_box(assembly);
            });
        });
    }
    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let assembly = synth::synthesize(&make_app(50)).unwrap();
    let previous = assembly.clone();
    c.bench_function("plan_50_unchanged", |b| {
        b.iter(|| {
            let diff = planner::plan(black_box(&assembly), black_box(Some(&previous))).unwrap();
            black_box(diff);
        });
    });
}

fn bench_yaml_parse(c: &mut Criterion) {
    let yaml = r#"
version: "1.0"
name: bench-config
params:
  region: eu-west-1
stacks:
  Dev:
    env:
      region: "{{params.region}}"
    tags:
      team: identity
  Staging:
    stack_name: users-staging
  Prod:
    stack_name: users-prod
    termination_protection: true
    export_outputs: true
"#;
    c.bench_function("yaml_parse", |b| {
        b.iter(|| {
            let config = parser::parse_config(black_box(yaml)).unwrap();
            black_box(config);
        });
    });
}

criterion_group!(
    benches,
    bench_declare,
    bench_synthesize,
    bench_plan,
    bench_yaml_parse
);
criterion_main!(benches);
