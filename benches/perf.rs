use std::fmt::Write as _;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use subs_dashboard::pipeline::merge_tables;
use subs_dashboard::source::{RawTable, read_csv_table};
use subs_dashboard::view::{NumericColumn, SortOrder, TableView};

const PLAYERS: usize = 2_000;

fn performance_csv() -> String {
    let mut out = String::from("player,actual_impact,predicted_impact,drop_off_pct\n");
    for idx in 0..PLAYERS {
        // Every fifth player is absent from the performance table.
        if idx % 5 == 4 {
            continue;
        }
        let actual = (idx % 17) as f64 * 0.07;
        let predicted = (idx % 11) as f64 * 0.09;
        let _ = writeln!(out, "Player {idx},{actual:.3},{predicted:.3},{}", idx % 40);
    }
    out
}

fn substitution_csv() -> String {
    let mut out = String::from("player,position,minutes,fatigue_score,sub_recommendation,team\n");
    let positions = ["Fwd", "Mid", "Def", "GK"];
    let recs = ["Sub Early", "Monitor", "Keep In Game"];
    for idx in 0..PLAYERS {
        let _ = writeln!(
            out,
            "Player {idx},{},{},{:.2},{},Team {}",
            positions[idx % positions.len()],
            idx % 91,
            (idx % 30) as f64 / 10.0,
            recs[idx % recs.len()],
            idx % 20
        );
    }
    out
}

fn raw_tables() -> (RawTable, RawTable) {
    let perf = read_csv_table(Path::new("perf.csv"), performance_csv().as_bytes())
        .expect("valid performance csv");
    let subs = read_csv_table(Path::new("subs.csv"), substitution_csv().as_bytes())
        .expect("valid substitution csv");
    (perf, subs)
}

fn bench_csv_read(c: &mut Criterion) {
    let raw = substitution_csv();
    c.bench_function("substitution_csv_read", |b| {
        b.iter(|| {
            let table = read_csv_table(Path::new("subs.csv"), black_box(raw.as_bytes())).unwrap();
            black_box(table.rows.len());
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let (perf, subs) = raw_tables();
    c.bench_function("merge_tables", |b| {
        b.iter(|| {
            let merged = merge_tables(black_box(&perf), black_box(&subs)).unwrap();
            black_box(merged.rows.len());
        })
    });
}

fn bench_views(c: &mut Criterion) {
    let (perf, subs) = raw_tables();
    let merged = merge_tables(&perf, &subs).expect("tables should merge");
    c.bench_function("filter_sort_top", |b| {
        b.iter(|| {
            let view = TableView::new(black_box(&merged))
                .filter_position("mid")
                .sort_by(NumericColumn::FatigueScore, SortOrder::Descending)
                .top_by_overperformance(25);
            black_box(view.len());
        })
    });
}

criterion_group!(benches, bench_csv_read, bench_merge, bench_views);
criterion_main!(benches);
