//! Benchmarks for OCR-text answer extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sheetgrade_core::extract::extract_answers;
use sheetgrade_core::model::ChoiceSet;

/// A clean numbered sheet: every line matches the first pattern strategy.
fn generate_clean_sheet(num_questions: usize) -> String {
    let letters = ['A', 'B', 'C', 'D', 'E'];
    (1..=num_questions)
        .map(|i| format!("{i}. {}", letters[(i - 1) % letters.len()]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A table-format sheet that forces the fallback detector to do the work.
fn generate_table_sheet(num_questions: usize) -> String {
    (1..=num_questions)
        .map(|i| format!("{i} ? A  B ==  C  D  E"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A noisy dump mixing prose, pattern lines and table lines.
fn generate_mixed_sheet(num_questions: usize) -> String {
    let mut out = String::from("EXAM ANSWER SHEET\nName: ____________\n\n");
    for i in 1..=num_questions {
        if i % 3 == 0 {
            out.push_str(&format!("{i}) D\n"));
        } else {
            out.push_str(&format!("{i} ? A XX B  C\n"));
        }
    }
    out
}

fn bench_extraction(c: &mut Criterion) {
    let choices = ChoiceSet::default();
    let mut group = c.benchmark_group("extract_answers");

    let clean = generate_clean_sheet(50);
    group.bench_function("clean_50", |b| {
        b.iter(|| extract_answers(black_box(&clean), 50, &choices))
    });

    let table = generate_table_sheet(50);
    group.bench_function("table_fallback_50", |b| {
        b.iter(|| extract_answers(black_box(&table), 50, &choices))
    });

    let mixed = generate_mixed_sheet(100);
    group.bench_function("mixed_100", |b| {
        b.iter(|| extract_answers(black_box(&mixed), 100, &choices))
    });

    group.bench_function("empty", |b| {
        b.iter(|| extract_answers(black_box(""), 50, &choices))
    });

    group.finish();
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
