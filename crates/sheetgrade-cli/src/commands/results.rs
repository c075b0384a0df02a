//! The `sheetgrade results` subcommands.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use sheetgrade_core::grade::{classify_status, DEFAULT_MIN_PASSING_SCORE};
use sheetgrade_services::config::load_config_from;
use sheetgrade_storage::{ExamRecord, FileStore};

use crate::ResultsAction;

pub fn execute(config_path: Option<&Path>, action: ResultsAction) -> Result<()> {
    let config = load_config_from(config_path)?;
    let store = FileStore::new(&config.data_dir);

    match action {
        ResultsAction::List => list(&store),
        ResultsAction::Show { id } => show(&store, &id),
        ResultsAction::Clear => clear(&store),
    }
}

fn list(store: &FileStore) -> Result<()> {
    let records = store.list_results();
    if records.is_empty() {
        println!("No stored results.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Key", "Source", "Score", "Correct", "When"]);
    for record in &records {
        table.add_row(vec![
            short_id(record),
            record.key_name.clone(),
            record.source.to_string(),
            format!("{:.2}%", record.grade.percentage),
            format!(
                "{}/{}",
                record.grade.correct_count, record.grade.total_questions
            ),
            record.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");

    let average = records
        .iter()
        .map(|r| r.grade.percentage)
        .sum::<f64>()
        / records.len() as f64;
    println!("\n{} result(s), average {average:.2}%", records.len());
    Ok(())
}

fn show(store: &FileStore, id: &str) -> Result<()> {
    let records = store.list_results();
    let matches: Vec<&ExamRecord> = records
        .iter()
        .filter(|r| r.id.to_string().starts_with(id))
        .collect();

    let record = match matches.as_slice() {
        [] => anyhow::bail!("no stored result matches '{id}'"),
        [one] => *one,
        many => anyhow::bail!("'{id}' is ambiguous, matches {} results", many.len()),
    };

    // Records do not carry the pass threshold; use the stored key's when
    // it still exists.
    let min_passing = store
        .answer_key(&record.key_id)
        .map(|k| k.min_passing_score)
        .unwrap_or(DEFAULT_MIN_PASSING_SCORE);
    let status = classify_status(record.grade.percentage, min_passing);

    println!(
        "Result {} ({} via {})",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.source
    );
    println!("Key: {} ({})", record.key_name, record.key_id);
    println!();
    super::grade::print_grade_table(&record.grade);
    println!();
    println!(
        "Score: {:.2}/{:.2} ({:.2}%)",
        record.grade.total_score, record.grade.max_score, record.grade.percentage
    );
    println!(
        "Correct: {}/{}",
        record.grade.correct_count, record.grade.total_questions
    );
    println!("Status: {}", status.label);
    Ok(())
}

fn clear(store: &FileStore) -> Result<()> {
    anyhow::ensure!(store.clear_results(), "failed to clear stored results");
    println!("Cleared stored results.");
    Ok(())
}

fn short_id(record: &ExamRecord) -> String {
    record.id.to_string().chars().take(8).collect()
}
