//! The `sheetgrade extract` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::Table;

use sheetgrade_core::extract::extract_answers_detailed;
use sheetgrade_core::model::ChoiceSet;
use sheetgrade_core::trace::{ExtractionObserver, NoopObserver};
use sheetgrade_services::config::load_config_from;

use super::ConsoleTraceObserver;

pub fn execute(
    config_path: Option<&Path>,
    text: PathBuf,
    questions: usize,
    choices_override: Option<String>,
    format: &str,
    trace: bool,
) -> Result<()> {
    anyhow::ensure!(questions >= 1, "--questions must be at least 1");

    let config = load_config_from(config_path)?;
    let choices = match &choices_override {
        Some(set) => set
            .parse::<ChoiceSet>()
            .map_err(|e| anyhow::anyhow!("invalid --choices: {e}"))?,
        None => config.choice_set()?,
    };

    let content = std::fs::read_to_string(&text)
        .with_context(|| format!("failed to read text file: {}", text.display()))?;

    let observer: &dyn ExtractionObserver =
        if trace { &ConsoleTraceObserver } else { &NoopObserver };
    let detailed = extract_answers_detailed(&content, questions, &choices, observer);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&detailed)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Answer", "Source"]);
    for entry in &detailed {
        let answer = entry
            .value
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let source = entry
            .source
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![entry.question_number.to_string(), answer, source]);
    }
    println!("{table}");

    let resolved = detailed.iter().filter(|e| e.value.is_some()).count();
    println!();
    println!("Resolved {resolved}/{questions} answers");

    Ok(())
}
