//! The `sheetgrade grade` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::Table;
use serde::Serialize;

use sheetgrade_core::extract::extract_answers_with;
use sheetgrade_core::grade::{calculate_grade, classify_status, GradeStatus};
use sheetgrade_core::keyfile::parse_answer_key;
use sheetgrade_core::model::{AnswerKey, ChoiceSet, GradeResult, StudentAnswers};
use sheetgrade_core::trace::{ExtractionObserver, NoopObserver};
use sheetgrade_services::config::{create_reader, load_config_from, SheetgradeConfig};
use sheetgrade_services::reader::ReadOptions;
use sheetgrade_storage::{AnswerSource, ExamRecord, FileStore};

use super::ConsoleTraceObserver;
use crate::ReadVia;

#[derive(Serialize)]
struct GradeOutput<'a> {
    key_id: &'a str,
    key_name: &'a str,
    source: AnswerSource,
    status: GradeStatus,
    grade: &'a GradeResult,
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config_path: Option<&Path>,
    key_ref: &str,
    text: Option<PathBuf>,
    answers: Option<String>,
    image: Option<PathBuf>,
    via: ReadVia,
    choices_override: Option<String>,
    save: bool,
    format: &str,
    trace: bool,
) -> Result<()> {
    let config = load_config_from(config_path)?;
    let store = FileStore::new(&config.data_dir);

    let key = resolve_key(key_ref, &store)?;
    anyhow::ensure!(
        !key.questions.is_empty(),
        "answer key '{}' has no questions",
        key.id
    );

    let choices = match &choices_override {
        Some(set) => set
            .parse::<ChoiceSet>()
            .map_err(|e| anyhow::anyhow!("invalid --choices: {e}"))?,
        None => config.choice_set()?,
    };

    // clap's input group guarantees exactly one of text/answers/image.
    let num_questions = key.question_count();
    let (student_answers, source) = match (&text, &answers, &image) {
        (Some(text_path), _, _) => {
            let content = std::fs::read_to_string(text_path)
                .with_context(|| format!("failed to read text file: {}", text_path.display()))?;
            let observer: &dyn ExtractionObserver =
                if trace { &ConsoleTraceObserver } else { &NoopObserver };
            let extracted = extract_answers_with(&content, num_questions, &choices, observer);
            eprintln!(
                "Extracted {}/{} answers from text",
                extracted.answered_count(),
                num_questions
            );
            (extracted, AnswerSource::OcrText)
        }
        (_, Some(list), _) => {
            let parsed = StudentAnswers::parse_list(list, num_questions)
                .map_err(|e| anyhow::anyhow!("invalid --answers: {e}"))?;
            (parsed, AnswerSource::Manual)
        }
        (_, _, Some(image_path)) => {
            let read = read_from_image(image_path, via, &choices, num_questions, &config).await?;
            let source = match via {
                ReadVia::Omr => AnswerSource::Omr,
                ReadVia::Vision => AnswerSource::Vision,
            };
            (read, source)
        }
        _ => anyhow::bail!("one of --text, --answers or --image is required"),
    };

    let grade = calculate_grade(&student_answers, &key);
    let status = classify_status(grade.percentage, key.min_passing_score);

    match format {
        "json" => {
            let output = GradeOutput {
                key_id: &key.id,
                key_name: &key.name,
                source,
                status,
                grade: &grade,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            print_grade_table(&grade);
            println!();
            println!("Key: {} ({})", key.name, key.id);
            println!(
                "Score: {:.2}/{:.2} ({:.2}%)",
                grade.total_score, grade.max_score, grade.percentage
            );
            println!("Correct: {}/{}", grade.correct_count, grade.total_questions);
            println!("Status: {}", status.label);
        }
    }

    if save {
        let record = ExamRecord::new(&key, source, grade);
        if store.save_result(&record) {
            eprintln!("Saved result {}", record.id);
        } else {
            tracing::warn!("failed to store the graded result");
        }
    }

    Ok(())
}

/// A key reference is a file path when one exists on disk, otherwise a
/// stored key id.
fn resolve_key(key_ref: &str, store: &FileStore) -> Result<AnswerKey> {
    let path = Path::new(key_ref);
    if path.exists() {
        return parse_answer_key(path);
    }
    store.answer_key(key_ref).ok_or_else(|| {
        anyhow::anyhow!("answer key '{key_ref}' is neither a file nor a stored key id")
    })
}

async fn read_from_image(
    image_path: &Path,
    via: ReadVia,
    choices: &ChoiceSet,
    num_questions: usize,
    config: &SheetgradeConfig,
) -> Result<StudentAnswers> {
    let bytes = std::fs::read(image_path)
        .with_context(|| format!("failed to read image file: {}", image_path.display()))?;
    let filename = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("sheet.jpg");

    let backend = match via {
        ReadVia::Omr => "omr",
        ReadVia::Vision => "vision",
    };
    let reader = create_reader(backend, config)?;
    let options = ReadOptions::new(num_questions, choices.clone());

    let readout = reader
        .read_marks(&bytes, filename, &options)
        .await
        .with_context(|| {
            format!(
                "the {backend} reader could not process the sheet; \
                 you can grade manually with --answers or --text"
            )
        })?;

    if readout.confidence > 0.0 {
        eprintln!("Reader confidence: {:.0}%", readout.confidence * 100.0);
    }
    for flag in &readout.flags {
        eprintln!("Warning: {flag}");
    }

    Ok(readout.answers)
}

/// Render the per-question outcome table. Shared with `results show`.
pub(crate) fn print_grade_table(grade: &GradeResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Correct", "Student", "Result", "Score"]);

    for result in &grade.results {
        let student = result
            .student_answer
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let verdict = if result.is_correct { "OK" } else { "WRONG" };
        table.add_row(vec![
            result.question_number.to_string(),
            result.correct_answer.to_string(),
            student,
            verdict.to_string(),
            format!("{:.1}/{:.1}", result.score, result.weight),
        ]);
    }

    println!("{table}");
}
