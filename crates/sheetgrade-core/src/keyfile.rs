//! Answer-key TOML parsing and validation.
//!
//! Keys are authored as TOML files with an `[answer_key]` header and one
//! `[[questions]]` block per question. Structural problems are hard errors;
//! suspicious-but-usable content comes back as [`ValidationWarning`]s.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::grade::DEFAULT_MIN_PASSING_SCORE;
use crate::model::{AnswerKey, Choice, Question};

/// Default weight for questions that do not specify one.
pub const DEFAULT_QUESTION_WEIGHT: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct TomlKeyFile {
    answer_key: TomlKeyHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlKeyHeader {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default = "default_min_passing")]
    min_passing_score: f64,
}

fn default_min_passing() -> f64 {
    DEFAULT_MIN_PASSING_SCORE
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    number: u32,
    correct: String,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    DEFAULT_QUESTION_WEIGHT
}

/// Parse an answer-key TOML file from disk.
pub fn parse_answer_key(path: &Path) -> Result<AnswerKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer key file: {}", path.display()))?;
    parse_answer_key_str(&content, path)
}

/// Parse answer-key TOML content. `source_path` is only used in errors.
pub fn parse_answer_key_str(content: &str, source_path: &Path) -> Result<AnswerKey> {
    let parsed: TomlKeyFile = toml::from_str(content)
        .with_context(|| format!("failed to parse answer key file: {}", source_path.display()))?;

    let mut questions = Vec::with_capacity(parsed.questions.len());
    for question in &parsed.questions {
        questions.push(
            convert_question(question).with_context(|| {
                format!("invalid answer key file: {}", source_path.display())
            })?,
        );
    }

    Ok(AnswerKey {
        id: parsed
            .answer_key
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: parsed.answer_key.name,
        questions,
        min_passing_score: parsed.answer_key.min_passing_score,
        created_at: None,
        updated_at: None,
    })
}

fn convert_question(question: &TomlQuestion) -> Result<Question> {
    if question.number < 1 {
        bail!("question number must be 1 or greater, got {}", question.number);
    }
    let correct_answer: Choice = question
        .correct
        .parse()
        .map_err(|e: String| anyhow::anyhow!("question {}: {e}", question.number))?;
    if !question.weight.is_finite() || question.weight < 0.0 {
        bail!(
            "question {}: weight must be a non-negative finite number, got {}",
            question.number,
            question.weight
        );
    }
    Ok(Question {
        number: question.number,
        correct_answer,
        weight: question.weight,
    })
}

/// Load every `.toml` answer key under a directory, recursively.
///
/// Files that fail to parse are skipped with a warning so one bad key does
/// not hide the rest.
pub fn load_key_directory(dir: &Path) -> Result<Vec<AnswerKey>> {
    let mut keys = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            keys.extend(load_key_directory(&path)?);
        } else if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            match parse_answer_key(&path) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!("skipping {}: {e:#}", path.display());
                }
            }
        }
    }
    Ok(keys)
}

/// A non-fatal finding from [`validate_answer_key`].
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The offending question number, when the finding is question-scoped.
    pub question: Option<u32>,
    /// Human-readable description.
    pub message: String,
}

/// Lint an answer key for content that parses but looks wrong.
pub fn validate_answer_key(key: &AnswerKey) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if key.questions.is_empty() {
        warnings.push(ValidationWarning {
            question: None,
            message: "answer key has no questions".to_string(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for question in &key.questions {
        if !seen.insert(question.number) {
            warnings.push(ValidationWarning {
                question: Some(question.number),
                message: format!("duplicate question number {}", question.number),
            });
        }
    }

    let mut numbers: Vec<u32> = key.questions.iter().map(|q| q.number).collect();
    numbers.sort_unstable();
    numbers.dedup();
    for (index, number) in numbers.iter().enumerate() {
        let expected = (index + 1) as u32;
        if *number != expected {
            warnings.push(ValidationWarning {
                question: Some(*number),
                message: format!(
                    "question numbers are not contiguous: expected {expected}, found {number}"
                ),
            });
            break;
        }
    }

    if !(0.0..=100.0).contains(&key.min_passing_score) {
        warnings.push(ValidationWarning {
            question: None,
            message: format!(
                "min_passing_score {} is outside 0..=100",
                key.min_passing_score
            ),
        });
    }

    warnings
}
