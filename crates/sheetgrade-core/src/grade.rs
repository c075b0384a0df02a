//! Scoring and pass/fail classification.
//!
//! Grading is deterministic and total: any answer sequence can be graded
//! against any key. Missing answers are automatic misses, never errors.

use serde::Serialize;

use crate::model::{AnswerKey, GradeResult, QuestionResult, StudentAnswers};

/// Passing threshold used when a key does not specify one.
pub const DEFAULT_MIN_PASSING_SCORE: f64 = 60.0;

/// Grade a student's answers against an answer key.
///
/// Each question looks up slot `number - 1` of the sequence; an exact letter
/// match earns the question's weight, anything else earns zero. Totals
/// accumulate unrounded and are rounded to two decimals only when stored on
/// the returned [`GradeResult`].
pub fn calculate_grade(answers: &StudentAnswers, key: &AnswerKey) -> GradeResult {
    let mut results = Vec::with_capacity(key.questions.len());
    let mut total_score = 0.0;
    let mut max_score = 0.0;
    let mut correct_count = 0;

    for question in &key.questions {
        let student_answer = answers.get(question.number);
        let is_correct = student_answer == Some(question.correct_answer);
        let score = if is_correct { question.weight } else { 0.0 };
        if is_correct {
            correct_count += 1;
        }
        total_score += score;
        max_score += question.weight;
        results.push(QuestionResult {
            question_number: question.number,
            correct_answer: question.correct_answer,
            student_answer,
            is_correct,
            weight: question.weight,
            score,
        });
    }

    let percentage = if max_score > 0.0 {
        total_score / max_score * 100.0
    } else {
        0.0
    };

    GradeResult {
        results,
        total_score: round2(total_score),
        max_score: round2(max_score),
        percentage: round2(percentage),
        correct_count,
        total_questions: key.questions.len(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Severity channel for a grade status, for output styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A classified grade outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeStatus {
    /// Display label for the outcome.
    pub label: &'static str,
    /// Styling channel for the label.
    pub severity: Severity,
}

/// Classify a percentage against a passing threshold.
///
/// The rules apply top to bottom: below the threshold fails, then 90 and
/// above is excellent, 70 and above is good, and everything else is a plain
/// pass. A threshold above 90 therefore still fails a 89% submission before
/// the excellence rule is consulted.
pub fn classify_status(percentage: f64, min_passing_score: f64) -> GradeStatus {
    if percentage < min_passing_score {
        GradeStatus {
            label: "Failed",
            severity: Severity::Error,
        }
    } else if percentage >= 90.0 {
        GradeStatus {
            label: "Excellent - Passed",
            severity: Severity::Success,
        }
    } else if percentage >= 70.0 {
        GradeStatus {
            label: "Good - Passed",
            severity: Severity::Success,
        }
    } else {
        GradeStatus {
            label: "Passed",
            severity: Severity::Info,
        }
    }
}
