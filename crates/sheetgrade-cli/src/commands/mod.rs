//! Subcommand implementations.

pub mod check;
pub mod extract;
pub mod grade;
pub mod init;
pub mod keys;
pub mod results;
pub mod validate;

use sheetgrade_core::model::Choice;
use sheetgrade_core::trace::ExtractionObserver;

/// Streams extraction decisions to stderr for `--trace`.
pub struct ConsoleTraceObserver;

impl ExtractionObserver for ConsoleTraceObserver {
    fn on_pattern_hit(&self, strategy: &str, question: u32, choice: Choice) {
        eprintln!("  [{strategy}] question {question} -> {choice}");
    }

    fn on_fallback_engaged(&self, found: usize, total: usize) {
        eprintln!("  pattern coverage {found}/{total}, engaging table-format detector");
    }

    fn on_candidate_scored(&self, question: u32, candidate: Choice, fill_score: usize) {
        eprintln!("  question {question}: candidate {candidate} scored {fill_score}");
    }

    fn on_candidate_selected(&self, question: u32, winner: Choice, fill_score: usize) {
        eprintln!("  question {question}: selected {winner} (fill score {fill_score})");
    }

    fn on_gap_filled(&self, question: u32, choice: Choice) {
        eprintln!("  question {question}: filled gap with {choice}");
    }
}
