//! Answer extraction from noisy OCR text.
//!
//! Turns an OCR dump of an answer sheet into a fixed-length
//! [`StudentAnswers`] sequence. Two heuristics run in a fixed order: an
//! ordered list of textual pattern strategies, then, only when pattern
//! coverage is poor, a table-format detector that scores the ink artifacts
//! trailing each choice letter. Precedence is explicit: pattern results
//! always win, the detector only fills gaps.

use regex::Regex;

use crate::model::{Choice, ChoiceSet, ExtractedAnswer, SourceMethod, StudentAnswers};
use crate::trace::{ExtractionObserver, NoopObserver};

/// Characters that count as a filled-in mark in table-format sheets.
/// Letters are compared case-insensitively, so a lowercase `x` counts.
const FILL_CHARS: &[char] = &[
    'X', '/', '\\', '-', '|', '_', '~', '=', '+', '*', '#', '@', '<', '>',
];

fn is_fill_char(c: char) -> bool {
    FILL_CHARS.contains(&c.to_ascii_uppercase())
}

/// How a later partial mapping combines with an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Later entries replace earlier ones for the same slot.
    Overwrite,
    /// Later entries land only in slots the earlier pass left empty.
    FillGaps,
}

/// Merge `incoming` into `target` slot by slot under the given policy.
pub fn merge_partial(
    target: &mut [Option<Choice>],
    incoming: &[Option<Choice>],
    policy: MergePolicy,
) {
    for (slot, value) in target.iter_mut().zip(incoming) {
        match policy {
            MergePolicy::Overwrite => {
                if value.is_some() {
                    *slot = *value;
                }
            }
            MergePolicy::FillGaps => {
                if slot.is_none() {
                    *slot = *value;
                }
            }
        }
    }
}

/// One textual extraction pattern.
///
/// Each regex has exactly two capture groups; which group holds the question
/// number is decided per match, since OCR output mixes both orders.
struct PatternStrategy {
    name: &'static str,
    regex: Regex,
}

impl PatternStrategy {
    /// Scan all lines and return this strategy's partial mapping. Later
    /// matches for the same question replace earlier ones.
    fn scan(
        &self,
        lines: &[&str],
        num_questions: usize,
        choices: &ChoiceSet,
        observer: &dyn ExtractionObserver,
    ) -> Vec<Option<Choice>> {
        let mut slots = vec![None; num_questions];
        for line in lines {
            for caps in self.regex.captures_iter(line) {
                let first = &caps[1];
                let second = &caps[2];
                let (number_str, letter_str) = if first.chars().all(|c| c.is_ascii_digit()) {
                    (first, second)
                } else {
                    (second, first)
                };
                let Ok(number) = number_str.parse::<u32>() else {
                    continue;
                };
                let Some(letter) = letter_str.chars().next() else {
                    continue;
                };
                if number < 1 || number as usize > num_questions || !choices.contains(letter) {
                    continue;
                }
                let Some(choice) = Choice::from_char(letter) else {
                    continue;
                };
                slots[(number - 1) as usize] = Some(choice);
                observer.on_pattern_hit(self.name, number, choice);
            }
        }
        slots
    }
}

/// The ordered pattern list. Declaration order is load-bearing: a later
/// strategy's matches replace an earlier strategy's for the same question.
fn pattern_strategies(choices: &ChoiceSet) -> Vec<PatternStrategy> {
    let class: String = choices.letters().iter().collect();
    vec![
        PatternStrategy {
            name: "number-then-letter",
            regex: Regex::new(&format!(r"(?i)(\d+)[.):\-\s]+([{class}])"))
                .expect("failed to build extraction regex"),
        },
        PatternStrategy {
            name: "letter-then-number",
            regex: Regex::new(&format!(r"(?i)([{class}])\s*[-–]\s*(\d+)"))
                .expect("failed to build extraction regex"),
        },
    ]
}

/// Run the textual pattern strategies over `text`.
///
/// Lines are trimmed and blank lines skipped. Strategies run in declared
/// order and merge with [`MergePolicy::Overwrite`], so between conflicting
/// strategies the later-declared one wins regardless of line order.
pub fn scan_patterns(
    text: &str,
    num_questions: usize,
    choices: &ChoiceSet,
    observer: &dyn ExtractionObserver,
) -> Vec<Option<Choice>> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut slots = vec![None; num_questions];
    for strategy in pattern_strategies(choices) {
        let partial = strategy.scan(&lines, num_questions, choices, observer);
        merge_partial(&mut slots, &partial, MergePolicy::Overwrite);
    }
    slots
}

/// Detect answers laid out as a marked table, one question per line.
///
/// A line qualifies when it starts with a question number followed by
/// whitespace. The remainder is scanned for each choice letter's first
/// occurrence; candidates are ordered by the position they were found at in
/// the line. Each candidate's segment, from just past its letter up to the
/// next candidate's letter, is scored by counting fill characters. The
/// strictly greatest positive score wins; on a tie the earliest candidate
/// keeps the win. A later line for the same question replaces an earlier one.
pub fn detect_table_marks(
    text: &str,
    num_questions: usize,
    choices: &ChoiceSet,
    observer: &dyn ExtractionObserver,
) -> Vec<Option<Choice>> {
    let leading_number =
        Regex::new(r"^\s*(\d+)\s").expect("failed to build extraction regex");
    let number_prefix = Regex::new(r"^\s*\d+\s*").expect("failed to build extraction regex");

    let mut slots = vec![None; num_questions];
    for line in text.lines() {
        let Some(caps) = leading_number.captures(line) else {
            continue;
        };
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        if number < 1 || number as usize > num_questions {
            continue;
        }

        let rest = number_prefix.replace(line, "");
        let rest_chars: Vec<char> = rest.chars().collect();

        let mut candidates: Vec<(Choice, usize)> = Vec::new();
        for &letter in choices.letters() {
            if let Some(pos) = rest_chars.iter().position(|c| c.eq_ignore_ascii_case(&letter)) {
                if let Some(choice) = Choice::from_char(letter) {
                    candidates.push((choice, pos));
                }
            }
        }
        candidates.sort_by_key(|&(_, pos)| pos);

        let mut marked: Option<Choice> = None;
        let mut max_fill_score = 0usize;
        for (index, &(candidate, pos)) in candidates.iter().enumerate() {
            let segment_end = candidates
                .get(index + 1)
                .map(|&(_, next_pos)| next_pos)
                .unwrap_or(rest_chars.len());
            let segment = &rest_chars[pos + 1..segment_end];
            let fill_score = segment.iter().filter(|&&c| is_fill_char(c)).count();
            observer.on_candidate_scored(number, candidate, fill_score);
            if fill_score > max_fill_score {
                max_fill_score = fill_score;
                marked = Some(candidate);
            }
        }

        if let Some(winner) = marked {
            slots[(number - 1) as usize] = Some(winner);
            observer.on_candidate_selected(number, winner, max_fill_score);
        }
    }
    slots
}

/// Full extraction with per-slot provenance.
///
/// Runs the pattern strategies, then engages the table detector only when
/// they resolved strictly fewer than half the questions. Detector output
/// merges with [`MergePolicy::FillGaps`], so it never overwrites a pattern
/// result.
pub fn extract_answers_detailed(
    text: &str,
    num_questions: usize,
    choices: &ChoiceSet,
    observer: &dyn ExtractionObserver,
) -> Vec<ExtractedAnswer> {
    let pattern_slots = scan_patterns(text, num_questions, choices, observer);
    let mut slots = pattern_slots.clone();

    let found = slots.iter().filter(|slot| slot.is_some()).count();
    if (found as f64) < num_questions as f64 / 2.0 {
        observer.on_fallback_engaged(found, num_questions);
        let table_slots = detect_table_marks(text, num_questions, choices, observer);
        for (index, value) in table_slots.iter().enumerate() {
            if slots[index].is_none() {
                if let Some(choice) = value {
                    observer.on_gap_filled((index + 1) as u32, *choice);
                }
            }
        }
        merge_partial(&mut slots, &table_slots, MergePolicy::FillGaps);
    }

    slots
        .iter()
        .zip(&pattern_slots)
        .enumerate()
        .map(|(index, (value, from_pattern))| {
            let source = match (value, from_pattern) {
                (Some(_), Some(_)) => Some(SourceMethod::PatternScan),
                (Some(_), None) => Some(SourceMethod::TableFill),
                (None, _) => None,
            };
            ExtractedAnswer {
                question_number: (index + 1) as u32,
                value: *value,
                source,
            }
        })
        .collect()
}

/// Extraction with an observer, returning just the answer sequence.
pub fn extract_answers_with(
    text: &str,
    num_questions: usize,
    choices: &ChoiceSet,
    observer: &dyn ExtractionObserver,
) -> StudentAnswers {
    let detailed = extract_answers_detailed(text, num_questions, choices, observer);
    StudentAnswers::from_slots(detailed.into_iter().map(|entry| entry.value).collect())
}

/// Extraction without observation. This is the everyday entry point.
pub fn extract_answers(text: &str, num_questions: usize, choices: &ChoiceSet) -> StudentAnswers {
    extract_answers_with(text, num_questions, choices, &NoopObserver)
}
