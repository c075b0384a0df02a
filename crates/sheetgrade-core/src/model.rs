//! Core data model types for sheetgrade.
//!
//! These are the fundamental types the whole system passes around:
//! answer keys, student answer sequences, and grading results.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A single answer letter, normalized to uppercase at construction.
///
/// Any ASCII letter is a valid `Choice`: the grading path compares whatever
/// letters it is given, while the [`ChoiceSet`] restricts which letters the
/// extraction heuristics will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Choice(char);

impl Choice {
    /// Build a choice from a single letter, normalizing case.
    /// Returns `None` for anything that is not an ASCII letter.
    pub fn from_char(c: char) -> Option<Self> {
        c.is_ascii_alphabetic().then(|| Choice(c.to_ascii_uppercase()))
    }

    /// The uppercase letter.
    pub fn letter(&self) -> char {
        self.0
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Choice::from_char(c).ok_or_else(|| format!("invalid choice letter: {s:?}"))
            }
            _ => Err(format!("invalid choice letter: {s:?}")),
        }
    }
}

impl Serialize for Choice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Choice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// The ordered alphabet of letters a sheet offers for each question.
///
/// Order matters: the table-format detector scans for letters in set order,
/// and the OMR wire format sends the list as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    letters: Vec<char>,
}

impl ChoiceSet {
    /// The letters in declaration order, all uppercase.
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, c: char) -> bool {
        self.letters.iter().any(|l| l.eq_ignore_ascii_case(&c))
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

impl Default for ChoiceSet {
    /// The conventional five-choice alphabet `A..E`.
    fn default() -> Self {
        ChoiceSet {
            letters: vec!['A', 'B', 'C', 'D', 'E'],
        }
    }
}

impl fmt::Display for ChoiceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.letters {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl FromStr for ChoiceSet {
    type Err = String;

    /// Parses `"ABCDE"` or `"A,B,C,D,E"`; commas and whitespace are separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut letters = Vec::new();
        for c in s.chars() {
            if c == ',' || c.is_whitespace() {
                continue;
            }
            if !c.is_ascii_alphabetic() {
                return Err(format!("invalid choice letter: {c:?}"));
            }
            let upper = c.to_ascii_uppercase();
            if letters.contains(&upper) {
                return Err(format!("duplicate choice letter: {upper}"));
            }
            letters.push(upper);
        }
        if letters.is_empty() {
            return Err("choice set must contain at least one letter".to_string());
        }
        Ok(ChoiceSet { letters })
    }
}

/// One question of an answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// 1-based question number.
    pub number: u32,
    /// The expected choice letter.
    pub correct_answer: Choice,
    /// Points awarded when answered correctly.
    pub weight: f64,
}

/// The authoritative set of correct choices and weights for one exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerKey {
    /// Unique identifier for this key.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The questions, conventionally numbered `1..N`.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Percentage required to pass, in `[0, 100]`.
    #[serde(default = "default_min_passing_score")]
    pub min_passing_score: f64,
    /// Set by the persistence layer on first save.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the persistence layer on every save.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub(crate) fn default_min_passing_score() -> f64 {
    crate::grade::DEFAULT_MIN_PASSING_SCORE
}

impl AnswerKey {
    /// Sum of all question weights.
    pub fn total_weight(&self) -> f64 {
        self.questions.iter().map(|q| q.weight).sum()
    }

    /// Number of questions in this key.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Which heuristic resolved an extracted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    /// One of the ordered textual pattern strategies matched.
    PatternScan,
    /// The table-format detector scored a filled mark.
    TableFill,
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMethod::PatternScan => write!(f, "pattern-scan"),
            SourceMethod::TableFill => write!(f, "table-fill"),
        }
    }
}

/// One extracted slot with its provenance. Intermediate only, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractedAnswer {
    /// 1-based question number.
    pub question_number: u32,
    /// The extracted letter, or `None` when no heuristic resolved the slot.
    pub value: Option<Choice>,
    /// The heuristic that produced `value`; `None` when unresolved.
    pub source: Option<SourceMethod>,
}

/// A fixed-length sequence of per-question answers.
///
/// Slot `i` corresponds to question number `i + 1`. Unanswered questions are
/// `None` and grade as automatic misses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentAnswers {
    slots: Vec<Option<Choice>>,
}

impl StudentAnswers {
    /// A sequence of `num_questions` blank slots.
    pub fn blank(num_questions: usize) -> Self {
        StudentAnswers {
            slots: vec![None; num_questions],
        }
    }

    pub fn from_slots(slots: Vec<Option<Choice>>) -> Self {
        StudentAnswers { slots }
    }

    /// Build a sequence of length `num_questions` from `(question, choice)`
    /// pairs. Pairs outside `1..=num_questions` are ignored; later pairs for
    /// the same question replace earlier ones.
    pub fn from_pairs<I>(pairs: I, num_questions: usize) -> Self
    where
        I: IntoIterator<Item = (u32, Choice)>,
    {
        let mut slots = vec![None; num_questions];
        for (number, choice) in pairs {
            if number >= 1 && (number as usize) <= num_questions {
                slots[(number - 1) as usize] = Some(choice);
            }
        }
        StudentAnswers { slots }
    }

    /// Parse free text that is expected to contain a JSON object mapping
    /// question numbers to letters, e.g. `{"1": "B", "2": "C"}`.
    ///
    /// The outermost brace pair is taken, so surrounding prose is tolerated.
    /// Unknown keys and values that are not a single letter are skipped;
    /// absent or `null` entries stay blank.
    pub fn from_json_text(text: &str, num_questions: usize) -> Result<Self, String> {
        let start = text
            .find('{')
            .ok_or_else(|| "no JSON object found in response text".to_string())?;
        let end = text
            .rfind('}')
            .filter(|&end| end > start)
            .ok_or_else(|| "no JSON object found in response text".to_string())?;
        let body = &text[start..=end];

        let map: std::collections::HashMap<String, Option<String>> =
            serde_json::from_str(body).map_err(|e| format!("invalid answer JSON: {e}"))?;

        let pairs = map.iter().filter_map(|(key, value)| {
            let number = key.trim().parse::<u32>().ok()?;
            let choice = value.as_deref()?.trim().parse::<Choice>().ok()?;
            Some((number, choice))
        });
        Ok(Self::from_pairs(pairs, num_questions))
    }

    /// Parse a manually entered answer list into a sequence of length
    /// `num_questions`.
    ///
    /// Accepts comma-separated tokens (`"A,B,,D"`) or a compact letter run
    /// (`"AB-D"`). An empty token, `-` or `_` marks a blank slot. Fewer
    /// entries than `num_questions` pad with blanks; more is an error.
    pub fn parse_list(input: &str, num_questions: usize) -> Result<Self, String> {
        let trimmed = input.trim();
        let mut slots = Vec::new();

        if trimmed.contains(',') {
            for token in trimmed.split(',') {
                let token = token.trim();
                if token.is_empty() || token == "-" || token == "_" {
                    slots.push(None);
                } else {
                    slots.push(Some(token.parse::<Choice>()?));
                }
            }
        } else {
            for c in trimmed.chars() {
                if c.is_whitespace() {
                    continue;
                }
                if c == '-' || c == '_' {
                    slots.push(None);
                } else if let Some(choice) = Choice::from_char(c) {
                    slots.push(Some(choice));
                } else {
                    return Err(format!("invalid answer character: {c:?}"));
                }
            }
        }

        if slots.len() > num_questions {
            return Err(format!(
                "too many answers: got {}, expected at most {num_questions}",
                slots.len()
            ));
        }
        slots.resize(num_questions, None);
        Ok(StudentAnswers { slots })
    }

    /// Answer for a 1-based question number; `None` when blank or out of range.
    pub fn get(&self, question_number: u32) -> Option<Choice> {
        let index = question_number.checked_sub(1)? as usize;
        self.slots.get(index).copied().flatten()
    }

    /// The raw slots, in question order.
    pub fn slots(&self) -> &[Option<Choice>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// How many slots hold an answer.
    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// The outcome for one graded question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    /// 1-based question number.
    pub question_number: u32,
    /// The expected letter from the key.
    pub correct_answer: Choice,
    /// What the student answered; serialized as the literal `"N/A"` when blank.
    #[serde(with = "answer_or_na")]
    pub student_answer: Option<Choice>,
    /// Exact match against the key, no partial credit.
    pub is_correct: bool,
    /// The question's weight from the key.
    pub weight: f64,
    /// `weight` when correct, `0` otherwise.
    pub score: f64,
}

/// A complete graded submission.
///
/// `total_score`, `max_score` and `percentage` carry two-decimal rounding;
/// accumulation happens unrounded before they are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    /// Per-question outcomes, in key order.
    pub results: Vec<QuestionResult>,
    /// Points earned.
    pub total_score: f64,
    /// Points available (sum of weights).
    pub max_score: f64,
    /// `total_score / max_score * 100`, or `0` when `max_score` is `0`.
    pub percentage: f64,
    /// Number of correct answers.
    pub correct_count: usize,
    /// Number of questions in the key.
    pub total_questions: usize,
}

/// Serde helper mapping a blank answer to the `"N/A"` placeholder.
mod answer_or_na {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Choice;

    pub fn serialize<S>(value: &Option<Choice>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(choice) => choice.serialize(serializer),
            None => serializer.serialize_str("N/A"),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Choice>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == "N/A" {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(de::Error::custom)
    }
}
