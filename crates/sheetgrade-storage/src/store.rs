//! JSON-file store for answer keys and exam results.
//!
//! A thin persistence layer over two pretty-printed JSON files in a data
//! directory. All public operations return booleans or empty collections
//! instead of errors; causes go to the `tracing` error log.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sheetgrade_core::model::{AnswerKey, GradeResult};

const ANSWER_KEYS_FILE: &str = "answer_keys.json";
const RESULTS_FILE: &str = "results.json";

/// Where a graded submission's answers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Typed in by hand.
    Manual,
    /// Extracted from an OCR text dump.
    OcrText,
    /// Read off a sheet photo by the OMR service.
    Omr,
    /// Read off a sheet photo by the AI vision model.
    Vision,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerSource::Manual => write!(f, "manual"),
            AnswerSource::OcrText => write!(f, "ocr_text"),
            AnswerSource::Omr => write!(f, "omr"),
            AnswerSource::Vision => write!(f, "vision"),
        }
    }
}

/// One stored grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRecord {
    /// Unique record id.
    pub id: Uuid,
    /// Id of the answer key the submission was graded against.
    pub key_id: String,
    /// Name of that key at grading time.
    pub key_name: String,
    /// How the answers were obtained.
    pub source: AnswerSource,
    /// The full grading outcome.
    pub grade: GradeResult,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ExamRecord {
    /// Build a record for a submission graded against `key`.
    pub fn new(key: &AnswerKey, source: AnswerSource, grade: GradeResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_id: key.id.clone(),
            key_name: key.name.clone(),
            source,
            grade,
            created_at: Utc::now(),
        }
    }
}

/// File-backed store rooted at a data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// All stored answer keys. Empty on a missing or unreadable file.
    pub fn list_answer_keys(&self) -> Vec<AnswerKey> {
        match self.read_list(ANSWER_KEYS_FILE) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("failed to load answer keys: {e:#}");
                Vec::new()
            }
        }
    }

    /// Look up one answer key by id.
    pub fn answer_key(&self, id: &str) -> Option<AnswerKey> {
        self.list_answer_keys().into_iter().find(|k| k.id == id)
    }

    /// Insert or replace an answer key by id.
    ///
    /// Stamps `updated_at`; `created_at` is kept from the stored copy when the
    /// id already exists, otherwise set now.
    pub fn save_answer_key(&self, key: &AnswerKey) -> bool {
        let mut keys = self.list_answer_keys();
        let now = Utc::now();

        let mut stamped = key.clone();
        stamped.updated_at = Some(now);
        stamped.created_at = keys
            .iter()
            .find(|k| k.id == stamped.id)
            .and_then(|k| k.created_at)
            .or(stamped.created_at)
            .or(Some(now));

        match keys.iter_mut().find(|k| k.id == stamped.id) {
            Some(slot) => *slot = stamped,
            None => keys.push(stamped),
        }

        match self.write_list(ANSWER_KEYS_FILE, &keys) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to save answer key: {e:#}");
                false
            }
        }
    }

    /// Remove an answer key. Succeeds whether or not the id existed.
    pub fn delete_answer_key(&self, id: &str) -> bool {
        let mut keys = self.list_answer_keys();
        keys.retain(|k| k.id != id);
        match self.write_list(ANSWER_KEYS_FILE, &keys) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to delete answer key: {e:#}");
                false
            }
        }
    }

    /// All stored exam records, newest first.
    pub fn list_results(&self) -> Vec<ExamRecord> {
        match self.read_list(RESULTS_FILE) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("failed to load results: {e:#}");
                Vec::new()
            }
        }
    }

    /// Prepend a record, keeping the list newest first.
    pub fn save_result(&self, record: &ExamRecord) -> bool {
        let mut records = self.list_results();
        records.insert(0, record.clone());
        match self.write_list(RESULTS_FILE, &records) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to save result: {e:#}");
                false
            }
        }
    }

    /// Delete every stored exam record.
    pub fn clear_results(&self) -> bool {
        match std::fs::remove_file(self.root.join(RESULTS_FILE)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::error!("failed to clear results: {e:#}");
                false
            }
        }
    }

    fn read_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    fn write_list<T: Serialize>(&self, file: &str, items: &[T]) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.root.join(file);
        let content = serde_json::to_string_pretty(items)?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgrade_core::grade::calculate_grade;
    use sheetgrade_core::model::{Choice, Question, StudentAnswers};

    fn sample_key(id: &str) -> AnswerKey {
        AnswerKey {
            id: id.to_string(),
            name: "Midterm A".to_string(),
            questions: vec![
                Question {
                    number: 1,
                    correct_answer: Choice::from_char('A').unwrap(),
                    weight: 10.0,
                },
                Question {
                    number: 2,
                    correct_answer: Choice::from_char('C').unwrap(),
                    weight: 10.0,
                },
            ],
            min_passing_score: 60.0,
            created_at: None,
            updated_at: None,
        }
    }

    fn sample_record(key: &AnswerKey) -> ExamRecord {
        let answers = StudentAnswers::from_slots(vec![Choice::from_char('A'), None]);
        let grade = calculate_grade(&answers, key);
        ExamRecord::new(key, AnswerSource::Manual, grade)
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.save_answer_key(&sample_key("mid-a")));

        let keys = store.list_answer_keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].created_at.is_some());
        assert!(keys[0].updated_at.is_some());

        let found = store.answer_key("mid-a").unwrap();
        assert_eq!(found.name, "Midterm A");
        assert!(store.answer_key("other").is_none());
    }

    #[test]
    fn upsert_keeps_created_at_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.save_answer_key(&sample_key("mid-a")));
        let created = store.answer_key("mid-a").unwrap().created_at.unwrap();

        let mut updated = sample_key("mid-a");
        updated.name = "Midterm A (v2)".to_string();
        assert!(store.save_answer_key(&updated));

        let keys = store.list_answer_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "Midterm A (v2)");
        assert_eq!(keys[0].created_at.unwrap(), created);
    }

    #[test]
    fn delete_tolerates_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.save_answer_key(&sample_key("mid-a")));
        assert!(store.delete_answer_key("nope"));
        assert_eq!(store.list_answer_keys().len(), 1);

        assert!(store.delete_answer_key("mid-a"));
        assert!(store.list_answer_keys().is_empty());
    }

    #[test]
    fn results_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = sample_key("mid-a");

        let first = sample_record(&key);
        let second = sample_record(&key);
        assert!(store.save_result(&first));
        assert!(store.save_result(&second));

        let records = store.list_results();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
        assert_eq!(records[0].grade.percentage, 50.0);
    }

    #[test]
    fn clear_results_succeeds_with_and_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.clear_results());

        let key = sample_key("mid-a");
        assert!(store.save_result(&sample_record(&key)));
        assert!(store.clear_results());
        assert!(store.list_results().is_empty());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ANSWER_KEYS_FILE), "not json at all").unwrap();

        let store = FileStore::new(dir.path());
        assert!(store.list_answer_keys().is_empty());
    }

    #[test]
    fn missing_data_directory_is_created_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("data");
        let store = FileStore::new(&nested);

        assert!(store.list_answer_keys().is_empty());
        assert!(store.save_answer_key(&sample_key("mid-a")));
        assert!(nested.join(ANSWER_KEYS_FILE).exists());
    }

    #[test]
    fn exam_record_serde_round_trip() {
        let key = sample_key("mid-a");
        let record = sample_record(&key);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"manual\""));
        let back: ExamRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.source, AnswerSource::Manual);
        assert_eq!(back.grade.total_questions, 2);
    }
}
