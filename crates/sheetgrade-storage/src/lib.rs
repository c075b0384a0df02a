//! sheetgrade-storage — JSON-file persistence.
//!
//! Stores answer keys and graded exam records as pretty-printed JSON under a
//! data directory, with a non-panicking boolean API.

pub mod store;

pub use store::{AnswerSource, ExamRecord, FileStore};
