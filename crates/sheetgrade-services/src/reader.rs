//! The sheet reader abstraction.
//!
//! Every mark-reading backend, whether a local OMR microservice or a hosted
//! vision model, implements [`SheetReader`]. Callers hold a `dyn SheetReader`
//! and never care which backend produced the answers.

use anyhow::Result;
use async_trait::async_trait;
use sheetgrade_core::model::{ChoiceSet, StudentAnswers};

/// Options for one mark-reading request.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// How many questions the sheet carries.
    pub num_questions: usize,
    /// The choice alphabet printed on the sheet.
    pub choices: ChoiceSet,
    /// Ask the backend for per-request diagnostic payloads.
    pub debug: bool,
}

impl ReadOptions {
    pub fn new(num_questions: usize, choices: ChoiceSet) -> Self {
        ReadOptions {
            num_questions,
            choices,
            debug: false,
        }
    }
}

/// Answers read off a sheet image, with reader metadata.
#[derive(Debug, Clone)]
pub struct MarkReadout {
    /// The extracted answer sequence, one slot per question.
    pub answers: StudentAnswers,
    /// Overall reader confidence in `[0, 1]`; `0` when the backend has none.
    pub confidence: f64,
    /// Human-readable warnings, e.g. ambiguous or double marks.
    pub flags: Vec<String>,
    /// Raw diagnostic payload when requested via [`ReadOptions::debug`].
    pub debug: Option<serde_json::Value>,
}

/// A backend that can read marked answers off a sheet image.
#[async_trait]
pub trait SheetReader: Send + Sync {
    /// Short name for logs and error messages, e.g. `"omr"`.
    fn name(&self) -> &str;

    /// Read the marks off one sheet image.
    ///
    /// `filename` travels with the upload so backends can pick a decoder
    /// from the extension.
    async fn read_marks(
        &self,
        image: &[u8],
        filename: &str,
        options: &ReadOptions,
    ) -> Result<MarkReadout>;
}

impl std::fmt::Debug for dyn SheetReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReader")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSheetReader;
    use sheetgrade_core::model::Choice;

    #[tokio::test]
    async fn readers_dispatch_through_trait_objects() {
        let answers = StudentAnswers::from_slots(vec![Choice::from_char('A'), None]);
        let reader: Box<dyn SheetReader> = Box::new(MockSheetReader::with_answers(answers));

        assert_eq!(reader.name(), "mock");
        let options = ReadOptions::new(2, ChoiceSet::default());
        let readout = reader.read_marks(b"img", "sheet.png", &options).await.unwrap();
        assert_eq!(readout.answers.get(1), Choice::from_char('A'));
        assert_eq!(readout.answers.get(2), None);
    }
}
