//! Mock sheet reader for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use sheetgrade_core::model::StudentAnswers;

use crate::reader::{MarkReadout, ReadOptions, SheetReader};

/// A mock sheet reader for testing grading flows without a live backend.
///
/// Returns a fixed readout and records how it was called.
pub struct MockSheetReader {
    /// The canned readout every call returns.
    readout: MarkReadout,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last options received.
    last_options: Mutex<Option<ReadOptions>>,
}

impl MockSheetReader {
    /// Create a mock that always returns the given readout.
    pub fn with_readout(readout: MarkReadout) -> Self {
        Self {
            readout,
            call_count: AtomicU32::new(0),
            last_options: Mutex::new(None),
        }
    }

    /// Create a mock that returns the given answers at full confidence.
    pub fn with_answers(answers: StudentAnswers) -> Self {
        Self::with_readout(MarkReadout {
            answers,
            confidence: 1.0,
            flags: Vec::new(),
            debug: None,
        })
    }

    /// Get the number of calls made to this reader.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the options passed to the most recent call.
    pub fn last_options(&self) -> Option<ReadOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetReader for MockSheetReader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read_marks(
        &self,
        _image: &[u8],
        _filename: &str,
        options: &ReadOptions,
    ) -> anyhow::Result<MarkReadout> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_options.lock().unwrap() = Some(options.clone());
        Ok(self.readout.clone())
    }
}
