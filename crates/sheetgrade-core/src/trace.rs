//! Extraction observability.
//!
//! The extraction heuristics report their decisions through the
//! [`ExtractionObserver`] trait so callers can surface or assert on them
//! without routing everything through a process-wide log.

use std::sync::Mutex;

use crate::model::Choice;

/// Callbacks for extraction decisions.
///
/// Implementations must be cheap; the heuristics call these inline.
pub trait ExtractionObserver {
    /// A textual pattern strategy matched and wrote an answer.
    fn on_pattern_hit(&self, strategy: &str, question: u32, choice: Choice);
    /// Pattern coverage fell below the activation threshold; the table
    /// detector is about to run.
    fn on_fallback_engaged(&self, found: usize, total: usize);
    /// The table detector scored one candidate letter's trailing segment.
    fn on_candidate_scored(&self, question: u32, candidate: Choice, fill_score: usize);
    /// The table detector settled on a winner for a question line.
    fn on_candidate_selected(&self, question: u32, winner: Choice, fill_score: usize);
    /// A table-detector answer filled a slot the pattern pass left empty.
    fn on_gap_filled(&self, question: u32, choice: Choice);
}

/// An observer that ignores all events.
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {
    fn on_pattern_hit(&self, _: &str, _: u32, _: Choice) {}
    fn on_fallback_engaged(&self, _: usize, _: usize) {}
    fn on_candidate_scored(&self, _: u32, _: Choice, _: usize) {}
    fn on_candidate_selected(&self, _: u32, _: Choice, _: usize) {}
    fn on_gap_filled(&self, _: u32, _: Choice) {}
}

/// A recorded extraction decision, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    PatternHit {
        strategy: String,
        question: u32,
        choice: Choice,
    },
    FallbackEngaged {
        found: usize,
        total: usize,
    },
    CandidateScored {
        question: u32,
        candidate: Choice,
        fill_score: usize,
    },
    CandidateSelected {
        question: u32,
        winner: Choice,
        fill_score: usize,
    },
    GapFilled {
        question: u32,
        choice: Choice,
    },
}

/// An observer that records every event, for tests and diagnostics.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: TraceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExtractionObserver for RecordingObserver {
    fn on_pattern_hit(&self, strategy: &str, question: u32, choice: Choice) {
        self.push(TraceEvent::PatternHit {
            strategy: strategy.to_string(),
            question,
            choice,
        });
    }

    fn on_fallback_engaged(&self, found: usize, total: usize) {
        self.push(TraceEvent::FallbackEngaged { found, total });
    }

    fn on_candidate_scored(&self, question: u32, candidate: Choice, fill_score: usize) {
        self.push(TraceEvent::CandidateScored {
            question,
            candidate,
            fill_score,
        });
    }

    fn on_candidate_selected(&self, question: u32, winner: Choice, fill_score: usize) {
        self.push(TraceEvent::CandidateSelected {
            question,
            winner,
            fill_score,
        });
    }

    fn on_gap_filled(&self, question: u32, choice: Choice) {
        self.push(TraceEvent::GapFilled { question, choice });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(c: char) -> Choice {
        Choice::from_char(c).unwrap()
    }

    #[test]
    fn recording_observer_keeps_emission_order() {
        let observer = RecordingObserver::new();
        observer.on_pattern_hit("number-then-letter", 1, choice('A'));
        observer.on_fallback_engaged(1, 10);
        observer.on_gap_filled(2, choice('B'));

        let events = observer.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            TraceEvent::PatternHit {
                strategy: "number-then-letter".to_string(),
                question: 1,
                choice: choice('A'),
            }
        );
        assert_eq!(events[1], TraceEvent::FallbackEngaged { found: 1, total: 10 });
        assert_eq!(
            events[2],
            TraceEvent::GapFilled {
                question: 2,
                choice: choice('B'),
            }
        );
    }

    #[test]
    fn observers_are_object_safe() {
        let observers: Vec<Box<dyn ExtractionObserver>> =
            vec![Box::new(NoopObserver), Box::new(RecordingObserver::new())];
        for observer in &observers {
            observer.on_candidate_scored(1, choice('C'), 2);
        }
    }
}
