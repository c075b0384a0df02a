//! sheetgrade-core — Extraction heuristics and grading engine.
//!
//! This crate defines the fundamental data model, the OCR-text answer
//! extraction pipeline, and the scoring logic that the entire sheetgrade
//! system builds on.

pub mod extract;
pub mod grade;
pub mod keyfile;
pub mod model;
pub mod trace;
