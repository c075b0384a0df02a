//! sheetgrade-services — Sheet reader backends.
//!
//! Implements the `SheetReader` trait for the OMR service and an AI vision
//! model, allowing sheetgrade to pull answers off sheet photos from multiple
//! backends.

pub mod config;
pub mod error;
pub mod mock;
pub mod omr;
pub mod reader;
pub mod vision;

pub use config::{create_reader, load_config, load_config_from, SheetgradeConfig};
pub use error::ServiceError;
pub use reader::{MarkReadout, ReadOptions, SheetReader};
