//! Guardpost Core
//!
//! Core types and error handling shared across Guardpost components.
//!
//! This crate provides:
//! - The classifier output type ([`LabelScore`])
//! - The typed device metadata report ([`DeviceReport`])
//! - Detection-timestamp parsing with receipt-time fallback
//! - The shared error taxonomy ([`Error`], [`Result`])

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{parse_detection_timestamp, truncate_chars, DeviceReport, LabelScore, UNKNOWN};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{DeviceReport, LabelScore};
}
