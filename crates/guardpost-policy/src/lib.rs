//! Guardpost Policy
//!
//! Threshold policy over classifier scores.
//!
//! A [`Policy`] names the trigger label set and the score threshold; its
//! [`Policy::decide`] is a pure function from a score vector to a boolean
//! verdict, independently testable with literal inputs. Policies can be
//! defined in YAML or fall back to the built-in default.

pub mod policy;

pub use policy::{Policy, DEFAULT_THRESHOLD, DEFAULT_TRIGGER_LABELS};
