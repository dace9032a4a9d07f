//! Guardpost Store
//!
//! Alert persistence over SQLite via `sqlx`.
//!
//! One table, keyed by a store-generated id, holding the flagged text, the
//! denormalized device fields used for filtering, the full device report and
//! score vector as JSON, and the detection/write timestamps. Indexes on
//! `detected_at` and `ip_address` back the paginated and filtered reads.

pub mod alert;
pub mod store;

pub use alert::{
    Alert, AlertFilter, AlertPage, AlertStats, DayCount, GroupCount, ListQuery, NewAlert,
};
pub use store::{AlertStore, MAX_BROWSER_CHARS, MAX_TEXT_CHARS};
