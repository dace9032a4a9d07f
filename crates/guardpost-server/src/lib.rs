//! Guardpost Server
//!
//! The moderation orchestrator and its HTTP surface.
//!
//! Per request: classify the text, evaluate the policy, and on a violation
//! persist an alert and dispatch a notification — both best-effort relative
//! to the response. The read side exposes paginated, filtered, and
//! aggregated alert queries.

pub mod config;
pub mod moderation;
pub mod routes;
pub mod state;

pub use moderation::{moderate, ModerateRequest, ModerationOutcome, PERSIST_WAIT};
pub use routes::create_router;
pub use state::AppState;
