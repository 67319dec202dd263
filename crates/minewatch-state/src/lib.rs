//! minewatch-state — persisted run state for minewatch.
//!
//! The whole engine state lives in one JSON document: a map from site
//! name to [`SiteState`] plus the time of the last aggregate report. It is
//! read once when a run starts and replaced atomically when the run ends,
//! under an exclusive [`RunLock`], so an interrupted run leaves the
//! previous document untouched.
//!
//! # Compatibility
//!
//! Every field has a documented default, unknown keys are ignored, and
//! the flat single-site layout written by earlier versions loads as the
//! one-entry case of the multi-site map.

pub mod error;
pub mod lock;
pub mod store;
pub mod timestamp;
pub mod types;

pub use error::{StateError, StateResult};
pub use lock::RunLock;
pub use store::StateStore;
pub use types::*;
