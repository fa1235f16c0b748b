//! Pure domain logic for the race-session ingest orchestrator.
//!
//! Nothing in this crate touches the database or the network. Job state
//! rules, session-code handling, progress maps, and worker executable
//! resolution all live here so they can be tested in isolation.

pub mod error;
pub mod ingest;
pub mod progress;
pub mod session_codes;
pub mod types;
pub mod worker;
