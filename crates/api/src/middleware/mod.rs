//! Request extractors.
//!
//! - [`auth::Caller`] -- the authenticated caller, from a JWT bearer token.

pub mod auth;
