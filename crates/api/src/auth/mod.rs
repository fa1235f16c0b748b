//! Authentication primitives.
//!
//! - [`jwt`] -- HS256 bearer token generation and validation.

pub mod jwt;
