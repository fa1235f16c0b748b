//! Domain errors shared by every pitwall crate.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No row with this id.
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: DbId },

    /// Input rejected before any side effect took place.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),
}
