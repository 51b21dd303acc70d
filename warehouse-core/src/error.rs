//! Error abstractions.

use thiserror::Error;

/// Application error variants.
///
/// Every variant is fatal: synthesis either completes in full or the whole
/// deployment aborts. Partial-apply and retry handling belong to the
/// provisioning engine, not to this code.
#[derive(Debug, Error)]
pub enum AppError {
    /// The given input was invalid.
    #[error("validation error: {0}")]
    InvalidInput(String),
    /// Two declarations resolved to the same name.
    #[error("naming collision: {0}")]
    NamingCollision(String),
    /// No default network was identified for the target account/region.
    #[error("no default network found: {0}")]
    MissingDefaultNetwork(String),
}
