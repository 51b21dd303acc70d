//! Shared declarative types for the data-warehouse stack.
//!
//! Everything in this crate is plain configuration data: the identity of a
//! deployment, the per-pipeline ingestion config handed to the Skippr
//! container, and the static permission grant set attached to the ingestion
//! role. The `warehouse-stack` crate turns these records into a
//! CloudFormation resource graph.

pub mod context;
pub mod error;
pub mod grants;
pub mod pipeline;

pub use error::AppError;
