//! CloudFormation synthesis for the data-warehouse ingestion stack.
//!
//! This crate builds the declarative resource graph for a Skippr-based data
//! warehouse: shared network and cluster infrastructure, one Fargate
//! ingestion workload per configured pipeline, and the data-lake bucket the
//! pipelines write to. The graph is built in one synchronous pass and
//! serialized as a CloudFormation template; CloudFormation owns ordering,
//! retries and rollback of the actual resource creation.
//!
//! NOTE WELL: the data-lake bucket, log groups and buffer filesystems are
//! declared with `DeletionPolicy: Delete`, so tearing the stack down destroys
//! ingested data. Production deployments will want a retain policy instead.

pub mod cfn;
pub mod config;
pub mod infra;
pub mod skippr;
pub mod stack;
