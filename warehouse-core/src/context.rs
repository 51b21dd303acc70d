//! Deployment context.
//!
//! The account/region/name identity of one deployment, plus the handles of
//! the existing default network it deploys into. The context is built once
//! from the process environment and passed explicitly into every build call;
//! nothing reads it from ambient state.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::error::AppError;

/// The identity of one deployment of the data-warehouse stack.
#[derive(Clone, Debug, PartialEq)]
pub struct DeployContext {
    /// The AWS account targeted by this deployment.
    pub aws_account_id: String,
    /// The AWS region targeted by this deployment.
    pub aws_region: String,
    /// The logical name of the stack.
    ///
    /// Its lowercased form prefixes every construct name and doubles as the
    /// workspace name handed to the ingestion containers.
    pub logical_name: String,
    /// Handles of the default network in the target account/region.
    pub network: NetworkConfig,
}

/// The resolved identity of the account's default VPC.
///
/// CloudFormation cannot look up "the default VPC" on its own, so the
/// resolved handles are supplied up front. A deployment without a default
/// VPC is a precondition failure, reported fatally and never retried.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// The id of the default VPC.
    pub default_vpc_id: String,
    /// The default VPC's own address block.
    pub default_vpc_cidr: String,
    /// The public subnets of the default VPC, comma-separated in the
    /// environment.
    pub public_subnet_ids: Vec<String>,
}

/// The environment-sourced slice of the deploy context.
#[derive(Deserialize)]
struct DeployEnv {
    aws_account_id: String,
    aws_region: String,
    logical_name: String,
}

impl DeployContext {
    /// Build the deployment context from the process environment.
    pub fn from_env() -> Result<Self> {
        let env: DeployEnv = envy::from_env().context("error building deploy context from env")?;
        let network: NetworkConfig = envy::from_env().context("error building network config from env")?;
        Ok(Self {
            aws_account_id: env.aws_account_id,
            aws_region: env.aws_region,
            logical_name: env.logical_name,
            network,
        })
    }

    /// The workspace name: the lowercased logical name.
    ///
    /// Prefixes pipeline names so that schemas stay separated across
    /// environments sharing one Skippr account.
    pub fn workspace_name(&self) -> String {
        self.logical_name.to_lowercase()
    }

    /// Validate the context ahead of synthesis.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.aws_account_id.is_empty(),
            AppError::InvalidInput("AWS_ACCOUNT_ID must not be empty".into())
        );
        ensure!(
            !self.aws_region.is_empty(),
            AppError::InvalidInput("AWS_REGION must not be empty".into())
        );
        ensure!(
            !self.logical_name.is_empty()
                && self.logical_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
            AppError::InvalidInput(format!(
                "LOGICAL_NAME {:?} must be non-empty alphanumeric/hyphen, as it is embedded in resource names",
                self.logical_name
            ))
        );
        self.network.validate()
    }
}

impl NetworkConfig {
    /// Validate the network handles ahead of synthesis.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.default_vpc_id.is_empty(),
            AppError::MissingDefaultNetwork("DEFAULT_VPC_ID must identify an existing default VPC".into())
        );
        ensure!(
            self.default_vpc_cidr.contains('/'),
            AppError::MissingDefaultNetwork(format!(
                "DEFAULT_VPC_CIDR {:?} must be the default VPC's CIDR block",
                self.default_vpc_cidr
            ))
        );
        ensure!(
            !self.public_subnet_ids.is_empty() && self.public_subnet_ids.iter().all(|id| !id.is_empty()),
            AppError::MissingDefaultNetwork("PUBLIC_SUBNET_IDS must list the default VPC's public subnets".into())
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> DeployContext {
        DeployContext {
            aws_account_id: "000000000000".into(),
            aws_region: "us-east-1".into(),
            logical_name: "Foo".into(),
            network: NetworkConfig {
                default_vpc_id: "vpc-0a1b2c3d".into(),
                default_vpc_cidr: "172.31.0.0/16".into(),
                public_subnet_ids: vec!["subnet-aaa".into(), "subnet-bbb".into()],
            },
        }
    }

    #[test]
    fn valid_context_passes_validation() {
        assert!(context().validate().is_ok());
    }

    #[test]
    fn workspace_name_is_lowercased_logical_name() {
        assert_eq!(context().workspace_name(), "foo");
    }

    #[test]
    fn missing_default_vpc_is_a_precondition_failure() {
        let mut ctx = context();
        ctx.network.default_vpc_id.clear();
        let err = ctx.validate().unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::MissingDefaultNetwork(_))));
    }

    #[test]
    fn cidr_must_be_an_address_block() {
        let mut ctx = context();
        ctx.network.default_vpc_cidr = "172.31.0.0".into();
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn at_least_one_public_subnet_is_required() {
        let mut ctx = context();
        ctx.network.public_subnet_ids.clear();
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn logical_name_charset_is_restricted() {
        let mut ctx = context();
        ctx.logical_name = "Foo Bar".into();
        let err = ctx.validate().unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::InvalidInput(_))));
    }
}
