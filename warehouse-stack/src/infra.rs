//! Shared infrastructure for the data-warehouse stack.
//!
//! Declared once per deployment and consumed by reference from every
//! pipeline workload: the two security groups and the Fargate cluster, all
//! placed in the account's existing default VPC.
//!
//! The two groups are deliberately asymmetric: the ingestion group accepts
//! HTTPS from anywhere and may send anywhere, while the storage group only
//! ever talks within the VPC's own address block.

use anyhow::Result;

use warehouse_core::context::DeployContext;

use crate::cfn::{ec2, ecs, Expr, LogicalId, Resource, ResourceSpec, Template};

/// Port used by Skippr to sync metadata with Skippr.io.
const PORT_HTTPS: i64 = 443;
/// Port used by the ingestion containers to reach the buffer filesystem.
const PORT_NFS: i64 = 2049;

/// Handles to the shared infrastructure consumed by every pipeline workload.
#[derive(Clone, Debug)]
pub struct SharedInfra {
    /// The access-control group attached to ingestion services.
    pub ingestion_sg: LogicalId,
    /// The access-control group attached to filesystem mount targets.
    pub efs_sg: LogicalId,
    /// The compute cluster the ingestion services run on.
    pub cluster: LogicalId,
}

/// Declare the shared infrastructure into the given template.
pub fn build_shared_infra(template: &mut Template, context: &DeployContext) -> Result<SharedInfra> {
    tracing::debug!(logical_name = %context.logical_name, "declaring shared infrastructure");
    let workspace = context.workspace_name();
    let vpc = &context.network;

    let ingestion_sg = template.add(
        &format!("{}-skippr-ingestion-sg", workspace),
        Resource::new(ResourceSpec::Ec2SecurityGroup(ec2::SecurityGroup {
            group_name: "skippr-ingestion-sg".into(),
            group_description: "Skippr comms with Skippr.io to sync metadata".into(),
            vpc_id: Expr::from(vpc.default_vpc_id.as_str()),
            security_group_ingress: vec![ec2::Rule::tcp(PORT_HTTPS, ec2::ANY_IPV4, "HTTPS from Skippr.io")],
            // Ingestion syncs data from external systems such as public S3
            // endpoints, so the group allows all outbound traffic.
            security_group_egress: vec![ec2::Rule::allow_all_outbound()],
            tags: vec![],
        })),
    )?;

    let efs_sg = template.add(
        &format!("{}-skippr-efs-ssg", workspace),
        Resource::new(ResourceSpec::Ec2SecurityGroup(ec2::SecurityGroup {
            group_name: "skippr-efs-ssg".into(),
            group_description: "Skippr comms with EFS".into(),
            vpc_id: Expr::from(vpc.default_vpc_id.as_str()),
            security_group_ingress: vec![ec2::Rule::tcp(
                PORT_NFS,
                &vpc.default_vpc_cidr,
                "EFS port from Skippr ECS containers",
            )],
            security_group_egress: vec![ec2::Rule::all_tcp(&vpc.default_vpc_cidr, "Out to local network")],
            tags: vec![],
        })),
    )?;

    let cluster = template.add(
        &format!("{}-skippr-ecs-fargate-cluster", workspace),
        Resource::new(ResourceSpec::EcsCluster(ecs::Cluster {
            capacity_providers: vec!["FARGATE".into(), "FARGATE_SPOT".into()],
            tags: vec![],
        })),
    )?;

    Ok(SharedInfra {
        ingestion_sg,
        efs_sg,
        cluster,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use warehouse_core::context::NetworkConfig;

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

    fn security_group<'a>(template: &'a Template, id: &LogicalId) -> &'a ec2::SecurityGroup {
        match &template.resources[id].spec {
            ResourceSpec::Ec2SecurityGroup(sg) => sg,
            other => panic!("expected a security group, got {:?}", other),
        }
    }

    #[test]
    fn ingestion_group_is_open_https_in_and_all_out() {
        let mut template = Template::new("test");
        let infra = build_shared_infra(&mut template, &context()).unwrap();
        let sg = security_group(&template, &infra.ingestion_sg);

        assert_eq!(sg.security_group_ingress.len(), 1);
        let ingress = &sg.security_group_ingress[0];
        assert_eq!(ingress.ip_protocol, "tcp");
        assert_eq!(ingress.from_port, Some(443));
        assert_eq!(ingress.to_port, Some(443));
        assert_eq!(ingress.cidr_ip, "0.0.0.0/0");

        assert_eq!(sg.security_group_egress, vec![ec2::Rule::allow_all_outbound()]);
    }

    #[test]
    fn storage_group_is_confined_to_the_vpc_block() {
        let mut template = Template::new("test");
        let infra = build_shared_infra(&mut template, &context()).unwrap();
        let sg = security_group(&template, &infra.efs_sg);

        assert_eq!(sg.security_group_ingress.len(), 1);
        let ingress = &sg.security_group_ingress[0];
        assert_eq!(ingress.from_port, Some(2049));
        assert_eq!(ingress.cidr_ip, "172.31.0.0/16");

        assert_eq!(sg.security_group_egress.len(), 1);
        let egress = &sg.security_group_egress[0];
        assert_eq!(egress.cidr_ip, "172.31.0.0/16");
        assert_eq!((egress.from_port, egress.to_port), (Some(0), Some(65535)));

        // The storage group must never reference the any-address block.
        let mut rules = sg.security_group_ingress.iter().chain(&sg.security_group_egress);
        assert!(rules.all(|rule| rule.cidr_ip != ec2::ANY_IPV4));
    }

    #[test]
    fn cluster_enables_fargate_capacity_providers() {
        let mut template = Template::new("test");
        let infra = build_shared_infra(&mut template, &context()).unwrap();
        match &template.resources[&infra.cluster].spec {
            ResourceSpec::EcsCluster(cluster) => {
                assert_eq!(cluster.capacity_providers, vec!["FARGATE", "FARGATE_SPOT"]);
            }
            other => panic!("expected a cluster, got {:?}", other),
        }
    }

    #[test]
    fn group_names_are_stable_across_workspaces() {
        let mut template = Template::new("test");
        let infra = build_shared_infra(&mut template, &context()).unwrap();
        assert_eq!(security_group(&template, &infra.ingestion_sg).group_name, "skippr-ingestion-sg");
        assert_eq!(security_group(&template, &infra.efs_sg).group_name, "skippr-efs-ssg");
        assert_eq!(infra.ingestion_sg.as_str(), "FooSkipprIngestionSg");
    }
}
