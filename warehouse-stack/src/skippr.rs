//! Skippr ingestion workload.
//!
//! Declares the complete running unit for one pipeline: log destination,
//! ingest role with its fixed grant set, the EFS buffer filesystem, the
//! Fargate task definition, and the service keeping exactly one task alive
//! on discounted capacity.

use anyhow::Result;
use maplit::btreemap;

use warehouse_core::context::DeployContext;
use warehouse_core::grants::INGEST_GRANTS;
use warehouse_core::pipeline::PipelineConfig;

use crate::cfn::{ecs, efs, iam, logs, DeletionPolicy, Expr, Resource, ResourceSpec, Tag, Template};
use crate::infra::SharedInfra;

/// The in-container path where the buffer filesystem is mounted.
///
/// NOTE WELL: `DATA_DIR` in the container environment is a relative path
/// under this mount. Do not change one without the other.
const CONTAINER_DATA_PATH: &str = "/data";
/// The name of the ingest container within the task definition.
const CONTAINER_NAME_SKIPPR_INGEST: &str = "skippr-ingest";
/// Graceful stop allowance for the ingest container, in seconds.
const STOP_TIMEOUT_SECONDS: i64 = 120;
/// The ingest task's CPU allocation, in CPU units (1024 = 1 vCPU).
const TASK_CPU_UNITS: &str = "1024";
/// The ingest task's memory limit, in MiB.
const TASK_MEMORY_MIB: &str = "2048";
/// Raised open-file limits: Skippr multiplexes many file handles while
/// buffering, and the platform default of 1024 starves it.
const NOFILE_SOFT_LIMIT: i64 = 50_000;
const NOFILE_HARD_LIMIT: i64 = 100_000;
/// Log retention of pipeline log groups, in days.
const LOG_RETENTION_DAYS: i64 = 14;
/// The Fargate platform version services are pinned to.
const FARGATE_PLATFORM_VERSION: &str = "1.4.0";

/// Declare the full workload of one pipeline into the given template.
///
/// `datalake_bucket` is the composition-owned output bucket every pipeline
/// writes to.
pub fn build_skippr_pipeline(
    template: &mut Template, context: &DeployContext, infra: &SharedInfra, pipeline: &PipelineConfig,
    datalake_bucket: &str,
) -> Result<()> {
    tracing::debug!(pipeline = %pipeline.pipeline_name, "declaring skippr ingestion workload");
    let workspace = context.workspace_name();
    let name = &pipeline.pipeline_name;

    let log_group_name = format!("data-warehouse-{}", name);
    let log_group = template.add(
        &format!("{}-{}-skippr-log-group", workspace, name),
        Resource::new(ResourceSpec::LogsLogGroup(logs::LogGroup {
            log_group_name: log_group_name.clone(),
            retention_in_days: LOG_RETENTION_DAYS,
            tags: vec![Tag::component("Skippr Jobs")],
        }))
        .deletion_policy(DeletionPolicy::Delete),
    )?;

    let log_stream_name = format!("{}-skippr-ingest", name);
    template.add(
        &format!("{}-{}-skippr-ingest-log-stream", workspace, name),
        Resource::new(ResourceSpec::LogsLogStream(logs::LogStream {
            log_group_name: Expr::reference(&log_group),
            log_stream_name: log_stream_name.clone(),
        })),
    )?;

    let role = template.add(
        &format!("{}-{}-skippr-ingest-role", workspace, name),
        Resource::new(ResourceSpec::IamRole(iam::Role {
            role_name: format!("{}-skippr-ingest-role", name),
            assume_role_policy_document: iam::PolicyDocument::assume_role("ecs-tasks.amazonaws.com"),
            policies: vec![iam::InlinePolicy {
                policy_name: format!("{}-skippr-ingest-policy", name),
                policy_document: iam::PolicyDocument::new(INGEST_GRANTS.iter().map(iam::Statement::from).collect()),
            }],
            tags: vec![Tag::component("Skippr Ingest Jobs")],
        })),
    )?;

    let file_system = template.add(
        &format!("{}-{}-skippr-efs", workspace, name),
        Resource::new(ResourceSpec::EfsFileSystem(efs::FileSystem {
            encrypted: true,
            lifecycle_policies: vec![efs::LifecyclePolicy {
                transition_to_ia: "AFTER_7_DAYS".into(),
            }],
            performance_mode: "generalPurpose".into(),
            throughput_mode: "bursting".into(),
            file_system_tags: vec![Tag::component("Ingest Buffer FS")],
        }))
        .deletion_policy(DeletionPolicy::Delete),
    )?;

    // One attachment point per public subnet; the service waits on all of
    // them so tasks never launch before the filesystem is reachable.
    let mut mount_targets = Vec::with_capacity(context.network.public_subnet_ids.len());
    for (index, subnet_id) in context.network.public_subnet_ids.iter().enumerate() {
        let mount_target = template.add(
            &format!("{}-{}-skippr-efs-mount-{}", workspace, name, index),
            Resource::new(ResourceSpec::EfsMountTarget(efs::MountTarget {
                file_system_id: Expr::reference(&file_system),
                subnet_id: subnet_id.clone(),
                security_groups: vec![Expr::reference(&infra.efs_sg)],
            })),
        )?;
        mount_targets.push(mount_target);
    }

    let volume_name = format!("efs-{}", name);
    let environment = pipeline
        .container_environment(&workspace, datalake_bucket)
        .into_iter()
        .map(|(key, value)| ecs::KeyValuePair { name: key, value })
        .collect();

    let task_definition = template.add(
        &format!("{}-{}-ingest-task", workspace, name),
        Resource::new(ResourceSpec::EcsTaskDefinition(ecs::TaskDefinition {
            cpu: TASK_CPU_UNITS.into(),
            memory: TASK_MEMORY_MIB.into(),
            network_mode: "awsvpc".into(),
            requires_compatibilities: vec!["FARGATE".into()],
            // The ingest role carries the logs grant, so it serves as both
            // the task role and the log-driver execution role.
            task_role_arn: Expr::get_att(&role, "Arn"),
            execution_role_arn: Expr::get_att(&role, "Arn"),
            container_definitions: vec![ecs::ContainerDefinition {
                name: CONTAINER_NAME_SKIPPR_INGEST.into(),
                image: format!("skippr/skipprd:{}", pipeline.skippr_version),
                essential: true,
                stop_timeout: Some(STOP_TIMEOUT_SECONDS),
                environment,
                ulimits: vec![ecs::Ulimit {
                    name: "nofile".into(),
                    soft_limit: NOFILE_SOFT_LIMIT,
                    hard_limit: NOFILE_HARD_LIMIT,
                }],
                mount_points: vec![ecs::MountPoint {
                    container_path: CONTAINER_DATA_PATH.into(),
                    source_volume: volume_name.clone(),
                    read_only: false,
                }],
                log_configuration: Some(ecs::LogConfiguration {
                    log_driver: "awslogs".into(),
                    options: btreemap! {
                        "awslogs-group".into() => log_group_name,
                        "awslogs-region".into() => context.aws_region.clone(),
                        "awslogs-stream-prefix".into() => log_stream_name,
                        "mode".into() => "non-blocking".into(),
                    },
                }),
            }],
            volumes: vec![ecs::Volume {
                name: volume_name,
                efs_volume_configuration: ecs::EfsVolumeConfiguration {
                    filesystem_id: Expr::reference(&file_system),
                    root_directory: "/".into(),
                },
            }],
            tags: vec![Tag::component("Skippr Ingest Jobs")],
        })),
    )?;

    let mut service = Resource::new(ResourceSpec::EcsService(ecs::Service {
        cluster: Expr::reference(&infra.cluster),
        task_definition: Expr::reference(&task_definition),
        desired_count: 1,
        platform_version: Some(FARGATE_PLATFORM_VERSION.into()),
        capacity_provider_strategy: vec![ecs::CapacityProviderStrategyItem {
            capacity_provider: "FARGATE_SPOT".into(),
            weight: 1,
        }],
        network_configuration: ecs::NetworkConfiguration {
            awsvpc_configuration: ecs::AwsVpcConfiguration {
                assign_public_ip: "ENABLED".into(),
                subnets: context.network.public_subnet_ids.clone(),
                security_groups: vec![Expr::reference(&infra.ingestion_sg)],
            },
        },
        tags: vec![Tag::component("Skippr Ingest Jobs")],
    }));
    for mount_target in &mount_targets {
        service = service.depends_on(mount_target);
    }
    template.add(&format!("{}-{}-service", workspace, name), service)?;

    Ok(())
}
