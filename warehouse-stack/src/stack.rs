//! Top-level composition of the data-warehouse stack.
//!
//! Declares the data-lake bucket, builds the shared infrastructure once,
//! builds one Skippr workload per configured pipeline, and publishes the
//! bucket's identity as exported outputs for cross-stack consumption.

use std::collections::BTreeSet;

use anyhow::{ensure, Result};

use warehouse_core::context::DeployContext;
use warehouse_core::error::AppError;
use warehouse_core::pipeline::PipelineConfig;

use crate::cfn::{s3, DeletionPolicy, Export, Expr, Output, Resource, ResourceSpec, Tag, Template};
use crate::infra::build_shared_infra;
use crate::skippr::build_skippr_pipeline;

/// Export identifier of the data-lake bucket ARN.
pub const EXPORT_DATA_LAKE_BUCKET_ARN: &str = "DataWarehouse::DataLake:S3Bucket:Arn";
/// Export identifier of the data-lake bucket name.
pub const EXPORT_DATA_LAKE_BUCKET_NAME: &str = "DataWarehouse::DataLake:S3Bucket:Name";

/// Synthesize the full deployment template.
///
/// Validation failures, a missing default network, and naming collisions
/// all abort synthesis with no partial template emitted.
pub fn synthesize(context: &DeployContext, pipelines: &[PipelineConfig]) -> Result<Template> {
    context.validate()?;
    let mut seen = BTreeSet::new();
    for pipeline in pipelines {
        pipeline.validate()?;
        ensure!(
            seen.insert(pipeline.pipeline_name.as_str()),
            AppError::NamingCollision(format!("duplicate pipeline name: {}", pipeline.pipeline_name))
        );
    }

    let workspace = context.workspace_name();
    let mut template = Template::new(format!(
        "{} data warehouse: Skippr ingestion pipelines and data-lake storage",
        context.logical_name
    ));

    // The bucket ingested data lands in, managed by Skippr. Deleted on
    // teardown along with its contents: demo-grade retention.
    let bucket_name = format!("{}-datalake", workspace);
    let bucket = template.add(
        &format!("{}-datalake-bucket", workspace),
        Resource::new(ResourceSpec::S3Bucket(s3::Bucket {
            bucket_name: bucket_name.clone(),
            tags: vec![Tag::component("Datalake Storage")],
        }))
        .deletion_policy(DeletionPolicy::Delete),
    )?;

    let infra = build_shared_infra(&mut template, context)?;
    for pipeline in pipelines {
        build_skippr_pipeline(&mut template, context, &infra, pipeline, &bucket_name)?;
    }

    template.add_output(
        &format!("{}-data-lake-bucket-arn-output", workspace),
        Output {
            value: Expr::get_att(&bucket, "Arn"),
            export: Export {
                name: EXPORT_DATA_LAKE_BUCKET_ARN.into(),
            },
        },
    )?;
    template.add_output(
        &format!("{}-data-lake-bucket-name-output", workspace),
        Output {
            value: Expr::reference(&bucket),
            export: Export {
                name: EXPORT_DATA_LAKE_BUCKET_NAME.into(),
            },
        },
    )?;

    tracing::info!(
        resources = template.resources.len(),
        pipelines = pipelines.len(),
        "stack synthesis complete"
    );
    Ok(template)
}

/// The sample wiring used when no pipelines manifest is given: one pipeline
/// with its source/transform/output parameters left as empty placeholders
/// to be filled per deployment.
pub fn default_pipelines() -> Vec<PipelineConfig> {
    vec![PipelineConfig {
        pipeline_name: "ingest1".into(),
        skippr_version: "v3.2.0".into(),
        source_plugin_name: "s3".into(),
        transform_flatten_events: "no".into(),
        output_plugin_name: "athena".into(),
        schema_output_plugin_name: "aws_glue".into(),
        ..Default::default()
    }]
}
