//! Pipeline configuration.
//!
//! One `PipelineConfig` describes one Skippr ingestion workload: where the
//! source data lives, how it is transformed and partitioned, and where the
//! output and its schema land. Every field is a plain string; the empty
//! string is a valid-but-inert placeholder meaning "unset for this
//! deployment".

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{ensure, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The environment keys of the Skippr container contract, in emission order.
///
/// NOTE WELL: these names are the public contract between this stack and the
/// opaque Skippr binary. Do not rename or drop any of them.
pub const ENV_KEYS: [&str; 22] = [
    "BUFFER_THRESHOLD_BYTES",
    "BUFFER_THRESHOLD_SECONDS",
    "DATA_DIR",
    "DATA_OUTPUT_ATHENA_WORKGROUP_NAME",
    "DATA_OUTPUT_PLUGIN_NAME",
    "DATA_OUTPUT_S3_BUCKET",
    "DATA_OUTPUT_S3_PREFIX",
    "DATA_SOURCE_BATCH_SIZE_BYTES",
    "DATA_SOURCE_PLUGIN_NAME",
    "DATA_SOURCE_S3_BUCKET",
    "DATA_SOURCE_S3_PREFIX",
    "LOG_LEVEL",
    "PIPELINE_NAME",
    "SCHEMA_OUTPUT_GLUE_DATABASE_NAME",
    "SCHEMA_OUTPUT_PLUGIN_NAME",
    "SKIPPR_API_TOKEN",
    "TRANSFORM_BATCH_PARTITION_FIELDS",
    "TRANSFORM_BATCH_TIME_FIELDS",
    "TRANSFORM_BATCH_TIME_UNIT",
    "TRANSFORM_FLATTEN_EVENTS",
    "TRANSFORM_NAMESPACE_FIELDS",
    "WORKSPACE_NAME",
];

/// The working buffer directory inside the container, relative to the
/// process working dir and backed by the `/data` filesystem mount.
pub const DATA_DIR: &str = "./data";

/// The log level handed to the Skippr container.
const LOG_LEVEL: &str = "INFO";

/// Configuration of one Skippr ingestion pipeline.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// The name of this pipeline, unique within a deployment.
    ///
    /// Keys every per-pipeline resource name, so it must be a non-empty
    /// DNS-label-like string.
    pub pipeline_name: String,
    /// The Skippr container image version to run.
    pub skippr_version: String,
    /// The Skippr.io API token, passed through opaquely.
    pub skippr_api_token: String,

    /// The source plugin identity, e.g. `s3`.
    pub source_plugin_name: String,
    /// The bucket the source plugin reads from.
    pub source_s3_bucket: String,
    /// The key prefix the source plugin reads under.
    pub source_s3_prefix: String,
    /// The source read batch size, in bytes.
    pub source_batch_size_bytes: String,

    /// Buffer flush threshold, in bytes.
    pub buffer_threshold_bytes: String,
    /// Buffer flush threshold, in seconds.
    pub buffer_threshold_seconds: String,

    /// Fields used to namespace ingested events.
    pub transform_namespace_field_names: String,
    /// Fields used to partition output batches.
    pub transform_batch_partition_field_names: String,
    /// Fields carrying the event time of each batch.
    pub transform_batch_time_field_names: String,
    /// The unit of the batch time fields.
    pub transform_batch_time_unit: String,
    /// Whether nested events are flattened before output (`yes`/`no`).
    pub transform_flatten_events: String,

    /// The output plugin identity, e.g. `athena`.
    pub output_plugin_name: String,
    /// The key prefix output is written under in the data-lake bucket.
    pub output_s3_prefix: String,
    /// The Athena workgroup used for output table maintenance.
    pub output_athena_workgroup_name: String,

    /// The schema-output plugin identity, e.g. `aws_glue`.
    pub schema_output_plugin_name: String,
    /// The Glue database schemas are written to.
    pub schema_output_glue_database_name: String,
}

impl PipelineConfig {
    /// Validate this pipeline config ahead of synthesis.
    ///
    /// Placeholder fields may be empty; the pipeline name may not, as it is
    /// embedded in role, log-group and volume names.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.pipeline_name.is_empty(),
            AppError::InvalidInput("pipelineName must not be empty".into())
        );
        ensure!(
            self.pipeline_name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                && !self.pipeline_name.starts_with('-'),
            AppError::InvalidInput(format!(
                "pipelineName {:?} must be lowercase alphanumeric/hyphen",
                self.pipeline_name
            ))
        );
        Ok(())
    }

    /// Flatten this config into the Skippr container's environment.
    ///
    /// Emits exactly the keys of [`ENV_KEYS`]: every config field under its
    /// fixed name, the composition-owned output bucket, the workspace name,
    /// and the fixed data dir and log level. Unset fields pass through as
    /// empty strings.
    pub fn container_environment(&self, workspace_name: &str, output_bucket: &str) -> BTreeMap<String, String> {
        let vars = [
            ("DATA_SOURCE_PLUGIN_NAME", self.source_plugin_name.clone()),
            ("DATA_SOURCE_S3_BUCKET", self.source_s3_bucket.clone()),
            ("DATA_SOURCE_S3_PREFIX", self.source_s3_prefix.clone()),
            ("DATA_SOURCE_BATCH_SIZE_BYTES", self.source_batch_size_bytes.clone()),
            ("BUFFER_THRESHOLD_BYTES", self.buffer_threshold_bytes.clone()),
            ("BUFFER_THRESHOLD_SECONDS", self.buffer_threshold_seconds.clone()),
            ("TRANSFORM_NAMESPACE_FIELDS", self.transform_namespace_field_names.clone()),
            ("TRANSFORM_BATCH_PARTITION_FIELDS", self.transform_batch_partition_field_names.clone()),
            ("TRANSFORM_BATCH_TIME_FIELDS", self.transform_batch_time_field_names.clone()),
            ("TRANSFORM_BATCH_TIME_UNIT", self.transform_batch_time_unit.clone()),
            ("TRANSFORM_FLATTEN_EVENTS", self.transform_flatten_events.clone()),
            ("DATA_OUTPUT_PLUGIN_NAME", self.output_plugin_name.clone()),
            ("DATA_OUTPUT_S3_BUCKET", output_bucket.to_string()),
            ("DATA_OUTPUT_S3_PREFIX", self.output_s3_prefix.clone()),
            ("DATA_OUTPUT_ATHENA_WORKGROUP_NAME", self.output_athena_workgroup_name.clone()),
            ("SCHEMA_OUTPUT_PLUGIN_NAME", self.schema_output_plugin_name.clone()),
            ("SCHEMA_OUTPUT_GLUE_DATABASE_NAME", self.schema_output_glue_database_name.clone()),
            ("WORKSPACE_NAME", workspace_name.to_string()),
            ("PIPELINE_NAME", self.pipeline_name.clone()),
            ("DATA_DIR", DATA_DIR.to_string()),
            ("SKIPPR_API_TOKEN", self.skippr_api_token.clone()),
            ("LOG_LEVEL", LOG_LEVEL.to_string()),
        ];
        vars.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
    }
}

/// Parse and validate a YAML pipelines manifest.
///
/// The manifest is a YAML sequence of pipeline configs. Duplicate pipeline
/// names within one deployment are a fatal naming collision.
pub fn load_pipelines(manifest: &str) -> Result<Vec<PipelineConfig>> {
    let pipelines: Vec<PipelineConfig> = serde_yaml::from_str(manifest).context("error parsing pipelines manifest")?;
    let mut seen = BTreeSet::new();
    for pipeline in &pipelines {
        pipeline.validate()?;
        ensure!(
            seen.insert(pipeline.pipeline_name.as_str()),
            AppError::NamingCollision(format!("duplicate pipeline name: {}", pipeline.pipeline_name))
        );
    }
    tracing::debug!(pipelines = pipelines.len(), "parsed pipelines manifest");
    Ok(pipelines)
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! env_field_test {
        ($name:ident, $field:ident, $key:literal) => {
            #[test]
            fn $name() {
                let config = PipelineConfig {
                    $field: "marker".into(),
                    ..Default::default()
                };
                let env = config.container_environment("ws", "bucket");
                assert_eq!(env.get($key).map(String::as_str), Some("marker"));
            }
        };
    }

    env_field_test!(source_plugin_name_key, source_plugin_name, "DATA_SOURCE_PLUGIN_NAME");
    env_field_test!(source_s3_bucket_key, source_s3_bucket, "DATA_SOURCE_S3_BUCKET");
    env_field_test!(source_s3_prefix_key, source_s3_prefix, "DATA_SOURCE_S3_PREFIX");
    env_field_test!(source_batch_size_bytes_key, source_batch_size_bytes, "DATA_SOURCE_BATCH_SIZE_BYTES");
    env_field_test!(buffer_threshold_bytes_key, buffer_threshold_bytes, "BUFFER_THRESHOLD_BYTES");
    env_field_test!(buffer_threshold_seconds_key, buffer_threshold_seconds, "BUFFER_THRESHOLD_SECONDS");
    env_field_test!(namespace_fields_key, transform_namespace_field_names, "TRANSFORM_NAMESPACE_FIELDS");
    env_field_test!(
        batch_partition_fields_key,
        transform_batch_partition_field_names,
        "TRANSFORM_BATCH_PARTITION_FIELDS"
    );
    env_field_test!(batch_time_fields_key, transform_batch_time_field_names, "TRANSFORM_BATCH_TIME_FIELDS");
    env_field_test!(batch_time_unit_key, transform_batch_time_unit, "TRANSFORM_BATCH_TIME_UNIT");
    env_field_test!(flatten_events_key, transform_flatten_events, "TRANSFORM_FLATTEN_EVENTS");
    env_field_test!(output_plugin_name_key, output_plugin_name, "DATA_OUTPUT_PLUGIN_NAME");
    env_field_test!(output_s3_prefix_key, output_s3_prefix, "DATA_OUTPUT_S3_PREFIX");
    env_field_test!(
        athena_workgroup_key,
        output_athena_workgroup_name,
        "DATA_OUTPUT_ATHENA_WORKGROUP_NAME"
    );
    env_field_test!(schema_output_plugin_key, schema_output_plugin_name, "SCHEMA_OUTPUT_PLUGIN_NAME");
    env_field_test!(
        glue_database_key,
        schema_output_glue_database_name,
        "SCHEMA_OUTPUT_GLUE_DATABASE_NAME"
    );
    env_field_test!(api_token_key, skippr_api_token, "SKIPPR_API_TOKEN");

    #[test]
    fn environment_holds_exactly_the_contract_keys() {
        let env = PipelineConfig::default().container_environment("ws", "bucket");
        let keys: Vec<&str> = env.keys().map(String::as_str).collect();
        assert_eq!(keys, ENV_KEYS);
    }

    #[test]
    fn composition_owned_and_fixed_values() {
        let config = PipelineConfig {
            pipeline_name: "ingest1".into(),
            ..Default::default()
        };
        let env = config.container_environment("foo", "foo-datalake");
        assert_eq!(env["WORKSPACE_NAME"], "foo");
        assert_eq!(env["DATA_OUTPUT_S3_BUCKET"], "foo-datalake");
        assert_eq!(env["PIPELINE_NAME"], "ingest1");
        assert_eq!(env["DATA_DIR"], "./data");
        assert_eq!(env["LOG_LEVEL"], "INFO");
    }

    #[test]
    fn unset_fields_pass_through_as_empty_strings() {
        let env = PipelineConfig::default().container_environment("ws", "bucket");
        assert_eq!(env["DATA_SOURCE_S3_BUCKET"], "");
        assert_eq!(env["BUFFER_THRESHOLD_BYTES"], "");
        assert_eq!(env["SKIPPR_API_TOKEN"], "");
    }

    #[test]
    fn empty_pipeline_name_is_rejected() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::InvalidInput(_))));
    }

    #[test]
    fn pipeline_name_charset_is_restricted() {
        let config = PipelineConfig {
            pipeline_name: "Ingest One".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serializes_camel_case() {
        let config = PipelineConfig {
            pipeline_name: "ingest1".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["pipelineName"], "ingest1");
        assert!(value.get("pipeline_name").is_none());
    }

    #[test]
    fn manifest_parses_camel_case_fields() {
        let manifest = r#"
- pipelineName: ingest1
  skipprVersion: v3.2.0
  sourcePluginName: s3
  transformFlattenEvents: "no"
"#;
        let pipelines = load_pipelines(manifest).unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].pipeline_name, "ingest1");
        assert_eq!(pipelines[0].skippr_version, "v3.2.0");
        assert_eq!(pipelines[0].source_plugin_name, "s3");
        assert_eq!(pipelines[0].transform_flatten_events, "no");
        assert_eq!(pipelines[0].source_s3_bucket, "");
    }

    #[test]
    fn duplicate_pipeline_names_collide() {
        let manifest = r#"
- pipelineName: ingest1
- pipelineName: ingest1
"#;
        let err = load_pipelines(manifest).unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::NamingCollision(_))));
    }
}
