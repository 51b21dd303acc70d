//! Typed CloudFormation template model.
//!
//! Only the resource kinds and properties this stack emits are modelled.
//! Everything here is inert data with a serde `Serialize` impl matching the
//! CloudFormation template schema; cross-resource references are explicit
//! [`Expr`] values so the provisioning engine can sequence creation from the
//! emitted graph alone.

pub mod ec2;
pub mod ecs;
pub mod efs;
pub mod iam;
pub mod logs;
pub mod s3;

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{ensure, Result};
use serde::Serialize;

use warehouse_core::error::AppError;

/// The template format version emitted in every template.
const FORMAT_VERSION: &str = "2010-09-09";

/// A CloudFormation logical resource id.
///
/// Logical ids must be alphanumeric; [`LogicalId::derive`] produces one from
/// a hyphenated construct-style name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derive a logical id by camelizing the given construct name on
    /// non-alphanumeric boundaries, e.g. `foo-ingest1-skippr-log-group`
    /// becomes `FooIngest1SkipprLogGroup`.
    pub fn derive(name: &str) -> Self {
        let mut id = String::with_capacity(name.len());
        let mut upper_next = true;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if upper_next {
                    id.push(c.to_ascii_uppercase());
                } else {
                    id.push(c);
                }
                upper_next = false;
            } else {
                upper_next = true;
            }
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A property value: a literal, or a reference into the declared graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Expr {
    /// A literal string value.
    Lit(String),
    /// The `Ref` intrinsic: the default value of another declared resource.
    Ref {
        #[serde(rename = "Ref")]
        logical_id: LogicalId,
    },
    /// The `Fn::GetAtt` intrinsic: a named attribute of another declared
    /// resource.
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        attribute: (LogicalId, String),
    },
}

impl Expr {
    /// Reference another resource declared in the same template.
    pub fn reference(id: &LogicalId) -> Self {
        Self::Ref { logical_id: id.clone() }
    }

    /// Reference an attribute of another resource declared in the same
    /// template.
    pub fn get_att(id: &LogicalId, attribute: &str) -> Self {
        Self::GetAtt {
            attribute: (id.clone(), attribute.to_string()),
        }
    }
}

impl From<&str> for Expr {
    fn from(val: &str) -> Self {
        Self::Lit(val.to_string())
    }
}

impl From<String> for Expr {
    fn from(val: String) -> Self {
        Self::Lit(val)
    }
}

/// A resource tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// The `Component` tag carried by every resource of this stack.
    pub fn component(value: &str) -> Self {
        Self {
            key: "Component".into(),
            value: value.into(),
        }
    }
}

/// What happens to a resource when its stack is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

/// The typed properties of one declared resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum ResourceSpec {
    #[serde(rename = "AWS::S3::Bucket")]
    S3Bucket(s3::Bucket),
    #[serde(rename = "AWS::EC2::SecurityGroup")]
    Ec2SecurityGroup(ec2::SecurityGroup),
    #[serde(rename = "AWS::ECS::Cluster")]
    EcsCluster(ecs::Cluster),
    #[serde(rename = "AWS::ECS::TaskDefinition")]
    EcsTaskDefinition(ecs::TaskDefinition),
    #[serde(rename = "AWS::ECS::Service")]
    EcsService(ecs::Service),
    #[serde(rename = "AWS::EFS::FileSystem")]
    EfsFileSystem(efs::FileSystem),
    #[serde(rename = "AWS::EFS::MountTarget")]
    EfsMountTarget(efs::MountTarget),
    #[serde(rename = "AWS::IAM::Role")]
    IamRole(iam::Role),
    #[serde(rename = "AWS::Logs::LogGroup")]
    LogsLogGroup(logs::LogGroup),
    #[serde(rename = "AWS::Logs::LogStream")]
    LogsLogStream(logs::LogStream),
}

/// One declared resource: typed properties plus graph metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resource {
    #[serde(flatten)]
    pub spec: ResourceSpec,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(spec: ResourceSpec) -> Self {
        Self {
            spec,
            depends_on: Vec::new(),
            deletion_policy: None,
        }
    }

    /// Set the deletion policy of this resource.
    pub fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Declare an explicit creation-ordering edge to another resource.
    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.push(id.clone());
        self
    }
}

/// A named, exported stack output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Output {
    #[serde(rename = "Value")]
    pub value: Expr,
    #[serde(rename = "Export")]
    pub export: Export,
}

/// The cross-stack export identifier of an output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Export {
    #[serde(rename = "Name")]
    pub name: String,
}

/// A CloudFormation template: the full declaration graph of one deployment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<LogicalId, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.into(),
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Declare a resource under the logical id derived from the given
    /// construct name, returning the id as a handle for references.
    ///
    /// Two constructs resolving to the same logical id are a naming
    /// collision and abort synthesis.
    pub fn add(&mut self, name: &str, resource: Resource) -> Result<LogicalId> {
        let id = LogicalId::derive(name);
        ensure!(
            !self.resources.contains_key(&id),
            AppError::NamingCollision(format!("logical id {} is already declared", id))
        );
        tracing::debug!(id = %id, "declaring resource");
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    /// Declare a named, exported stack output.
    pub fn add_output(&mut self, name: &str, output: Output) -> Result<()> {
        let id = LogicalId::derive(name).to_string();
        ensure!(
            !self.outputs.contains_key(&id),
            AppError::NamingCollision(format!("output {} is already declared", id))
        );
        self.outputs.insert(id, output);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! logical_id_test {
        ($name:ident, $input:literal, $expect:literal) => {
            #[test]
            fn $name() {
                assert_eq!(LogicalId::derive($input).as_str(), $expect);
            }
        };
    }

    logical_id_test!(derive_camelizes_hyphenated_names, "foo-ingest1-skippr-log-group", "FooIngest1SkipprLogGroup");
    logical_id_test!(derive_handles_single_segment, "foo", "Foo");
    logical_id_test!(derive_keeps_digits, "ingest1-efs-mount-0", "Ingest1EfsMount0");
    logical_id_test!(derive_strips_other_separators, "foo_bar.baz", "FooBarBaz");

    #[test]
    fn duplicate_logical_ids_are_a_naming_collision() {
        let mut template = Template::new("test");
        let bucket = || {
            Resource::new(ResourceSpec::S3Bucket(s3::Bucket {
                bucket_name: "b".into(),
                tags: vec![],
            }))
        };
        template.add("foo-datalake-bucket", bucket()).unwrap();
        let err = template.add("foo-datalake-bucket", bucket()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<warehouse_core::AppError>(),
            Some(warehouse_core::AppError::NamingCollision(_))
        ));
    }

    #[test]
    fn resources_serialize_with_type_and_properties() {
        let mut template = Template::new("test");
        template
            .add(
                "foo-datalake-bucket",
                Resource::new(ResourceSpec::S3Bucket(s3::Bucket {
                    bucket_name: "foo-datalake".into(),
                    tags: vec![Tag::component("Datalake Storage")],
                }))
                .deletion_policy(DeletionPolicy::Delete),
            )
            .unwrap();
        let value = serde_json::to_value(&template).unwrap();
        let bucket = &value["Resources"]["FooDatalakeBucket"];
        assert_eq!(bucket["Type"], "AWS::S3::Bucket");
        assert_eq!(bucket["Properties"]["BucketName"], "foo-datalake");
        assert_eq!(bucket["Properties"]["Tags"][0]["Key"], "Component");
        assert_eq!(bucket["DeletionPolicy"], "Delete");
    }

    #[test]
    fn expr_intrinsics_serialize_to_their_cfn_forms() {
        let id = LogicalId::derive("foo-datalake-bucket");
        assert_eq!(serde_json::to_value(Expr::from("literal")).unwrap(), serde_json::json!("literal"));
        assert_eq!(
            serde_json::to_value(Expr::reference(&id)).unwrap(),
            serde_json::json!({"Ref": "FooDatalakeBucket"})
        );
        assert_eq!(
            serde_json::to_value(Expr::get_att(&id, "Arn")).unwrap(),
            serde_json::json!({"Fn::GetAtt": ["FooDatalakeBucket", "Arn"]})
        );
    }
}
