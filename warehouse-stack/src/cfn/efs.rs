//! EFS filesystem resources.

use serde::Serialize;

use super::{Expr, Tag};

/// A network-attached shared filesystem.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileSystem {
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lifecycle_policies: Vec<LifecyclePolicy>,
    pub performance_mode: String,
    pub throughput_mode: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_system_tags: Vec<Tag>,
}

/// A filesystem lifecycle transition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LifecyclePolicy {
    #[serde(rename = "TransitionToIA")]
    pub transition_to_ia: String,
}

/// A subnet attachment point for a filesystem.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountTarget {
    pub file_system_id: Expr,
    pub subnet_id: String,
    pub security_groups: Vec<Expr>,
}
