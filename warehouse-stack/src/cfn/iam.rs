//! IAM role and policy resources.

use serde::Serialize;

use warehouse_core::grants::Grant;

use super::Tag;

/// The policy document version emitted in every document.
const POLICY_VERSION: &str = "2012-10-17";

/// An execution identity assumable by a service principal.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub role_name: String,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<InlinePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// A named policy attached inline to a role.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

/// An IAM policy document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.into(),
            statement,
        }
    }

    /// The trust document allowing the given service principal to assume a
    /// role.
    pub fn assume_role(service: &str) -> Self {
        Self::new(vec![Statement {
            effect: Effect::Allow,
            action: vec!["sts:AssumeRole".into()],
            resource: Vec::new(),
            principal: Some(Principal { service: service.into() }),
        }])
    }
}

/// One policy statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

/// Statement effect. Only `Allow` is representable: the workload's
/// permission boundary is additive-only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Effect {
    Allow,
}

/// A service principal.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

impl From<&Grant> for Statement {
    fn from(grant: &Grant) -> Self {
        Self {
            effect: Effect::Allow,
            action: grant.actions.iter().map(|action| action.to_string()).collect(),
            resource: grant.resources.iter().map(|resource| resource.to_string()).collect(),
            principal: None,
        }
    }
}
