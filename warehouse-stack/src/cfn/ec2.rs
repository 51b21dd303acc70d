//! EC2 security group resources.

use serde::Serialize;

use super::{Expr, Tag};

/// The any-source/any-destination IPv4 block.
pub const ANY_IPV4: &str = "0.0.0.0/0";

/// A named set of network ingress/egress rules within a VPC.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_name: String,
    pub group_description: String,
    pub vpc_id: Expr,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ingress: Vec<Rule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_egress: Vec<Rule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// A single ingress or egress rule; the direction is carried by the list the
/// rule is declared in.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i64>,
    pub cidr_ip: String,
    pub description: String,
}

impl Rule {
    /// A single-port TCP rule for the given peer block.
    pub fn tcp(port: i64, cidr_ip: &str, description: &str) -> Self {
        Self {
            ip_protocol: "tcp".into(),
            from_port: Some(port),
            to_port: Some(port),
            cidr_ip: cidr_ip.into(),
            description: description.into(),
        }
    }

    /// A full-port-range TCP rule for the given peer block.
    pub fn all_tcp(cidr_ip: &str, description: &str) -> Self {
        Self {
            ip_protocol: "tcp".into(),
            from_port: Some(0),
            to_port: Some(65535),
            cidr_ip: cidr_ip.into(),
            description: description.into(),
        }
    }

    /// The all-protocol egress rule emitted for groups created with the
    /// allow-all-outbound flag.
    pub fn allow_all_outbound() -> Self {
        Self {
            ip_protocol: "-1".into(),
            from_port: None,
            to_port: None,
            cidr_ip: ANY_IPV4.into(),
            description: "Allow all outbound traffic".into(),
        }
    }
}
