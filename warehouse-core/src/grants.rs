//! The permission grant set attached to the ingestion role.

/// A single additive permission grant.
///
/// Grants only ever allow; the effective permission boundary of the
/// ingestion workload is the union of all grants in [`INGEST_GRANTS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    /// The actions granted.
    pub actions: &'static [&'static str],
    /// The resource patterns the actions are granted on.
    pub resources: &'static [&'static str],
}

/// The grant set of the Skippr ingest role, in declaration order.
///
/// Skippr writes its own log streams, scans source buckets, reads and writes
/// objects, manages Athena/Glue tables for the partitioned output, and
/// decrypts via KMS-backed SSM parameters.
pub const INGEST_GRANTS: [Grant; 5] = [
    Grant {
        actions: &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
        resources: &["arn:aws:logs:*:*:*"],
    },
    Grant {
        actions: &["s3:ListBuckets"],
        resources: &["*"],
    },
    Grant {
        actions: &["s3:ListBucket", "s3:ListObjectsV2", "s3:ListObjects", "s3:GetObject", "s3:PutObject"],
        resources: &["*"],
    },
    Grant {
        actions: &["athena:*", "glue:*"],
        resources: &["*"],
    },
    Grant {
        actions: &["kms:*", "ssm:GetParameters"],
        resources: &["*"],
    },
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn grant_set_is_exactly_five_triples() {
        assert_eq!(INGEST_GRANTS.len(), 5);
    }

    #[test]
    fn grant_union_matches_the_declared_actions() {
        let actions: Vec<&str> = INGEST_GRANTS.iter().flat_map(|grant| grant.actions.iter().copied()).collect();
        assert_eq!(
            actions,
            vec![
                "logs:CreateLogGroup",
                "logs:CreateLogStream",
                "logs:PutLogEvents",
                "s3:ListBuckets",
                "s3:ListBucket",
                "s3:ListObjectsV2",
                "s3:ListObjects",
                "s3:GetObject",
                "s3:PutObject",
                "athena:*",
                "glue:*",
                "kms:*",
                "ssm:GetParameters",
            ]
        );
    }

    #[test]
    fn log_grant_is_scoped_to_log_arns() {
        assert_eq!(INGEST_GRANTS[0].resources, &["arn:aws:logs:*:*:*"]);
        for grant in &INGEST_GRANTS[1..] {
            assert_eq!(grant.resources, &["*"]);
        }
    }
}
