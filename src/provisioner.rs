//! Resized-storage declaration
//!
//! Builds the full declaration for the resized images bucket in one
//! straight-line pass: bucket, resource policy and exports. Nothing here
//! talks to AWS; realizing the declaration is the backend's job.

use crate::bucket::BucketSpec;
use crate::exports::{ExportKind, ExportedValue};
use crate::models::{StackInputs, ValidatedInputs};
use crate::policy::{AccessPrincipal, BucketPolicy, PolicyStatement};
use crate::role::{RoleReference, RoleResolver};
use crate::Result;
use tracing::{info, warn};

/// Everything one provisioning run declares. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub stage: String,
    pub bucket: BucketSpec,
    pub policy: BucketPolicy,
    pub exports: Vec<ExportedValue>,
    pub edge_role: Option<RoleReference>,
}

impl Declaration {
    pub fn grants_edge_write(&self) -> bool {
        self.edge_role.is_some()
    }

    pub fn export_names(&self) -> Vec<String> {
        self.exports.iter().map(|e| e.export_name.clone()).collect()
    }
}

/// Build the declaration from validated inputs and the role lookup result.
pub fn declare(validated: &ValidatedInputs, edge_role: Option<RoleReference>) -> Result<Declaration> {
    let inputs = &validated.inputs;

    let bucket = BucketSpec::resized_images(
        &inputs.bucket_id,
        &inputs.original_bucket_name,
        &inputs.partition,
    );

    let mut policy = BucketPolicy::new();
    policy.add_statement(PolicyStatement::delivery_read(
        &bucket,
        AccessPrincipal::origin_access_identity(&inputs.origin_access_identity_user_id),
    ))?;

    if let Some(role) = &edge_role {
        policy.add_statement(PolicyStatement::edge_write(
            &bucket,
            AccessPrincipal::role(role),
        ))?;
    }

    let exports = vec![
        ExportedValue::for_bucket(
            &inputs.stage,
            &inputs.bucket_id,
            ExportKind::Arn,
            bucket.arn(),
        ),
        ExportedValue::for_bucket(
            &inputs.stage,
            &inputs.bucket_id,
            ExportKind::Name,
            bucket.name.clone(),
        ),
    ];

    Ok(Declaration {
        stage: inputs.stage.clone(),
        bucket,
        policy,
        exports,
        edge_role,
    })
}

/// Validate inputs, look up the edge role and build the declaration.
///
/// A role that does not exist yet leaves the edge function without write
/// access; re-running once the role exists adds the grant.
pub async fn resolve_and_declare(
    inputs: &StackInputs,
    resolver: &dyn RoleResolver,
) -> Result<Declaration> {
    let validated = inputs.validate()?;

    let edge_role = resolver.resolve(&validated.edge_function_role_arn).await?;
    match &edge_role {
        Some(role) => info!("Edge function role {} resolved", role.arn()),
        None => warn!(
            "Edge function role {} not found; bucket will not be writable by the edge function until the next run",
            validated.edge_function_role_arn
        ),
    }

    let declaration = declare(&validated, edge_role)?;
    info!(
        "Declared bucket {} with {} policy statement(s)",
        declaration.bucket.name,
        declaration.policy.len()
    );

    Ok(declaration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        ACTION_GET_OBJECT, ACTION_LIST_BUCKET, ACTION_PUT_OBJECT, CLOUDFRONT_READ_SID,
        EDGE_FUNCTION_WRITE_SID,
    };
    use crate::role::{MockRoleResolver, RoleArn};
    use pretty_assertions::assert_eq;

    const ROLE: &str = "arn:aws:iam::123456789012:role/edge-resize";

    fn inputs() -> StackInputs {
        StackInputs::new("ResizedBucket", "myapp-images", "E1A2B3C4", ROLE, "prod")
    }

    fn role() -> RoleReference {
        RoleReference::new(RoleArn::parse(ROLE).unwrap())
    }

    #[test]
    fn test_declare_with_role() {
        let declaration = declare(&inputs().validate().unwrap(), Some(role())).unwrap();

        assert_eq!(declaration.bucket.name, "myapp-images-optimized-imgs");
        assert_eq!(declaration.policy.len(), 2);
        assert!(declaration.grants_edge_write());

        let read = declaration.policy.get(CLOUDFRONT_READ_SID).unwrap();
        assert!(read.actions.contains(ACTION_GET_OBJECT));
        assert!(read.actions.contains(ACTION_LIST_BUCKET));
        assert_eq!(read.resources.len(), 2);

        let write = declaration.policy.get(EDGE_FUNCTION_WRITE_SID).unwrap();
        assert_eq!(write.actions.len(), 1);
        assert!(write.actions.contains(ACTION_PUT_OBJECT));
        assert_eq!(
            write.principals.iter().next().unwrap().arn(),
            "arn:aws:iam::123456789012:role/edge-resize"
        );
    }

    #[test]
    fn test_declare_without_role() {
        let declaration = declare(&inputs().validate().unwrap(), None).unwrap();

        assert_eq!(declaration.policy.len(), 1);
        assert!(declaration.policy.contains(CLOUDFRONT_READ_SID));
        assert!(!declaration.policy.contains(EDGE_FUNCTION_WRITE_SID));
        assert!(!declaration.grants_edge_write());
    }

    #[test]
    fn test_declare_exports() {
        let declaration = declare(&inputs().validate().unwrap(), None).unwrap();

        assert_eq!(
            declaration.exports,
            vec![
                ExportedValue::new(
                    ExportKind::Arn,
                    "prod-ResizedBucketArn".to_string(),
                    "arn:aws:s3:::myapp-images-optimized-imgs".to_string()
                ),
                ExportedValue::new(
                    ExportKind::Name,
                    "prod-ResizedBucketName".to_string(),
                    "myapp-images-optimized-imgs".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_declare_is_deterministic() {
        let validated = inputs().validate().unwrap();
        assert_eq!(
            declare(&validated, Some(role())).unwrap(),
            declare(&validated, Some(role())).unwrap()
        );
    }

    #[test]
    fn test_bucket_invariants_hold_for_any_inputs() {
        let names = ["a1b", "photos", "my.bucket", "x-y-z-0"];
        for name in names {
            let validated = StackInputs::new("Bucket", name, "ABC", ROLE, "dev")
                .validate()
                .unwrap();
            for edge_role in [None, Some(role())] {
                let declaration = declare(&validated, edge_role).unwrap();
                assert!(declaration.bucket.public_access.is_fully_blocked());
                assert_eq!(declaration.bucket.lifecycle_rules[0].expiration_days, 90);
                assert!(declaration.bucket.cors_rules.iter().all(|rule| rule
                    .allowed_methods
                    .iter()
                    .all(|m| !m.is_mutating())));
                assert!((1..=2).contains(&declaration.policy.len()));
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_and_declare_present_role() {
        let resolver = MockRoleResolver::new().with_role(ROLE);

        let declaration = resolve_and_declare(&inputs(), &resolver).await.unwrap();

        assert_eq!(declaration.policy.len(), 2);
        assert_eq!(resolver.get_resolve_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_and_declare_absent_role() {
        let resolver = MockRoleResolver::new();

        let declaration = resolve_and_declare(&inputs(), &resolver).await.unwrap();

        assert_eq!(declaration.policy.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs_skip_role_lookup() {
        let resolver = MockRoleResolver::new().with_role(ROLE);
        let mut bad = inputs();
        bad.origin_access_identity_user_id = String::new();

        let err = resolve_and_declare(&bad, &resolver).await.unwrap_err();

        assert!(err.is_config());
        assert_eq!(resolver.get_resolve_count(), 0);
    }

    #[tokio::test]
    async fn test_role_lookup_failure_aborts() {
        let resolver = MockRoleResolver::new().with_failure(true);

        let err = resolve_and_declare(&inputs(), &resolver).await.unwrap_err();

        assert!(!err.is_config());
    }
}
