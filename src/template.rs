//! CloudFormation-style rendering of a declaration
//!
//! Used by `synth` to inspect what a run would apply without touching AWS.

use crate::bucket::{BucketSpec, RemovalPolicy};
use crate::provisioner::Declaration;
use crate::Result;
use serde_json::{json, Map, Value};

const OUTPUT_PREFIX: &str = "ResizedImagesBucket";

fn deletion_policy(policy: RemovalPolicy) -> &'static str {
    match policy {
        RemovalPolicy::Destroy => "Delete",
        RemovalPolicy::Retain => "Retain",
    }
}

fn bucket_resource(bucket: &BucketSpec) -> Value {
    let lifecycle_rules: Vec<Value> = bucket
        .lifecycle_rules
        .iter()
        .map(|rule| {
            let status = if rule.enabled { "Enabled" } else { "Disabled" };
            json!({
                "Id": rule.id,
                "Prefix": rule.prefix,
                "Status": status,
                "ExpirationInDays": rule.expiration_days,
            })
        })
        .collect();

    let cors_rules: Vec<Value> = bucket
        .cors_rules
        .iter()
        .map(|rule| {
            let methods: Vec<&str> = rule.allowed_methods.iter().map(|m| m.as_str()).collect();
            json!({
                "AllowedMethods": methods,
                "AllowedOrigins": rule.allowed_origins,
                "AllowedHeaders": rule.allowed_headers,
            })
        })
        .collect();

    json!({
        "Type": "AWS::S3::Bucket",
        "DeletionPolicy": deletion_policy(bucket.removal_policy),
        "UpdateReplacePolicy": deletion_policy(bucket.removal_policy),
        "Properties": {
            "BucketName": bucket.name,
            "PublicAccessBlockConfiguration": bucket.public_access,
            "LifecycleConfiguration": { "Rules": lifecycle_rules },
            "CorsConfiguration": { "CorsRules": cors_rules },
        }
    })
}

/// Render the declaration as a template document.
pub fn render(declaration: &Declaration) -> Result<Value> {
    let bucket = &declaration.bucket;

    let mut resources = Map::new();
    resources.insert(bucket.logical_id.clone(), bucket_resource(bucket));
    resources.insert(
        format!("{}Policy", bucket.logical_id),
        json!({
            "Type": "AWS::S3::BucketPolicy",
            "Properties": {
                "Bucket": { "Ref": bucket.logical_id },
                "PolicyDocument": declaration.policy.to_document()?,
            }
        }),
    );

    let mut outputs = Map::new();
    for export in &declaration.exports {
        outputs.insert(
            format!("{}{}", OUTPUT_PREFIX, export.kind.suffix()),
            json!({
                "Value": export.value,
                "Export": { "Name": export.export_name },
            }),
        );
    }

    Ok(json!({
        "Description": format!(
            "Resized images bucket {} ({})",
            bucket.name, declaration.stage
        ),
        "Resources": resources,
        "Outputs": outputs,
    }))
}

pub fn render_pretty(declaration: &Declaration) -> Result<String> {
    Ok(serde_json::to_string_pretty(&render(declaration)?)?)
}
