use super::ProvisioningBackend;
use crate::bucket::BucketSpec;
use crate::provisioner::Declaration;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{
    BucketLifecycleConfiguration, BucketLocationConstraint, CorsConfiguration,
    CorsRule as S3CorsRule, CreateBucketConfiguration, Delete, ExpirationStatus,
    LifecycleExpiration, LifecycleRule as S3LifecycleRule, LifecycleRuleFilter, ObjectIdentifier,
    PublicAccessBlockConfiguration,
};
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, error, info, warn};

const DEFAULT_REGION: &str = "us-east-1";

fn provisioning_error(action: &str, bucket: &str, e: impl std::error::Error) -> Error {
    Error::Provisioning(format!(
        "Failed to {} for bucket '{}': {}",
        action,
        bucket,
        DisplayErrorContext(e)
    ))
}

pub struct S3Backend {
    client: S3Client,
    region: String,
}

impl S3Backend {
    pub fn new(config: &SdkConfig) -> Self {
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Self {
            client: S3Client::new(config),
            region,
        }
    }

    /// Returns `true` when this call created the bucket.
    async fn create_bucket(&self, bucket_name: &str) -> Result<bool> {
        let mut request = self.client.create_bucket().bucket(bucket_name);

        // us-east-1 rejects an explicit location constraint
        if self.region != DEFAULT_REGION {
            let config = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(config);
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket '{}' in {}", bucket_name, self.region);
                Ok(true)
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you() {
                    info!("Bucket '{}' already exists", bucket_name);
                    Ok(false)
                } else {
                    Err(provisioning_error("create bucket", bucket_name, service_error))
                }
            }
        }
    }

    async fn configure_bucket(&self, declaration: &Declaration) -> Result<()> {
        let bucket = &declaration.bucket;
        self.apply_public_access_block(bucket).await?;
        self.apply_lifecycle_rules(bucket).await?;
        self.apply_cors_configuration(bucket).await?;
        self.apply_bucket_policy(declaration).await?;
        Ok(())
    }

    async fn apply_public_access_block(&self, bucket: &BucketSpec) -> Result<()> {
        let block = &bucket.public_access;
        let config = PublicAccessBlockConfiguration::builder()
            .block_public_acls(block.block_public_acls())
            .ignore_public_acls(block.ignore_public_acls())
            .block_public_policy(block.block_public_policy())
            .restrict_public_buckets(block.restrict_public_buckets())
            .build();

        self.client
            .put_public_access_block()
            .bucket(&bucket.name)
            .public_access_block_configuration(config)
            .send()
            .await
            .map_err(|e| provisioning_error("apply public access block", &bucket.name, e))?;

        debug!("Blocked public access on '{}'", bucket.name);
        Ok(())
    }

    async fn apply_lifecycle_rules(&self, bucket: &BucketSpec) -> Result<()> {
        let mut s3_rules = Vec::new();

        for rule in &bucket.lifecycle_rules {
            let expiration = LifecycleExpiration::builder()
                .days(rule.expiration_days)
                .build();

            let s3_rule = S3LifecycleRule::builder()
                .id(&rule.id)
                .status(if rule.enabled {
                    ExpirationStatus::Enabled
                } else {
                    ExpirationStatus::Disabled
                })
                .expiration(expiration)
                .filter(LifecycleRuleFilter::builder().prefix(&rule.prefix).build())
                .build()
                .map_err(|e| provisioning_error("build lifecycle rule", &bucket.name, e))?;

            s3_rules.push(s3_rule);
        }

        let config = BucketLifecycleConfiguration::builder()
            .set_rules(Some(s3_rules))
            .build()
            .map_err(|e| provisioning_error("build lifecycle configuration", &bucket.name, e))?;

        self.client
            .put_bucket_lifecycle_configuration()
            .bucket(&bucket.name)
            .lifecycle_configuration(config)
            .send()
            .await
            .map_err(|e| provisioning_error("apply lifecycle rules", &bucket.name, e))?;

        debug!("Applied lifecycle rules on '{}'", bucket.name);
        Ok(())
    }

    async fn apply_cors_configuration(&self, bucket: &BucketSpec) -> Result<()> {
        let mut s3_cors_rules = Vec::new();

        for rule in &bucket.cors_rules {
            let s3_rule = S3CorsRule::builder()
                .set_allowed_methods(Some(
                    rule.allowed_methods
                        .iter()
                        .map(|m| m.as_str().to_string())
                        .collect(),
                ))
                .set_allowed_origins(Some(rule.allowed_origins.clone()))
                .set_allowed_headers(Some(rule.allowed_headers.clone()))
                .build()
                .map_err(|e| provisioning_error("build CORS rule", &bucket.name, e))?;

            s3_cors_rules.push(s3_rule);
        }

        let config = CorsConfiguration::builder()
            .set_cors_rules(Some(s3_cors_rules))
            .build()
            .map_err(|e| provisioning_error("build CORS configuration", &bucket.name, e))?;

        self.client
            .put_bucket_cors()
            .bucket(&bucket.name)
            .cors_configuration(config)
            .send()
            .await
            .map_err(|e| provisioning_error("apply CORS configuration", &bucket.name, e))?;

        debug!("Applied CORS configuration on '{}'", bucket.name);
        Ok(())
    }

    async fn apply_bucket_policy(&self, declaration: &Declaration) -> Result<()> {
        let bucket_name = &declaration.bucket.name;
        let policy = declaration.policy.to_json()?;

        self.client
            .put_bucket_policy()
            .bucket(bucket_name)
            .policy(policy)
            .send()
            .await
            .map_err(|e| provisioning_error("apply bucket policy", bucket_name, e))?;

        debug!(
            "Applied bucket policy with {} statement(s) on '{}'",
            declaration.policy.len(),
            bucket_name
        );
        Ok(())
    }

    async fn bucket_exists(&self, bucket_name: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(provisioning_error("check", bucket_name, service_error))
                }
            }
        }
    }

    async fn empty_bucket(&self, bucket_name: &str) -> Result<()> {
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket_name)
                .max_keys(1000)
                .send()
                .await
                .map_err(|e| provisioning_error("list objects", bucket_name, e))?;

            let identifiers = resp
                .contents()
                .iter()
                .filter_map(|obj| obj.key())
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| provisioning_error("build object identifiers", bucket_name, e))?;

            if identifiers.is_empty() {
                break;
            }

            let count = identifiers.len();
            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build()
                .map_err(|e| provisioning_error("build delete request", bucket_name, e))?;

            self.client
                .delete_objects()
                .bucket(bucket_name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| provisioning_error("delete objects", bucket_name, e))?;

            debug!("Deleted {} objects from '{}'", count, bucket_name);
        }

        Ok(())
    }

    async fn delete_bucket(&self, bucket_name: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket_name)
            .send()
            .await
            .map_err(|e| provisioning_error("delete bucket", bucket_name, e))?;

        Ok(())
    }
}

#[async_trait]
impl ProvisioningBackend for S3Backend {
    async fn apply(&self, declaration: &Declaration) -> Result<()> {
        let bucket_name = &declaration.bucket.name;
        let created = self.create_bucket(bucket_name).await?;

        if let Err(e) = self.configure_bucket(declaration).await {
            error!("Configuring bucket '{}' failed: {}", bucket_name, e);
            if created {
                // Nothing has been written yet, so the bucket is still empty.
                match self.delete_bucket(bucket_name).await {
                    Ok(()) => info!("Rolled back bucket '{}'", bucket_name),
                    Err(rollback) => {
                        error!("Rollback of bucket '{}' failed: {}", bucket_name, rollback)
                    }
                }
            }
            return Err(e);
        }

        info!("Bucket '{}' is up to date", bucket_name);
        Ok(())
    }

    async fn teardown(&self, bucket: &BucketSpec) -> Result<()> {
        if !bucket.destroy_on_teardown() {
            info!("Retaining bucket '{}'", bucket.name);
            return Ok(());
        }

        if !self.bucket_exists(&bucket.name).await? {
            warn!("Bucket '{}' does not exist; nothing to tear down", bucket.name);
            return Ok(());
        }

        self.empty_bucket(&bucket.name).await?;
        self.delete_bucket(&bucket.name).await?;
        info!("Deleted bucket '{}'", bucket.name);
        Ok(())
    }
}
