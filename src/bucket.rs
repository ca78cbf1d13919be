//! Bucket declaration for resized image storage
//!
//! The bucket holds derived, regenerable assets: it never allows public
//! access, expires objects after 90 days, only serves cross-origin GETs and
//! is destroyed together with its objects on teardown.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const BUCKET_NAME_SUFFIX: &str = "-optimized-imgs";
pub const EXPIRATION_DAYS: i32 = 90;
pub const LIFECYCLE_RULE_ID: &str = "ExpireAfter90Days";
pub const DEFAULT_PARTITION: &str = "aws";

/// Derive the resized bucket name from the upstream bucket name.
pub fn derive_bucket_name(original_bucket_name: &str) -> String {
    format!("{}{}", original_bucket_name, BUCKET_NAME_SUFFIX)
}

/// Check a bucket name against the S3 naming rules.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(Error::Config(format!(
            "Bucket name '{}' must be between 3 and 63 characters",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(Error::Config(format!(
            "Bucket name '{}' may only contain lowercase letters, digits, '-' and '.'",
            name
        )));
    }

    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(Error::Config(format!(
            "Bucket name '{}' must start and end with a letter or digit",
            name
        )));
    }

    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(Error::Config(format!(
            "Bucket name '{}' must not contain '..', '.-' or '-.'",
            name
        )));
    }

    if is_ipv4_shaped(name) {
        return Err(Error::Config(format!(
            "Bucket name '{}' must not be formatted as an IP address",
            name
        )));
    }

    const RESERVED_PREFIXES: [&str; 2] = ["xn--", "sthree-"];
    const RESERVED_SUFFIXES: [&str; 2] = ["-s3alias", "--ol-s3"];
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| name.starts_with(*p)) {
        return Err(Error::Config(format!(
            "Bucket name '{}' must not start with reserved prefix '{}'",
            name, prefix
        )));
    }
    if let Some(suffix) = RESERVED_SUFFIXES.iter().find(|s| name.ends_with(*s)) {
        return Err(Error::Config(format!(
            "Bucket name '{}' must not end with reserved suffix '{}'",
            name, suffix
        )));
    }

    Ok(())
}

fn is_ipv4_shaped(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.len() <= 3 && p.chars().all(|c| c.is_ascii_digit()))
}

/// Block-public-access settings. All four flags are always on; there is no
/// way to construct a weaker value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlock {
    block_public_acls: bool,
    ignore_public_acls: bool,
    block_public_policy: bool,
    restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub const fn block_all() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }

    pub fn block_public_acls(&self) -> bool {
        self.block_public_acls
    }

    pub fn ignore_public_acls(&self) -> bool {
        self.ignore_public_acls
    }

    pub fn block_public_policy(&self) -> bool {
        self.block_public_policy
    }

    pub fn restrict_public_buckets(&self) -> bool {
        self.restrict_public_buckets
    }

    pub fn is_fully_blocked(&self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub id: String,
    pub prefix: String,
    pub expiration_days: i32,
    pub enabled: bool,
}

impl LifecycleRule {
    pub fn expire_after_days(id: &str, days: i32) -> Self {
        Self {
            id: id.to_string(),
            prefix: String::new(),
            expiration_days: days,
            enabled: true,
        }
    }
}

/// HTTP methods a CORS rule can allow. Only `Get` is ever used for this
/// bucket; the others exist so that checks against them are expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Post | HttpMethod::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    pub allowed_methods: Vec<HttpMethod>,
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
}

impl CorsRule {
    /// Read-only cross-origin access from any origin with any header.
    pub fn read_only_any_origin() -> Self {
        Self {
            allowed_methods: vec![HttpMethod::Get],
            allowed_origins: vec!["*".to_string()],
            allowed_headers: vec!["*".to_string()],
        }
    }
}

/// What happens to the bucket when its provisioning unit is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    /// Delete all objects, then the bucket itself.
    Destroy,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSpec {
    pub logical_id: String,
    pub name: String,
    pub partition: String,
    pub public_access: PublicAccessBlock,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub cors_rules: Vec<CorsRule>,
    pub removal_policy: RemovalPolicy,
}

impl BucketSpec {
    /// Bucket for derived images of `original_bucket_name`.
    pub fn resized_images(logical_id: &str, original_bucket_name: &str, partition: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            name: derive_bucket_name(original_bucket_name),
            partition: partition.to_string(),
            public_access: PublicAccessBlock::block_all(),
            lifecycle_rules: vec![LifecycleRule::expire_after_days(
                LIFECYCLE_RULE_ID,
                EXPIRATION_DAYS,
            )],
            cors_rules: vec![CorsRule::read_only_any_origin()],
            removal_policy: RemovalPolicy::Destroy,
        }
    }

    pub fn arn(&self) -> String {
        format!("arn:{}:s3:::{}", self.partition, self.name)
    }

    /// ARN pattern covering every object in the bucket.
    pub fn objects_arn(&self) -> String {
        format!("{}/*", self.arn())
    }

    pub fn destroy_on_teardown(&self) -> bool {
        self.removal_policy == RemovalPolicy::Destroy
    }
}
