//! Edge-function execution role lookup
//!
//! The execution role is owned by another provisioning unit and may not
//! exist yet. Resolution is a lookup only: a missing role resolves to `None`
//! and is never an error.

pub mod iam;
pub mod mock;

pub use iam::IamRoleResolver;
pub use mock::MockRoleResolver;

use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt;

/// A parsed IAM role ARN, `arn:<partition>:iam::<account>:role/<path/name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleArn {
    raw: String,
    partition: String,
    account_id: String,
    role_name: String,
}

impl RoleArn {
    pub fn parse(arn: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::Config(format!("Invalid role ARN '{}': {}", arn, reason))
        };

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(invalid("expected arn:<partition>:iam::<account>:role/<name>"));
        }

        let (partition, service, region, account_id, resource) =
            (parts[1], parts[2], parts[3], parts[4], parts[5]);

        if partition.is_empty() {
            return Err(invalid("missing partition"));
        }
        if service != "iam" {
            return Err(invalid("service must be 'iam'"));
        }
        if !region.is_empty() {
            return Err(invalid("IAM ARNs carry no region"));
        }
        if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("account id must be 12 digits"));
        }

        let path = resource
            .strip_prefix("role/")
            .ok_or_else(|| invalid("resource must start with 'role/'"))?;
        let role_name = path.rsplit('/').next().unwrap_or_default();
        if role_name.is_empty() {
            return Err(invalid("missing role name"));
        }

        Ok(Self {
            raw: arn.to_string(),
            partition: partition.to_string(),
            account_id: account_id.to_string(),
            role_name: role_name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Role name without its path, as accepted by `GetRole`.
    pub fn role_name(&self) -> &str {
        &self.role_name
    }
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A role that was found to exist at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleReference {
    arn: RoleArn,
}

impl RoleReference {
    pub fn new(arn: RoleArn) -> Self {
        Self { arn }
    }

    pub fn arn(&self) -> &str {
        self.arn.as_str()
    }

    pub fn role_name(&self) -> &str {
        self.arn.role_name()
    }
}

#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Look the role up. `Ok(None)` means the role does not exist yet.
    async fn resolve(&self, arn: &RoleArn) -> Result<Option<RoleReference>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_arn() {
        let arn = RoleArn::parse("arn:aws:iam::123456789012:role/edge-resize-role").unwrap();

        assert_eq!(arn.partition(), "aws");
        assert_eq!(arn.account_id(), "123456789012");
        assert_eq!(arn.role_name(), "edge-resize-role");
        assert_eq!(arn.to_string(), "arn:aws:iam::123456789012:role/edge-resize-role");
    }

    #[test]
    fn test_parse_role_arn_with_path() {
        let arn =
            RoleArn::parse("arn:aws:iam::123456789012:role/service-role/edge/resizer").unwrap();
        assert_eq!(arn.role_name(), "resizer");
    }

    #[test]
    fn test_parse_role_arn_other_partition() {
        let arn = RoleArn::parse("arn:aws-cn:iam::123456789012:role/resizer").unwrap();
        assert_eq!(arn.partition(), "aws-cn");
    }

    #[test]
    fn test_parse_role_arn_rejects_malformed() {
        let cases = [
            "",
            "edge-role",
            "arn:aws:iam::123456789012",
            "arn::iam::123456789012:role/edge",
            "arn:aws:s3::123456789012:role/edge",
            "arn:aws:iam:us-east-1:123456789012:role/edge",
            "arn:aws:iam::1234:role/edge",
            "arn:aws:iam::123456789012:user/edge",
            "arn:aws:iam::123456789012:role/",
            "arn:aws:iam::123456789012:role/path/",
        ];

        for case in cases {
            let err = RoleArn::parse(case).unwrap_err();
            assert!(err.is_config(), "expected config error for '{}'", case);
        }
    }
}
