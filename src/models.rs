//! Provisioning inputs and configuration
//!
//! `StackInputs` is the boundary contract of the provisioner: every field is
//! supplied by the caller with no defaults. `Config` is the CLI layer that
//! gathers those inputs from the environment.

use crate::bucket::{derive_bucket_name, validate_bucket_name, DEFAULT_PARTITION};
use crate::role::RoleArn;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackInputs {
    /// Logical id of the bucket within its provisioning unit.
    pub bucket_id: String,
    pub original_bucket_name: String,
    pub origin_access_identity_user_id: String,
    pub edge_function_role_arn: String,
    pub stage: String,
    pub partition: String,
}

/// Inputs that passed validation, with the role ARN already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInputs {
    pub inputs: StackInputs,
    pub edge_function_role_arn: RoleArn,
}

impl StackInputs {
    pub fn new(
        bucket_id: &str,
        original_bucket_name: &str,
        origin_access_identity_user_id: &str,
        edge_function_role_arn: &str,
        stage: &str,
    ) -> Self {
        Self {
            bucket_id: bucket_id.to_string(),
            original_bucket_name: original_bucket_name.to_string(),
            origin_access_identity_user_id: origin_access_identity_user_id.to_string(),
            edge_function_role_arn: edge_function_role_arn.to_string(),
            stage: stage.to_string(),
            partition: DEFAULT_PARTITION.to_string(),
        }
    }

    pub fn with_partition(mut self, partition: &str) -> Self {
        self.partition = partition.to_string();
        self
    }

    /// Check every input locally so that malformed values never reach AWS.
    pub fn validate(&self) -> Result<ValidatedInputs> {
        require_non_empty("bucket id", &self.bucket_id)?;
        if !self.bucket_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Config(format!(
                "Bucket id '{}' must be alphanumeric",
                self.bucket_id
            )));
        }

        require_non_empty("stage", &self.stage)?;
        if !self
            .stage
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Config(format!(
                "Stage '{}' may only contain letters, digits, '-' and '_'",
                self.stage
            )));
        }

        require_non_empty("partition", &self.partition)?;

        require_non_empty("original bucket name", &self.original_bucket_name)?;
        validate_bucket_name(&self.original_bucket_name)?;
        validate_bucket_name(&derive_bucket_name(&self.original_bucket_name))?;

        require_non_empty(
            "origin access identity user id",
            &self.origin_access_identity_user_id,
        )?;
        if !self
            .origin_access_identity_user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::Config(format!(
                "Origin access identity user id '{}' must be alphanumeric",
                self.origin_access_identity_user_id
            )));
        }

        let edge_function_role_arn = RoleArn::parse(&self.edge_function_role_arn)?;

        Ok(ValidatedInputs {
            inputs: self.clone(),
            edge_function_role_arn,
        })
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} must not be empty", field)));
    }
    Ok(())
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: StackInputs,
    pub region: Option<String>,
    pub exports_path: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        allow_missing_dotenv(dotenvy::dotenv())?;

        let required = |name: &str| {
            std::env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
        };

        let inputs = StackInputs::new(
            &required("BUCKET_ID")?,
            &required("ORIGINAL_BUCKET_NAME")?,
            &required("ORIGIN_ACCESS_IDENTITY_USER_ID")?,
            &required("EDGE_FUNCTION_ROLE_ARN")?,
            &required("STAGE")?,
        )
        .with_partition(
            &std::env::var("AWS_PARTITION").unwrap_or_else(|_| DEFAULT_PARTITION.to_string()),
        );

        Ok(Self {
            inputs,
            region: std::env::var("AWS_REGION").ok(),
            exports_path: std::env::var("EXPORTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output").join("exports.json")),
            dry_run: std::env::var("DRY_RUN")
                .map(|v| parse_bool_flag(&v))
                .unwrap_or(false),
        })
    }
}

/// A missing `.env` is fine; one that exists but cannot be read or parsed is not.
fn allow_missing_dotenv<T>(loaded: std::result::Result<T, dotenvy::Error>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/edge-resize";

    fn inputs() -> StackInputs {
        StackInputs::new("ResizedBucket", "myapp-images", "E1A2B3C4", ROLE, "prod")
    }

    #[test]
    fn test_valid_inputs() {
        let validated = inputs().validate().unwrap();
        assert_eq!(validated.edge_function_role_arn.role_name(), "edge-resize");
        assert_eq!(validated.inputs.partition, "aws");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let mut cases = Vec::new();

        let mut i = inputs();
        i.bucket_id = String::new();
        cases.push(i);

        let mut i = inputs();
        i.original_bucket_name = "  ".to_string();
        cases.push(i);

        let mut i = inputs();
        i.origin_access_identity_user_id = String::new();
        cases.push(i);

        let mut i = inputs();
        i.edge_function_role_arn = String::new();
        cases.push(i);

        let mut i = inputs();
        i.stage = String::new();
        cases.push(i);

        for case in cases {
            assert!(case.validate().unwrap_err().is_config());
        }
    }

    #[test]
    fn test_malformed_identifiers_rejected() {
        let mut i = inputs();
        i.origin_access_identity_user_id = "E1A2 B3C4".to_string();
        assert!(i.validate().unwrap_err().is_config());

        let mut i = inputs();
        i.edge_function_role_arn = "edge-resize".to_string();
        assert!(i.validate().unwrap_err().is_config());

        let mut i = inputs();
        i.bucket_id = "Resized-Bucket".to_string();
        assert!(i.validate().unwrap_err().is_config());

        let mut i = inputs();
        i.stage = "prod/eu".to_string();
        assert!(i.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_original_bucket_names_rejected_locally() {
        for name in ["my..images", "192.168.0.1", "xn--images", "a.-b"] {
            let mut i = inputs();
            i.original_bucket_name = name.to_string();
            let err = i.validate().unwrap_err();
            assert!(err.is_config(), "expected config error for '{}'", name);
        }
    }

    #[test]
    fn test_invalid_derived_bucket_name_rejected() {
        let mut i = inputs();
        i.original_bucket_name = "MyApp_Images".to_string();
        assert!(i.validate().unwrap_err().is_config());

        let mut i = inputs();
        i.original_bucket_name = "a".repeat(50);
        assert!(i.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();

        let loaded = dotenvy::from_path(dir.path().join(".env"));

        assert!(allow_missing_dotenv(loaded).is_ok());
    }

    #[test]
    fn test_malformed_dotenv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RESIZED_TEST_BROKEN='unterminated\n").unwrap();

        let err = allow_missing_dotenv(dotenvy::from_path(&path)).unwrap_err();

        assert!(matches!(err, Error::EnvVar(_)));
    }

    #[test]
    fn test_parse_bool_flag() {
        assert!(parse_bool_flag("true"));
        assert!(parse_bool_flag("1"));
        assert!(parse_bool_flag(" YES "));
        assert!(!parse_bool_flag("false"));
        assert!(!parse_bool_flag(""));
    }
}
