//! Named values published for other provisioning units
//!
//! Other units never hold a handle to the bucket; they look its ARN and name
//! up by export name.

pub mod file;
pub mod mock;

pub use file::FileExportStore;
pub use mock::MockExportStore;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which bucket attribute an export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportKind {
    Arn,
    Name,
}

impl ExportKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ExportKind::Arn => "Arn",
            ExportKind::Name => "Name",
        }
    }
}

/// `{stage}-{bucket_id}{suffix}`
pub fn export_name(stage: &str, bucket_id: &str, kind: ExportKind) -> String {
    format!("{}-{}{}", stage, bucket_id, kind.suffix())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedValue {
    pub kind: ExportKind,
    pub export_name: String,
    pub value: String,
}

impl ExportedValue {
    pub fn new(kind: ExportKind, export_name: String, value: String) -> Self {
        Self {
            kind,
            export_name,
            value,
        }
    }

    /// Export of `kind` for the bucket `bucket_id` in `stage`.
    pub fn for_bucket(stage: &str, bucket_id: &str, kind: ExportKind, value: String) -> Self {
        Self::new(kind, export_name(stage, bucket_id, kind), value)
    }
}

#[async_trait]
pub trait ExportStore: Send + Sync {
    /// Publish values, replacing any previous value under the same name.
    async fn publish(&self, exports: &[ExportedValue]) -> Result<()>;
    async fn lookup(&self, export_name: &str) -> Result<Option<String>>;
    async fn remove(&self, export_names: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_name() {
        assert_eq!(
            export_name("prod", "ResizedBucket", ExportKind::Arn),
            "prod-ResizedBucketArn"
        );
        assert_eq!(
            export_name("staging", "ResizedBucket", ExportKind::Name),
            "staging-ResizedBucketName"
        );
    }

    #[test]
    fn test_for_bucket_keeps_kind() {
        let export = ExportedValue::for_bucket(
            "prod",
            "ResizedBucket",
            ExportKind::Name,
            "imgs-optimized-imgs".to_string(),
        );

        assert_eq!(export.kind, ExportKind::Name);
        assert_eq!(export.export_name, "prod-ResizedBucketName");
        assert_eq!(export.value, "imgs-optimized-imgs");
    }
}
