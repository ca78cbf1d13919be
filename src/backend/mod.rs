//! Provisioning backend that realizes declarations
//!
//! Applies a declared bucket (visibility, lifecycle, CORS and resource
//! policy) to S3-compatible storage, and tears it down again.

pub mod mock;
pub mod s3;

pub use mock::MockBackend;
pub use s3::S3Backend;

use crate::bucket::BucketSpec;
use crate::provisioner::Declaration;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Realize the declaration. Either every part is applied or the call
    /// fails and nothing created by this call is left behind.
    async fn apply(&self, declaration: &Declaration) -> Result<()>;

    /// Delete every object and then the bucket. A missing bucket is not an
    /// error.
    async fn teardown(&self, bucket: &BucketSpec) -> Result<()>;
}
