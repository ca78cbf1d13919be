use super::ProvisioningBackend;
use crate::bucket::BucketSpec;
use crate::provisioner::Declaration;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A bucket as the mock backend last saw it applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedBucket {
    pub spec: BucketSpec,
    pub policy_json: String,
    pub objects: Vec<String>,
}

/// In-memory backend for tests and dry runs.
#[derive(Clone)]
pub struct MockBackend {
    buckets: Arc<Mutex<HashMap<String, AppliedBucket>>>,
    foreign_buckets: Arc<Mutex<HashSet<String>>>,
    apply_count: Arc<Mutex<usize>>,
    teardown_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            foreign_buckets: Arc::new(Mutex::new(HashSet::new())),
            apply_count: Arc::new(Mutex::new(0)),
            teardown_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// A bucket name already taken by another account.
    pub fn with_foreign_bucket(self, name: &str) -> Self {
        self.foreign_buckets.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Simulate an object written into an applied bucket.
    pub fn put_object(&self, bucket_name: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .get_mut(bucket_name)
            .ok_or_else(|| Error::Provisioning(format!("No such bucket: {}", bucket_name)))?;
        bucket.objects.push(key.to_string());
        Ok(())
    }

    pub fn get_bucket(&self, name: &str) -> Option<AppliedBucket> {
        self.buckets.lock().unwrap().get(name).cloned()
    }

    pub fn get_bucket_count(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }

    pub fn get_apply_count(&self) -> usize {
        *self.apply_count.lock().unwrap()
    }

    pub fn get_teardown_count(&self) -> usize {
        *self.teardown_count.lock().unwrap()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningBackend for MockBackend {
    async fn apply(&self, declaration: &Declaration) -> Result<()> {
        *self.apply_count.lock().unwrap() += 1;

        let name = &declaration.bucket.name;
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Provisioning(format!(
                "Failed to create bucket '{}': mock failure",
                name
            )));
        }
        if self.foreign_buckets.lock().unwrap().contains(name) {
            return Err(Error::Provisioning(format!(
                "Failed to create bucket '{}': BucketAlreadyExists",
                name
            )));
        }

        let policy_json = declaration.policy.to_json()?;
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(name)
            .map(|b| b.objects.clone())
            .unwrap_or_default();
        buckets.insert(
            name.clone(),
            AppliedBucket {
                spec: declaration.bucket.clone(),
                policy_json,
                objects,
            },
        );
        Ok(())
    }

    async fn teardown(&self, bucket: &BucketSpec) -> Result<()> {
        *self.teardown_count.lock().unwrap() += 1;

        if bucket.destroy_on_teardown() {
            self.buckets.lock().unwrap().remove(&bucket.name);
        }
        Ok(())
    }
}
