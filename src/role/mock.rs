use super::{RoleArn, RoleReference, RoleResolver};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// In-memory role directory for tests and dry runs.
#[derive(Clone)]
pub struct MockRoleResolver {
    roles: Arc<Mutex<HashSet<String>>>,
    resolve_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockRoleResolver {
    pub fn new() -> Self {
        Self {
            roles: Arc::new(Mutex::new(HashSet::new())),
            resolve_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_role(self, arn: &str) -> Self {
        self.roles.lock().unwrap().insert(arn.to_string());
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn add_role(&self, arn: &str) {
        self.roles.lock().unwrap().insert(arn.to_string());
    }

    pub fn get_resolve_count(&self) -> usize {
        *self.resolve_count.lock().unwrap()
    }
}

impl Default for MockRoleResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleResolver for MockRoleResolver {
    async fn resolve(&self, arn: &RoleArn) -> Result<Option<RoleReference>> {
        *self.resolve_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::Provisioning(format!(
                "Failed to look up role '{}': mock failure",
                arn
            )));
        }

        if self.roles.lock().unwrap().contains(arn.as_str()) {
            Ok(Some(RoleReference::new(arn.clone())))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/edge-resize";

    #[tokio::test]
    async fn test_mock_resolves_known_role() {
        let resolver = MockRoleResolver::new().with_role(ROLE);
        let arn = RoleArn::parse(ROLE).unwrap();

        let role = resolver.resolve(&arn).await.unwrap().unwrap();
        assert_eq!(role.arn(), ROLE);
        assert_eq!(role.role_name(), "edge-resize");
        assert_eq!(resolver.get_resolve_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_role_is_absent() {
        let resolver = MockRoleResolver::new();
        let arn = RoleArn::parse(ROLE).unwrap();

        assert!(resolver.resolve(&arn).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_role_added_later_resolves() {
        let resolver = MockRoleResolver::new();
        let arn = RoleArn::parse(ROLE).unwrap();

        assert!(resolver.resolve(&arn).await.unwrap().is_none());
        resolver.add_role(ROLE);
        assert!(resolver.resolve(&arn).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let resolver = MockRoleResolver::new().with_role(ROLE).with_failure(true);
        let arn = RoleArn::parse(ROLE).unwrap();

        let err = resolver.resolve(&arn).await.unwrap_err();
        assert!(!err.is_config());
    }
}
