use super::{RoleArn, RoleReference, RoleResolver};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::Client as IamClient;
use tracing::{debug, warn};

/// Resolves execution roles with IAM `GetRole`.
pub struct IamRoleResolver {
    client: IamClient,
}

impl IamRoleResolver {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: IamClient::new(config),
        }
    }
}

#[async_trait]
impl RoleResolver for IamRoleResolver {
    async fn resolve(&self, arn: &RoleArn) -> Result<Option<RoleReference>> {
        debug!("Looking up IAM role '{}'", arn.role_name());

        match self
            .client
            .get_role()
            .role_name(arn.role_name())
            .send()
            .await
        {
            Ok(output) => Ok(matching_reference(arn, output.role().map(|role| role.arn()))),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_entity_exception() {
                    warn!("IAM role '{}' does not exist yet", arn);
                    Ok(None)
                } else {
                    Err(Error::Provisioning(format!(
                        "Failed to look up role '{}': {}",
                        arn, service_error
                    )))
                }
            }
        }
    }
}

/// `GetRole` looks roles up by name only, so a role with the same name in
/// another account or under another path must not count as the requested one.
fn matching_reference(requested: &RoleArn, found_arn: Option<&str>) -> Option<RoleReference> {
    match found_arn {
        Some(found) if found == requested.as_str() => Some(RoleReference::new(requested.clone())),
        Some(found) => {
            warn!(
                "IAM role '{}' resolved to '{}', which is not the requested role; treating it as absent",
                requested, found
            );
            None
        }
        None => {
            warn!("IAM returned no role for '{}'", requested);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/edge-resize";

    fn requested() -> RoleArn {
        RoleArn::parse(ROLE).unwrap()
    }

    #[test]
    fn test_matching_arn_resolves() {
        let reference = matching_reference(&requested(), Some(ROLE)).unwrap();
        assert_eq!(reference.arn(), ROLE);
    }

    #[test]
    fn test_same_name_in_other_account_is_absent() {
        let found = "arn:aws:iam::210987654321:role/edge-resize";
        assert!(matching_reference(&requested(), Some(found)).is_none());
    }

    #[test]
    fn test_same_name_under_other_path_is_absent() {
        let found = "arn:aws:iam::123456789012:role/service-role/edge-resize";
        assert!(matching_reference(&requested(), Some(found)).is_none());
    }

    #[test]
    fn test_missing_role_in_response_is_absent() {
        assert!(matching_reference(&requested(), None).is_none());
    }
}
