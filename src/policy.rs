//! Bucket resource policy
//!
//! Statements are kept in a set keyed by statement id, so the rendered
//! document never depends on the order grants were added in.

use crate::bucket::BucketSpec;
use crate::role::RoleReference;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const POLICY_VERSION: &str = "2012-10-17";

pub const CLOUDFRONT_READ_SID: &str = "GrantCloudFrontAccessToBucket";
// Policies already attached to deployed buckets use this sid for the write grant.
pub const EDGE_FUNCTION_WRITE_SID: &str = "GrantReadAccessToResizeEdgeFunction";

const ORIGIN_ACCESS_IDENTITY_ARN_PREFIX: &str =
    "arn:aws:iam::cloudfront:user/CloudFront Origin Access Identity ";

pub const ACTION_GET_OBJECT: &str = "s3:GetObject";
pub const ACTION_LIST_BUCKET: &str = "s3:ListBucket";
pub const ACTION_PUT_OBJECT: &str = "s3:PutObject";

/// An identity referenced by ARN in a policy statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessPrincipal(String);

impl AccessPrincipal {
    pub fn from_arn(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    /// Principal for a CloudFront origin access identity.
    pub fn origin_access_identity(user_id: &str) -> Self {
        Self(format!("{}{}", ORIGIN_ACCESS_IDENTITY_ARN_PREFIX, user_id))
    }

    pub fn role(role: &RoleReference) -> Self {
        Self(role.arn().to_string())
    }

    pub fn arn(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    pub principals: BTreeSet<AccessPrincipal>,
    pub actions: BTreeSet<String>,
    pub resources: BTreeSet<String>,
}

impl PolicyStatement {
    pub fn allow(sid: &str) -> Self {
        Self {
            sid: sid.to_string(),
            effect: Effect::Allow,
            principals: BTreeSet::new(),
            actions: BTreeSet::new(),
            resources: BTreeSet::new(),
        }
    }

    pub fn principal(mut self, principal: AccessPrincipal) -> Self {
        self.principals.insert(principal);
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.actions.insert(action.to_string());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.insert(resource.into());
        self
    }

    /// Read and list access on the bucket and every object in it.
    pub fn delivery_read(bucket: &BucketSpec, principal: AccessPrincipal) -> Self {
        Self::allow(CLOUDFRONT_READ_SID)
            .principal(principal)
            .action(ACTION_GET_OBJECT)
            .action(ACTION_LIST_BUCKET)
            .resource(bucket.arn())
            .resource(bucket.objects_arn())
    }

    /// Write-only access to objects; no read, list or delete.
    pub fn edge_write(bucket: &BucketSpec, principal: AccessPrincipal) -> Self {
        Self::allow(EDGE_FUNCTION_WRITE_SID)
            .principal(principal)
            .action(ACTION_PUT_OBJECT)
            .resource(bucket.objects_arn())
    }

    fn document(&self) -> StatementDocument<'_> {
        let mut arns: Vec<&str> = self.principals.iter().map(AccessPrincipal::arn).collect();
        let aws = if arns.len() == 1 {
            OneOrMany::One(arns.remove(0))
        } else {
            OneOrMany::Many(arns)
        };

        StatementDocument {
            sid: &self.sid,
            effect: self.effect,
            principal: PrincipalDocument { aws },
            action: self.actions.iter().map(String::as_str).collect(),
            resource: self.resources.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum OneOrMany<'a> {
    One(&'a str),
    Many(Vec<&'a str>),
}

#[derive(Serialize)]
struct PrincipalDocument<'a> {
    #[serde(rename = "AWS")]
    aws: OneOrMany<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StatementDocument<'a> {
    sid: &'a str,
    effect: Effect,
    principal: PrincipalDocument<'a>,
    action: Vec<&'a str>,
    resource: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument<'a> {
    version: &'static str,
    statement: Vec<StatementDocument<'a>>,
}

/// Append-only set of statements attached to the bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketPolicy {
    statements: BTreeMap<String, PolicyStatement>,
}

impl BucketPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement. A statement id can only be added once.
    pub fn add_statement(&mut self, statement: PolicyStatement) -> Result<()> {
        if self.statements.contains_key(&statement.sid) {
            return Err(Error::Config(format!(
                "Duplicate policy statement id '{}'",
                statement.sid
            )));
        }
        self.statements.insert(statement.sid.clone(), statement);
        Ok(())
    }

    pub fn get(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statements.get(sid)
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.statements.contains_key(sid)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &PolicyStatement> {
        self.statements.values()
    }

    pub fn to_document(&self) -> Result<serde_json::Value> {
        let document = PolicyDocument {
            version: POLICY_VERSION,
            statement: self.statements.values().map(|s| s.document()).collect(),
        };
        Ok(serde_json::to_value(document)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_document()?)?)
    }
}
