//! Page-level read access to Identity Center and its neighbouring services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use idc_model::{
    Account, AttachedPolicy, CustomerManagedPolicy, Group, OrganizationRoot, PermissionSet,
    PrincipalRef, User,
};

use crate::error::FetchResult;

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// An Identity Center instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub arn: String,
    pub identity_store_id: String,
}

/// A group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub membership_id: String,
    pub user_id: String,
}

/// An organizational unit as listed under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuRecord {
    pub id: String,
    pub name: String,
}

/// An AWS-managed IAM policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub name: String,
    pub arn: String,
    pub default_version_id: Option<String>,
}

/// An Identity Center application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: String,
    pub arn: String,
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub key: String,
    pub value: String,
}

impl TagRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Read-only directory API.
///
/// Every list call returns a single page; the caller drives pagination.
/// Groups are returned without members; memberships are listed separately.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Region the client talks to.
    fn region(&self) -> String;

    async fn list_instances(&self, next_token: Option<String>) -> FetchResult<Page<InstanceRecord>>;

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<User>>;

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Group>>;

    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        group_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<MembershipRecord>>;

    async fn list_roots(&self, next_token: Option<String>) -> FetchResult<Page<OrganizationRoot>>;

    async fn list_organizational_units(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<OuRecord>>;

    /// All accounts, whatever their status.
    async fn list_accounts(&self, next_token: Option<String>) -> FetchResult<Page<Account>>;

    /// Permission set ARNs.
    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>>;

    /// Permission set attributes without policies or tags.
    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<PermissionSet>;

    /// Raw inline policy JSON, `None` when the permission set has none.
    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<Option<String>>;

    async fn list_managed_policies_in_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<AttachedPolicy>>;

    async fn list_customer_managed_policy_references(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<CustomerManagedPolicy>>;

    async fn list_permission_set_tags(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>>;

    /// Account ids the permission set is provisioned to.
    async fn list_accounts_for_provisioned_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>>;

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>>;

    /// AWS-scoped managed policies.
    async fn list_aws_managed_policies(
        &self,
        next_token: Option<String>,
    ) -> FetchResult<Page<PolicyRecord>>;

    /// Decoded policy version document.
    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> FetchResult<String>;

    async fn list_applications(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<ApplicationRecord>>;

    async fn list_application_assignments(
        &self,
        application_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>>;

    /// DynamoDB table names.
    async fn list_tables(&self, next_token: Option<String>) -> FetchResult<Page<String>>;

    async fn describe_table_arn(&self, table_name: &str) -> FetchResult<String>;

    async fn list_table_tags(
        &self,
        table_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>>;

    /// Items of a table as plain JSON objects.
    async fn scan_table(
        &self,
        table_name: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<serde_json::Value>>;
}
