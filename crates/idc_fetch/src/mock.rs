//! Mock directory for testing.
//!
//! Serves an in-memory fixture through the [`DirectoryApi`] trait, splitting
//! every listing into pages, capturing calls and injecting failures so the
//! fetcher can be exercised without AWS.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use idc_model::{
    Account, AttachedPolicy, CustomerManagedPolicy, Group, OrganizationRoot, PermissionSet,
    PrincipalRef, Snapshot, User,
};

use crate::directory::{
    ApplicationRecord, DirectoryApi, InstanceRecord, MembershipRecord, OuRecord, Page,
    PolicyRecord, TagRecord,
};
use crate::error::{FetchError, FetchResult};
use crate::team::TEAM_APPLICATION_NAME;

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub args: Vec<String>,
}

/// Failure to inject into a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Report throttling for the next `times` calls, then succeed.
    Throttle { times: u32 },
    /// Always fail authentication.
    Auth,
    /// Always fail with a generic API error.
    Api(String),
}

#[derive(Debug, Clone)]
struct MockTable {
    name: String,
    arn: String,
    tags: Vec<TagRecord>,
    items: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
struct Fixture {
    region: String,
    instances: Vec<InstanceRecord>,
    users: Vec<User>,
    groups: Vec<Group>,
    roots: Vec<OrganizationRoot>,
    ous: BTreeMap<String, Vec<OuRecord>>,
    accounts: Vec<Account>,
    permission_sets: Vec<PermissionSet>,
    provisioned: BTreeMap<String, Vec<String>>,
    assignments: BTreeMap<(String, String), Vec<PrincipalRef>>,
    policies: Vec<PolicyRecord>,
    documents: BTreeMap<String, String>,
    applications: Vec<ApplicationRecord>,
    application_assignments: BTreeMap<String, Vec<PrincipalRef>>,
    tables: Vec<MockTable>,
}

/// Mock directory for testing.
#[derive(Clone)]
pub struct MockDirectory {
    fixture: Arc<RwLock<Fixture>>,
    page_size: Arc<RwLock<usize>>,
    failures: Arc<RwLock<HashMap<String, MockFailure>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDirectory {
    /// Create an empty mock directory.
    pub fn new() -> Self {
        let fixture = Fixture {
            region: "us-east-1".to_string(),
            ..Fixture::default()
        };

        Self {
            fixture: Arc::new(RwLock::new(fixture)),
            page_size: Arc::new(RwLock::new(100)),
            failures: Arc::new(RwLock::new(HashMap::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve the contents of an existing snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mock = Self::new()
            .set_region(snapshot.instance.region.clone())
            .add_instance(
                snapshot.instance.arn.clone(),
                snapshot.instance.identity_store_id.clone(),
            )
            .add_root(snapshot.organization.root.clone());

        {
            let mut f = mock.fixture.write();
            f.users.extend(snapshot.users.values().cloned());
            f.groups.extend(snapshot.groups.values().cloned());
            f.accounts
                .extend(snapshot.organization.accounts.values().cloned());

            for ou in snapshot.organization.organizational_units.values() {
                f.ous.entry(ou.parent_id.clone()).or_default().push(OuRecord {
                    id: ou.id.clone(),
                    name: ou.name.clone(),
                });
            }

            f.permission_sets
                .extend(snapshot.permission_sets.values().cloned());

            for a in &snapshot.assignments {
                let accounts = f.provisioned.entry(a.permission_set_arn.clone()).or_default();
                if !accounts.contains(&a.account_id) {
                    accounts.push(a.account_id.clone());
                }
                f.assignments
                    .entry((a.account_id.clone(), a.permission_set_arn.clone()))
                    .or_default()
                    .push(a.principal.clone());
            }

            for policy in snapshot.managed_policies.values() {
                f.policies.push(PolicyRecord {
                    name: policy.name.clone(),
                    arn: policy.arn.clone(),
                    default_version_id: Some("v1".to_string()),
                });
                if let Some(doc) = &policy.document {
                    f.documents.insert(policy.arn.clone(), doc.to_string());
                }
            }

            if let Some(app) = snapshot
                .elevated_access
                .as_ref()
                .and_then(|ea| ea.application.as_ref())
            {
                f.applications.push(ApplicationRecord {
                    name: TEAM_APPLICATION_NAME.to_string(),
                    arn: app.arn.clone(),
                });
                f.application_assignments
                    .insert(app.arn.clone(), app.assignments.iter().cloned().collect());
            }
        }

        mock
    }

    /// Split every listing into pages of `size` items.
    pub fn with_page_size(self, size: usize) -> Self {
        *self.page_size.write() = size.max(1);
        self
    }

    pub fn set_region(self, region: impl Into<String>) -> Self {
        self.fixture.write().region = region.into();
        self
    }

    pub fn add_instance(self, arn: impl Into<String>, identity_store_id: impl Into<String>) -> Self {
        self.fixture.write().instances.push(InstanceRecord {
            arn: arn.into(),
            identity_store_id: identity_store_id.into(),
        });
        self
    }

    pub fn add_root(self, root: OrganizationRoot) -> Self {
        self.fixture.write().roots.push(root);
        self
    }

    pub fn add_organizational_unit(
        self,
        parent_id: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.fixture
            .write()
            .ous
            .entry(parent_id.into())
            .or_default()
            .push(OuRecord {
                id: id.into(),
                name: name.into(),
            });
        self
    }

    pub fn add_account(self, account: Account) -> Self {
        self.fixture.write().accounts.push(account);
        self
    }

    /// Add a user. Adding the same user twice serves it twice.
    pub fn add_user(self, user: User) -> Self {
        self.fixture.write().users.push(user);
        self
    }

    /// Add a group; its `members` are served as memberships.
    pub fn add_group(self, group: Group) -> Self {
        self.fixture.write().groups.push(group);
        self
    }

    /// Add a fully described permission set.
    pub fn add_permission_set(self, permission_set: PermissionSet) -> Self {
        self.fixture.write().permission_sets.push(permission_set);
        self
    }

    pub fn add_assignment(
        self,
        account_id: impl Into<String>,
        permission_set_arn: impl Into<String>,
        principal: PrincipalRef,
    ) -> Self {
        let account_id = account_id.into();
        let ps_arn = permission_set_arn.into();
        {
            let mut f = self.fixture.write();
            let accounts = f.provisioned.entry(ps_arn.clone()).or_default();
            if !accounts.contains(&account_id) {
                accounts.push(account_id.clone());
            }
            f.assignments
                .entry((account_id, ps_arn))
                .or_default()
                .push(principal);
        }
        self
    }

    pub fn add_managed_policy(
        self,
        name: impl Into<String>,
        arn: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        let arn = arn.into();
        {
            let mut f = self.fixture.write();
            f.policies.push(PolicyRecord {
                name: name.into(),
                arn: arn.clone(),
                default_version_id: Some("v1".to_string()),
            });
            f.documents.insert(arn, document.into());
        }
        self
    }

    pub fn add_application(
        self,
        name: impl Into<String>,
        arn: impl Into<String>,
        assignments: Vec<PrincipalRef>,
    ) -> Self {
        let arn = arn.into();
        {
            let mut f = self.fixture.write();
            f.applications.push(ApplicationRecord {
                name: name.into(),
                arn: arn.clone(),
            });
            f.application_assignments.insert(arn, assignments);
        }
        self
    }

    /// Add a DynamoDB table with tags and plain JSON items.
    pub fn add_table(
        self,
        name: impl Into<String>,
        arn: impl Into<String>,
        tags: Vec<TagRecord>,
        items: Vec<Value>,
    ) -> Self {
        self.fixture.write().tables.push(MockTable {
            name: name.into(),
            arn: arn.into(),
            tags,
            items,
        });
        self
    }

    /// Inject a failure into a method.
    pub fn simulate_failure(self, method: impl Into<String>, failure: MockFailure) -> Self {
        self.failures.write().insert(method.into(), failure);
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Record a call and apply any injected failure.
    fn enter(&self, method: &str, args: &[&str]) -> FetchResult<()> {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });

        let mut failures = self.failures.write();
        match failures.get_mut(method) {
            Some(MockFailure::Throttle { times }) if *times > 0 => {
                *times -= 1;
                Err(FetchError::throttled(method))
            }
            Some(MockFailure::Auth) => Err(FetchError::Auth(format!(
                "{}: The security token included in the request is expired",
                method
            ))),
            Some(MockFailure::Api(message)) => Err(FetchError::api(method, message.clone())),
            _ => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: &[T], next_token: Option<String>) -> FetchResult<Page<T>> {
        let size = *self.page_size.read();
        let start = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| FetchError::InvalidData {
                source_name: "mock".to_string(),
                message: format!("invalid page token '{}'", token),
            })?,
            None => 0,
        };

        let end = (start + size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next = if end < items.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(Page::new(slice, next))
    }

    fn find_permission_set(&self, arn: &str) -> FetchResult<PermissionSet> {
        self.fixture
            .read()
            .permission_sets
            .iter()
            .find(|ps| ps.arn == arn)
            .cloned()
            .ok_or_else(|| FetchError::not_found(arn))
    }
}

#[async_trait]
impl DirectoryApi for MockDirectory {
    fn region(&self) -> String {
        self.fixture.read().region.clone()
    }

    async fn list_instances(&self, next_token: Option<String>) -> FetchResult<Page<InstanceRecord>> {
        self.enter("list_instances", &[])?;
        let items = self.fixture.read().instances.clone();
        self.page(&items, next_token)
    }

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<User>> {
        self.enter("list_users", &[identity_store_id])?;
        let items = self.fixture.read().users.clone();
        self.page(&items, next_token)
    }

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Group>> {
        self.enter("list_groups", &[identity_store_id])?;
        let items: Vec<Group> = self
            .fixture
            .read()
            .groups
            .iter()
            .map(|g| Group {
                members: BTreeMap::new(),
                ..g.clone()
            })
            .collect();
        self.page(&items, next_token)
    }

    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        group_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<MembershipRecord>> {
        self.enter("list_group_memberships", &[identity_store_id, group_id])?;
        let items: Vec<MembershipRecord> = self
            .fixture
            .read()
            .groups
            .iter()
            .filter(|g| g.id == group_id)
            .flat_map(|g| {
                g.members.iter().map(|(user_id, membership_id)| MembershipRecord {
                    membership_id: membership_id.clone(),
                    user_id: user_id.clone(),
                })
            })
            .collect();
        self.page(&items, next_token)
    }

    async fn list_roots(&self, next_token: Option<String>) -> FetchResult<Page<OrganizationRoot>> {
        self.enter("list_roots", &[])?;
        let items = self.fixture.read().roots.clone();
        self.page(&items, next_token)
    }

    async fn list_organizational_units(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<OuRecord>> {
        self.enter("list_organizational_units", &[parent_id])?;
        let items = self
            .fixture
            .read()
            .ous
            .get(parent_id)
            .cloned()
            .unwrap_or_default();
        self.page(&items, next_token)
    }

    async fn list_accounts(&self, next_token: Option<String>) -> FetchResult<Page<Account>> {
        self.enter("list_accounts", &[])?;
        let items = self.fixture.read().accounts.clone();
        self.page(&items, next_token)
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        self.enter("list_permission_sets", &[instance_arn])?;
        let items: Vec<String> = self
            .fixture
            .read()
            .permission_sets
            .iter()
            .map(|ps| ps.arn.clone())
            .collect();
        self.page(&items, next_token)
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<PermissionSet> {
        self.enter("describe_permission_set", &[instance_arn, permission_set_arn])?;
        let ps = self.find_permission_set(permission_set_arn)?;
        let mut bare = PermissionSet::new(ps.arn, ps.name);
        bare.description = ps.description;
        bare.session_duration = ps.session_duration;
        bare.relay_state = ps.relay_state;
        Ok(bare)
    }

    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<Option<String>> {
        self.enter("get_inline_policy", &[instance_arn, permission_set_arn])?;
        let ps = self.find_permission_set(permission_set_arn)?;
        Ok(ps.inline_policy.map(|doc| doc.to_string()))
    }

    async fn list_managed_policies_in_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<AttachedPolicy>> {
        self.enter(
            "list_managed_policies_in_permission_set",
            &[instance_arn, permission_set_arn],
        )?;
        let ps = self.find_permission_set(permission_set_arn)?;
        let items: Vec<AttachedPolicy> = ps.managed_policies.into_iter().collect();
        self.page(&items, next_token)
    }

    async fn list_customer_managed_policy_references(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<CustomerManagedPolicy>> {
        self.enter(
            "list_customer_managed_policy_references",
            &[instance_arn, permission_set_arn],
        )?;
        let ps = self.find_permission_set(permission_set_arn)?;
        let items: Vec<CustomerManagedPolicy> = ps.customer_managed_policies.into_iter().collect();
        self.page(&items, next_token)
    }

    async fn list_permission_set_tags(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>> {
        self.enter("list_permission_set_tags", &[instance_arn, permission_set_arn])?;
        let ps = self.find_permission_set(permission_set_arn)?;
        let items: Vec<TagRecord> = ps
            .tags
            .into_iter()
            .map(|(key, value)| TagRecord { key, value })
            .collect();
        self.page(&items, next_token)
    }

    async fn list_accounts_for_provisioned_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        self.enter(
            "list_accounts_for_provisioned_permission_set",
            &[instance_arn, permission_set_arn],
        )?;
        let items = self
            .fixture
            .read()
            .provisioned
            .get(permission_set_arn)
            .cloned()
            .unwrap_or_default();
        self.page(&items, next_token)
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>> {
        self.enter(
            "list_account_assignments",
            &[instance_arn, account_id, permission_set_arn],
        )?;
        let items = self
            .fixture
            .read()
            .assignments
            .get(&(account_id.to_string(), permission_set_arn.to_string()))
            .cloned()
            .unwrap_or_default();
        self.page(&items, next_token)
    }

    async fn list_aws_managed_policies(
        &self,
        next_token: Option<String>,
    ) -> FetchResult<Page<PolicyRecord>> {
        self.enter("list_aws_managed_policies", &[])?;
        let items = self.fixture.read().policies.clone();
        self.page(&items, next_token)
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> FetchResult<String> {
        self.enter("get_policy_version_document", &[policy_arn, version_id])?;
        self.fixture
            .read()
            .documents
            .get(policy_arn)
            .cloned()
            .ok_or_else(|| FetchError::not_found(policy_arn))
    }

    async fn list_applications(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<ApplicationRecord>> {
        self.enter("list_applications", &[instance_arn])?;
        let items = self.fixture.read().applications.clone();
        self.page(&items, next_token)
    }

    async fn list_application_assignments(
        &self,
        application_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>> {
        self.enter("list_application_assignments", &[application_arn])?;
        let items = self
            .fixture
            .read()
            .application_assignments
            .get(application_arn)
            .cloned()
            .unwrap_or_default();
        self.page(&items, next_token)
    }

    async fn list_tables(&self, next_token: Option<String>) -> FetchResult<Page<String>> {
        self.enter("list_tables", &[])?;
        let items: Vec<String> = self
            .fixture
            .read()
            .tables
            .iter()
            .map(|t| t.name.clone())
            .collect();
        self.page(&items, next_token)
    }

    async fn describe_table_arn(&self, table_name: &str) -> FetchResult<String> {
        self.enter("describe_table_arn", &[table_name])?;
        self.fixture
            .read()
            .tables
            .iter()
            .find(|t| t.name == table_name)
            .map(|t| t.arn.clone())
            .ok_or_else(|| FetchError::not_found(table_name))
    }

    async fn list_table_tags(
        &self,
        table_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>> {
        self.enter("list_table_tags", &[table_arn])?;
        let items = self
            .fixture
            .read()
            .tables
            .iter()
            .find(|t| t.arn == table_arn)
            .map(|t| t.tags.clone())
            .unwrap_or_default();
        self.page(&items, next_token)
    }

    async fn scan_table(
        &self,
        table_name: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Value>> {
        self.enter("scan_table", &[table_name])?;
        let items = self
            .fixture
            .read()
            .tables
            .iter()
            .find(|t| t.name == table_name)
            .map(|t| t.items.clone())
            .unwrap_or_default();
        self.page(&items, next_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_pages_listings() {
        let mock = MockDirectory::new()
            .with_page_size(2)
            .add_instance("arn:1", "d-1")
            .add_instance("arn:2", "d-2")
            .add_instance("arn:3", "d-3");

        let first = mock.list_instances(None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let second = mock.list_instances(first.next_token).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_token.is_none());
        assert_eq!(mock.get_method_calls("list_instances").len(), 2);
    }

    #[tokio::test]
    async fn test_mock_throttle_then_recover() {
        let mock = MockDirectory::new()
            .add_instance("arn:1", "d-1")
            .simulate_failure("list_instances", MockFailure::Throttle { times: 1 });

        assert!(mock.list_instances(None).await.unwrap_err().is_throttled());
        assert_eq!(mock.list_instances(None).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_rejects_bad_token() {
        let mock = MockDirectory::new();
        assert!(mock.list_users("d-1", Some("abc".to_string())).await.is_err());
    }
}
