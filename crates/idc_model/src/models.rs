//! Data models for an IAM Identity Center snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk snapshot format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The Identity Center instance the snapshot was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoInstance {
    pub arn: String,
    pub identity_store_id: String,
    pub region: String,
}

impl SsoInstance {
    /// Last path segment of the instance ARN (`ssoins-...`).
    pub fn short_name(&self) -> &str {
        self.arn.rsplit('/').next().unwrap_or(&self.arn)
    }
}

/// Root of the organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRoot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
}

/// Lifecycle status of a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    PendingClosure,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::PendingClosure => "PENDING_CLOSURE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(AccountStatus::Active),
            "SUSPENDED" => Some(AccountStatus::Suspended),
            "PENDING_CLOSURE" => Some(AccountStatus::PendingClosure),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member account of the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub status: AccountStatus,
}

/// An organizational unit below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    /// Slash-separated path from the root, e.g. `Root/Workloads/Prod`.
    pub path: String,
    pub depth: u32,
}

/// Accounts and OUs of the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSnapshot {
    pub root: OrganizationRoot,
    /// Keyed by account id.
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
    /// Keyed by OU id.
    #[serde(default)]
    pub organizational_units: BTreeMap<String, OrganizationalUnit>,
}

impl OrganizationSnapshot {
    pub fn new(root: OrganizationRoot) -> Self {
        Self {
            root,
            accounts: BTreeMap::new(),
            organizational_units: BTreeMap::new(),
        }
    }

    pub fn add_account(&mut self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn add_organizational_unit(&mut self, ou: OrganizationalUnit) {
        self.organizational_units.insert(ou.id.clone(), ou);
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.name == name)
    }

    pub fn ou_by_name(&self, name: &str) -> Option<&OrganizationalUnit> {
        self.organizational_units.values().find(|ou| ou.name == name)
    }

    pub fn is_active_account(&self, account_id: &str) -> bool {
        self.accounts
            .get(account_id)
            .map_or(false, |a| a.status == AccountStatus::Active)
    }
}

/// A user in the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Provisioned by an external IdP (SCIM); rendered as a data source.
    #[serde(default)]
    pub scim: bool,
}

impl User {
    pub fn new(id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_name: user_name.into(),
            display_name: None,
            given_name: None,
            family_name: None,
            email: None,
            scim: false,
        }
    }
}

/// A group in the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scim: bool,
    /// Member user id -> membership id.
    #[serde(default)]
    pub members: BTreeMap<String, String>,
}

/// Kind of principal an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrincipalType {
    User,
    Group,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "USER",
            PrincipalType::Group => "GROUP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(PrincipalType::User),
            "GROUP" => Some(PrincipalType::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a user or group by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub kind: PrincipalType,
    pub id: String,
}

impl PrincipalRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalType::User,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalType::Group,
            id: id.into(),
        }
    }
}

/// A principal resolved against the identity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPrincipal<'a> {
    User(&'a User),
    Group(&'a Group),
}

impl<'a> IdentityPrincipal<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            IdentityPrincipal::User(u) => &u.id,
            IdentityPrincipal::Group(g) => &g.id,
        }
    }

    /// User name or group display name.
    pub fn name(&self) -> &'a str {
        match self {
            IdentityPrincipal::User(u) => &u.user_name,
            IdentityPrincipal::Group(g) => &g.display_name,
        }
    }

    pub fn kind(&self) -> PrincipalType {
        match self {
            IdentityPrincipal::User(_) => PrincipalType::User,
            IdentityPrincipal::Group(_) => PrincipalType::Group,
        }
    }
}

/// AWS-managed policy attached to a permission set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachedPolicy {
    pub name: String,
    pub arn: String,
}

/// Customer-managed policy reference on a permission set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerManagedPolicy {
    pub name: String,
    #[serde(default = "default_policy_path")]
    pub path: String,
}

fn default_policy_path() -> String {
    "/".to_string()
}

/// A permission set with its attached policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub arn: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO-8601 duration, e.g. `PT8H`.
    #[serde(default)]
    pub session_duration: Option<String>,
    #[serde(default)]
    pub relay_state: Option<String>,
    #[serde(default)]
    pub managed_policies: BTreeSet<AttachedPolicy>,
    #[serde(default)]
    pub customer_managed_policies: BTreeSet<CustomerManagedPolicy>,
    #[serde(default)]
    pub inline_policy: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl PermissionSet {
    pub fn new(arn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            name: name.into(),
            description: None,
            session_duration: None,
            relay_state: None,
            managed_policies: BTreeSet::new(),
            customer_managed_policies: BTreeSet::new(),
            inline_policy: None,
            tags: BTreeMap::new(),
        }
    }

    /// Transient permission sets created by the elevated-access workflow.
    pub fn is_elevated_access_managed(&self) -> bool {
        self.name.starts_with("TEAM-")
    }
}

/// Binding of a permission set to a principal on an account.
///
/// Field order defines the sort order used for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountAssignment {
    pub account_id: String,
    pub permission_set_arn: String,
    pub principal: PrincipalRef,
}

/// Entry of the AWS-managed policy catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPolicy {
    pub name: String,
    pub arn: String,
    #[serde(default)]
    pub document: Option<serde_json::Value>,
}

/// Reference to an entity by type tag and name, as stored in elevated-access
/// records. The tag is kept raw and checked by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            name: name.into(),
        }
    }
}

/// Who may request which permission sets on which targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub entity: EntityRef,
    /// Eligible account names.
    #[serde(default)]
    pub accounts: BTreeSet<String>,
    /// Eligible OU names.
    #[serde(default)]
    pub organizational_units: BTreeSet<String>,
    /// Eligible permission set names.
    #[serde(default)]
    pub permission_sets: BTreeSet<String>,
    pub max_duration_hours: u32,
    pub approval_required: bool,
    #[serde(default)]
    pub ticket_no: String,
}

/// Which groups approve requests targeting an account or OU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverRecord {
    pub entity: EntityRef,
    #[serde(default)]
    pub approver_groups: BTreeSet<String>,
    #[serde(default)]
    pub ticket_no: String,
}

/// A DynamoDB table backing the elevated-access workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTable {
    pub name: String,
    pub arn: String,
}

impl TeamTable {
    pub fn is_approvers(&self) -> bool {
        self.name.starts_with("Approvers-")
    }

    pub fn is_eligibility(&self) -> bool {
        self.name.starts_with("Eligibility-")
    }
}

/// The elevated-access application registered in Identity Center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamApplication {
    pub arn: String,
    #[serde(default)]
    pub assignments: BTreeSet<PrincipalRef>,
}

/// Optional elevated-access (TEAM) state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatedAccess {
    #[serde(default)]
    pub application: Option<TeamApplication>,
    /// Keyed by table name.
    #[serde(default)]
    pub tables: BTreeMap<String, TeamTable>,
    /// Keyed by `<entity type>___<entity name>`.
    #[serde(default)]
    pub eligibility: BTreeMap<String, EligibilityRecord>,
    /// Keyed by `<entity type>___<entity name>`.
    #[serde(default)]
    pub approvers: BTreeMap<String, ApproverRecord>,
}

impl ElevatedAccess {
    pub fn add_eligibility(&mut self, record: EligibilityRecord) {
        let key = format!("{}___{}", record.entity.entity_type, record.entity.name);
        self.eligibility.insert(key, record);
    }

    pub fn add_approver(&mut self, record: ApproverRecord) {
        let key = format!("{}___{}", record.entity.entity_type, record.entity.name);
        self.approvers.insert(key, record);
    }
}

/// Point-in-time capture of directory, permission and assignment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub fetched_at: DateTime<Utc>,
    pub instance: SsoInstance,
    pub organization: OrganizationSnapshot,
    /// Keyed by user id.
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    /// Keyed by group id.
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    /// Keyed by permission set ARN.
    #[serde(default)]
    pub permission_sets: BTreeMap<String, PermissionSet>,
    #[serde(default)]
    pub assignments: BTreeSet<AccountAssignment>,
    /// Keyed by policy ARN.
    #[serde(default)]
    pub managed_policies: BTreeMap<String, ManagedPolicy>,
    #[serde(default)]
    pub elevated_access: Option<ElevatedAccess>,
}

impl Snapshot {
    pub fn new(instance: SsoInstance, root: OrganizationRoot) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            fetched_at: Utc::now(),
            instance,
            organization: OrganizationSnapshot::new(root),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            permission_sets: BTreeMap::new(),
            assignments: BTreeSet::new(),
            managed_policies: BTreeMap::new(),
            elevated_access: None,
        }
    }

    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.id.clone(), group);
    }

    pub fn add_permission_set(&mut self, permission_set: PermissionSet) {
        self.permission_sets
            .insert(permission_set.arn.clone(), permission_set);
    }

    pub fn add_managed_policy(&mut self, policy: ManagedPolicy) {
        self.managed_policies.insert(policy.arn.clone(), policy);
    }

    /// Returns false when the assignment was already present.
    pub fn add_assignment(&mut self, assignment: AccountAssignment) -> bool {
        self.assignments.insert(assignment)
    }

    pub fn permission_set(&self, arn: &str) -> Option<&PermissionSet> {
        self.permission_sets.get(arn)
    }

    pub fn user_by_name(&self, user_name: &str) -> Option<&User> {
        self.users.values().find(|u| u.user_name == user_name)
    }

    pub fn group_by_name(&self, display_name: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.display_name == display_name)
    }

    /// Look a principal up in the identity directory.
    pub fn resolve_principal(&self, principal: &PrincipalRef) -> Option<IdentityPrincipal<'_>> {
        match principal.kind {
            PrincipalType::User => self.users.get(&principal.id).map(IdentityPrincipal::User),
            PrincipalType::Group => self.groups.get(&principal.id).map(IdentityPrincipal::Group),
        }
    }

    pub fn elevated_access_enabled(&self) -> bool {
        self.elevated_access.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::new(
            SsoInstance {
                arn: "arn:aws:sso:::instance/ssoins-1234".to_string(),
                identity_store_id: "d-1234".to_string(),
                region: "eu-west-1".to_string(),
            },
            OrganizationRoot {
                id: "r-abcd".to_string(),
                name: "Root".to_string(),
                arn: None,
            },
        )
    }

    #[test]
    fn test_instance_short_name() {
        assert_eq!(snapshot().instance.short_name(), "ssoins-1234");
    }

    #[test]
    fn test_assignment_dedup() {
        let mut s = snapshot();
        let a = AccountAssignment {
            account_id: "111111111111".to_string(),
            permission_set_arn: "arn:ps".to_string(),
            principal: PrincipalRef::group("g-1"),
        };
        assert!(s.add_assignment(a.clone()));
        assert!(!s.add_assignment(a));
        assert_eq!(s.assignments.len(), 1);
    }

    #[test]
    fn test_resolve_principal() {
        let mut s = snapshot();
        s.add_user(User::new("u-1", "alice"));

        let resolved = s.resolve_principal(&PrincipalRef::user("u-1")).unwrap();
        assert_eq!(resolved.name(), "alice");
        assert_eq!(resolved.kind(), PrincipalType::User);
        assert!(s.resolve_principal(&PrincipalRef::group("u-1")).is_none());
    }

    #[test]
    fn test_principal_type_parsing() {
        assert_eq!(PrincipalType::from_str("group"), Some(PrincipalType::Group));
        assert_eq!(PrincipalType::from_str("USER"), Some(PrincipalType::User));
        assert_eq!(PrincipalType::from_str("role"), None);
    }

    #[test]
    fn test_team_permission_sets_detected() {
        assert!(PermissionSet::new("arn:1", "TEAM-Admin").is_elevated_access_managed());
        assert!(!PermissionSet::new("arn:2", "Admin").is_elevated_access_managed());
    }
}
