//! Fetcher tests against the mock directory.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use idc_fetch::{
    FetchError, FetchOptions, Fetcher, MockDirectory, MockFailure, RetryPolicy, TagRecord,
};
use idc_model::{
    Account, AccountStatus, AttachedPolicy, Group, ManagedPolicy, OrganizationRoot, PermissionSet,
    PrincipalRef, Snapshot, SsoInstance, User,
};

const INSTANCE_ARN: &str = "arn:aws:sso:::instance/ssoins-1111";
const STORE_ID: &str = "d-1111";
const ADMIN_PS: &str = "arn:aws:sso:::permissionSet/ssoins-1111/ps-admin";
const READ_PS: &str = "arn:aws:sso:::permissionSet/ssoins-1111/ps-read";

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(4))
}

fn options() -> FetchOptions {
    FetchOptions::new().retry(fast_retry()).concurrency(4)
}

fn user(id: &str, name: &str) -> User {
    User::new(id, name)
}

fn account(id: &str, name: &str, status: AccountStatus) -> Account {
    Account {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        status,
    }
}

fn base_directory() -> MockDirectory {
    let mut members = BTreeMap::new();
    members.insert("u-1".to_string(), "m-1".to_string());
    members.insert("u-2".to_string(), "m-2".to_string());

    let mut admin = PermissionSet::new(ADMIN_PS, "AdministratorAccess");
    admin.session_duration = Some("PT4H".to_string());
    admin.managed_policies.insert(AttachedPolicy {
        name: "AdministratorAccess".to_string(),
        arn: "arn:aws:iam::aws:policy/AdministratorAccess".to_string(),
    });
    admin.inline_policy = Some(json!({"Version": "2012-10-17", "Statement": []}));
    admin.tags.insert("team".to_string(), "platform".to_string());

    MockDirectory::new()
        .set_region("eu-west-1")
        .add_instance(INSTANCE_ARN, STORE_ID)
        .add_root(OrganizationRoot {
            id: "r-1".to_string(),
            name: "Root".to_string(),
            arn: None,
        })
        .add_organizational_unit("r-1", "ou-1", "Workloads")
        .add_organizational_unit("ou-1", "ou-2", "Prod")
        .add_account(account("111111111111", "Management", AccountStatus::Active))
        .add_account(account("222222222222", "Prod", AccountStatus::Active))
        .add_account(account("333333333333", "Closed", AccountStatus::Suspended))
        .add_user(user("u-1", "alice"))
        .add_user(user("u-2", "bob"))
        .add_user(user("u-3", "carol"))
        .add_group(Group {
            id: "g-1".to_string(),
            display_name: "Ops".to_string(),
            description: None,
            scim: false,
            members,
        })
        .add_permission_set(admin)
        .add_permission_set(PermissionSet::new(READ_PS, "ReadOnly"))
        .add_assignment("222222222222", ADMIN_PS, PrincipalRef::group("g-1"))
        .add_assignment("111111111111", READ_PS, PrincipalRef::user("u-3"))
        .add_managed_policy(
            "AdministratorAccess",
            "arn:aws:iam::aws:policy/AdministratorAccess",
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"*","Resource":"*"}]}"#,
        )
}

async fn fetch(directory: MockDirectory, options: FetchOptions) -> Result<Snapshot, FetchError> {
    Fetcher::new(Arc::new(directory), options).fetch(None).await
}

#[tokio::test]
async fn test_fetch_complete_snapshot() {
    let snapshot = fetch(base_directory(), options()).await.unwrap();

    assert_eq!(snapshot.instance.arn, INSTANCE_ARN);
    assert_eq!(snapshot.instance.identity_store_id, STORE_ID);
    assert_eq!(snapshot.instance.region, "eu-west-1");
    assert_eq!(snapshot.users.len(), 3);
    assert_eq!(snapshot.groups["g-1"].members.len(), 2);
    assert_eq!(snapshot.groups["g-1"].members["u-1"], "m-1");

    let admin = &snapshot.permission_sets[ADMIN_PS];
    assert_eq!(admin.session_duration.as_deref(), Some("PT4H"));
    assert_eq!(admin.managed_policies.len(), 1);
    assert!(admin.inline_policy.is_some());
    assert_eq!(admin.tags["team"], "platform");

    assert_eq!(snapshot.assignments.len(), 2);
    assert_eq!(snapshot.managed_policies.len(), 1);
    assert!(snapshot.elevated_access.is_none());
}

#[tokio::test]
async fn test_fetch_drains_every_page() {
    let directory = base_directory()
        .with_page_size(1)
        .add_user(user("u-4", "dave"))
        .add_user(user("u-5", "erin"));

    let snapshot = fetch(directory.clone(), options()).await.unwrap();

    assert_eq!(snapshot.users.len(), 5);
    assert_eq!(snapshot.permission_sets.len(), 2);
    assert_eq!(snapshot.groups["g-1"].members.len(), 2);
    // 5 users at one per page
    assert_eq!(directory.get_method_calls("list_users").len(), 5);
}

#[tokio::test]
async fn test_fetch_deduplicates_listings() {
    let directory = base_directory()
        .with_page_size(2)
        .add_user(user("u-1", "alice"));

    let snapshot = fetch(directory, options()).await.unwrap();
    assert_eq!(snapshot.users.len(), 3);
}

#[tokio::test]
async fn test_only_active_accounts_are_kept() {
    let snapshot = fetch(base_directory(), options()).await.unwrap();

    let accounts = &snapshot.organization.accounts;
    assert_eq!(accounts.len(), 2);
    assert!(!accounts.contains_key("333333333333"));
}

#[tokio::test]
async fn test_ou_walk_records_paths_and_depth() {
    let snapshot = fetch(base_directory(), options()).await.unwrap();

    let ous = &snapshot.organization.organizational_units;
    assert_eq!(ous["ou-1"].path, "Root/Workloads");
    assert_eq!(ous["ou-1"].depth, 1);
    assert_eq!(ous["ou-2"].path, "Root/Workloads/Prod");
    assert_eq!(ous["ou-2"].parent_id, "ou-1");
}

#[tokio::test]
async fn test_ou_walk_stops_at_max_depth() {
    let mut directory = base_directory();
    for level in 3..=7 {
        directory = directory.add_organizational_unit(
            format!("ou-{}", level - 1),
            format!("ou-{}", level),
            format!("Level{}", level),
        );
    }

    let snapshot = fetch(directory, options()).await.unwrap();
    let ous = &snapshot.organization.organizational_units;

    assert!(ous.contains_key("ou-5"));
    assert!(!ous.contains_key("ou-6"));
    assert!(ous.values().all(|ou| ou.depth <= idc_fetch::MAX_OU_DEPTH));
}

#[tokio::test]
async fn test_throttled_call_is_retried() {
    let directory = base_directory()
        .simulate_failure("list_users", MockFailure::Throttle { times: 2 });

    let snapshot = fetch(directory.clone(), options()).await.unwrap();

    assert_eq!(snapshot.users.len(), 3);
    assert_eq!(directory.get_method_calls("list_users").len(), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_fails() {
    let directory = base_directory()
        .simulate_failure("list_groups", MockFailure::Throttle { times: 100 });
    let options = options().retry(fast_retry().max_attempts(3));

    let err = fetch(directory.clone(), options).await.unwrap_err();

    match err {
        FetchError::Throttled { operation, attempts } => {
            assert_eq!(operation, "list_groups");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected throttling error, got {:?}", other),
    }
    assert_eq!(directory.get_method_calls("list_groups").len(), 3);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let directory = base_directory().simulate_failure("list_accounts", MockFailure::Auth);

    let err = fetch(directory.clone(), options()).await.unwrap_err();

    assert!(err.is_auth());
    assert_eq!(directory.get_method_calls("list_accounts").len(), 1);
    assert!(!directory.was_called("list_users"));
}

#[tokio::test]
async fn test_missing_instance() {
    let err = fetch(MockDirectory::new(), options()).await.unwrap_err();
    assert!(matches!(err, FetchError::NoInstance));
}

#[tokio::test]
async fn test_unknown_principal_is_skipped() {
    let directory =
        base_directory().add_assignment("222222222222", READ_PS, PrincipalRef::user("u-gone"));

    let snapshot = fetch(directory, options()).await.unwrap();

    assert_eq!(snapshot.assignments.len(), 2);
    assert!(snapshot
        .assignments
        .iter()
        .all(|a| a.principal.id != "u-gone"));
}

#[tokio::test]
async fn test_retained_managed_policies() {
    let mut previous = Snapshot::new(
        SsoInstance {
            arn: INSTANCE_ARN.to_string(),
            identity_store_id: STORE_ID.to_string(),
            region: "eu-west-1".to_string(),
        },
        OrganizationRoot {
            id: "r-1".to_string(),
            name: "Root".to_string(),
            arn: None,
        },
    );
    previous.add_managed_policy(ManagedPolicy {
        name: "ReadOnlyAccess".to_string(),
        arn: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
        document: None,
    });

    let directory = base_directory();
    let fetcher = Fetcher::new(
        Arc::new(directory.clone()),
        options().retain_managed_policies(true),
    );
    let snapshot = fetcher.fetch(Some(&previous)).await.unwrap();

    assert!(!directory.was_called("list_aws_managed_policies"));
    assert_eq!(snapshot.managed_policies, previous.managed_policies);
}

fn team_tags() -> Vec<TagRecord> {
    vec![
        TagRecord::new("project", "iam-identity-center-team"),
        TagRecord::new("environment", "prod"),
    ]
}

#[tokio::test]
async fn test_elevated_access_fetch() {
    let directory = base_directory()
        .add_table(
            "Eligibility-abc-main",
            "arn:aws:dynamodb:eu-west-1:111111111111:table/Eligibility-abc-main",
            team_tags(),
            vec![json!({
                "type": "Group",
                "name": "Ops",
                "accounts": [{"name": "Prod", "id": "222222222222"}],
                "permissions": [{"name": "AdministratorAccess", "id": ADMIN_PS}],
                "duration": 4,
                "approvalRequired": true
            })],
        )
        .add_table(
            "Approvers-abc-main",
            "arn:aws:dynamodb:eu-west-1:111111111111:table/Approvers-abc-main",
            team_tags(),
            vec![json!({"type": "OU", "name": "Root", "approvers": ["Ops"]})],
        )
        .add_table(
            "Eligibility-old-main",
            "arn:aws:dynamodb:eu-west-1:111111111111:table/Eligibility-old-main",
            vec![TagRecord::new("project", "other")],
            vec![json!({"type": "User", "name": "alice"})],
        )
        .add_application(
            "TEAM IDC APP",
            "arn:aws:sso::111111111111:application/ssoins-1111/apl-team",
            vec![PrincipalRef::group("g-1")],
        );

    let snapshot = fetch(directory, options().enable_elevated_access(true))
        .await
        .unwrap();
    let team = snapshot.elevated_access.expect("elevated access");

    assert_eq!(team.tables.len(), 2);
    assert!(!team.tables.contains_key("Eligibility-old-main"));
    assert_eq!(team.eligibility.len(), 1);
    assert_eq!(team.eligibility["Group___Ops"].max_duration_hours, 4);
    assert_eq!(team.approvers.len(), 1);

    let app = team.application.expect("application");
    assert!(app.assignments.contains(&PrincipalRef::group("g-1")));
}

#[tokio::test]
async fn test_elevated_access_failures_are_not_fatal() {
    let directory = base_directory()
        .simulate_failure("list_tables", MockFailure::Api("AccessDenied".to_string()));

    let snapshot = fetch(directory, options().enable_elevated_access(true))
        .await
        .unwrap();
    let team = snapshot.elevated_access.expect("elevated access");

    assert!(team.tables.is_empty());
    assert!(team.application.is_none());
}
