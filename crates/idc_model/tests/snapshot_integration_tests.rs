//! Integration tests for the snapshot model.

use std::collections::BTreeMap;
use std::fs;

use serde_json::json;
use tempfile::tempdir;

use idc_model::{
    Account, AccountAssignment, AccountStatus, ApproverRecord, AttachedPolicy,
    CustomerManagedPolicy, EligibilityRecord, ElevatedAccess, EntityRef, EntityResolver, Group,
    ManagedPolicy, ModelError, OrganizationRoot, OrganizationalUnit, PermissionSet, PrincipalRef,
    ResolveError, Snapshot, SnapshotStore, SsoInstance, TeamApplication, TeamTable, User,
};

fn populated_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::new(
        SsoInstance {
            arn: "arn:aws:sso:::instance/ssoins-7223a3f1c9e4b2d0".to_string(),
            identity_store_id: "d-9067a1b2c3".to_string(),
            region: "eu-central-1".to_string(),
        },
        OrganizationRoot {
            id: "r-ab12".to_string(),
            name: "Root".to_string(),
            arn: Some("arn:aws:organizations::111111111111:root/o-xyz/r-ab12".to_string()),
        },
    );

    snapshot.organization.add_account(Account {
        id: "111111111111".to_string(),
        name: "Management".to_string(),
        email: "mgmt@example.com".to_string(),
        status: AccountStatus::Active,
    });
    snapshot.organization.add_account(Account {
        id: "222222222222".to_string(),
        name: "Workload Prod".to_string(),
        email: "prod@example.com".to_string(),
        status: AccountStatus::Active,
    });
    snapshot
        .organization
        .add_organizational_unit(OrganizationalUnit {
            id: "ou-ab12-workload".to_string(),
            name: "Workloads".to_string(),
            parent_id: "r-ab12".to_string(),
            path: "Root/Workloads".to_string(),
            depth: 1,
        });

    let mut alice = User::new("u-alice", "alice@example.com");
    alice.display_name = Some("Alice".to_string());
    alice.given_name = Some("Alice".to_string());
    alice.family_name = Some("Liddell".to_string());
    snapshot.add_user(alice);
    let mut members = BTreeMap::new();
    members.insert("u-alice".to_string(), "m-1".to_string());
    snapshot.add_group(Group {
        id: "g-ops".to_string(),
        display_name: "Platform Ops".to_string(),
        description: Some("Operators".to_string()),
        scim: true,
        members,
    });

    let mut ps = PermissionSet::new(
        "arn:aws:sso:::permissionSet/ssoins-7223a3f1c9e4b2d0/ps-0001",
        "AdministratorAccess",
    );
    ps.session_duration = Some("PT8H".to_string());
    ps.managed_policies.insert(AttachedPolicy {
        name: "AdministratorAccess".to_string(),
        arn: "arn:aws:iam::aws:policy/AdministratorAccess".to_string(),
    });
    ps.customer_managed_policies.insert(CustomerManagedPolicy {
        name: "BoundaryPolicy".to_string(),
        path: "/".to_string(),
    });
    ps.inline_policy = Some(json!({
        "Version": "2012-10-17",
        "Statement": [{"Effect": "Deny", "Action": "s3:DeleteBucket", "Resource": "*"}]
    }));
    ps.tags.insert("owner".to_string(), "platform".to_string());
    let ps_arn = ps.arn.clone();
    snapshot.add_permission_set(ps);

    snapshot.add_assignment(AccountAssignment {
        account_id: "222222222222".to_string(),
        permission_set_arn: ps_arn,
        principal: PrincipalRef::group("g-ops"),
    });

    snapshot.add_managed_policy(ManagedPolicy {
        name: "AdministratorAccess".to_string(),
        arn: "arn:aws:iam::aws:policy/AdministratorAccess".to_string(),
        document: Some(json!({"Version": "2012-10-17", "Statement": []})),
    });

    let mut team = ElevatedAccess::default();
    team.application = Some(TeamApplication {
        arn: "arn:aws:sso::111111111111:application/ssoins-1/apl-1".to_string(),
        assignments: [PrincipalRef::group("g-ops")].into_iter().collect(),
    });
    team.tables.insert(
        "Eligibility-abc-main".to_string(),
        TeamTable {
            name: "Eligibility-abc-main".to_string(),
            arn: "arn:aws:dynamodb:eu-central-1:111111111111:table/Eligibility-abc-main"
                .to_string(),
        },
    );
    team.add_eligibility(EligibilityRecord {
        entity: EntityRef::new("Group", "Platform Ops"),
        accounts: ["Workload Prod".to_string()].into_iter().collect(),
        organizational_units: Default::default(),
        permission_sets: ["AdministratorAccess".to_string()].into_iter().collect(),
        max_duration_hours: 4,
        approval_required: true,
        ticket_no: "CHG-1".to_string(),
    });
    team.add_approver(ApproverRecord {
        entity: EntityRef::new("OU", "root"),
        approver_groups: ["Platform Ops".to_string()].into_iter().collect(),
        ticket_no: String::new(),
    });
    snapshot.elevated_access = Some(team);

    snapshot
}

/// Saving then loading yields an equal snapshot.
#[test]
fn test_snapshot_round_trip() {
    let temp = tempdir().unwrap();
    let path = SnapshotStore::default_path(temp.path());
    let snapshot = populated_snapshot();

    SnapshotStore::save(&snapshot, &path).unwrap();
    assert!(path.ends_with("json/snapshot.json"));

    let loaded = SnapshotStore::load(&path).unwrap();
    assert_eq!(loaded, snapshot);
}

#[test]
fn test_snapshot_file_is_stable() {
    let temp = tempdir().unwrap();
    let first = temp.path().join("a.json");
    let second = temp.path().join("b.json");
    let snapshot = populated_snapshot();

    SnapshotStore::save(&snapshot, &first).unwrap();
    let reloaded = SnapshotStore::load(&first).unwrap();
    SnapshotStore::save(&reloaded, &second).unwrap();

    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn test_load_missing_snapshot() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("json/snapshot.json");

    assert!(matches!(
        SnapshotStore::load(&path),
        Err(ModelError::NotFound(_))
    ));
    assert!(SnapshotStore::load_optional(&path).unwrap().is_none());
}

#[test]
fn test_load_rejects_garbage() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("snapshot.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        SnapshotStore::load(&path),
        Err(ModelError::InvalidFormat { .. })
    ));
}

#[test]
fn test_resolve_root_any_case() {
    let snapshot = populated_snapshot();
    let resolver = EntityResolver::new(&snapshot);

    for value in ["root", "ROOT", "Root"] {
        let resolved = resolver.resolve("OU", value).unwrap();
        assert_eq!(resolved.id, "r-ab12");
        assert_eq!(resolved.display_name, "Root");
    }
}

#[test]
fn test_resolve_each_kind() {
    let snapshot = populated_snapshot();
    let resolver = EntityResolver::new(&snapshot);

    assert_eq!(
        resolver.resolve("Account", "Workload Prod").unwrap().id,
        "222222222222"
    );
    assert_eq!(
        resolver.resolve("OU", "Workloads").unwrap().id,
        "ou-ab12-workload"
    );
    assert_eq!(
        resolver.resolve("User", "alice@example.com").unwrap().id,
        "u-alice"
    );
    assert_eq!(resolver.resolve("group", "Platform Ops").unwrap().id, "g-ops");
}

#[test]
fn test_resolve_invalid_kind() {
    let snapshot = populated_snapshot();
    let resolver = EntityResolver::new(&snapshot);

    assert_eq!(
        resolver.resolve("Widget", "x"),
        Err(ResolveError::InvalidEntityType("Widget".to_string()))
    );
}

#[test]
fn test_resolve_unknown_name() {
    let snapshot = populated_snapshot();
    let resolver = EntityResolver::new(&snapshot);

    assert_eq!(
        resolver.resolve("Account", "Sandbox"),
        Err(ResolveError::NotFound {
            kind: "Account".to_string(),
            name: "Sandbox".to_string(),
        })
    );
}
