//! Snapshot consistency checks.

use crate::error::{ModelError, ModelResult};
use crate::models::Snapshot;

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn accumulated errors into a single invariant error.
    pub fn into_result(self) -> ModelResult<Vec<String>> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(ModelError::Invariant(self.errors.join("; ")))
        }
    }
}

/// Validator for snapshots.
pub struct SnapshotValidator;

impl SnapshotValidator {
    /// Run every check.
    pub fn validate(snapshot: &Snapshot) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.merge(Self::validate_instance(snapshot));
        result.merge(Self::validate_assignments(snapshot));
        result.merge(Self::validate_memberships(snapshot));
        result
    }

    pub fn validate_instance(snapshot: &Snapshot) -> ValidationResult {
        let mut result = ValidationResult::new();

        if snapshot.instance.arn.is_empty() {
            result.add_error("Instance ARN cannot be empty");
        }

        if snapshot.instance.identity_store_id.is_empty() {
            result.add_error("Identity store id cannot be empty");
        }

        if snapshot.organization.root.id.is_empty() {
            result.add_error("Organization root id cannot be empty");
        }

        result
    }

    /// Every assignment must reference a known permission set and principal.
    pub fn validate_assignments(snapshot: &Snapshot) -> ValidationResult {
        let mut result = ValidationResult::new();

        for assignment in &snapshot.assignments {
            let Some(ps) = snapshot.permission_set(&assignment.permission_set_arn) else {
                result.add_error(format!(
                    "Assignment on account {} references unknown permission set {}",
                    assignment.account_id, assignment.permission_set_arn
                ));
                continue;
            };

            if snapshot.resolve_principal(&assignment.principal).is_none() {
                result.add_error(format!(
                    "Assignment of '{}' on account {} references unknown {} {}",
                    ps.name,
                    assignment.account_id,
                    assignment.principal.kind,
                    assignment.principal.id
                ));
            }

            if ps.is_elevated_access_managed() {
                result.add_warning(format!(
                    "Assignment of '{}' on account {} is a transient elevated-access grant",
                    ps.name, assignment.account_id
                ));
            } else if !snapshot.organization.is_active_account(&assignment.account_id) {
                result.add_warning(format!(
                    "Assignment of '{}' targets unknown or inactive account {}",
                    ps.name, assignment.account_id
                ));
            }
        }

        result
    }

    pub fn validate_memberships(snapshot: &Snapshot) -> ValidationResult {
        let mut result = ValidationResult::new();

        for group in snapshot.groups.values() {
            for user_id in group.members.keys() {
                if !snapshot.users.contains_key(user_id) {
                    result.add_warning(format!(
                        "Group '{}' has member {} that is not in the directory",
                        group.display_name, user_id
                    ));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn snapshot() -> Snapshot {
        let mut s = Snapshot::new(
            SsoInstance {
                arn: "arn:aws:sso:::instance/ssoins-1".to_string(),
                identity_store_id: "d-1".to_string(),
                region: "us-east-1".to_string(),
            },
            OrganizationRoot {
                id: "r-1".to_string(),
                name: "Root".to_string(),
                arn: None,
            },
        );
        s.organization.add_account(Account {
            id: "111111111111".to_string(),
            name: "Prod".to_string(),
            email: "prod@example.com".to_string(),
            status: AccountStatus::Active,
        });
        s.add_permission_set(PermissionSet::new("arn:ps:1", "Admin"));
        s.add_group(Group {
            id: "g-1".to_string(),
            display_name: "Ops".to_string(),
            description: None,
            scim: false,
            members: Default::default(),
        });
        s
    }

    #[test]
    fn test_valid_snapshot() {
        let mut s = snapshot();
        s.add_assignment(AccountAssignment {
            account_id: "111111111111".to_string(),
            permission_set_arn: "arn:ps:1".to_string(),
            principal: PrincipalRef::group("g-1"),
        });

        let result = SnapshotValidator::validate(&s);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_dangling_permission_set() {
        let mut s = snapshot();
        s.add_assignment(AccountAssignment {
            account_id: "111111111111".to_string(),
            permission_set_arn: "arn:ps:missing".to_string(),
            principal: PrincipalRef::group("g-1"),
        });

        let result = SnapshotValidator::validate(&s);
        assert!(!result.valid);
        assert!(result.errors[0].contains("arn:ps:missing"));
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_dangling_principal() {
        let mut s = snapshot();
        s.add_assignment(AccountAssignment {
            account_id: "111111111111".to_string(),
            permission_set_arn: "arn:ps:1".to_string(),
            principal: PrincipalRef::user("u-404"),
        });

        let result = SnapshotValidator::validate(&s);
        assert!(!result.valid);
        assert!(result.errors[0].contains("u-404"));
    }

    #[test]
    fn test_inactive_account_is_warning() {
        let mut s = snapshot();
        s.add_assignment(AccountAssignment {
            account_id: "999999999999".to_string(),
            permission_set_arn: "arn:ps:1".to_string(),
            principal: PrincipalRef::group("g-1"),
        });

        let result = SnapshotValidator::validate(&s);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
