//! Stable, collision-free Terraform resource names.

use std::collections::{BTreeMap, BTreeSet};

use idc_model::{sanitize_name, PrincipalRef, PrincipalType, Snapshot};

/// Hands out unique identifiers, suffixing `_2`, `_3`, ... on collision.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: BTreeSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a sanitized form of `raw`.
    pub fn claim(&mut self, raw: &str) -> String {
        self.claim_exact(sanitize_name(raw))
    }

    /// Claim `base` as is, suffixing only on collision.
    pub fn claim_exact(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Resource names for every directory object, assigned in id order so the
/// same snapshot always produces the same names.
#[derive(Debug, Default)]
pub struct ResourceNames {
    users: BTreeMap<String, String>,
    groups: BTreeMap<String, String>,
    permission_sets: BTreeMap<String, String>,
    accounts: BTreeMap<String, String>,
}

fn assign<'a>(entries: impl Iterator<Item = (&'a String, &'a str)>) -> BTreeMap<String, String> {
    let mut names = UniqueNames::new();
    let mut sorted: Vec<_> = entries.collect();
    // name first so collisions resolve by name, then id
    sorted.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
    sorted
        .into_iter()
        .map(|(key, raw)| (key.clone(), names.claim(raw)))
        .collect()
}

impl ResourceNames {
    pub fn build(snapshot: &Snapshot) -> Self {
        Self {
            users: assign(snapshot.users.iter().map(|(id, u)| (id, u.user_name.as_str()))),
            groups: assign(
                snapshot
                    .groups
                    .iter()
                    .map(|(id, g)| (id, g.display_name.as_str())),
            ),
            permission_sets: assign(
                snapshot
                    .permission_sets
                    .iter()
                    .map(|(arn, ps)| (arn, ps.name.as_str())),
            ),
            accounts: assign(
                snapshot
                    .organization
                    .accounts
                    .iter()
                    .map(|(id, a)| (id, a.name.as_str())),
            ),
        }
    }

    pub fn user(&self, id: &str) -> Option<&str> {
        self.users.get(id).map(String::as_str)
    }

    pub fn group(&self, id: &str) -> Option<&str> {
        self.groups.get(id).map(String::as_str)
    }

    pub fn principal(&self, principal: &PrincipalRef) -> Option<&str> {
        match principal.kind {
            PrincipalType::User => self.user(&principal.id),
            PrincipalType::Group => self.group(&principal.id),
        }
    }

    pub fn permission_set(&self, arn: &str) -> Option<&str> {
        self.permission_sets.get(arn).map(String::as_str)
    }

    pub fn account(&self, id: &str) -> Option<&str> {
        self.accounts.get(id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_suffix() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("Ops Team"), "Ops_Team");
        assert_eq!(names.claim("Ops_Team"), "Ops_Team_2");
        assert_eq!(names.claim("Ops/Team"), "Ops_Team_3");
        assert_eq!(names.claim("1st"), "_1st");
    }

    #[test]
    fn test_assign_is_order_independent() {
        let a = "id-a".to_string();
        let b = "id-b".to_string();
        let forward = assign(vec![(&a, "x y"), (&b, "x_y")].into_iter());
        let reverse = assign(vec![(&b, "x_y"), (&a, "x y")].into_iter());

        assert_eq!(forward, reverse);
        assert_eq!(forward["id-a"], "x_y");
        assert_eq!(forward["id-b"], "x_y_2");
    }
}
