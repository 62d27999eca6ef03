//! Resolution of elevated-access entity references to directory ids.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::models::Snapshot;

/// Entity kinds an elevated-access record can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Account,
    #[serde(rename = "OU")]
    OrganizationalUnit,
    User,
    Group,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "Account",
            EntityKind::OrganizationalUnit => "OU",
            EntityKind::User => "User",
            EntityKind::Group => "Group",
        }
    }

    /// Parse a record tag, case-insensitive.
    pub fn parse(tag: &str) -> Result<Self, ResolveError> {
        match tag.trim().to_lowercase().as_str() {
            "account" => Ok(EntityKind::Account),
            "ou" => Ok(EntityKind::OrganizationalUnit),
            "user" => Ok(EntityKind::User),
            "group" => Ok(EntityKind::Group),
            _ => Err(ResolveError::InvalidEntityType(tag.to_string())),
        }
    }

    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Account,
            EntityKind::OrganizationalUnit,
            EntityKind::User,
            EntityKind::Group,
        ]
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub id: String,
    pub display_name: String,
}

/// Resolves entity names against a populated snapshot.
pub struct EntityResolver<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> EntityResolver<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Resolve `value` of the given kind tag.
    pub fn resolve(&self, kind: &str, value: &str) -> Result<ResolvedEntity, ResolveError> {
        let kind = EntityKind::parse(kind)?;
        self.resolve_kind(kind, value)
    }

    pub fn resolve_kind(
        &self,
        kind: EntityKind,
        value: &str,
    ) -> Result<ResolvedEntity, ResolveError> {
        let org = &self.snapshot.organization;

        let resolved = match kind {
            EntityKind::Account => org.account_by_name(value).map(|a| ResolvedEntity {
                id: a.id.clone(),
                display_name: a.name.clone(),
            }),
            EntityKind::OrganizationalUnit if value.eq_ignore_ascii_case("root") => {
                Some(ResolvedEntity {
                    id: org.root.id.clone(),
                    display_name: "Root".to_string(),
                })
            }
            EntityKind::OrganizationalUnit => org.ou_by_name(value).map(|ou| ResolvedEntity {
                id: ou.id.clone(),
                display_name: ou.name.clone(),
            }),
            EntityKind::User => self.snapshot.user_by_name(value).map(|u| ResolvedEntity {
                id: u.id.clone(),
                display_name: u.user_name.clone(),
            }),
            EntityKind::Group => self.snapshot.group_by_name(value).map(|g| ResolvedEntity {
                id: g.id.clone(),
                display_name: g.display_name.clone(),
            }),
        };

        resolved.ok_or_else(|| ResolveError::NotFound {
            kind: kind.as_str().to_string(),
            name: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_kind() {
        assert_eq!(EntityKind::parse("account").unwrap(), EntityKind::Account);
        assert_eq!(
            EntityKind::parse("OU").unwrap(),
            EntityKind::OrganizationalUnit
        );
        assert_eq!(EntityKind::parse("Group").unwrap(), EntityKind::Group);
        assert_eq!(
            EntityKind::parse("Widget"),
            Err(ResolveError::InvalidEntityType("Widget".to_string()))
        );
    }

    #[test]
    fn test_all_kinds_round_trip() {
        for kind in EntityKind::all() {
            assert_eq!(EntityKind::parse(kind.as_str()).unwrap(), *kind);
        }
    }
}
