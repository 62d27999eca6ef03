//! Decoding of TEAM (elevated access) tables.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;

use idc_model::{ApproverRecord, EligibilityRecord, EntityRef};

use crate::directory::TagRecord;
use crate::error::{FetchError, FetchResult};

/// Name of the TEAM application in Identity Center.
pub const TEAM_APPLICATION_NAME: &str = "TEAM IDC APP";

/// Which TEAM table a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamTableKind {
    Approvers,
    Eligibility,
}

const APPROVERS_PATTERN: &str = r"^Approvers-.*-main$";
const ELIGIBILITY_PATTERN: &str = r"^Eligibility-.*-main$";

/// Classifies DynamoDB table names. Built once per fetch.
#[derive(Debug, Clone)]
pub struct TeamTableMatcher {
    approvers: Regex,
    eligibility: Regex,
}

fn compile(pattern: &str) -> FetchResult<Regex> {
    Regex::new(pattern).map_err(|e| FetchError::InvalidData {
        source_name: "table name pattern".to_string(),
        message: format!("'{}': {}", pattern, e),
    })
}

impl TeamTableMatcher {
    pub fn new() -> FetchResult<Self> {
        Ok(Self {
            approvers: compile(APPROVERS_PATTERN)?,
            eligibility: compile(ELIGIBILITY_PATTERN)?,
        })
    }

    pub fn classify(&self, name: &str) -> Option<TeamTableKind> {
        if self.approvers.is_match(name) {
            Some(TeamTableKind::Approvers)
        } else if self.eligibility.is_match(name) {
            Some(TeamTableKind::Eligibility)
        } else {
            None
        }
    }
}

/// TEAM tables carry `project=iam-identity-center-team` and `environment=prod`.
pub fn has_team_tags(tags: &[TagRecord]) -> bool {
    let has = |key: &str, value: &str| tags.iter().any(|t| t.key == key && t.value == value);
    has("project", "iam-identity-center-team") && has("environment", "prod")
}

fn invalid(table: &str, message: impl Into<String>) -> FetchError {
    FetchError::InvalidData {
        source_name: table.to_string(),
        message: message.into(),
    }
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field).and_then(Value::as_str)
}

/// Names from a list of `{name, id}` objects or plain strings.
fn name_list(item: &Value, field: &str) -> BTreeSet<String> {
    item.get(field)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| match e {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(_) => str_field(e, "name").map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn entity(table: &str, item: &Value) -> FetchResult<EntityRef> {
    let entity_type = str_field(item, "type").ok_or_else(|| invalid(table, "item without 'type'"))?;
    let name = str_field(item, "name").ok_or_else(|| invalid(table, "item without 'name'"))?;
    Ok(EntityRef::new(entity_type, name))
}

/// Decode one eligibility item.
pub fn decode_eligibility(table: &str, item: &Value) -> FetchResult<EligibilityRecord> {
    let max_duration_hours = match item.get("duration") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| invalid(table, format!("invalid duration '{}'", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(table, format!("invalid duration '{}'", s)))?,
        _ => 0,
    };

    Ok(EligibilityRecord {
        entity: entity(table, item)?,
        accounts: name_list(item, "accounts"),
        organizational_units: name_list(item, "ous"),
        permission_sets: name_list(item, "permissions"),
        max_duration_hours,
        approval_required: item
            .get("approvalRequired")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ticket_no: str_field(item, "ticketNo").unwrap_or_default().to_string(),
    })
}

/// Decode one approvers item.
pub fn decode_approver(table: &str, item: &Value) -> FetchResult<ApproverRecord> {
    Ok(ApproverRecord {
        entity: entity(table, item)?,
        approver_groups: name_list(item, "approvers"),
        ticket_no: str_field(item, "ticketNo").unwrap_or_default().to_string(),
    })
}
