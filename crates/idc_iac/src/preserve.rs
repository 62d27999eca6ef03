//! Carry AWS-managed policy data over from a previous output directory.
//!
//! Used when the managed-policy catalog is not refreshed and the snapshot
//! has none: the map (or the older list) written by an earlier run is parsed
//! back, together with the policy documents next to it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{IacError, IacResult};
use crate::layout::Component;

/// File holding the `managed_policies_map` local.
pub const MANAGED_POLICIES_MAP_FILE: &str = "aws_iam_managed_policies_map.tf";

/// Older list-form file holding `managed_policies_list`.
pub const MANAGED_POLICIES_LIST_FILE: &str = "aws_iam_managed_policies_list.tf";

/// Directory of policy documents inside the managed-policies component.
pub const POLICY_DOCUMENTS_DIR: &str = "policies";

const MAP_PATTERN: &str = r"(?s)managed_policies_map\s*=\s*\{(.*?)\}";
const LIST_PATTERN: &str = r"(?s)managed_policies_list\s*=\s*\[(.*?)\]";
const PAIR_PATTERN: &str = r#""([^"]+)"\s*=\s*"([^"]+)""#;
const QUOTED_PATTERN: &str = r#""([^"]+)""#;

/// Managed-policy data recovered from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedPolicies {
    /// Policy name to ARN.
    pub policies: BTreeMap<String, String>,
    /// Document file name to raw JSON content.
    pub documents: BTreeMap<String, String>,
}

fn compile(pattern: &str) -> IacResult<Regex> {
    Regex::new(pattern).map_err(|e| IacError::TemplateRender(e.to_string()))
}

impl PreservedPolicies {
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Load from `<output>/managed_policies/`. Returns `None` when nothing
    /// usable was written there before.
    pub fn load(output_dir: &Path) -> IacResult<Option<Self>> {
        let dir = output_dir.join(Component::ManagedPolicies.as_str());
        let map_file = dir.join(MANAGED_POLICIES_MAP_FILE);
        let list_file = dir.join(MANAGED_POLICIES_LIST_FILE);

        let policies = if map_file.exists() {
            Self::parse_map(&fs::read_to_string(&map_file)?)?
        } else if list_file.exists() {
            Self::parse_list(&fs::read_to_string(&list_file)?)?
        } else {
            debug!("No managed policies found under {:?}", dir);
            return Ok(None);
        };

        if policies.is_empty() {
            return Ok(None);
        }

        let mut documents = BTreeMap::new();
        let docs_dir = dir.join(POLICY_DOCUMENTS_DIR);
        if docs_dir.is_dir() {
            for entry in fs::read_dir(&docs_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    documents.insert(name.to_string(), fs::read_to_string(&path)?);
                }
            }
        }

        info!(
            "Preserved {} managed policies and {} policy documents",
            policies.len(),
            documents.len()
        );

        Ok(Some(Self {
            policies,
            documents,
        }))
    }

    /// Parse `managed_policies_map = { "Name" = "arn", ... }`.
    pub fn parse_map(content: &str) -> IacResult<BTreeMap<String, String>> {
        let Some(body) = compile(MAP_PATTERN)?
            .captures(content)
            .and_then(|caps| caps.get(1))
        else {
            return Ok(BTreeMap::new());
        };

        Ok(compile(PAIR_PATTERN)?
            .captures_iter(body.as_str())
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect())
    }

    /// Parse `managed_policies_list = [ "Name", ... ]`; ARNs are derived.
    pub fn parse_list(content: &str) -> IacResult<BTreeMap<String, String>> {
        let Some(body) = compile(LIST_PATTERN)?
            .captures(content)
            .and_then(|caps| caps.get(1))
        else {
            return Ok(BTreeMap::new());
        };

        Ok(compile(QUOTED_PATTERN)?
            .captures_iter(body.as_str())
            .map(|caps| {
                let name = caps[1].to_string();
                let arn = format!("arn:aws:iam::aws:policy/{}", name);
                (name, arn)
            })
            .collect())
    }
}
