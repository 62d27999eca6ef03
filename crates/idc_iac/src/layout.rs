//! Output layout: state modes, platforms, components and generation options.

use serde::{Deserialize, Serialize};

use crate::error::{IacError, IacResult};
use crate::preserve::PreservedPolicies;

/// Pinned `hashicorp/aws` version used when the registry is not consulted.
pub const DEFAULT_AWS_PROVIDER_VERSION: &str = "5.85.0";

/// Pinned `hashicorp/tfe` version used when the registry is not consulted.
pub const DEFAULT_TFE_PROVIDER_VERSION: &str = "0.63.0";

/// How Terraform state is partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMode {
    /// One root module wiring every component.
    #[default]
    Single,
    /// One root module (and state) per component.
    Multi,
}

impl StateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMode::Single => "single",
            StateMode::Multi => "multi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(StateMode::Single),
            "multi" => Some(StateMode::Multi),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![StateMode::Single, StateMode::Multi]
    }
}

impl std::fmt::Display for StateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where Terraform state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Local backend.
    #[default]
    Local,
    /// Terraform Cloud.
    Tfc,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Local => "local",
            Platform::Tfc => "tfc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(Platform::Local),
            "tfc" => Some(Platform::Tfc),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Platform::Local, Platform::Tfc]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated Terraform component (one directory of the output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    IdentityStore,
    ManagedPolicies,
    PermissionSets,
    AccountAssignments,
    Team,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::IdentityStore => "identity_store",
            Component::ManagedPolicies => "managed_policies",
            Component::PermissionSets => "permission_sets",
            Component::AccountAssignments => "account_assignments",
            Component::Team => "team",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.as_str() == s)
    }

    pub fn all() -> Vec<Self> {
        vec![
            Component::IdentityStore,
            Component::ManagedPolicies,
            Component::PermissionSets,
            Component::AccountAssignments,
            Component::Team,
        ]
    }

    /// Components in dependency order; `team` only when elevated access is on.
    pub fn ordered(include_team: bool) -> Vec<Self> {
        Self::all()
            .into_iter()
            .filter(|c| include_team || *c != Component::Team)
            .collect()
    }

    /// Components that must be applied before this one.
    pub fn dependencies(&self) -> &'static [Component] {
        match self {
            Component::IdentityStore | Component::ManagedPolicies => &[],
            Component::PermissionSets => &[Component::ManagedPolicies],
            Component::AccountAssignments => {
                &[Component::IdentityStore, Component::PermissionSets]
            }
            Component::Team => &[
                Component::IdentityStore,
                Component::ManagedPolicies,
                Component::PermissionSets,
                Component::AccountAssignments,
            ],
        }
    }

    /// Cross-component inputs as `(name, producing component)`.
    pub fn inputs(&self) -> &'static [(&'static str, Component)] {
        match self {
            Component::IdentityStore | Component::ManagedPolicies => &[],
            Component::PermissionSets => &[("managed_policies_map", Component::ManagedPolicies)],
            Component::AccountAssignments => &[
                ("users_map", Component::IdentityStore),
                ("groups_map", Component::IdentityStore),
                ("permission_sets_map", Component::PermissionSets),
            ],
            Component::Team => &[
                ("users_map", Component::IdentityStore),
                ("groups_map", Component::IdentityStore),
            ],
        }
    }

    /// Whether the component reads the SSO instance ARN or identity store id.
    pub fn needs_instance(&self) -> bool {
        matches!(
            self,
            Component::IdentityStore | Component::PermissionSets | Component::AccountAssignments
        )
    }

    /// Component name as used in workspace names.
    pub fn workspace_suffix(&self) -> String {
        self.as_str().replace('_', "-")
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider versions written into `required_providers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersions {
    pub aws: String,
    pub tfe: String,
}

impl Default for ProviderVersions {
    fn default() -> Self {
        Self {
            aws: DEFAULT_AWS_PROVIDER_VERSION.to_string(),
            tfe: DEFAULT_TFE_PROVIDER_VERSION.to_string(),
        }
    }
}

/// Options controlling one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub state_mode: StateMode,
    pub platform: Platform,
    pub tfc_org: String,
    pub prefix: String,
    pub environment: String,
    pub enable_elevated_access: bool,
    /// Overrides the snapshot's region in provider blocks.
    pub region: Option<String>,
    pub versions: ProviderVersions,
    /// Managed-policy data carried over from a previous output.
    pub preserved_policies: Option<PreservedPolicies>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            state_mode: StateMode::Single,
            platform: Platform::Local,
            tfc_org: String::new(),
            prefix: "aws-identity-management".to_string(),
            environment: String::new(),
            enable_elevated_access: false,
            region: None,
            versions: ProviderVersions::default(),
            preserved_policies: None,
        }
    }
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_mode(mut self, state_mode: StateMode) -> Self {
        self.state_mode = state_mode;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_tfc_org(mut self, tfc_org: impl Into<String>) -> Self {
        self.tfc_org = tfc_org.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_elevated_access(mut self, enabled: bool) -> Self {
        self.enable_elevated_access = enabled;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_versions(mut self, versions: ProviderVersions) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_preserved_policies(mut self, preserved: PreservedPolicies) -> Self {
        self.preserved_policies = Some(preserved);
        self
    }

    /// Check option combinations before rendering.
    pub fn validate(&self) -> IacResult<()> {
        if self.platform == Platform::Tfc && self.tfc_org.trim().is_empty() {
            return Err(IacError::InvalidConfiguration(
                "platform 'tfc' requires a Terraform Cloud organization (tfc_org)".to_string(),
            ));
        }
        if self.prefix.trim().is_empty() {
            return Err(IacError::InvalidConfiguration(
                "workspace prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Terraform Cloud workspace for the root (single) or a component (multi).
    pub fn workspace_name(&self, component: Option<Component>) -> String {
        let mut parts = vec![self.prefix.clone()];
        if !self.environment.is_empty() {
            parts.push(self.environment.clone());
        }
        if let (StateMode::Multi, Some(component)) = (self.state_mode, component) {
            parts.push(component.workspace_suffix());
        }
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing() {
        assert_eq!(StateMode::from_str("MULTI"), Some(StateMode::Multi));
        assert_eq!(Platform::from_str("tfc"), Some(Platform::Tfc));
        assert_eq!(Platform::from_str("s3"), None);
        assert_eq!(
            Component::from_str("account_assignments"),
            Some(Component::AccountAssignments)
        );
    }

    #[test]
    fn test_ordered_respects_dependencies() {
        let ordered = Component::ordered(true);
        for (position, component) in ordered.iter().enumerate() {
            for dependency in component.dependencies() {
                let dep_position = ordered.iter().position(|c| c == dependency).unwrap();
                assert!(dep_position < position, "{} before {}", dependency, component);
            }
        }
        assert!(!Component::ordered(false).contains(&Component::Team));
    }

    #[test]
    fn test_inputs_come_from_dependencies() {
        for component in Component::all() {
            for (_, source) in component.inputs() {
                assert!(component.dependencies().contains(source));
            }
        }
    }

    #[test]
    fn test_workspace_names() {
        let single = GenerateOptions::new().with_environment("prod");
        assert_eq!(single.workspace_name(None), "aws-identity-management-prod");
        assert_eq!(
            single.workspace_name(Some(Component::PermissionSets)),
            "aws-identity-management-prod"
        );

        let multi = GenerateOptions::new()
            .with_state_mode(StateMode::Multi)
            .with_prefix("idc");
        assert_eq!(
            multi.workspace_name(Some(Component::AccountAssignments)),
            "idc-account-assignments"
        );
    }

    #[test]
    fn test_tfc_requires_org() {
        let options = GenerateOptions::new().with_platform(Platform::Tfc);
        assert!(matches!(
            options.validate(),
            Err(IacError::InvalidConfiguration(_))
        ));
        assert!(options.with_tfc_org("acme").validate().is_ok());
    }
}
