//! Provider version lookup against the Terraform Registry.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{IacError, IacResult};
use crate::layout::{Platform, ProviderVersions};

#[cfg(test)]
use mockall::automock;

pub const REGISTRY_URL: &str = "https://registry.terraform.io";

/// Source of the latest stable provider versions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Latest stable version of `hashicorp/<provider>`.
    async fn latest(&self, provider: &str) -> IacResult<String>;
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
}

/// Terraform Registry client.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: REGISTRY_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VersionSource for RegistryClient {
    async fn latest(&self, provider: &str) -> IacResult<String> {
        let url = format!(
            "{}/v1/providers/hashicorp/{}/versions",
            self.base_url.trim_end_matches('/'),
            provider
        );
        debug!("Querying {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IacError::Registry(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(IacError::Registry(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body: VersionsResponse = response
            .json()
            .await
            .map_err(|e| IacError::Registry(format!("{}: {}", url, e)))?;

        select_latest(body.versions.iter().map(|v| v.version.as_str())).ok_or_else(|| {
            IacError::Registry(format!("no stable versions published for {}", provider))
        })
    }
}

fn numeric_parts(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Highest stable version; pre-releases (anything with `-`) are ignored.
pub fn select_latest<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    versions
        .into_iter()
        .filter(|v| !v.contains('-'))
        .filter_map(|v| numeric_parts(v).map(|parts| (parts, v)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, v)| v.to_string())
}

/// Resolve provider versions, falling back to the pinned ones when the
/// registry cannot be reached.
pub async fn resolve_versions(source: &dyn VersionSource, platform: Platform) -> ProviderVersions {
    let mut versions = ProviderVersions::default();

    match source.latest("aws").await {
        Ok(version) => versions.aws = version,
        Err(e) => warn!("Using pinned aws provider {}: {}", versions.aws, e),
    }

    if platform == Platform::Tfc {
        match source.latest("tfe").await {
            Ok(version) => versions.tfe = version,
            Err(e) => warn!("Using pinned tfe provider {}: {}", versions.tfe, e),
        }
    }

    info!(aws = %versions.aws, tfe = %versions.tfe, "Provider versions resolved");
    versions
}
