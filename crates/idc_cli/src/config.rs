//! Layered settings: built-in defaults < config file < environment < flags.
//!
//! Environment variables and flags are both handled by clap, so they arrive
//! here as one [`RawSettings`] layer that takes precedence over the file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use idc_fetch::FetchOptions;
use idc_iac::{GenerateOptions, Platform, StateMode};
use idc_model::SnapshotStore;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_PREFIX: &str = "aws-identity-management";
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value '{value}' for {key} (expected {expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            _ => None,
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unresolved layer of settings. Keys are flat and match the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub verbosity: Option<String>,
    pub output: Option<PathBuf>,
    pub state_mode: Option<String>,
    pub platform: Option<String>,
    pub tfc_org: Option<String>,
    pub prefix: Option<String>,
    pub environment: Option<String>,
    #[serde(alias = "enable_team")]
    pub enable_elevated_access: Option<bool>,
    pub auto_update_providers: Option<bool>,
    pub retain_managed_policies: Option<bool>,
    pub region: Option<String>,
    pub concurrency: Option<usize>,
}

impl RawSettings {
    pub fn from_yaml(content: &str, path: &Path) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file. A missing file is an empty layer unless `required`.
    pub fn load(path: &Path, required: bool) -> ConfigResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loaded config file {:?}", path);
                Self::from_yaml(&content, path)
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !required => {
                debug!("No config file at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Fill every unset value from a lower-precedence layer.
    pub fn or(self, lower: RawSettings) -> Self {
        Self {
            verbosity: self.verbosity.or(lower.verbosity),
            output: self.output.or(lower.output),
            state_mode: self.state_mode.or(lower.state_mode),
            platform: self.platform.or(lower.platform),
            tfc_org: self.tfc_org.or(lower.tfc_org),
            prefix: self.prefix.or(lower.prefix),
            environment: self.environment.or(lower.environment),
            enable_elevated_access: self.enable_elevated_access.or(lower.enable_elevated_access),
            auto_update_providers: self.auto_update_providers.or(lower.auto_update_providers),
            retain_managed_policies: self.retain_managed_policies.or(lower.retain_managed_policies),
            region: self.region.or(lower.region),
            concurrency: self.concurrency.or(lower.concurrency),
        }
    }
}

fn parse_value<T>(
    key: &'static str,
    value: Option<String>,
    parse: fn(&str) -> Option<T>,
    expected: &'static str,
) -> ConfigResult<Option<T>> {
    value
        .map(|value| match parse(value.trim()) {
            Some(parsed) => Ok(parsed),
            None => Err(ConfigError::InvalidValue {
                key,
                value,
                expected,
            }),
        })
        .transpose()
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub verbosity: Verbosity,
    pub output: PathBuf,
    pub state_mode: StateMode,
    pub platform: Platform,
    pub tfc_org: String,
    pub prefix: String,
    pub environment: String,
    pub enable_elevated_access: bool,
    pub auto_update_providers: bool,
    pub retain_managed_policies: bool,
    pub region: Option<String>,
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            state_mode: StateMode::Single,
            platform: Platform::Local,
            tfc_org: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            environment: String::new(),
            enable_elevated_access: false,
            auto_update_providers: true,
            retain_managed_policies: false,
            region: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Settings {
    /// Apply a raw layer over the defaults and validate the result.
    pub fn resolve(raw: RawSettings) -> ConfigResult<Self> {
        let defaults = Settings::default();

        let settings = Self {
            verbosity: parse_value(
                "verbosity",
                raw.verbosity,
                Verbosity::from_str,
                "quiet, normal or verbose",
            )?
            .unwrap_or(defaults.verbosity),
            output: raw.output.unwrap_or(defaults.output),
            state_mode: parse_value(
                "state_mode",
                raw.state_mode,
                StateMode::from_str,
                "single or multi",
            )?
            .unwrap_or(defaults.state_mode),
            platform: parse_value("platform", raw.platform, Platform::from_str, "local or tfc")?
                .unwrap_or(defaults.platform),
            tfc_org: raw.tfc_org.unwrap_or(defaults.tfc_org),
            prefix: raw.prefix.unwrap_or(defaults.prefix),
            environment: raw.environment.unwrap_or(defaults.environment),
            enable_elevated_access: raw
                .enable_elevated_access
                .unwrap_or(defaults.enable_elevated_access),
            auto_update_providers: raw
                .auto_update_providers
                .unwrap_or(defaults.auto_update_providers),
            retain_managed_policies: raw
                .retain_managed_policies
                .unwrap_or(defaults.retain_managed_policies),
            region: raw.region.filter(|r| !r.trim().is_empty()),
            concurrency: raw.concurrency.unwrap_or(defaults.concurrency),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.platform == Platform::Tfc && self.tfc_org.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "tfc_org is required when platform is 'tfc'".to_string(),
            ));
        }
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("prefix must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        SnapshotStore::default_path(&self.output)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new()
            .concurrency(self.concurrency)
            .enable_elevated_access(self.enable_elevated_access)
            .retain_managed_policies(self.retain_managed_policies)
    }

    /// Generation options without provider versions or preserved policies;
    /// those depend on I/O done by the generate command.
    pub fn generate_options(&self) -> GenerateOptions {
        let mut options = GenerateOptions::new()
            .with_state_mode(self.state_mode)
            .with_platform(self.platform)
            .with_tfc_org(self.tfc_org.trim())
            .with_prefix(self.prefix.trim())
            .with_environment(self.environment.trim())
            .with_elevated_access(self.enable_elevated_access);
        if let Some(region) = &self.region {
            options = options.with_region(region.trim());
        }
        options
    }
}
