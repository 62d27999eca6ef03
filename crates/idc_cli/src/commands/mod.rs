//! CLI command definitions.
//!
//! Every option is global so it can be given before or after the
//! subcommand. Without a subcommand the full pipeline runs.

use std::path::{Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};

use crate::config::{ConfigResult, RawSettings, Settings, DEFAULT_CONFIG_FILE};

pub mod fetch;
pub mod generate;
pub mod run;

/// idcgen - Terraform from an existing AWS IAM Identity Center
#[derive(Parser, Debug)]
#[command(name = "idcgen")]
#[command(version, about = "Generate Terraform (with import blocks) from AWS IAM Identity Center")]
#[command(long_about = r#"
idcgen reads the live state of an AWS IAM Identity Center instance and
generates Terraform that reproduces it, including import blocks for every
resource that already exists.

WORKFLOWS:
  (none)    → fetch, then generate
  fetch     → read AWS and write <output>/json/snapshot.json
  generate  → render Terraform from the saved snapshot

CONFIGURATION:
  flags > IDCGEN_* environment variables > config.yaml > defaults

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid configuration or arguments
  3 - Authentication failure
  4 - Template or render error
  5 - AWS API error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: quiet, normal or verbose
    #[arg(short, long, global = true, env = "IDCGEN_VERBOSITY")]
    pub verbosity: Option<String>,

    /// Output directory
    #[arg(short, long, global = true, env = "IDCGEN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Config file (default: config.yaml, optional)
    #[arg(short, long, global = true, env = "IDCGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// State mode: single or multi
    #[arg(short, long, global = true, env = "IDCGEN_STATE_MODE")]
    pub state_mode: Option<String>,

    /// Platform: local or tfc
    #[arg(short, long, global = true, env = "IDCGEN_PLATFORM")]
    pub platform: Option<String>,

    /// Terraform Cloud organization (required for tfc)
    #[arg(short, long, global = true, env = "IDCGEN_TFC_ORG")]
    pub tfc_org: Option<String>,

    /// Prefix for workspace names
    #[arg(short = 'x', long, global = true, env = "IDCGEN_PREFIX")]
    pub prefix: Option<String>,

    /// Environment name used in workspace names
    #[arg(short, long, global = true, env = "IDCGEN_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Include TEAM elevated-access data
    #[arg(short = 'm', long, global = true, env = "IDCGEN_ENABLE_ELEVATED_ACCESS",
          value_parser = BoolishValueParser::new())]
    pub enable_elevated_access: Option<bool>,

    /// Look up the latest provider versions in the Terraform Registry
    #[arg(short, long, global = true, env = "IDCGEN_AUTO_UPDATE_PROVIDERS",
          value_parser = BoolishValueParser::new())]
    pub auto_update_providers: Option<bool>,

    /// Reuse the previous AWS-managed policy catalog instead of refreshing it
    #[arg(short, long, global = true, env = "IDCGEN_RETAIN_MANAGED_POLICIES",
          value_parser = BoolishValueParser::new())]
    pub retain_managed_policies: Option<bool>,

    /// AWS region (default: from the AWS configuration)
    #[arg(long, global = true, env = "IDCGEN_REGION")]
    pub region: Option<String>,

    /// Maximum concurrent AWS detail calls
    #[arg(long, global = true, env = "IDCGEN_CONCURRENCY")]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Read AWS state and save the snapshot
    Fetch,

    /// Generate Terraform from the saved snapshot
    Generate,
}

impl Cli {
    /// Flags and environment variables as the top settings layer.
    pub fn overrides(&self) -> RawSettings {
        RawSettings {
            verbosity: self.verbosity.clone(),
            output: self.output.clone(),
            state_mode: self.state_mode.clone(),
            platform: self.platform.clone(),
            tfc_org: self.tfc_org.clone(),
            prefix: self.prefix.clone(),
            environment: self.environment.clone(),
            enable_elevated_access: self.enable_elevated_access,
            auto_update_providers: self.auto_update_providers,
            retain_managed_policies: self.retain_managed_policies,
            region: self.region.clone(),
            concurrency: self.concurrency,
        }
    }

    /// Resolve settings. An explicitly named config file must exist.
    pub fn settings(&self) -> ConfigResult<Settings> {
        let file = match &self.config {
            Some(path) => RawSettings::load(path, true)?,
            None => RawSettings::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };
        Settings::resolve(self.overrides().or(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "idcgen", "-s", "multi", "-p", "tfc", "-t", "acme", "-m", "true", "-a", "no",
            "generate",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Generate));
        assert_eq!(cli.state_mode.as_deref(), Some("multi"));
        assert_eq!(cli.tfc_org.as_deref(), Some("acme"));
        assert_eq!(cli.enable_elevated_access, Some(true));
        assert_eq!(cli.auto_update_providers, Some(false));
        assert_eq!(cli.retain_managed_policies, None);
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["idcgen", "fetch", "--region", "eu-west-1", "-o", "out"])
            .unwrap();

        assert_eq!(cli.command, Some(Commands::Fetch));
        assert_eq!(cli.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["idcgen", "-x", "idc"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.overrides().prefix.as_deref(), Some("idc"));
    }
}
