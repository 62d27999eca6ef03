//! Generate command - Render Terraform from a snapshot.

use anyhow::{Context, Result};
use tracing::{info, warn};

use idc_iac::{resolve_versions, PreservedPolicies, RegistryClient, TerraformGenerator};
use idc_model::{Snapshot, SnapshotStore, SnapshotValidator};

use crate::config::Settings;

/// Generate from `snapshot`, or from the saved snapshot when none is given.
pub async fn execute(settings: &Settings, snapshot: Option<Snapshot>) -> Result<()> {
    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => {
            let path = settings.snapshot_path();
            SnapshotStore::load(&path).with_context(|| {
                format!("Failed to load snapshot {:?}; run `idcgen fetch` first", path)
            })?
        }
    };

    let warnings = SnapshotValidator::validate(&snapshot)
        .into_result()
        .context("Snapshot is inconsistent")?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    let mut options = settings.generate_options();

    if settings.auto_update_providers {
        let versions = resolve_versions(&RegistryClient::new(), settings.platform).await;
        options = options.with_versions(versions);
    }

    if settings.retain_managed_policies && snapshot.managed_policies.is_empty() {
        let preserved = PreservedPolicies::load(&settings.output)
            .context("Failed to read managed policies from the previous output")?;
        match preserved {
            Some(preserved) => options = options.with_preserved_policies(preserved),
            None => warn!("No previous managed policy output found to retain"),
        }
    }

    let tree = TerraformGenerator::new()
        .context("Failed to load templates")?
        .generate(&snapshot, &options)
        .context("Failed to generate Terraform")?;

    tree.write_atomic(&settings.output)
        .with_context(|| format!("Failed to write output to {:?}", settings.output))?;

    info!(
        "Wrote {} files to {:?} ({} state)",
        tree.len(),
        settings.output,
        settings.state_mode
    );
    Ok(())
}
