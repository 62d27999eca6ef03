//! Fetch command - Read Identity Center state and save the snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use idc_fetch::{AwsDirectory, Fetcher};
use idc_model::{Snapshot, SnapshotStore};

use crate::config::Settings;

pub async fn execute(settings: &Settings) -> Result<Snapshot> {
    let path = settings.snapshot_path();

    let previous = if settings.retain_managed_policies {
        SnapshotStore::load_optional(&path)
            .with_context(|| format!("Failed to read previous snapshot {:?}", path))?
    } else {
        None
    };

    let api = AwsDirectory::new(settings.region.clone()).await;
    let fetcher = Fetcher::new(Arc::new(api), settings.fetch_options());

    let snapshot = fetcher
        .fetch(previous.as_ref())
        .await
        .context("Failed to fetch IAM Identity Center state")?;

    SnapshotStore::save(&snapshot, &path)
        .with_context(|| format!("Failed to write snapshot to {:?}", path))?;

    info!(
        users = snapshot.users.len(),
        groups = snapshot.groups.len(),
        permission_sets = snapshot.permission_sets.len(),
        assignments = snapshot.assignments.len(),
        "Snapshot saved to {:?}",
        path
    );

    Ok(snapshot)
}
