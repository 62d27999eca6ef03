//! Default run - fetch, then generate from the fresh snapshot.

use anyhow::Result;
use tracing::info;

use crate::config::Settings;

use super::{fetch, generate};

pub async fn execute(settings: &Settings) -> Result<()> {
    info!("Phase 1: fetch");
    let snapshot = fetch::execute(settings).await?;

    info!("Phase 2: generate");
    generate::execute(settings, Some(snapshot)).await
}
