//! Static map of AWS-managed policies and their documents.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use idc_model::sanitize_name;
use idc_templates::HclWriter;
use tracing::{debug, info, warn};

use super::{json_document, ComponentOutput, RenderContext};
use crate::error::IacResult;
use crate::preserve::{MANAGED_POLICIES_MAP_FILE, POLICY_DOCUMENTS_DIR};

pub const OUTPUTS_FILE: &str = "outputs.tf";

pub fn render(ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    let snapshot = ctx.snapshot;
    let mut out = ComponentOutput::new();
    let docs = Path::new(POLICY_DOCUMENTS_DIR);

    let mut map: BTreeMap<String, String> = BTreeMap::new();

    if !snapshot.managed_policies.is_empty() {
        for policy in snapshot.managed_policies.values() {
            map.insert(policy.name.clone(), policy.arn.clone());
            if let Some(document) = &policy.document {
                out.file(
                    docs.join(format!("{}.json", sanitize_name(&policy.name))),
                    json_document(document)?,
                );
            }
        }
    } else if let Some(preserved) = &ctx.options.preserved_policies {
        info!(
            "Using {} managed policies preserved from previous output",
            preserved.policies.len()
        );
        map.extend(preserved.policies.clone());
        for (file_name, content) in &preserved.documents {
            out.file(docs.join(file_name), content.clone());
        }
    } else {
        warn!("Snapshot holds no AWS-managed policies; managed_policies_map will be empty");
    }

    // Attachments fall back to their own ARN, but a gap here usually means
    // stale retained data.
    let known: BTreeSet<&String> = map.values().collect();
    for ps in snapshot.permission_sets.values() {
        for attached in &ps.managed_policies {
            if !known.contains(&attached.arn) {
                warn!(
                    "Managed policy {} attached to {} is not in the managed policy map",
                    attached.arn, ps.name
                );
            }
        }
    }

    let mut w = HclWriter::new();
    w.open("locals");
    w.open_map("managed_policies_map");
    for (name, arn) in &map {
        w.map_string_entry(name, arn);
    }
    w.close();
    w.close();
    out.file(MANAGED_POLICIES_MAP_FILE, w.finish());

    let mut outputs = HclWriter::new();
    outputs.open("output \"managed_policies_map\"");
    outputs.attr("value", "local.managed_policies_map");
    outputs.close();
    out.file(OUTPUTS_FILE, outputs.finish());

    debug!("managed_policies: {} policies", map.len());
    Ok(out)
}
