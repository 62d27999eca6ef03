//! Per-component renderers.
//!
//! Each renderer reads the snapshot through a [`RenderContext`] and returns
//! component-relative files plus the import blocks for the resources it
//! declares. Resource code always reads cross-component inputs and the
//! instance identifiers as `local.<name>`; where those locals come from is
//! decided by the generator per state mode.

use std::collections::BTreeMap;
use std::path::PathBuf;

use idc_model::Snapshot;
use idc_templates::TemplateRenderer;

use crate::error::{IacError, IacResult};
use crate::imports::ImportBlock;
use crate::layout::{Component, GenerateOptions};
use crate::names::ResourceNames;

pub mod account_assignments;
pub mod identity_store;
pub mod managed_policies;
pub mod permission_sets;
pub mod team;

/// Shared, read-only state for one generation run.
pub struct RenderContext<'a> {
    pub snapshot: &'a Snapshot,
    pub options: &'a GenerateOptions,
    pub renderer: &'a TemplateRenderer,
    pub names: ResourceNames,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        snapshot: &'a Snapshot,
        options: &'a GenerateOptions,
        renderer: &'a TemplateRenderer,
    ) -> Self {
        Self {
            snapshot,
            options,
            renderer,
            names: ResourceNames::build(snapshot),
        }
    }
}

/// Files and imports produced by one component.
#[derive(Debug, Default)]
pub struct ComponentOutput {
    pub files: BTreeMap<PathBuf, String>,
    pub imports: Vec<ImportBlock>,
}

impl ComponentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn import(&mut self, block: ImportBlock) {
        self.imports.push(block);
    }
}

/// Render one component.
pub fn render(component: Component, ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    match component {
        Component::IdentityStore => identity_store::render(ctx),
        Component::ManagedPolicies => managed_policies::render(ctx),
        Component::PermissionSets => permission_sets::render(ctx),
        Component::AccountAssignments => account_assignments::render(ctx),
        Component::Team => team::render(ctx),
    }
}

pub(crate) fn missing_name(kind: &str, id: &str) -> IacError {
    IacError::TemplateRender(format!("no resource name for {} '{}'", kind, id))
}

/// Pretty JSON with sorted keys and a trailing newline.
pub(crate) fn json_document(value: &serde_json::Value) -> IacResult<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(&sorted(value))?))
}

fn sorted(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_document_sorts_keys() {
        let doc = json_document(&json!({"b": 1, "a": {"d": 2, "c": 3}})).unwrap();
        assert_eq!(
            doc,
            "{\n  \"a\": {\n    \"c\": 3,\n    \"d\": 2\n  },\n  \"b\": 1\n}\n"
        );
    }
}
