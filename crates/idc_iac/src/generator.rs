//! Snapshot to Terraform.

use std::path::PathBuf;

use idc_model::Snapshot;
use idc_templates::TemplateRenderer;
use tracing::{debug, info, warn};

use crate::components::{self, RenderContext};
use crate::error::IacResult;
use crate::imports::render_imports;
use crate::layout::{Component, GenerateOptions, StateMode};
use crate::output::OutputTree;
use crate::scaffold;

pub const PROVIDERS_FILE: &str = "providers.tf";
pub const MAIN_FILE: &str = "main.tf";
pub const INSTANCES_FILE: &str = "instances.tf";
pub const VARIABLES_FILE: &str = "variables.tf";
pub const EXTERNAL_FILE: &str = "external.tf";
pub const IMPORTS_FILE: &str = "imports.tf";

/// Renders a snapshot into an [`OutputTree`].
///
/// Generation is pure: the same snapshot and options always produce the same
/// tree. Nothing touches the filesystem until [`OutputTree::write_atomic`].
pub struct TerraformGenerator {
    renderer: TemplateRenderer,
}

impl TerraformGenerator {
    pub fn new() -> IacResult<Self> {
        Ok(Self {
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Components rendered for this snapshot, in dependency order.
    pub fn components(snapshot: &Snapshot, options: &GenerateOptions) -> Vec<Component> {
        let include_team = options.enable_elevated_access && snapshot.elevated_access_enabled();
        if options.enable_elevated_access && !include_team {
            warn!("Elevated access enabled but the snapshot holds no TEAM data; skipping team");
        }
        Component::ordered(include_team)
    }

    pub fn generate(&self, snapshot: &Snapshot, options: &GenerateOptions) -> IacResult<OutputTree> {
        options.validate()?;

        let components = Self::components(snapshot, options);
        let region = options
            .region
            .clone()
            .unwrap_or_else(|| snapshot.instance.region.clone());
        let ctx = RenderContext::new(snapshot, options, &self.renderer);
        let mut tree = OutputTree::new();

        info!(
            "Generating {} components ({} state, {} platform)",
            components.len(),
            options.state_mode,
            options.platform
        );

        for component in &components {
            let component = *component;
            let dir = PathBuf::from(component.as_str());
            let output = components::render(component, &ctx)?;

            for (path, content) in &output.files {
                tree.insert(dir.join(path), content);
            }

            if component.needs_instance() {
                tree.insert(dir.join(INSTANCES_FILE), &scaffold::instances(&self.renderer)?);
            }

            match options.state_mode {
                StateMode::Single => {
                    if !component.inputs().is_empty() {
                        tree.insert(dir.join(VARIABLES_FILE), &scaffold::input_variables(component));
                    }
                    if !output.imports.is_empty() {
                        let imports =
                            render_imports(&self.renderer, &output.imports, Some(component.as_str()))?;
                        tree.insert(format!("{}_imports.tf", component), &imports);
                    }
                }
                StateMode::Multi => {
                    tree.insert(
                        dir.join(PROVIDERS_FILE),
                        &scaffold::providers(&self.renderer, options, &region, Some(component))?,
                    );
                    if !component.inputs().is_empty() {
                        tree.insert(
                            dir.join(EXTERNAL_FILE),
                            &scaffold::external_inputs(&self.renderer, options, component)?,
                        );
                    }
                    if !output.imports.is_empty() {
                        let imports = render_imports(&self.renderer, &output.imports, None)?;
                        tree.insert(dir.join(IMPORTS_FILE), &imports);
                    }
                }
            }

            debug!(
                "{}: {} files, {} imports",
                component,
                output.files.len(),
                output.imports.len()
            );
        }

        if options.state_mode == StateMode::Single {
            tree.insert(
                PROVIDERS_FILE,
                &scaffold::providers(&self.renderer, options, &region, None)?,
            );
            tree.insert(MAIN_FILE, &scaffold::root_main(&components));
        }

        info!("Generated {} files", tree.len());
        Ok(tree)
    }
}
