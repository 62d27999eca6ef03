//! Wiring files: providers, root module, cross-component inputs.

use idc_templates::{builtin, hcl, vars, HclWriter, TemplateRenderer};

use crate::error::IacResult;
use crate::layout::{Component, GenerateOptions, Platform};

/// `providers.tf` for the root (single) or for one component (multi).
pub fn providers(
    renderer: &TemplateRenderer,
    options: &GenerateOptions,
    region: &str,
    component: Option<Component>,
) -> IacResult<String> {
    let region = hcl::escape(region);
    let rendered = match options.platform {
        Platform::Local => renderer.render_builtin(
            builtin::PROVIDERS_LOCAL,
            &vars([
                ("aws_version", options.versions.aws.as_str()),
                ("region", region.as_str()),
            ]),
        )?,
        Platform::Tfc => {
            let organization = hcl::escape(&options.tfc_org);
            let workspace = hcl::escape(&options.workspace_name(component));
            renderer.render_builtin(
                builtin::PROVIDERS_TFC,
                &vars([
                    ("aws_version", options.versions.aws.as_str()),
                    ("tfe_version", options.versions.tfe.as_str()),
                    ("organization", organization.as_str()),
                    ("workspace", workspace.as_str()),
                    ("region", region.as_str()),
                ]),
            )?
        }
    };
    Ok(rendered)
}

/// `instances.tf`: instance ARN and identity store id as locals.
pub fn instances(renderer: &TemplateRenderer) -> IacResult<String> {
    Ok(renderer.render_builtin(builtin::INSTANCES, &vars([]))?)
}

/// Root `main.tf` for single state mode.
pub fn root_main(components: &[Component]) -> String {
    let mut w = HclWriter::new();

    for (index, component) in components.iter().enumerate() {
        if index > 0 {
            w.blank();
        }
        w.open(&format!("module \"{}\"", component));
        w.attr("source", &hcl::quote(&format!("./{}", component)));

        let inputs = component.inputs();
        if !inputs.is_empty() {
            w.blank();
            for (name, source) in inputs {
                w.attr(name, &format!("module.{}.{}", source, name));
            }
        }

        if *component == Component::Team {
            let deps: Vec<String> = component
                .dependencies()
                .iter()
                .filter(|d| components.contains(d))
                .map(|d| format!("module.{}", d))
                .collect();
            w.blank();
            w.attr("depends_on", &format!("[{}]", deps.join(", ")));
        }
        w.close();
    }

    w.finish()
}

/// `variables.tf` of a child module in single state mode: one variable per
/// input, re-exposed as a local of the same name.
pub fn input_variables(component: Component) -> String {
    let mut w = HclWriter::new();

    for (name, _) in component.inputs() {
        w.open(&format!("variable \"{}\"", name));
        w.attr("type", "map(string)");
        w.close();
        w.blank();
    }

    w.open("locals");
    for (name, _) in component.inputs() {
        w.attr(name, &format!("var.{}", name));
    }
    w.close();

    w.finish()
}

/// `external.tf` of a component in multi state mode: reads inputs from the
/// producing components' state.
pub fn external_inputs(
    renderer: &TemplateRenderer,
    options: &GenerateOptions,
    component: Component,
) -> IacResult<String> {
    let mut sources: Vec<Component> = component.inputs().iter().map(|(_, c)| *c).collect();
    sources.dedup();

    let mut blocks = Vec::new();
    for source in &sources {
        let block = match options.platform {
            Platform::Tfc => {
                let organization = hcl::escape(&options.tfc_org);
                let workspace = hcl::escape(&options.workspace_name(Some(*source)));
                renderer.render_builtin(
                    builtin::EXTERNAL_TFE,
                    &vars([
                        ("component", source.as_str()),
                        ("organization", organization.as_str()),
                        ("workspace", workspace.as_str()),
                    ]),
                )?
            }
            Platform::Local => renderer.render_builtin(
                builtin::EXTERNAL_REMOTE_STATE,
                &vars([("component", source.as_str())]),
            )?,
        };
        blocks.push(block);
    }

    let mut w = HclWriter::new();
    w.open("locals");
    for (name, source) in component.inputs() {
        let expr = match options.platform {
            Platform::Tfc => format!("data.tfe_outputs.{}.nonsensitive_values.{}", source, name),
            Platform::Local => format!("data.terraform_remote_state.{}.outputs.{}", source, name),
        };
        w.attr(name, &expr);
    }
    w.close();
    blocks.push(w.finish());

    Ok(blocks.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StateMode;

    #[test]
    fn test_root_main_wires_inputs() {
        let main = root_main(&Component::ordered(false));

        assert!(main.contains("module \"identity_store\" {\n  source = \"./identity_store\"\n}"));
        assert!(main.contains(
            "  permission_sets_map = module.permission_sets.permission_sets_map\n"
        ));
        assert!(!main.contains("module \"team\""));
    }

    #[test]
    fn test_root_main_team_depends_on_everything() {
        let main = root_main(&Component::ordered(true));
        assert!(main.contains(
            "depends_on = [module.identity_store, module.managed_policies, module.permission_sets, module.account_assignments]"
        ));
    }

    #[test]
    fn test_input_variables() {
        let vars = input_variables(Component::PermissionSets);
        assert!(vars.contains("variable \"managed_policies_map\" {"));
        assert!(vars.contains("managed_policies_map = var.managed_policies_map"));
    }

    #[test]
    fn test_external_inputs_tfc() {
        let renderer = TemplateRenderer::new().unwrap();
        let options = GenerateOptions::new()
            .with_state_mode(StateMode::Multi)
            .with_platform(Platform::Tfc)
            .with_tfc_org("acme")
            .with_environment("prod");

        let external =
            external_inputs(&renderer, &options, Component::AccountAssignments).unwrap();

        assert_eq!(external.matches("data \"tfe_outputs\" \"identity_store\"").count(), 1);
        assert!(external.contains("workspace    = \"aws-identity-management-prod-permission-sets\""));
        assert!(external.contains(
            "users_map = data.tfe_outputs.identity_store.nonsensitive_values.users_map"
        ));
    }

    #[test]
    fn test_external_inputs_local() {
        let renderer = TemplateRenderer::new().unwrap();
        let options = GenerateOptions::new().with_state_mode(StateMode::Multi);

        let external = external_inputs(&renderer, &options, Component::PermissionSets).unwrap();
        assert!(external.contains("path = \"../managed_policies/terraform.tfstate\""));
        assert!(external.contains(
            "managed_policies_map = data.terraform_remote_state.managed_policies.outputs.managed_policies_map"
        ));
    }
}
