//! Elevated-access (TEAM) eligibility, approvers and application assignments.
//!
//! Entity references in the TEAM tables are stored by name; they are
//! resolved to directory ids here so the generated module calls carry
//! literal ids.

use std::collections::BTreeMap;

use idc_model::{composite_key, EntityKind, EntityResolver, ResolveError, Snapshot};
use idc_templates::{builtin, hcl, vars, HclWriter};
use tracing::{debug, warn};

use super::account_assignments::accounts_map;
use super::{ComponentOutput, RenderContext};
use crate::error::{IacError, IacResult};
use crate::imports::{self, ImportBlock};
use crate::names::UniqueNames;

pub const DATA_FILE: &str = "data.tf";
pub const LOCALS_FILE: &str = "locals.tf";
pub const ELIGIBILITY_FILE: &str = "team_eligibility.tf";
pub const APPROVERS_FILE: &str = "team_approvers.tf";
pub const APPLICATION_FILE: &str = "team_application.tf";
pub const ELIGIBILITY_MODULE_DIR: &str = "modules/eligibility";
pub const APPROVER_MODULE_DIR: &str = "modules/approver";

const APPLICATION_ASSIGNMENT_RESOURCE: &str = "aws_ssoadmin_application_assignment.controller";

/// `[{ name = "...", id = "..." }, ...]`
fn named_ids(items: &[(String, String)]) -> String {
    let entries: Vec<String> = items
        .iter()
        .map(|(name, id)| format!("{{ name = {}, id = {} }}", hcl::quote(name), hcl::quote(id)))
        .collect();
    format!("[{}]", entries.join(", "))
}

fn resolve_all<'a>(
    resolver: &EntityResolver<'_>,
    kind: EntityKind,
    names: impl IntoIterator<Item = &'a String>,
) -> IacResult<Vec<(String, String)>> {
    names
        .into_iter()
        .map(|name| {
            let entity = resolver.resolve_kind(kind, name)?;
            Ok((entity.display_name, entity.id))
        })
        .collect()
}

fn permission_set_arn(snapshot: &Snapshot, name: &str) -> IacResult<String> {
    snapshot
        .permission_sets
        .values()
        .find(|ps| ps.name == name)
        .map(|ps| ps.arn.clone())
        .ok_or_else(|| {
            IacError::Resolve(ResolveError::NotFound {
                kind: "PermissionSet".to_string(),
                name: name.to_string(),
            })
        })
}

pub fn render(ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    let snapshot = ctx.snapshot;
    let team = snapshot.elevated_access.as_ref().ok_or_else(|| {
        IacError::TemplateRender("snapshot holds no elevated-access data".to_string())
    })?;
    let resolver = EntityResolver::new(snapshot);
    let mut out = ComponentOutput::new();

    // Tables
    let mut table_names = UniqueNames::new();
    let mut eligibility_table = None;
    let mut approvers_table = None;
    let mut data = HclWriter::new();
    for (index, table) in team.tables.values().enumerate() {
        let name = table_names.claim(&table.name);
        if index > 0 {
            data.blank();
        }
        data.open(&format!("data \"aws_dynamodb_table\" \"{}\"", name));
        data.string_attr("name", &table.name);
        data.close();

        let reference = format!("data.aws_dynamodb_table.{}.name", name);
        if table.is_eligibility() && eligibility_table.is_none() {
            eligibility_table = Some(reference);
        } else if table.is_approvers() && approvers_table.is_none() {
            approvers_table = Some(reference);
        }
    }
    if !team.tables.is_empty() {
        out.file(DATA_FILE, data.finish());
    }

    // Locals
    let ous = ou_map(snapshot);

    let mut locals = HclWriter::new();
    locals.open("locals");
    accounts_map(ctx, &mut locals);
    locals.blank();
    locals.open_map("ou_map");
    for (name, id) in &ous {
        locals.map_string_entry(name, id);
    }
    locals.close();
    locals.close();
    out.file(LOCALS_FILE, locals.finish());

    let mut module_names = UniqueNames::new();

    // Eligibility
    match (&eligibility_table, team.eligibility.is_empty()) {
        (_, true) => {}
        (None, false) => warn!(
            "Skipping {} eligibility records: no eligibility table found",
            team.eligibility.len()
        ),
        (Some(table), false) => {
            let mut w = HclWriter::new();
            for (index, record) in team.eligibility.values().enumerate() {
                let kind = EntityKind::parse(&record.entity.entity_type)?;
                let entity = resolver.resolve_kind(kind, &record.entity.name)?;
                let accounts = resolve_all(&resolver, EntityKind::Account, &record.accounts)?;
                let ous = resolve_all(
                    &resolver,
                    EntityKind::OrganizationalUnit,
                    &record.organizational_units,
                )?;
                let permissions = record
                    .permission_sets
                    .iter()
                    .map(|name| Ok((name.clone(), permission_set_arn(snapshot, name)?)))
                    .collect::<IacResult<Vec<_>>>()?;

                let module = module_names.claim(&format!(
                    "eligibility_{}",
                    composite_key([kind.as_str(), entity.display_name.as_str()])
                ));

                if index > 0 {
                    w.blank();
                }
                w.open(&format!("module \"{}\"", module));
                w.attr("source", &hcl::quote(&format!("./{}", ELIGIBILITY_MODULE_DIR)));
                w.blank();
                w.attr("table_name", table);
                w.string_attr("entity_id", &entity.id);
                w.string_attr("entity_name", &entity.display_name);
                w.string_attr("entity_type", kind.as_str());
                w.attr("accounts", &named_ids(&accounts));
                w.attr("ous", &named_ids(&ous));
                w.attr("permissions", &named_ids(&permissions));
                w.attr("duration", &record.max_duration_hours.to_string());
                w.attr("approval_required", &record.approval_required.to_string());
                w.string_attr("ticket_no", &record.ticket_no);
                w.close();
            }
            out.file(ELIGIBILITY_FILE, w.finish());
        }
    }

    // Approvers
    match (&approvers_table, team.approvers.is_empty()) {
        (_, true) => {}
        (None, false) => warn!(
            "Skipping {} approver records: no approvers table found",
            team.approvers.len()
        ),
        (Some(table), false) => {
            let mut w = HclWriter::new();
            for (index, record) in team.approvers.values().enumerate() {
                let kind = EntityKind::parse(&record.entity.entity_type)?;
                let entity = resolver.resolve_kind(kind, &record.entity.name)?;
                let groups = resolve_all(&resolver, EntityKind::Group, &record.approver_groups)?;

                let module = module_names.claim(&format!(
                    "approver_{}",
                    composite_key([kind.as_str(), entity.display_name.as_str()])
                ));

                if index > 0 {
                    w.blank();
                }
                w.open(&format!("module \"{}\"", module));
                w.attr("source", &hcl::quote(&format!("./{}", APPROVER_MODULE_DIR)));
                w.blank();
                w.attr("table_name", table);
                w.string_attr("entity_id", &entity.id);
                w.string_attr("entity_name", &entity.display_name);
                w.string_attr("entity_type", kind.as_str());
                w.attr(
                    "approvers",
                    &hcl::string_list(groups.iter().map(|(name, _)| name)),
                );
                w.attr(
                    "approver_group_ids",
                    &hcl::string_list(groups.iter().map(|(_, id)| id)),
                );
                w.string_attr("ticket_no", &record.ticket_no);
                w.close();
            }
            out.file(APPROVERS_FILE, w.finish());
        }
    }

    // Application assignments
    if let Some(application) = &team.application {
        let mut keys = UniqueNames::new();
        let mut w = HclWriter::new();
        w.open("locals");
        w.string_attr("team_application_arn", &application.arn);
        w.blank();
        w.open_map("team_application_assignments");
        for principal_ref in &application.assignments {
            let (Some(principal), Some(name)) = (
                snapshot.resolve_principal(principal_ref),
                ctx.names.principal(principal_ref),
            ) else {
                warn!(
                    "Skipping TEAM application assignment of unknown {} {}",
                    principal_ref.kind, principal_ref.id
                );
                continue;
            };
            let principal_type = principal.kind().as_str();
            let key = keys.claim_exact(composite_key([principal_type, name]));

            w.open(&format!("{} =", hcl::quote(&key)));
            w.string_attr("principal_type", principal_type);
            w.string_attr("principal", principal.name());
            w.close();

            out.import(ImportBlock::keyed(
                APPLICATION_ASSIGNMENT_RESOURCE,
                &key,
                imports::application_assignment_id(&application.arn, principal.id(), principal_type),
            ));
        }
        w.close();
        w.close();
        w.blank();
        w.open("resource \"aws_ssoadmin_application_assignment\" \"controller\"");
        w.attr("for_each", "local.team_application_assignments");
        w.blank();
        w.attr("application_arn", "local.team_application_arn");
        w.attr(
            "principal_id",
            "each.value.principal_type == \"GROUP\" ? local.groups_map[each.value.principal] : local.users_map[each.value.principal]",
        );
        w.attr("principal_type", "each.value.principal_type");
        w.close();
        out.file(APPLICATION_FILE, w.finish());
    }

    // Embedded modules
    let modules = [
        (ELIGIBILITY_MODULE_DIR, "main.tf", builtin::MODULE_ELIGIBILITY_MAIN),
        (ELIGIBILITY_MODULE_DIR, "variables.tf", builtin::MODULE_ELIGIBILITY_VARIABLES),
        (APPROVER_MODULE_DIR, "main.tf", builtin::MODULE_APPROVER_MAIN),
        (APPROVER_MODULE_DIR, "variables.tf", builtin::MODULE_APPROVER_VARIABLES),
    ];
    for (dir, file, template) in modules {
        let content = ctx.renderer.render_builtin(template, &vars([]))?;
        out.file(format!("{}/{}", dir, file), content);
    }

    debug!(
        "team: {} eligibility, {} approver records",
        team.eligibility.len(),
        team.approvers.len()
    );

    Ok(out)
}

/// OU name to id. "Root" always names the organization root.
fn ou_map(snapshot: &Snapshot) -> BTreeMap<String, String> {
    let mut ous = BTreeMap::new();
    for ou in snapshot.organization.organizational_units.values() {
        if ou.name.eq_ignore_ascii_case("root") {
            warn!("Organizational unit {} is named '{}', leaving it out of ou_map", ou.id, ou.name);
            continue;
        }
        ous.entry(ou.name.clone()).or_insert_with(|| ou.id.clone());
    }
    ous.insert("Root".to_string(), snapshot.organization.root.id.clone());
    ous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_ids() {
        let items = vec![("Prod".to_string(), "222222222222".to_string())];
        assert_eq!(
            named_ids(&items),
            "[{ name = \"Prod\", id = \"222222222222\" }]"
        );
        assert_eq!(named_ids(&[]), "[]");
    }
}
