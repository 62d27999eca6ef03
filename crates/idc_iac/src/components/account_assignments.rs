//! Account assignments.

use idc_model::composite_key;
use idc_templates::{hcl, HclWriter};
use tracing::{debug, warn};

use super::{missing_name, ComponentOutput, RenderContext};
use crate::error::{IacError, IacResult};
use crate::imports::{self, ImportBlock};
use crate::names::UniqueNames;

pub const ASSIGNMENTS_FILE: &str = "aws_ssoadmin_account_assignments.tf";
pub const LOCALS_FILE: &str = "locals.tf";

const ASSIGNMENT_RESOURCE: &str = "aws_ssoadmin_account_assignment.controller";

/// `locals { accounts_map = { name = id } }` for the active accounts.
pub(crate) fn accounts_map(ctx: &RenderContext<'_>, w: &mut HclWriter) {
    let mut accounts: Vec<_> = ctx
        .snapshot
        .organization
        .accounts
        .values()
        .filter(|a| ctx.snapshot.organization.is_active_account(&a.id))
        .map(|a| (a.name.as_str(), a.id.as_str()))
        .collect();
    accounts.sort();

    w.open_map("accounts_map");
    for (name, id) in accounts {
        w.map_string_entry(name, id);
    }
    w.close();
}

pub fn render(ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    let snapshot = ctx.snapshot;
    let instance_arn = &snapshot.instance.arn;
    let mut out = ComponentOutput::new();

    let mut locals = HclWriter::new();
    locals.open("locals");
    accounts_map(ctx, &mut locals);
    locals.close();
    out.file(LOCALS_FILE, locals.finish());

    let mut keys = UniqueNames::new();
    let mut w = HclWriter::new();
    w.open("locals");
    w.open_map("account_assignments");

    let mut rendered = 0;
    for assignment in &snapshot.assignments {
        let ps = snapshot
            .permission_set(&assignment.permission_set_arn)
            .ok_or_else(|| {
                IacError::TemplateRender(format!(
                    "assignment on account {} references unknown permission set {}",
                    assignment.account_id, assignment.permission_set_arn
                ))
            })?;

        if ps.is_elevated_access_managed() {
            debug!(
                "Skipping elevated-access assignment of {} on {}",
                ps.name, assignment.account_id
            );
            continue;
        }

        let Some(account) = snapshot
            .organization
            .accounts
            .get(&assignment.account_id)
            .filter(|a| snapshot.organization.is_active_account(&a.id))
        else {
            warn!(
                "Skipping assignment of {} on inactive or unknown account {}",
                ps.name, assignment.account_id
            );
            continue;
        };

        let principal = snapshot
            .resolve_principal(&assignment.principal)
            .ok_or_else(|| {
                IacError::TemplateRender(format!(
                    "assignment of {} on account {} references unknown {} {}",
                    ps.name,
                    account.id,
                    assignment.principal.kind,
                    assignment.principal.id
                ))
            })?;

        let account_name = ctx
            .names
            .account(&account.id)
            .ok_or_else(|| missing_name("account", &account.id))?;
        let ps_name = ctx
            .names
            .permission_set(&ps.arn)
            .ok_or_else(|| missing_name("permission set", &ps.arn))?;
        let principal_name = ctx
            .names
            .principal(&assignment.principal)
            .ok_or_else(|| missing_name("principal", &assignment.principal.id))?;
        let principal_type = principal.kind().as_str();

        let key = keys.claim_exact(composite_key([
            account_name,
            ps_name,
            principal_type,
            principal_name,
        ]));

        w.open(&format!("{} =", hcl::quote(&key)));
        w.string_attr("account", &account.name);
        w.string_attr("permission_set", &ps.name);
        w.string_attr("principal_type", principal_type);
        w.string_attr("principal", principal.name());
        w.close();

        out.import(ImportBlock::keyed(
            ASSIGNMENT_RESOURCE,
            &key,
            imports::account_assignment_id(
                &assignment.principal.id,
                principal_type,
                &account.id,
                &ps.arn,
                instance_arn,
            ),
        ));
        rendered += 1;
    }

    w.close();
    w.close();
    w.blank();
    w.open("resource \"aws_ssoadmin_account_assignment\" \"controller\"");
    w.attr("for_each", "local.account_assignments");
    w.blank();
    w.attr("instance_arn", "local.instance_arn");
    w.attr(
        "permission_set_arn",
        "local.permission_sets_map[each.value.permission_set]",
    );
    w.attr(
        "principal_id",
        "each.value.principal_type == \"GROUP\" ? local.groups_map[each.value.principal] : local.users_map[each.value.principal]",
    );
    w.attr("principal_type", "each.value.principal_type");
    w.attr("target_id", "local.accounts_map[each.value.account]");
    w.string_attr("target_type", "AWS_ACCOUNT");
    w.close();
    out.file(ASSIGNMENTS_FILE, w.finish());

    debug!(
        "account_assignments: {} of {} assignments rendered",
        rendered,
        snapshot.assignments.len()
    );

    Ok(out)
}
