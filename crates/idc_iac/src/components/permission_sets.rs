//! Permission sets, inline policies and policy attachments.

use std::path::Path;

use idc_model::composite_key;
use idc_templates::{hcl, HclWriter};
use tracing::debug;

use super::{json_document, missing_name, ComponentOutput, RenderContext};
use crate::error::IacResult;
use crate::imports::{self, ImportBlock};
use crate::names::UniqueNames;

pub const PERMISSION_SETS_FILE: &str = "aws_ssoadmin_permission_sets.tf";
pub const INLINE_POLICIES_FILE: &str = "aws_ssoadmin_permission_set_inline_policies.tf";
pub const MANAGED_ATTACHMENTS_FILE: &str = "aws_ssoadmin_managed_policy_attachments.tf";
pub const CUSTOMER_MANAGED_ATTACHMENTS_FILE: &str =
    "aws_ssoadmin_customer_managed_policy_attachments.tf";
pub const OUTPUTS_FILE: &str = "outputs.tf";
pub const INLINE_POLICIES_DIR: &str = "inline_policies";

const MANAGED_ATTACHMENT_RESOURCE: &str = "aws_ssoadmin_managed_policy_attachment.controller";
const CUSTOMER_MANAGED_ATTACHMENT_RESOURCE: &str =
    "aws_ssoadmin_customer_managed_policy_attachment.controller";

pub fn render(ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    let snapshot = ctx.snapshot;
    let instance_arn = &snapshot.instance.arn;
    let mut out = ComponentOutput::new();

    let mut permission_sets = HclWriter::new();
    let mut inline = HclWriter::new();
    let mut inline_count = 0;
    let mut arns_map = Vec::new();

    let mut managed_keys = UniqueNames::new();
    let mut managed = HclWriter::new();
    managed.open("locals");
    managed.open_map("managed_policy_attachments");

    let mut customer_keys = UniqueNames::new();
    let mut customer = HclWriter::new();
    customer.open("locals");
    customer.open_map("customer_managed_policy_attachments");

    for (index, (arn, ps)) in snapshot.permission_sets.iter().enumerate() {
        let name = ctx
            .names
            .permission_set(arn)
            .ok_or_else(|| missing_name("permission set", arn))?;
        let address = format!("aws_ssoadmin_permission_set.{}", name);

        if index > 0 {
            permission_sets.blank();
        }
        permission_sets.open(&format!("resource \"aws_ssoadmin_permission_set\" \"{}\"", name));
        permission_sets.string_attr("name", &ps.name);
        permission_sets.optional_string_attr("description", ps.description.as_deref());
        permission_sets.attr("instance_arn", "local.instance_arn");
        permission_sets.optional_string_attr("session_duration", ps.session_duration.as_deref());
        permission_sets.optional_string_attr("relay_state", ps.relay_state.as_deref());
        if !ps.tags.is_empty() {
            permission_sets.blank();
            permission_sets.open_map("tags");
            for (key, value) in &ps.tags {
                permission_sets.map_string_entry(key, value);
            }
            permission_sets.close();
        }
        permission_sets.close();

        out.import(ImportBlock::new(
            address.clone(),
            imports::permission_set_id(arn, instance_arn),
        ));
        arns_map.push((ps.name.clone(), format!("{}.arn", address)));

        if let Some(policy) = &ps.inline_policy {
            let policy_file = Path::new(INLINE_POLICIES_DIR).join(format!("{}.json", name));
            out.file(policy_file, json_document(policy)?);

            if inline_count > 0 {
                inline.blank();
            }
            inline_count += 1;
            inline.open(&format!(
                "resource \"aws_ssoadmin_permission_set_inline_policy\" \"{}\"",
                name
            ));
            inline.attr(
                "inline_policy",
                &format!("file(\"${{path.module}}/{}/{}.json\")", INLINE_POLICIES_DIR, name),
            );
            inline.attr("instance_arn", "local.instance_arn");
            inline.attr("permission_set_arn", &format!("{}.arn", address));
            inline.close();

            out.import(ImportBlock::new(
                format!("aws_ssoadmin_permission_set_inline_policy.{}", name),
                imports::permission_set_id(arn, instance_arn),
            ));
        }

        for policy in &ps.managed_policies {
            let key = managed_keys.claim_exact(composite_key([name, policy.name.as_str()]));
            managed.open(&format!("{} =", hcl::quote(&key)));
            managed.string_attr("permission_set", &ps.name);
            managed.string_attr("policy", &policy.name);
            managed.string_attr("policy_arn", &policy.arn);
            managed.close();

            out.import(ImportBlock::keyed(
                MANAGED_ATTACHMENT_RESOURCE,
                &key,
                imports::managed_attachment_id(&policy.arn, arn, instance_arn),
            ));
        }

        for policy in &ps.customer_managed_policies {
            let key = customer_keys.claim_exact(composite_key([name, policy.name.as_str()]));
            customer.open(&format!("{} =", hcl::quote(&key)));
            customer.string_attr("permission_set", &ps.name);
            customer.string_attr("name", &policy.name);
            customer.string_attr("path", &policy.path);
            customer.close();

            out.import(ImportBlock::keyed(
                CUSTOMER_MANAGED_ATTACHMENT_RESOURCE,
                &key,
                imports::customer_managed_attachment_id(
                    &policy.name,
                    &policy.path,
                    arn,
                    instance_arn,
                ),
            ));
        }
    }

    managed.close();
    managed.close();
    managed.blank();
    managed.open("resource \"aws_ssoadmin_managed_policy_attachment\" \"controller\"");
    managed.attr("for_each", "local.managed_policy_attachments");
    managed.blank();
    managed.attr("instance_arn", "local.instance_arn");
    managed.attr(
        "managed_policy_arn",
        "lookup(local.managed_policies_map, each.value.policy, each.value.policy_arn)",
    );
    managed.attr(
        "permission_set_arn",
        "local.permission_sets_map[each.value.permission_set]",
    );
    managed.close();

    customer.close();
    customer.close();
    customer.blank();
    customer.open("resource \"aws_ssoadmin_customer_managed_policy_attachment\" \"controller\"");
    customer.attr("for_each", "local.customer_managed_policy_attachments");
    customer.blank();
    customer.attr("instance_arn", "local.instance_arn");
    customer.attr(
        "permission_set_arn",
        "local.permission_sets_map[each.value.permission_set]",
    );
    customer.blank();
    customer.open("customer_managed_policy_reference");
    customer.attr("name", "each.value.name");
    customer.attr("path", "each.value.path");
    customer.close();
    customer.close();

    arns_map.sort();
    let mut outputs = HclWriter::new();
    outputs.open("locals");
    outputs.open_map("permission_sets_map");
    for (ps_name, expr) in &arns_map {
        outputs.map_entry(ps_name, expr);
    }
    outputs.close();
    outputs.close();
    outputs.blank();
    outputs.open("output \"permission_sets_map\"");
    outputs.attr("value", "local.permission_sets_map");
    outputs.close();

    if !snapshot.permission_sets.is_empty() {
        out.file(PERMISSION_SETS_FILE, permission_sets.finish());
    }
    if inline_count > 0 {
        out.file(INLINE_POLICIES_FILE, inline.finish());
    }
    out.file(MANAGED_ATTACHMENTS_FILE, managed.finish());
    out.file(CUSTOMER_MANAGED_ATTACHMENTS_FILE, customer.finish());
    out.file(OUTPUTS_FILE, outputs.finish());

    debug!(
        "permission_sets: {} permission sets, {} inline policies, {} imports",
        snapshot.permission_sets.len(),
        inline_count,
        out.imports.len()
    );

    Ok(out)
}
