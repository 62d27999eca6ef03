//! Users, groups and group memberships.

use idc_model::{composite_key, Group, User};
use idc_templates::{hcl, HclWriter};
use tracing::{debug, warn};

use super::{missing_name, ComponentOutput, RenderContext};
use crate::error::IacResult;
use crate::imports::{self, ImportBlock};
use crate::names::UniqueNames;

pub const USERS_FILE: &str = "aws_identitystore_users.tf";
pub const GROUPS_FILE: &str = "aws_identitystore_groups.tf";
pub const MEMBERSHIPS_FILE: &str = "aws_identitystore_group_memberships.tf";
pub const OUTPUTS_FILE: &str = "outputs.tf";

const MEMBERSHIP_RESOURCE: &str = "aws_identitystore_group_membership.controller";

fn write_lookup(w: &mut HclWriter, resource: &str, name: &str, attribute: &str, value: &str) {
    w.open(&format!("data \"{}\" \"{}\"", resource, name));
    w.attr("identity_store_id", "local.identity_store_id");
    w.blank();
    w.open("alternate_identifier");
    w.open("unique_attribute");
    w.string_attr("attribute_path", attribute);
    w.string_attr("attribute_value", value);
    w.close();
    w.close();
    w.close();
}

fn write_user(w: &mut HclWriter, name: &str, user: &User) {
    if user.scim {
        write_lookup(w, "aws_identitystore_user", name, "UserName", &user.user_name);
        return;
    }

    w.open(&format!("resource \"aws_identitystore_user\" \"{}\"", name));
    w.attr("identity_store_id", "local.identity_store_id");
    w.string_attr("user_name", &user.user_name);
    w.string_attr(
        "display_name",
        user.display_name.as_deref().unwrap_or(&user.user_name),
    );
    w.blank();
    w.open("name");
    w.string_attr(
        "given_name",
        user.given_name.as_deref().unwrap_or(&user.user_name),
    );
    w.string_attr(
        "family_name",
        user.family_name.as_deref().unwrap_or(&user.user_name),
    );
    w.close();
    if let Some(email) = &user.email {
        w.blank();
        w.open("emails");
        w.string_attr("value", email);
        w.attr("primary", "true");
        w.close();
    }
    w.close();
}

fn write_group(w: &mut HclWriter, name: &str, group: &Group) {
    if group.scim {
        write_lookup(w, "aws_identitystore_group", name, "DisplayName", &group.display_name);
        return;
    }

    w.open(&format!("resource \"aws_identitystore_group\" \"{}\"", name));
    w.attr("identity_store_id", "local.identity_store_id");
    w.string_attr("display_name", &group.display_name);
    w.optional_string_attr("description", group.description.as_deref());
    w.close();
}

fn address(scim: bool, resource: &str, name: &str) -> String {
    if scim {
        format!("data.{}.{}", resource, name)
    } else {
        format!("{}.{}", resource, name)
    }
}

pub fn render(ctx: &RenderContext<'_>) -> IacResult<ComponentOutput> {
    let snapshot = ctx.snapshot;
    let store = &snapshot.instance.identity_store_id;
    let mut out = ComponentOutput::new();

    let mut users = HclWriter::new();
    let mut users_map = Vec::new();
    for (index, (id, user)) in snapshot.users.iter().enumerate() {
        let name = ctx.names.user(id).ok_or_else(|| missing_name("user", id))?;
        if index > 0 {
            users.blank();
        }
        write_user(&mut users, name, user);
        users_map.push((
            user.user_name.clone(),
            format!("{}.user_id", address(user.scim, "aws_identitystore_user", name)),
        ));
        if !user.scim {
            out.import(ImportBlock::new(
                format!("aws_identitystore_user.{}", name),
                imports::identity_store_id(store, id),
            ));
        }
    }

    let mut groups = HclWriter::new();
    let mut groups_map = Vec::new();
    for (index, (id, group)) in snapshot.groups.iter().enumerate() {
        let name = ctx.names.group(id).ok_or_else(|| missing_name("group", id))?;
        if index > 0 {
            groups.blank();
        }
        write_group(&mut groups, name, group);
        groups_map.push((
            group.display_name.clone(),
            format!("{}.group_id", address(group.scim, "aws_identitystore_group", name)),
        ));
        if !group.scim {
            out.import(ImportBlock::new(
                format!("aws_identitystore_group.{}", name),
                imports::identity_store_id(store, id),
            ));
        }
    }

    // Memberships of SCIM groups are owned by the external IdP.
    let mut keys = UniqueNames::new();
    let mut memberships = HclWriter::new();
    memberships.open("locals");
    memberships.open_map("group_memberships");
    for (group_id, group) in snapshot.groups.iter().filter(|(_, g)| !g.scim) {
        let group_name = ctx
            .names
            .group(group_id)
            .ok_or_else(|| missing_name("group", group_id))?;
        for (user_id, membership_id) in &group.members {
            let (Some(user), Some(user_name)) = (snapshot.users.get(user_id), ctx.names.user(user_id))
            else {
                warn!(
                    "Skipping membership of unknown user {} in group {}",
                    user_id, group.display_name
                );
                continue;
            };

            let key = keys.claim_exact(composite_key([group_name, user_name]));
            memberships.open(&format!("{} =", hcl::quote(&key)));
            memberships.string_attr("group", &group.display_name);
            memberships.string_attr("user", &user.user_name);
            memberships.close();

            out.import(ImportBlock::keyed(
                MEMBERSHIP_RESOURCE,
                &key,
                imports::identity_store_id(store, membership_id),
            ));
        }
    }
    memberships.close();
    memberships.close();
    memberships.blank();
    memberships.open("resource \"aws_identitystore_group_membership\" \"controller\"");
    memberships.attr("for_each", "local.group_memberships");
    memberships.blank();
    memberships.attr("identity_store_id", "local.identity_store_id");
    memberships.attr("group_id", "local.groups_map[each.value.group]");
    memberships.attr("member_id", "local.users_map[each.value.user]");
    memberships.close();

    users_map.sort();
    groups_map.sort();

    let mut outputs = HclWriter::new();
    outputs.open("locals");
    outputs.open_map("users_map");
    for (user_name, expr) in &users_map {
        outputs.map_entry(user_name, expr);
    }
    outputs.close();
    outputs.blank();
    outputs.open_map("groups_map");
    for (display_name, expr) in &groups_map {
        outputs.map_entry(display_name, expr);
    }
    outputs.close();
    outputs.close();
    for name in ["users_map", "groups_map"] {
        outputs.blank();
        outputs.open(&format!("output \"{}\"", name));
        outputs.attr("value", &format!("local.{}", name));
        outputs.close();
    }

    debug!(
        "identity_store: {} users, {} groups, {} imports",
        snapshot.users.len(),
        snapshot.groups.len(),
        out.imports.len()
    );

    if !snapshot.users.is_empty() {
        out.file(USERS_FILE, users.finish());
    }
    if !snapshot.groups.is_empty() {
        out.file(GROUPS_FILE, groups.finish());
    }
    out.file(MEMBERSHIPS_FILE, memberships.finish());
    out.file(OUTPUTS_FILE, outputs.finish());

    Ok(out)
}
