//! Terraform `import {}` blocks for existing Identity Center resources.

use idc_templates::{builtin, hcl, vars, TemplateRenderer};

use crate::error::IacResult;

/// One import: a component-relative address and the provider import id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportBlock {
    pub to: String,
    pub id: String,
}

impl ImportBlock {
    pub fn new(to: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            id: id.into(),
        }
    }

    /// Address of a `for_each` instance, e.g. `controller["key"]`.
    pub fn keyed(resource: &str, key: &str, id: impl Into<String>) -> Self {
        Self::new(format!("{}[{}]", resource, hcl::quote(key)), id)
    }
}

/// `<identity_store_id>/<object_id>` for users, groups and memberships.
pub fn identity_store_id(identity_store_id: &str, object_id: &str) -> String {
    format!("{}/{}", identity_store_id, object_id)
}

/// `<permission_set_arn>,<instance_arn>` for permission sets and inline policies.
pub fn permission_set_id(permission_set_arn: &str, instance_arn: &str) -> String {
    format!("{},{}", permission_set_arn, instance_arn)
}

/// `<policy_arn>,<permission_set_arn>,<instance_arn>`.
pub fn managed_attachment_id(policy_arn: &str, permission_set_arn: &str, instance_arn: &str) -> String {
    format!("{},{},{}", policy_arn, permission_set_arn, instance_arn)
}

/// `<name>,<path>,<permission_set_arn>,<instance_arn>`.
pub fn customer_managed_attachment_id(
    name: &str,
    path: &str,
    permission_set_arn: &str,
    instance_arn: &str,
) -> String {
    format!("{},{},{},{}", name, path, permission_set_arn, instance_arn)
}

/// `<principal_id>,<TYPE>,<account_id>,AWS_ACCOUNT,<permission_set_arn>,<instance_arn>`.
pub fn account_assignment_id(
    principal_id: &str,
    principal_type: &str,
    account_id: &str,
    permission_set_arn: &str,
    instance_arn: &str,
) -> String {
    format!(
        "{},{},{},AWS_ACCOUNT,{},{}",
        principal_id, principal_type, account_id, permission_set_arn, instance_arn
    )
}

/// `<application_arn>,<principal_id>,<TYPE>`.
pub fn application_assignment_id(application_arn: &str, principal_id: &str, principal_type: &str) -> String {
    format!("{},{},{}", application_arn, principal_id, principal_type)
}

/// Render import blocks, prefixing addresses with `module.<name>.` when the
/// resources live in a child module.
pub fn render_imports(
    renderer: &TemplateRenderer,
    blocks: &[ImportBlock],
    module: Option<&str>,
) -> IacResult<String> {
    let mut rendered = Vec::with_capacity(blocks.len());

    for block in blocks {
        let to = match module {
            Some(module) => format!("module.{}.{}", module, block.to),
            None => block.to.clone(),
        };
        let id = hcl::escape(&block.id);
        rendered.push(renderer.render_builtin(
            builtin::IMPORT_BLOCK,
            &vars([("to", to.as_str()), ("id", id.as_str())]),
        )?);
    }

    Ok(rendered.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_id_shape() {
        assert_eq!(
            account_assignment_id("g-1", "GROUP", "111111111111", "arn:ps", "arn:ins"),
            "g-1,GROUP,111111111111,AWS_ACCOUNT,arn:ps,arn:ins"
        );
    }

    #[test]
    fn test_render_with_module_prefix() {
        let renderer = TemplateRenderer::new().unwrap();
        let blocks = vec![
            ImportBlock::new("aws_identitystore_user.alice", "d-1/u-1"),
            ImportBlock::keyed("aws_identitystore_group_membership.controller", "Ops___alice", "d-1/m-1"),
        ];

        let rendered = render_imports(&renderer, &blocks, Some("identity_store")).unwrap();

        assert!(rendered.contains("to = module.identity_store.aws_identitystore_user.alice\n"));
        assert!(rendered.contains(
            "to = module.identity_store.aws_identitystore_group_membership.controller[\"Ops___alice\"]\n"
        ));
        assert_eq!(rendered.matches("import {").count(), 2);
    }
}
