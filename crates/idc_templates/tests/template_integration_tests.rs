//! Integration tests for the built-in templates.

use std::collections::HashMap;

use idc_templates::{builtin, hcl, vars, BuiltinTemplates, TemplateError, TemplateRenderer};

fn sample_values() -> HashMap<String, String> {
    vars([
        ("aws_version", "5.85.0"),
        ("tfe_version", "0.63.0"),
        ("region", "eu-west-1"),
        ("organization", "acme"),
        ("workspace", "aws-identity-management-prod"),
        ("component", "permission_sets"),
        ("to", "aws_identitystore_user.alice"),
        ("id", "d-123/u-1"),
    ])
}

/// Every built-in renders with a complete variable set and leaves no
/// placeholders behind.
#[test]
fn test_all_builtins_render() {
    let renderer = TemplateRenderer::new().unwrap();
    let values = sample_values();

    for name in BuiltinTemplates::names() {
        let rendered = renderer.render_builtin(name, &values).unwrap();
        assert!(!rendered.contains("{{"), "placeholder left in {}", name);
        assert!(rendered.ends_with('\n'), "{} lacks trailing newline", name);
    }
}

#[test]
fn test_unknown_builtin() {
    let renderer = TemplateRenderer::new().unwrap();
    let err = renderer
        .render_builtin("does_not_exist", &HashMap::new())
        .unwrap_err();
    assert!(matches!(err, TemplateError::NotFound(_)));
}

#[test]
fn test_providers_tfc_requires_organization() {
    let renderer = TemplateRenderer::new().unwrap();
    let err = renderer
        .render_builtin(
            builtin::PROVIDERS_TFC,
            &vars([
                ("aws_version", "5.85.0"),
                ("tfe_version", "0.63.0"),
                ("region", "eu-west-1"),
                ("workspace", "ws"),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, TemplateError::MissingVariable(v) if v == "organization"));
}

#[test]
fn test_import_block_shape() {
    let renderer = TemplateRenderer::new().unwrap();
    let id = hcl::escape("arn:aws:sso:::permissionSet/ssoins-1/ps-1,arn:aws:sso:::instance/ssoins-1");
    let rendered = renderer
        .render_builtin(
            builtin::IMPORT_BLOCK,
            &vars([("to", "aws_ssoadmin_permission_set.Admin"), ("id", id.as_str())]),
        )
        .unwrap();

    assert_eq!(
        rendered,
        "import {\n  to = aws_ssoadmin_permission_set.Admin\n  id = \"arn:aws:sso:::permissionSet/ssoins-1/ps-1,arn:aws:sso:::instance/ssoins-1\"\n}\n"
    );
}

#[test]
fn test_remote_state_points_at_sibling_component() {
    let renderer = TemplateRenderer::new().unwrap();
    let rendered = renderer
        .render_builtin(
            builtin::EXTERNAL_REMOTE_STATE,
            &vars([("component", "identity_store")]),
        )
        .unwrap();
    assert!(rendered.contains("path = \"../identity_store/terraform.tfstate\""));
}
