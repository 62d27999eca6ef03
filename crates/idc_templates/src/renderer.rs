//! Variable substitution in template bodies.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;
use tracing::debug;

use crate::builtin::BuiltinTemplates;
use crate::error::{TemplateError, TemplateResult};

/// Matches `{{variable_name}}`.
const VARIABLE_PATTERN: &str = r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}";

/// Template renderer.
pub struct TemplateRenderer {
    variable_pattern: Regex,
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> TemplateResult<Self> {
        let variable_pattern = Regex::new(VARIABLE_PATTERN)
            .map_err(|e| TemplateError::RenderingFailed(e.to_string()))?;
        Ok(Self { variable_pattern })
    }

    /// Render content by replacing variables. Unknown variables are left in
    /// place.
    pub fn render_content(&self, content: &str, variables: &HashMap<String, String>) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                variables
                    .get(var_name)
                    .cloned()
                    .unwrap_or_else(|| format!("{{{{{}}}}}", var_name))
            })
            .to_string()
    }

    /// Render content, failing on the first variable without a value.
    pub fn render_strict(
        &self,
        content: &str,
        variables: &HashMap<String, String>,
    ) -> TemplateResult<String> {
        let missing: BTreeSet<&str> = self
            .variable_pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|name| !variables.contains_key(*name))
            .collect();

        if let Some(name) = missing.into_iter().next() {
            return Err(TemplateError::MissingVariable(name.to_string()));
        }

        Ok(self.render_content(content, variables))
    }

    /// Render a built-in template by name.
    pub fn render_builtin(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> TemplateResult<String> {
        let body = BuiltinTemplates::get(name)?;
        debug!("Rendering built-in template {}", name);
        self.render_strict(body, variables)
    }

    /// Variable names referenced by a template body.
    pub fn variables_in(&self, content: &str) -> BTreeSet<String> {
        self.variable_pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Build a variable map from key/value pairs.
pub fn vars<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_content() {
        let renderer = TemplateRenderer::new().unwrap();
        let variables = vars([("name", "identity_store"), ("version", "5.85.0")]);

        let content = "Module: {{name}}, Version: {{version}}";
        let rendered = renderer.render_content(content, &variables);
        assert_eq!(rendered, "Module: identity_store, Version: 5.85.0");
    }

    #[test]
    fn test_render_content_keeps_unknown() {
        let renderer = TemplateRenderer::new().unwrap();
        let rendered = renderer.render_content("a = {{missing}}", &HashMap::new());
        assert_eq!(rendered, "a = {{missing}}");
    }

    #[test]
    fn test_render_strict_reports_missing() {
        let renderer = TemplateRenderer::new().unwrap();
        let err = renderer
            .render_strict("{{a}} {{b}}", &vars([("a", "1")]))
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable(name) if name == "b"));
    }

    #[test]
    fn test_terraform_interpolation_untouched() {
        let renderer = TemplateRenderer::new().unwrap();
        let rendered = renderer
            .render_strict("path = \"${path.module}/{{file}}\"", &vars([("file", "x.json")]))
            .unwrap();
        assert_eq!(rendered, "path = \"${path.module}/x.json\"");
    }

    #[test]
    fn test_variables_in() {
        let renderer = TemplateRenderer::new().unwrap();
        let names = renderer.variables_in("{{b}} {{a}} {{b}}");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
