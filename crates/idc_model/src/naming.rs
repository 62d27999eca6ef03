//! Terraform-safe identifiers and composite keys.

/// Separator used in composite `for_each` keys.
pub const KEY_SEPARATOR: &str = "___";

/// Turn an arbitrary display name into a valid Terraform identifier.
///
/// Leading/trailing whitespace is dropped, names that do not start with a
/// letter or underscore get a `_` prefix, and anything outside
/// `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut out = String::with_capacity(trimmed.len() + 1);

    match trimmed.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => out.push('_'),
    }

    out.extend(trimmed.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        }
    }));

    out
}

/// Join key parts with the composite separator.
pub fn composite_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("AdministratorAccess"), "AdministratorAccess");
        assert_eq!(sanitize_name("  Dev Team  "), "Dev_Team");
        assert_eq!(sanitize_name("john.doe@example.com"), "john_doe_example_com");
        assert_eq!(sanitize_name("123-prod"), "_123-prod");
        assert_eq!(sanitize_name("_internal"), "_internal");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key(["Dev", "alice"]), "Dev___alice");
        assert_eq!(
            composite_key(vec!["Prod", "Admin", "GROUP", "Ops"]),
            "Prod___Admin___GROUP___Ops"
        );
    }
}
