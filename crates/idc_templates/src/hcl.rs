//! HCL literal helpers.
//!
//! Everything that ends up inside a quoted HCL string goes through
//! [`quote`], which escapes quotes and backslashes and neutralises template
//! sequences (`${` and `%{`) so directory data is never interpolated by
//! Terraform.

/// Escape a value for use inside an HCL string literal, without quotes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("$$"),
            '%' if chars.peek() == Some(&'{') => out.push_str("%%"),
            other => out.push(other),
        }
    }

    out
}

/// Quoted HCL string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// HCL list of string literals.
pub fn string_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = values.into_iter().map(|v| quote(v.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

/// Indentation-aware builder for HCL bodies.
#[derive(Debug, Default)]
pub struct HclWriter {
    out: String,
    indent: usize,
}

impl HclWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    /// Raw line at the current indentation.
    pub fn line(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            self.out.push('\n');
        } else {
            self.pad();
            self.out.push_str(text);
            self.out.push('\n');
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.line(&format!("# {}", text))
    }

    /// Open a block, e.g. `resource "aws_x" "name"`.
    pub fn open(&mut self, header: &str) -> &mut Self {
        self.line(&format!("{} {{", header));
        self.indent += 1;
        self
    }

    /// Open a map-valued attribute, e.g. `tags = {`.
    pub fn open_map(&mut self, key: &str) -> &mut Self {
        self.line(&format!("{} = {{", key));
        self.indent += 1;
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self.line("}")
    }

    /// `key = <expression>`.
    pub fn attr(&mut self, key: &str, expr: &str) -> &mut Self {
        self.line(&format!("{} = {}", key, expr))
    }

    /// `key = "value"`.
    pub fn string_attr(&mut self, key: &str, value: &str) -> &mut Self {
        self.attr(key, &quote(value))
    }

    /// `key = "value"` only when a value is present.
    pub fn optional_string_attr(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.string_attr(key, value);
        }
        self
    }

    /// `"key" = <expression>` inside a map.
    pub fn map_entry(&mut self, key: &str, expr: &str) -> &mut Self {
        self.line(&format!("{} = {}", quote(key), expr))
    }

    /// `"key" = "value"` inside a map.
    pub fn map_string_entry(&mut self, key: &str, value: &str) -> &mut Self {
        self.map_entry(key, &quote(value))
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape("C:\\path"), "C:\\\\path");
        assert_eq!(escape("${var.x} and %{if}"), "$${var.x} and %%{if}");
        assert_eq!(escape("cost $5"), "cost $5");
        assert_eq!(escape("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(["a", "b"]), "[\"a\", \"b\"]");
        assert_eq!(string_list(Vec::<String>::new()), "[]");
    }

    #[test]
    fn test_writer_blocks() {
        let mut w = HclWriter::new();
        w.open("resource \"aws_ssoadmin_permission_set\" \"Admin\"")
            .string_attr("name", "Admin")
            .attr("instance_arn", "local.instance_arn")
            .open_map("tags")
            .map_string_entry("owner", "platform")
            .close()
            .close();

        assert_eq!(
            w.finish(),
            "resource \"aws_ssoadmin_permission_set\" \"Admin\" {\n  name = \"Admin\"\n  instance_arn = local.instance_arn\n  tags = {\n    \"owner\" = \"platform\"\n  }\n}\n"
        );
    }
}
