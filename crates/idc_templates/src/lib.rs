//! # idc_templates
//!
//! Template rendering for idcgen.
//!
//! Static Terraform fragments (provider blocks, remote-state lookups, import
//! blocks, embedded TEAM modules) are built-in templates with `{{variable}}`
//! placeholders. Data-driven bodies are assembled with [`HclWriter`], and
//! every directory value is escaped through [`hcl::quote`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use idc_templates::{builtin, vars, TemplateRenderer};
//!
//! let renderer = TemplateRenderer::new().unwrap();
//! let providers = renderer
//!     .render_builtin(
//!         builtin::PROVIDERS_LOCAL,
//!         &vars([("aws_version", "5.85.0"), ("region", "eu-west-1")]),
//!     )
//!     .unwrap();
//! ```

pub mod builtin;
pub mod error;
pub mod hcl;
pub mod renderer;

pub use builtin::BuiltinTemplates;
pub use error::{TemplateError, TemplateResult};
pub use hcl::HclWriter;
pub use renderer::{vars, TemplateRenderer};
