//! # idc_model
//!
//! Snapshot model for AWS IAM Identity Center state.
//!
//! A [`Snapshot`] captures the identity directory, the permission catalog,
//! account assignments and the organization tree at one point in time. It is
//! produced by the fetch phase and consumed, read-only, by the generator.
//!
//! ## Features
//!
//! - **Models**: deterministic, deduplicated collections keyed by stable ids
//! - **Naming**: Terraform-safe identifiers and composite `for_each` keys
//! - **Resolution**: elevated-access entity references to directory ids
//! - **Store**: lossless JSON persistence under `<output>/json/`
//! - **Validation**: referential checks between assignments and the directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use idc_model::{EntityResolver, SnapshotStore};
//!
//! let snapshot = SnapshotStore::load("./output/json/snapshot.json").unwrap();
//! let root = EntityResolver::new(&snapshot).resolve("OU", "root").unwrap();
//! println!("{} -> {}", root.display_name, root.id);
//! ```

pub mod error;
pub mod models;
pub mod naming;
pub mod resolver;
pub mod store;
pub mod validator;

pub use error::{ModelError, ModelResult, ResolveError};
pub use models::*;
pub use naming::{composite_key, sanitize_name, KEY_SEPARATOR};
pub use resolver::{EntityKind, EntityResolver, ResolvedEntity};
pub use store::SnapshotStore;
pub use validator::{SnapshotValidator, ValidationResult};
