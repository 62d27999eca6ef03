//! # idc_iac
//!
//! Terraform generation for AWS IAM Identity Center snapshots.
//!
//! A [`Snapshot`](idc_model::Snapshot) is rendered into components
//! (`identity_store`, `managed_policies`, `permission_sets`,
//! `account_assignments` and optionally `team`) together with Terraform
//! `import` blocks for the resources that already exist.
//!
//! ## Features
//!
//! - Single state (one root module) or multi state (one root per component)
//! - Local backend or Terraform Cloud, with cross-component inputs wired
//!   through `terraform_remote_state` / `tfe_outputs`
//! - Deterministic, collision-free resource names
//! - Atomic replacement of a previous output directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use idc_iac::{GenerateOptions, StateMode, TerraformGenerator};
//! use idc_model::SnapshotStore;
//!
//! let snapshot = SnapshotStore::load("./output/json/snapshot.json").unwrap();
//! let options = GenerateOptions::new().with_state_mode(StateMode::Multi);
//!
//! let tree = TerraformGenerator::new()
//!     .unwrap()
//!     .generate(&snapshot, &options)
//!     .unwrap();
//! tree.write_atomic(std::path::Path::new("./output")).unwrap();
//! ```

pub mod components;
pub mod error;
pub mod generator;
pub mod imports;
pub mod layout;
pub mod names;
pub mod output;
pub mod preserve;
pub mod scaffold;
pub mod versions;

pub use error::{IacError, IacResult};
pub use generator::TerraformGenerator;
pub use imports::ImportBlock;
pub use layout::{
    Component, GenerateOptions, Platform, ProviderVersions, StateMode,
    DEFAULT_AWS_PROVIDER_VERSION, DEFAULT_TFE_PROVIDER_VERSION,
};
pub use output::{OutputTree, GENERATED_HEADER};
pub use preserve::PreservedPolicies;
pub use versions::{resolve_versions, RegistryClient, VersionSource};
