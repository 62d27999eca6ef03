//! # idc_fetch
//!
//! Reads AWS IAM Identity Center state into an [`idc_model::Snapshot`].
//!
//! # Features
//!
//! - **Directory trait**: page-level read calls behind [`DirectoryApi`]
//! - **AWS client**: SSO Admin, Identity Store, Organizations, IAM and DynamoDB
//! - **Pagination**: every listing is drained before the snapshot is built
//! - **Retries**: throttled calls back off exponentially, auth failures are fatal
//! - **Fan-out**: per-item detail calls run with bounded concurrency
//! - **Mock directory**: in-memory fixture for tests without AWS
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idc_fetch::{AwsDirectory, FetchOptions, Fetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = AwsDirectory::new(Some("eu-west-1".to_string())).await;
//!     let fetcher = Fetcher::new(Arc::new(api), FetchOptions::default());
//!
//!     let snapshot = fetcher.fetch(None).await?;
//!     println!("{} permission sets", snapshot.permission_sets.len());
//!     Ok(())
//! }
//! ```

pub mod aws;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetcher;
pub mod mock;
pub mod retry;
pub mod team;

pub use aws::AwsDirectory;
pub use config::{FetchOptions, RetryPolicy};
pub use directory::{
    ApplicationRecord, DirectoryApi, InstanceRecord, MembershipRecord, OuRecord, Page,
    PolicyRecord, TagRecord,
};
pub use error::{FetchError, FetchResult};
pub use fetcher::{Fetcher, MAX_OU_DEPTH};
pub use mock::{CapturedCall, MockDirectory, MockFailure};
pub use retry::with_retry;
pub use team::{TeamTableKind, TeamTableMatcher, TEAM_APPLICATION_NAME};
