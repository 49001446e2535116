//! Release reconciliation primitives.
//!
//! This library converges a repository's release for one tag to the state
//! described by a [`ReleaseConfig`] and attaches local files to it. Key
//! concepts:
//!
//! - **Releaser**: the remote platform's release operations, consumed as a
//!   trait so the logic here never sees transport or auth details.
//! - **Reconcile**: fetch the existing release, merge desired fields into
//!   it, then update or create. Create conflicts from concurrent runs are
//!   retried within a bounded budget.
//! - **Upload**: replace same-named assets and upload files concurrently,
//!   with configurable failure tolerance.
//!
//! # Invariants
//!
//! - At most one release is reconciled per run
//! - Asset names are unique per release; a name collision is a replace
//! - No local state is kept between runs

pub mod config;
pub mod error;
pub mod reconcile;
pub mod releaser;
pub mod types;
pub mod upload;

pub use config::ReleaseConfig;
pub use error::{ReleaseError, Result};
pub use reconcile::{release, release_with_retries, DEFAULT_MAX_RETRIES};
pub use releaser::{ReleasePages, Releaser, RELEASES_PAGE_SIZE};
pub use types::{
    AssetMetadata, AssetRef, LocalAsset, MakeLatest, Release, ReleasePage, ReleaseRequest,
    RepoSlug,
};
pub use upload::{upload_asset, upload_assets, upload_endpoint};
