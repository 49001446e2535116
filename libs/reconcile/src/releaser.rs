//! The releaser port: remote operations the reconciler and uploader consume.
//!
//! Transport, authentication and pagination mechanics belong to the
//! implementation; this module only defines the contract and a lazy page
//! iterator on top of it.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AssetMetadata, LocalAsset, Release, ReleasePage, ReleaseRequest, RepoSlug};

/// Page size used when scanning release listings.
pub const RELEASES_PAGE_SIZE: u32 = 100;

/// Remote release operations.
#[async_trait]
pub trait Releaser: Send + Sync {
    /// Fetch a published release by tag. Drafts are not visible here.
    async fn get_release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release>;

    /// Create a release.
    async fn create_release(&self, repo: &RepoSlug, request: &ReleaseRequest) -> Result<Release>;

    /// Update an existing release.
    async fn update_release(
        &self,
        repo: &RepoSlug,
        release_id: u64,
        request: &ReleaseRequest,
    ) -> Result<Release>;

    /// List releases, one page at a time (pages start at 1).
    async fn list_releases(&self, repo: &RepoSlug, page: u32, per_page: u32)
        -> Result<ReleasePage>;

    /// Delete an asset from a release.
    async fn delete_release_asset(&self, repo: &RepoSlug, asset_id: u64) -> Result<()>;

    /// Upload an asset to a release upload endpoint (already stripped of its
    /// template suffix).
    async fn upload_release_asset(&self, endpoint: &str, asset: &LocalAsset)
        -> Result<AssetMetadata>;
}

/// Lazy iterator over the pages of a repository's release listing.
///
/// Pages are fetched on demand; iteration ends after the page that reports
/// no successor, or after an error.
pub struct ReleasePages<'a, R: Releaser + ?Sized> {
    releaser: &'a R,
    repo: &'a RepoSlug,
    per_page: u32,
    next: Option<u32>,
}

impl<'a, R: Releaser + ?Sized> ReleasePages<'a, R> {
    /// Create an iterator positioned at the first page.
    pub fn new(releaser: &'a R, repo: &'a RepoSlug) -> Self {
        Self::with_page_size(releaser, repo, RELEASES_PAGE_SIZE)
    }

    pub fn with_page_size(releaser: &'a R, repo: &'a RepoSlug, per_page: u32) -> Self {
        Self {
            releaser,
            repo,
            per_page,
            next: Some(1),
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Release>>> {
        let page = self.next?;
        match self
            .releaser
            .list_releases(self.repo, page, self.per_page)
            .await
        {
            Ok(listing) => {
                self.next = listing.has_next.then_some(page + 1);
                Some(Ok(listing.releases))
            }
            Err(e) => {
                self.next = None;
                Some(Err(e))
            }
        }
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.next = Some(1);
    }

    /// Scan pages in listing order for the first release with `tag`.
    ///
    /// Stops fetching as soon as a match is found.
    pub async fn find_by_tag(&mut self, tag: &str) -> Result<Option<Release>> {
        while let Some(page) = self.next_page().await {
            if let Some(release) = page?.into_iter().find(|r| r.tag_name == tag) {
                return Ok(Some(release));
            }
        }
        Ok(None)
    }
}
