//! Test support for tagship.
//!
//! [`MockReleaser`] keeps releases in memory, records every call it
//! receives, and can be told to fail specific operations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tagship_reconcile::{
    AssetMetadata, AssetRef, LocalAsset, Release, ReleaseError, ReleasePage, ReleaseRequest,
    Releaser, RepoSlug, Result,
};

/// A call received by [`MockReleaser`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetReleaseByTag { tag: String },
    CreateRelease(ReleaseRequest),
    UpdateRelease { release_id: u64, request: ReleaseRequest },
    ListReleases { page: u32, per_page: u32 },
    DeleteAsset { asset_id: u64 },
    UploadAsset { endpoint: String, name: String, mime: String, size: u64 },
}

/// Failure injected into a mock operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Conflict,
    Remote(u16),
}

impl Failure {
    fn to_error(self, what: &str) -> ReleaseError {
        match self {
            Self::NotFound => ReleaseError::not_found(what),
            Self::Conflict => ReleaseError::conflict(format!("{what}: already_exists")),
            Self::Remote(status) => ReleaseError::remote(status, format!("{what} failed")),
        }
    }
}

#[derive(Default)]
struct State {
    releases: Vec<Release>,
    calls: Vec<Call>,
    create_conflicts: u32,
    always_conflict: bool,
    get_failure: Option<Failure>,
    update_failure: Option<Failure>,
    create_failure: Option<Failure>,
    failing_uploads: HashSet<String>,
    failing_deletes: HashSet<u64>,
}

/// In-memory [`Releaser`].
pub struct MockReleaser {
    state: Mutex<State>,
    next_id: AtomicU64,
}

impl MockReleaser {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(1000),
        }
    }

    /// Create a mock holding `releases`, in listing order.
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let mock = Self::new();
        mock.state().releases = releases;
        mock
    }

    /// Report a conflict on the next `count` creates.
    pub fn conflict_on_create(self, count: u32) -> Self {
        self.state().create_conflicts = count;
        self
    }

    /// Report a conflict on every create.
    pub fn always_conflict(self) -> Self {
        self.state().always_conflict = true;
        self
    }

    pub fn fail_get(self, failure: Failure) -> Self {
        self.state().get_failure = Some(failure);
        self
    }

    pub fn fail_update(self, failure: Failure) -> Self {
        self.state().update_failure = Some(failure);
        self
    }

    pub fn fail_create(self, failure: Failure) -> Self {
        self.state().create_failure = Some(failure);
        self
    }

    /// Fail uploads of the asset named `name`.
    pub fn fail_upload(self, name: &str) -> Self {
        self.state().failing_uploads.insert(name.to_string());
        self
    }

    /// Fail deletion of the asset with `asset_id`.
    pub fn fail_delete(self, asset_id: u64) -> Self {
        self.state().failing_deletes.insert(asset_id);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateRelease(_)))
    }

    pub fn update_count(&self) -> usize {
        self.count(|c| matches!(c, Call::UpdateRelease { .. }))
    }

    /// Current stored releases.
    pub fn releases(&self) -> Vec<Release> {
        self.state().releases.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockReleaser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Releaser for MockReleaser {
    async fn get_release_by_tag(&self, _repo: &RepoSlug, tag: &str) -> Result<Release> {
        let mut state = self.state();
        state.calls.push(Call::GetReleaseByTag {
            tag: tag.to_string(),
        });

        if let Some(failure) = state.get_failure {
            return Err(failure.to_error("get release"));
        }

        state
            .releases
            .iter()
            .find(|r| r.tag_name == tag && !r.draft)
            .cloned()
            .ok_or_else(|| ReleaseError::not_found(format!("release for tag {tag}")))
    }

    async fn create_release(&self, _repo: &RepoSlug, request: &ReleaseRequest) -> Result<Release> {
        let mut state = self.state();
        state.calls.push(Call::CreateRelease(request.clone()));

        if let Some(failure) = state.create_failure {
            return Err(failure.to_error("create release"));
        }
        if state.always_conflict {
            return Err(Failure::Conflict.to_error("create release"));
        }
        if state.create_conflicts > 0 {
            state.create_conflicts -= 1;
            return Err(Failure::Conflict.to_error("create release"));
        }

        let release = apply_request(
            Release {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                ..Default::default()
            },
            request,
        );
        state.releases.push(release.clone());
        Ok(release)
    }

    async fn update_release(
        &self,
        _repo: &RepoSlug,
        release_id: u64,
        request: &ReleaseRequest,
    ) -> Result<Release> {
        let mut state = self.state();
        state.calls.push(Call::UpdateRelease {
            release_id,
            request: request.clone(),
        });

        if let Some(failure) = state.update_failure {
            return Err(failure.to_error("update release"));
        }

        let Some(slot) = state.releases.iter_mut().find(|r| r.id == release_id) else {
            return Err(ReleaseError::not_found(format!("release {release_id}")));
        };
        *slot = apply_request(slot.clone(), request);
        Ok(slot.clone())
    }

    async fn list_releases(
        &self,
        _repo: &RepoSlug,
        page: u32,
        per_page: u32,
    ) -> Result<ReleasePage> {
        let mut state = self.state();
        state.calls.push(Call::ListReleases { page, per_page });

        let per_page = per_page.max(1) as usize;
        let start = (page.saturating_sub(1) as usize) * per_page;
        let releases: Vec<Release> = state
            .releases
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();

        Ok(ReleasePage {
            has_next: start + per_page < state.releases.len(),
            releases,
        })
    }

    async fn delete_release_asset(&self, _repo: &RepoSlug, asset_id: u64) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::DeleteAsset { asset_id });

        if state.failing_deletes.contains(&asset_id) {
            return Err(ReleaseError::remote(500, format!("delete asset {asset_id} failed")));
        }
        for release in state.releases.iter_mut() {
            release.assets.retain(|a| a.id != asset_id);
        }
        Ok(())
    }

    async fn upload_release_asset(
        &self,
        endpoint: &str,
        asset: &LocalAsset,
    ) -> Result<AssetMetadata> {
        let mut state = self.state();
        state.calls.push(Call::UploadAsset {
            endpoint: endpoint.to_string(),
            name: asset.name.clone(),
            mime: asset.mime.clone(),
            size: asset.size,
        });

        if state.failing_uploads.contains(&asset.name) {
            return Err(ReleaseError::AssetUpload {
                name: asset.name.clone(),
                reason: "received status code 500".to_string(),
            });
        }

        let metadata = serde_json::json!({
            "id": self.next_id.fetch_add(1, Ordering::SeqCst),
            "name": asset.name,
            "size": asset.size,
            "content_type": asset.mime,
            "state": "uploaded",
            "uploader": {"login": "github-actions[bot]"}
        });
        match metadata {
            serde_json::Value::Object(map) => Ok(AssetMetadata::from(map)),
            _ => Ok(AssetMetadata::empty()),
        }
    }
}

/// Apply a create/update payload to a stored release.
fn apply_request(mut release: Release, request: &ReleaseRequest) -> Release {
    release.tag_name = request.tag_name.clone();
    release.name = Some(request.name.clone());
    if let Some(body) = request.body.as_ref() {
        release.body = Some(body.clone());
    }
    if let Some(commit) = request.target_commitish.as_ref() {
        release.target_commitish = commit.clone();
    }
    if let Some(draft) = request.draft {
        release.draft = draft;
    }
    if let Some(prerelease) = request.prerelease {
        release.prerelease = prerelease;
    }
    release.upload_url = format!(
        "https://uploads.example.com/releases/{}/assets{{?name,label}}",
        release.id
    );
    release.html_url = format!(
        "https://example.com/releases/tag/{}",
        release.tag_name
    );
    release
}

/// A published release fixture.
pub fn release(id: u64, tag: &str) -> Release {
    apply_request(
        Release {
            id,
            target_commitish: "main".to_string(),
            ..Default::default()
        },
        &ReleaseRequest {
            tag_name: tag.to_string(),
            name: tag.to_string(),
            ..Default::default()
        },
    )
}

/// A draft release fixture.
pub fn draft_release(id: u64, tag: &str) -> Release {
    Release {
        draft: true,
        ..release(id, tag)
    }
}

/// An asset reference fixture.
pub fn asset(id: u64, name: &str) -> AssetRef {
    AssetRef {
        id,
        name: name.to_string(),
    }
}
