//! Per-run release configuration.

use std::fmt;
use std::path::PathBuf;

use crate::error::{ReleaseError, Result};
use crate::types::{MakeLatest, RepoSlug};

/// Prefix of git refs that name a tag.
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// Immutable inputs for one reconciliation run.
///
/// Built once at process start and passed by reference to the reconciler
/// and uploader.
#[derive(Clone)]
pub struct ReleaseConfig {
    /// API token, also sent with asset uploads.
    pub token: String,

    pub repository: RepoSlug,

    /// Git ref that triggered the run (e.g. `refs/tags/v1.0.0`).
    pub github_ref: String,

    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,

    /// File whose contents take precedence over `body` when non-empty.
    pub body_path: Option<PathBuf>,

    /// `None` keeps whatever the existing release has.
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,

    pub append_body: bool,
    pub generate_release_notes: bool,
    pub make_latest: Option<MakeLatest>,
    pub target_commitish: Option<String>,
    pub discussion_category_name: Option<String>,

    /// Glob patterns of files to attach.
    pub files: Vec<String>,
    pub fail_on_unmatched_files: bool,
    pub fail_on_asset_upload_issue: bool,
}

impl ReleaseConfig {
    /// Config for a repository with every optional input unset.
    pub fn new(repository: RepoSlug) -> Self {
        Self {
            token: String::new(),
            repository,
            github_ref: String::new(),
            tag_name: None,
            name: None,
            body: None,
            body_path: None,
            draft: None,
            prerelease: None,
            append_body: false,
            generate_release_notes: false,
            make_latest: None,
            target_commitish: None,
            discussion_category_name: None,
            files: Vec::new(),
            fail_on_unmatched_files: false,
            fail_on_asset_upload_issue: false,
        }
    }

    /// Whether draft mode was requested.
    pub fn is_draft(&self) -> bool {
        self.draft == Some(true)
    }

    /// The tag to reconcile: the explicit tag, else the tag named by the ref,
    /// else empty.
    pub fn tag(&self) -> String {
        if let Some(tag) = self.tag_name.as_deref().filter(|t| !t.is_empty()) {
            return tag.to_string();
        }
        self.github_ref
            .strip_prefix(TAG_REF_PREFIX)
            .unwrap_or_default()
            .to_string()
    }

    /// Whether the triggering ref names a tag.
    pub fn is_tag_ref(&self) -> bool {
        self.github_ref.starts_with(TAG_REF_PREFIX)
    }

    /// Resolve the release body supplied for this run.
    pub async fn release_body(&self) -> Result<Option<String>> {
        if let Some(path) = self.body_path.as_ref() {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ReleaseError::Io {
                    path: path.clone(),
                    source,
                })?;
            if !contents.is_empty() {
                return Ok(Some(contents));
            }
        }
        Ok(self.body.clone())
    }
}

impl fmt::Debug for ReleaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseConfig")
            .field("token", &"<redacted>")
            .field("repository", &self.repository)
            .field("github_ref", &self.github_ref)
            .field("tag_name", &self.tag_name)
            .field("name", &self.name)
            .field("body", &self.body)
            .field("body_path", &self.body_path)
            .field("draft", &self.draft)
            .field("prerelease", &self.prerelease)
            .field("append_body", &self.append_body)
            .field("generate_release_notes", &self.generate_release_notes)
            .field("make_latest", &self.make_latest)
            .field("target_commitish", &self.target_commitish)
            .field("discussion_category_name", &self.discussion_category_name)
            .field("files", &self.files)
            .field("fail_on_unmatched_files", &self.fail_on_unmatched_files)
            .field("fail_on_asset_upload_issue", &self.fail_on_asset_upload_issue)
            .finish()
    }
}
