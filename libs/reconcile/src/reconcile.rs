//! Release reconciliation.
//!
//! Converges the remote release for a tag to the desired state in a run's
//! [`ReleaseConfig`]: an existing release is updated with merged fields, a
//! missing one is created. A create that loses a race against a concurrent
//! run is retried within a bounded budget.

use tracing::{debug, error, info, warn};

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::releaser::{ReleasePages, Releaser};
use crate::types::{Release, ReleaseRequest};

/// Default create-conflict retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Reconcile the release with the default retry budget.
pub async fn release<R: Releaser + ?Sized>(config: &ReleaseConfig, releaser: &R) -> Result<Release> {
    release_with_retries(config, releaser, DEFAULT_MAX_RETRIES).await
}

/// Reconcile the release, making at most `max_retries` attempts.
///
/// Only create conflicts consume the budget. Every other failure,
/// including conflicts on update, is returned immediately.
pub async fn release_with_retries<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    max_retries: u32,
) -> Result<Release> {
    let body = config.release_body().await?;
    let mut remaining = max_retries;

    loop {
        if remaining == 0 {
            error!(attempts = max_retries, "Too many retries. Aborting");
            return Err(ReleaseError::TooManyRetries {
                attempts: max_retries,
            });
        }

        match reconcile_once(config, releaser, body.as_deref()).await? {
            Attempt::Ready(release) => return Ok(release),
            Attempt::CreateConflict(message) => {
                remaining -= 1;
                warn!(
                    error = %message,
                    retries_remaining = remaining,
                    "Release creation conflicted, retrying"
                );
            }
        }
    }
}

/// Outcome of a single reconciliation attempt.
enum Attempt {
    Ready(Release),
    CreateConflict(String),
}

async fn reconcile_once<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    body: Option<&str>,
) -> Result<Attempt> {
    let repo = &config.repository;
    let tag = config.tag();

    let existing = match fetch_existing(config, releaser, &tag).await {
        Ok(existing) => existing,
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            warn!(
                tag = %tag,
                github_ref = %config.github_ref,
                error = %e,
                "Unexpected error fetching release"
            );
            return Err(e);
        }
    };

    if let Some(existing) = existing {
        let request = merge_update(config, &existing, body);
        debug!(release_id = existing.id, tag = %tag, "Updating existing release");
        match releaser.update_release(repo, existing.id, &request).await {
            Ok(updated) => return Ok(Attempt::Ready(updated)),
            Err(e) if e.is_not_found() => {
                debug!(release_id = existing.id, "Release disappeared before update");
            }
            Err(e) => return Err(e),
        }
    }

    let request = create_request(config, &tag, body.map(str::to_string));
    match request.target_commitish.as_deref() {
        Some(commit) => info!(tag = %tag, commit = %commit, "Creating new release"),
        None => info!(tag = %tag, "Creating new release"),
    }

    match releaser.create_release(repo, &request).await {
        Ok(created) => Ok(Attempt::Ready(created)),
        Err(ReleaseError::Conflict { message }) => Ok(Attempt::CreateConflict(message)),
        Err(e) => Err(e),
    }
}

/// Look up the release currently holding `tag`.
///
/// Drafts cannot be fetched by tag, so draft mode scans the full listing.
async fn fetch_existing<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    tag: &str,
) -> Result<Option<Release>> {
    if config.is_draft() {
        ReleasePages::new(releaser, &config.repository)
            .find_by_tag(tag)
            .await
    } else {
        releaser
            .get_release_by_tag(&config.repository, tag)
            .await
            .map(Some)
    }
}

/// Merge the desired fields with an existing release.
pub fn merge_update(config: &ReleaseConfig, existing: &Release, body: Option<&str>) -> ReleaseRequest {
    let tag = config.tag();

    let target_commitish = match non_empty(config.target_commitish.as_deref()) {
        Some(commit) if commit != existing.target_commitish => {
            info!(
                from = %existing.target_commitish,
                to = %commit,
                "Updating release commit"
            );
            Some(commit.to_string())
        }
        _ => non_empty(Some(existing.target_commitish.as_str())).map(str::to_string),
    };

    let name = non_empty(config.name.as_deref())
        .or(non_empty(existing.name.as_deref()))
        .unwrap_or(&tag)
        .to_string();

    let new_body = body.unwrap_or_default();
    let existing_body = existing.body.as_deref().unwrap_or_default();
    let body = if config.append_body && !new_body.is_empty() && !existing_body.is_empty() {
        format!("{existing_body}\n{new_body}")
    } else if !new_body.is_empty() {
        new_body.to_string()
    } else {
        existing_body.to_string()
    };

    ReleaseRequest {
        tag_name: tag,
        target_commitish,
        name,
        body: Some(body),
        draft: Some(config.draft.unwrap_or(existing.draft)),
        prerelease: Some(config.prerelease.unwrap_or(existing.prerelease)),
        discussion_category_name: config.discussion_category_name.clone(),
        generate_release_notes: config.generate_release_notes,
        make_latest: config.make_latest,
    }
}

/// Build the payload for a new release from config alone.
pub fn create_request(config: &ReleaseConfig, tag: &str, body: Option<String>) -> ReleaseRequest {
    ReleaseRequest {
        tag_name: tag.to_string(),
        target_commitish: non_empty(config.target_commitish.as_deref()).map(str::to_string),
        name: non_empty(config.name.as_deref()).unwrap_or(tag).to_string(),
        body,
        draft: config.draft,
        prerelease: config.prerelease,
        discussion_category_name: config.discussion_category_name.clone(),
        generate_release_notes: config.generate_release_notes,
        make_latest: config.make_latest,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
