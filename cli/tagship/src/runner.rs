//! Run orchestration: reconcile the release, upload assets, emit outputs.

use anyhow::Result;
use tagship_reconcile::{
    release, upload_assets, upload_endpoint, AssetMetadata, Release, ReleaseConfig, Releaser,
};
use tracing::{info, warn};

use crate::config::RunSettings;
use crate::error::CliError;
use crate::files;
use crate::github::GitHubReleaser;
use crate::output::{Outputs, ReleaseOutputs};

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub release: Release,
    pub assets: Vec<AssetMetadata>,
}

/// Run against the GitHub API described by `settings`.
pub async fn run(config: &ReleaseConfig, settings: &RunSettings) -> Result<RunReport> {
    let releaser = GitHubReleaser::new(&settings.api_url, &config.token)?;
    let outputs = Outputs::new(settings.github_output.clone());
    run_with(config, &releaser, &outputs).await
}

/// Run against any releaser.
pub async fn run_with<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    outputs: &Outputs,
) -> Result<RunReport> {
    if !config.files.is_empty() {
        let unmatched = files::unmatched_patterns(&config.files)?;
        for pattern in &unmatched {
            warn!(pattern = %pattern, "Pattern does not match any files");
        }
        if !unmatched.is_empty() && config.fail_on_unmatched_files {
            return Err(CliError::UnmatchedFiles.into());
        }
    }

    let rel = release(config, releaser).await.map_err(CliError::Release)?;

    let mut assets = Vec::new();
    if !config.files.is_empty() {
        let paths = files::paths(&config.files)?;
        if paths.is_empty() {
            warn!(patterns = ?config.files, "File patterns do not include any valid file");
        }
        assets = upload_assets(
            config,
            releaser,
            upload_endpoint(&rel.upload_url),
            &paths,
            &rel.assets,
        )
        .await
        .map_err(CliError::Upload)?;
        outputs.set_assets(&assets)?;
    }

    info!(url = %rel.html_url, id = rel.id, "Release ready");
    outputs.set_release(&ReleaseOutputs::from_release(&rel))?;

    Ok(RunReport {
        release: rel,
        assets,
    })
}
