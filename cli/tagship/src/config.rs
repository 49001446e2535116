//! Command-line and environment configuration.
//!
//! Every input can be given as a flag or through the environment variables
//! a CI runner sets for a release action (`INPUT_*`, `GITHUB_*`). Values are
//! read once here and frozen into a [`ReleaseConfig`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tagship_reconcile::{MakeLatest, ReleaseConfig, RepoSlug};

use crate::error::CliError;

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// tagship - create or update a GitHub release and upload its assets.
#[derive(Debug, Parser)]
#[command(name = "tagship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub inputs: Inputs,

    /// Log output format.
    #[arg(long, env = "TAGSHIP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Release inputs.
///
/// Action runners export unset inputs as empty strings, so every value is
/// taken raw and normalized in [`Inputs::into_config`].
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Inputs {
    /// API token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long = "input-token", env = "INPUT_TOKEN", hide = true, hide_env_values = true)]
    pub input_token: Option<String>,

    /// Repository as owner/repo.
    #[arg(long, env = "INPUT_REPOSITORY")]
    pub repository: Option<String>,

    #[arg(long = "github-repository", env = "GITHUB_REPOSITORY", hide = true)]
    pub github_repository: Option<String>,

    /// Git ref that triggered the run.
    #[arg(long = "ref", env = "GITHUB_REF")]
    pub github_ref: Option<String>,

    /// Tag to release. Defaults to the tag named by the ref.
    #[arg(long, env = "INPUT_TAG_NAME")]
    pub tag_name: Option<String>,

    /// Release name. Defaults to the existing name, then the tag.
    #[arg(long, env = "INPUT_NAME")]
    pub name: Option<String>,

    /// Release notes.
    #[arg(long, env = "INPUT_BODY")]
    pub body: Option<String>,

    /// File with release notes; wins over --body when non-empty.
    #[arg(long, env = "INPUT_BODY_PATH")]
    pub body_path: Option<String>,

    /// Newline or comma separated glob patterns of files to upload.
    #[arg(long, env = "INPUT_FILES")]
    pub files: Option<String>,

    /// Keep the release as a draft (true/false).
    #[arg(long, env = "INPUT_DRAFT")]
    pub draft: Option<String>,

    /// Mark the release as a prerelease (true/false).
    #[arg(long, env = "INPUT_PRERELEASE")]
    pub prerelease: Option<String>,

    /// Fail when a file pattern matches nothing.
    #[arg(long, env = "INPUT_FAIL_ON_UNMATCHED_FILES")]
    pub fail_on_unmatched_files: Option<String>,

    /// Fail when an asset cannot be uploaded.
    #[arg(long, env = "INPUT_FAIL_ON_ASSET_UPLOAD_ISSUE")]
    pub fail_on_asset_upload_issue: Option<String>,

    /// Commit or branch the tag is created from.
    #[arg(long, env = "INPUT_TARGET_COMMITISH")]
    pub target_commitish: Option<String>,

    /// Discussion category to link the release to.
    #[arg(long, env = "INPUT_DISCUSSION_CATEGORY_NAME")]
    pub discussion_category_name: Option<String>,

    /// Let the platform generate release notes.
    #[arg(long, env = "INPUT_GENERATE_RELEASE_NOTES")]
    pub generate_release_notes: Option<String>,

    /// Append the body to the existing release body instead of replacing it.
    #[arg(long, env = "INPUT_APPEND_BODY")]
    pub append_body: Option<String>,

    /// Mark as latest release: true, false or legacy.
    #[arg(long, env = "INPUT_MAKE_LATEST")]
    pub make_latest: Option<String>,

    /// GitHub REST API URL.
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// File that receives step outputs.
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,
}

/// Settings for the runner that are not part of the release itself.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub api_url: String,
    pub github_output: Option<PathBuf>,
}

impl Inputs {
    /// Validate the inputs and freeze them into a release config.
    pub fn into_config(self) -> Result<(ReleaseConfig, RunSettings)> {
        let token = non_empty(self.token)
            .or_else(|| non_empty(self.input_token))
            .ok_or(CliError::MissingToken)?;

        let repository = non_empty(self.repository)
            .or_else(|| non_empty(self.github_repository))
            .ok_or(CliError::MissingRepository)?;
        let repository: RepoSlug = repository
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid repository")?;

        let make_latest = non_empty(self.make_latest)
            .map(|v| v.parse::<MakeLatest>())
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))?;

        let config = ReleaseConfig {
            token,
            repository,
            github_ref: self.github_ref.unwrap_or_default(),
            tag_name: non_empty(self.tag_name.map(|t| t.trim().to_string())),
            name: non_empty(self.name),
            body: non_empty(self.body),
            body_path: non_empty(self.body_path).map(PathBuf::from),
            draft: tri_state(self.draft.as_deref()),
            prerelease: tri_state(self.prerelease.as_deref()),
            append_body: enabled(self.append_body.as_deref()),
            generate_release_notes: enabled(self.generate_release_notes.as_deref()),
            make_latest,
            target_commitish: non_empty(self.target_commitish),
            discussion_category_name: non_empty(self.discussion_category_name),
            files: parse_input_files(self.files.as_deref().unwrap_or_default()),
            fail_on_unmatched_files: enabled(self.fail_on_unmatched_files.as_deref()),
            fail_on_asset_upload_issue: enabled(self.fail_on_asset_upload_issue.as_deref()),
        };

        if config.tag().is_empty() && !config.is_draft() {
            return Err(CliError::MissingTag.into());
        }

        let settings = RunSettings {
            api_url: non_empty(self.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            github_output: self.github_output.filter(|p| !p.as_os_str().is_empty()),
        };

        Ok((config, settings))
    }
}

/// Split a files input on newlines and commas, dropping blanks.
pub fn parse_input_files(files: &str) -> Vec<String> {
    files
        .lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}

/// Unset or empty means "keep existing"; only `true` is true.
fn tri_state(value: Option<&str>) -> Option<bool> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v == "true")
}

fn enabled(value: Option<&str>) -> bool {
    tri_state(value).unwrap_or(false)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
