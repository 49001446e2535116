//! Error handling and display for the CLI.

use colored::Colorize;
use tagship_reconcile::ReleaseError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No GitHub token provided. Set GITHUB_TOKEN or pass --token.")]
    MissingToken,

    #[error("No repository provided. Set GITHUB_REPOSITORY or pass --repository.")]
    MissingRepository,

    #[error("GitHub Releases requires a tag")]
    MissingTag,

    #[error("There were unmatched files")]
    UnmatchedFiles,

    #[error("Failed to create the new release")]
    Release(#[source] ReleaseError),

    #[error("Failed to upload release assets")]
    Upload(#[source] ReleaseError),
}

/// Print an error in a user-friendly format.
///
/// Inside GitHub Actions the message is also emitted as an `::error::`
/// workflow command so it shows up on the run summary.
pub fn print_error(err: &anyhow::Error) {
    if running_in_actions() {
        println!("::error::{}", escape_workflow_data(&format!("{err:#}")));
    }

    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(hint) = hint_for(err) {
        eprintln!("\n{}", hint.yellow());
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    let release_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ReleaseError>())?;

    match release_err {
        ReleaseError::Remote { status: 401, .. } => {
            Some("Hint: The token was rejected. Check that GITHUB_TOKEN is set and valid.")
        }
        ReleaseError::Remote { status: 403, .. } => Some(
            "Hint: The token may lack `contents: write` permission for this repository.",
        ),
        ReleaseError::Remote { status: 0, .. } => {
            Some("Hint: Check your network connection and API endpoint.")
        }
        ReleaseError::TooManyRetries { .. } => {
            Some("Hint: Another run kept creating this release concurrently.")
        }
        _ => None,
    }
}

fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Escape a message for a workflow command.
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_workflow_data() {
        assert_eq!(escape_workflow_data("50% done\nnext"), "50%25 done%0Anext");
    }

    #[test]
    fn test_release_failure_reports_cause_once() {
        let err: anyhow::Error =
            CliError::Release(ReleaseError::remote(500, "Server Error")).into();
        let message = format!("{err:#}");
        assert_eq!(
            message,
            "Failed to create the new release: remote error (status 500): Server Error"
        );
        assert_eq!(message.matches("Server Error").count(), 1);
    }

    #[test]
    fn test_upload_failure_has_its_own_wording() {
        let err: anyhow::Error = CliError::Upload(ReleaseError::AssetUpload {
            name: "app.zip".to_string(),
            reason: "received status code 500".to_string(),
        })
        .into();
        let message = format!("{err:#}");
        assert!(message.starts_with("Failed to upload release assets: "));
        assert!(!message.contains("create"));
        assert_eq!(message.matches("app.zip").count(), 1);
    }

    #[test]
    fn test_hints() {
        let unauthorized: anyhow::Error =
            CliError::Release(ReleaseError::remote(401, "Bad credentials")).into();
        assert!(hint_for(&unauthorized).is_some());

        let network: anyhow::Error = ReleaseError::remote(0, "connection refused").into();
        assert!(hint_for(&network).unwrap().contains("network"));

        let other: anyhow::Error = CliError::MissingTag.into();
        assert!(hint_for(&other).is_none());
    }
}
