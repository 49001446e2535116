//! Step outputs for the invoking pipeline.
//!
//! Outputs are appended to the file named by `GITHUB_OUTPUT` using the
//! heredoc form, which is safe for multi-line values. Without that file
//! they are printed to stdout as `name=value` lines.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tagship_reconcile::{AssetMetadata, Release};
use uuid::Uuid;

/// Writer for step outputs.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    path: Option<PathBuf>,
}

/// Outputs describing a reconciled release.
#[derive(Debug, Serialize)]
pub struct ReleaseOutputs<'a> {
    pub url: &'a str,
    pub id: String,
    pub upload_url: &'a str,
}

impl<'a> ReleaseOutputs<'a> {
    pub fn from_release(release: &'a Release) -> Self {
        Self {
            url: &release.html_url,
            id: release.id.to_string(),
            upload_url: &release.upload_url,
        }
    }
}

impl Outputs {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Set one output.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        match self.path.as_ref() {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output file {}", path.display()))?;
                file.write_all(heredoc(name, value).as_bytes())
                    .with_context(|| format!("Failed to write output file {}", path.display()))?;
            }
            None => println!("{name}={value}"),
        }
        Ok(())
    }

    /// Set the release outputs.
    pub fn set_release(&self, release: &ReleaseOutputs<'_>) -> Result<()> {
        self.set("url", release.url)?;
        self.set("id", &release.id)?;
        self.set("upload_url", release.upload_url)
    }

    /// Set the `assets` output as a JSON array.
    pub fn set_assets(&self, assets: &[AssetMetadata]) -> Result<()> {
        let json = serde_json::to_string(assets).context("Failed to serialize assets")?;
        self.set("assets", &json)
    }
}

/// Format `name<<DELIM\nvalue\nDELIM\n` with a delimiter absent from `value`.
fn heredoc(name: &str, value: &str) -> String {
    let mut delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse a heredoc-format output file into (name, value) pairs.
    fn parse(contents: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut lines = contents.lines();
        while let Some(line) = lines.next() {
            let (name, delimiter) = line.split_once("<<").unwrap();
            let mut value = Vec::new();
            for line in lines.by_ref() {
                if line == delimiter {
                    break;
                }
                value.push(line);
            }
            out.push((name.to_string(), value.join("\n")));
        }
        out
    }

    #[test]
    fn test_outputs_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        let outputs = Outputs::new(Some(path.clone()));

        let release = Release {
            id: 42,
            html_url: "https://github.com/octo/hello/releases/tag/v1".to_string(),
            upload_url: "https://uploads.github.com/assets{?name,label}".to_string(),
            ..Default::default()
        };
        outputs
            .set_release(&ReleaseOutputs::from_release(&release))
            .unwrap();
        outputs.set("multi", "line one\nline two").unwrap();

        let written = parse(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(
            written,
            vec![
                (
                    "url".to_string(),
                    "https://github.com/octo/hello/releases/tag/v1".to_string()
                ),
                ("id".to_string(), "42".to_string()),
                (
                    "upload_url".to_string(),
                    "https://uploads.github.com/assets{?name,label}".to_string()
                ),
                ("multi".to_string(), "line one\nline two".to_string()),
            ]
        );
    }

    #[test]
    fn test_heredoc_delimiter_is_random() {
        let first = heredoc("x", "v");
        let second = heredoc("x", "v");
        let delimiter = first.lines().next().unwrap().split_once("<<").unwrap().1;
        let token = delimiter.strip_prefix("ghadelimiter_").unwrap();
        assert!(Uuid::parse_str(token).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn test_heredoc_delimiter_not_in_value() {
        let formatted = heredoc("x", "ghadelimiter_");
        let delimiter = formatted.lines().next().unwrap().split_once("<<").unwrap().1;
        assert_eq!(formatted.lines().last(), Some(delimiter));
        assert_ne!(delimiter, "ghadelimiter_");
    }
}
