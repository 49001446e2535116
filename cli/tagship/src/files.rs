//! Glob matching of asset files.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Regular files matched by one pattern, in glob order.
fn matches(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).with_context(|| format!("Invalid file pattern '{pattern}'"))?;
    Ok(paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect())
}

/// Regular files matched by any of `patterns`.
pub fn paths(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut all = Vec::new();
    for pattern in patterns {
        all.extend(matches(pattern)?);
    }
    Ok(all)
}

/// Patterns that match no regular file.
pub fn unmatched_patterns(patterns: &[String]) -> Result<Vec<String>> {
    let mut unmatched = Vec::new();
    for pattern in patterns {
        if matches(pattern)?.is_empty() {
            unmatched.push(pattern.clone());
        }
    }
    Ok(unmatched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(dir: &std::path::Path, glob: &str) -> String {
        dir.join(glob).to_string_lossy().into_owned()
    }

    #[test]
    fn test_paths_only_return_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.zip"), b"a").unwrap();
        std::fs::write(dir.path().join("b.zip"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("c.zip")).unwrap();

        let found = paths(&[pattern(dir.path(), "*.zip")]).unwrap();
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }

    #[test]
    fn test_unmatched_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.zip"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("only-dir")).unwrap();

        let patterns = vec![
            pattern(dir.path(), "*.zip"),
            pattern(dir.path(), "*.tar.gz"),
            pattern(dir.path(), "only-dir"),
        ];
        let unmatched = unmatched_patterns(&patterns).unwrap();
        assert_eq!(unmatched, vec![patterns[1].clone(), patterns[2].clone()]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(paths(&["[".to_string()]).is_err());
    }
}
