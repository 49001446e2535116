//! Release asset upload.
//!
//! Asset names are unique per release, so uploading a file whose basename
//! matches an existing asset replaces it: the old asset is deleted first.

use std::path::Path;

use futures_util::future::try_join_all;
use tracing::{error, info};

use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::releaser::Releaser;
use crate::types::{AssetMetadata, AssetRef, LocalAsset};

/// Strip the URI-template suffix (`{?name,label}`) from an upload URL.
pub fn upload_endpoint(template: &str) -> &str {
    template
        .find('{')
        .map_or(template, |marker| &template[..marker])
}

/// Upload one file, replacing a same-named asset.
///
/// Remote failures are returned only when `fail_on_asset_upload_issue` is
/// set; otherwise they are logged and an empty result is returned. Local
/// read failures are always returned.
pub async fn upload_asset<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    endpoint: &str,
    path: &Path,
    current_assets: &[AssetRef],
) -> Result<AssetMetadata> {
    let asset = LocalAsset::read(path).await?;

    match replace_asset(config, releaser, endpoint, &asset, current_assets).await {
        Ok(metadata) => Ok(metadata),
        Err(e) if config.fail_on_asset_upload_issue => Err(e),
        Err(e) => {
            error!(asset = %asset.name, error = %e, "Failed to upload asset");
            Ok(AssetMetadata::empty())
        }
    }
}

async fn replace_asset<R: Releaser + ?Sized>(
    config: &ReleaseConfig,
    releaser: &R,
    endpoint: &str,
    asset: &LocalAsset,
    current_assets: &[AssetRef],
) -> Result<AssetMetadata> {
    if let Some(current) = current_assets.iter().find(|a| a.name == asset.name) {
        info!(
            asset = %asset.name,
            asset_id = current.id,
            "Deleting previously uploaded asset"
        );
        releaser
            .delete_release_asset(&config.repository, current.id)
            .await?;
    }

    info!(asset = %asset.name, size = asset.size, mime = %asset.mime, "Uploading asset");
    releaser.upload_release_asset(endpoint, asset).await
}

/// Upload every file concurrently against the same asset snapshot.
///
/// Results keep the order of `paths`, with the `uploader` field stripped.
/// The first propagated failure aborts the batch.
pub async fn upload_assets<R, P>(
    config: &ReleaseConfig,
    releaser: &R,
    endpoint: &str,
    paths: &[P],
    current_assets: &[AssetRef],
) -> Result<Vec<AssetMetadata>>
where
    R: Releaser + ?Sized,
    P: AsRef<Path>,
{
    let uploads = paths
        .iter()
        .map(|path| upload_asset(config, releaser, endpoint, path.as_ref(), current_assets));

    let assets = try_join_all(uploads).await?;
    Ok(assets
        .into_iter()
        .map(AssetMetadata::without_uploader)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}",
        "https://uploads.github.com/repos/o/r/releases/1/assets"
    )]
    #[case(
        "https://uploads.github.com/repos/o/r/releases/1/assets",
        "https://uploads.github.com/repos/o/r/releases/1/assets"
    )]
    #[case("{?name}", "")]
    fn test_upload_endpoint(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(upload_endpoint(template), expected);
    }
}
