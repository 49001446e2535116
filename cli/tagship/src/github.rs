//! GitHub REST implementation of the releaser port.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LINK,
    RETRY_AFTER, USER_AGENT,
};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tagship_reconcile::{
    AssetMetadata, LocalAsset, Release, ReleaseError, ReleasePage, ReleaseRequest, Releaser,
    RepoSlug, Result,
};
use tracing::{debug, info, warn};

/// REST API version pinned for every request.
const API_VERSION: &str = "2022-11-28";

/// Longest wait honoured before retrying a rate-limited request.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Releaser backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleaser {
    client: reqwest::Client,
    base_url: Url,
}

impl GitHubReleaser {
    /// Create a client for `api_url` authenticated with `token`.
    pub fn new(api_url: &str, token: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tagship/", env!("CARGO_PKG_VERSION"))),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("Invalid token format")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(api_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {api_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {api_url}");
        }

        Ok(Self { client, base_url })
    }

    /// Build an API URL from path segments, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repo_url(&self, repo: &RepoSlug, rest: &[&str]) -> Url {
        let mut segments = vec!["repos", repo.owner.as_str(), repo.repo.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    /// Send a request, retrying once if the API reports a rate limit.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let retry = request.try_clone();
        let response = request.send().await.map_err(transport_error)?;

        match (
            rate_limit_delay(response.status(), response.headers(), Utc::now()),
            retry,
        ) {
            (Some(delay), Some(retry)) => {
                warn!(
                    url = %response.url(),
                    status = response.status().as_u16(),
                    retry_after_secs = delay.as_secs(),
                    "Request quota exhausted, retrying once"
                );
                tokio::time::sleep(delay).await;
                retry.send().await.map_err(transport_error)
            }
            _ => Ok(response),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ReleaseError::remote(0, format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl Releaser for GitHubReleaser {
    async fn get_release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release> {
        let url = self.repo_url(repo, &["releases", "tags", tag]);
        debug!(url = %url, "Fetching release by tag");
        self.send_json(self.client.get(url)).await
    }

    async fn create_release(&self, repo: &RepoSlug, request: &ReleaseRequest) -> Result<Release> {
        let url = self.repo_url(repo, &["releases"]);
        debug!(url = %url, tag = %request.tag_name, "Creating release");
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn update_release(
        &self,
        repo: &RepoSlug,
        release_id: u64,
        request: &ReleaseRequest,
    ) -> Result<Release> {
        let id = release_id.to_string();
        let url = self.repo_url(repo, &["releases", &id]);
        debug!(url = %url, "Updating release");
        self.send_json(self.client.patch(url).json(request)).await
    }

    async fn list_releases(
        &self,
        repo: &RepoSlug,
        page: u32,
        per_page: u32,
    ) -> Result<ReleasePage> {
        let url = self.repo_url(repo, &["releases"]);
        debug!(url = %url, page, per_page, "Listing releases");
        let request = self
            .client
            .get(url)
            .query(&[("per_page", per_page), ("page", page)]);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let has_next = has_next_page(response.headers());
        let releases = response
            .json()
            .await
            .map_err(|e| ReleaseError::remote(0, format!("failed to parse response: {e}")))?;

        Ok(ReleasePage { releases, has_next })
    }

    async fn delete_release_asset(&self, repo: &RepoSlug, asset_id: u64) -> Result<()> {
        let id = asset_id.to_string();
        let url = self.repo_url(repo, &["releases", "assets", &id]);
        debug!(url = %url, "Deleting release asset");

        let response = self.send(self.client.delete(url)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    async fn upload_release_asset(
        &self,
        endpoint: &str,
        asset: &LocalAsset,
    ) -> Result<AssetMetadata> {
        let upload_failed = |reason: String| ReleaseError::AssetUpload {
            name: asset.name.clone(),
            reason,
        };

        let url = Url::parse(endpoint)
            .map_err(|e| upload_failed(format!("invalid upload URL {endpoint}: {e}")))?;
        let request = self
            .client
            .post(url)
            .query(&[("name", asset.name.as_str())])
            .header(CONTENT_LENGTH, asset.size)
            .header(CONTENT_TYPE, asset.mime.as_str())
            .body(asset.data.clone());

        let response = self
            .send(request)
            .await
            .map_err(|e| upload_failed(e.to_string()))?;
        let status = response.status();

        if status != StatusCode::CREATED {
            let body: ApiErrorResponse = response.json().await.unwrap_or_default();
            return Err(upload_failed(format!(
                "received status code {}\n{}\n{}",
                status.as_u16(),
                body.message,
                serde_json::to_string(&body.errors).unwrap_or_default()
            )));
        }

        let metadata: AssetMetadata = response
            .json()
            .await
            .map_err(|e| upload_failed(format!("failed to parse server response: {e}")))?;
        info!(asset = %asset.name, id = ?metadata.id(), "Uploaded asset");
        Ok(metadata)
    }
}

/// Error response body.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: String,

    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl ApiErrorResponse {
    /// Whether a validation error reports an existing resource.
    fn reports_already_exists(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.get("code").and_then(|c| c.as_str()) == Some("already_exists"))
    }
}

/// Map an unsuccessful response onto the release error taxonomy.
async fn api_error(response: Response) -> ReleaseError {
    let status = response.status();
    let url = response.url().path().to_string();
    let body: ApiErrorResponse = response.json().await.unwrap_or_default();
    let message = if body.message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        body.message.clone()
    };

    match status {
        StatusCode::NOT_FOUND => ReleaseError::not_found(url),
        StatusCode::CONFLICT => ReleaseError::conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY if body.reports_already_exists() => {
            ReleaseError::conflict(format!(
                "{message}: {}",
                serde_json::to_string(&body.errors).unwrap_or_default()
            ))
        }
        _ => ReleaseError::remote(status.as_u16(), message),
    }
}

fn transport_error(err: reqwest::Error) -> ReleaseError {
    ReleaseError::remote(0, err.to_string())
}

/// How long to wait before retrying a rate-limited response, if it is one.
fn rate_limit_delay(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header(RETRY_AFTER.as_str()).and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT));
    }

    if header("x-ratelimit-remaining") == Some("0") {
        let reset = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok())?;
        let wait = u64::try_from(reset - now.timestamp()).unwrap_or_default();
        return Some(Duration::from_secs(wait).min(MAX_RATE_LIMIT_WAIT));
    }

    None
}

/// Whether a `Link` header advertises a next page.
fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|link| {
            link.split(';')
                .skip(1)
                .any(|param| param.trim() == "rel=\"next\"")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let releaser = GitHubReleaser::new("https://ghe.example.com/api/v3/", "token").unwrap();
        let repo = RepoSlug::new("octo", "hello");
        let url = releaser.repo_url(&repo, &["releases", "tags", "release/v1.0"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/hello/releases/tags/release%2Fv1.0"
        );
    }

    #[test]
    fn test_has_next_page() {
        let mut headers = HeaderMap::new();
        assert!(!has_next_page(&headers));

        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/releases?page=2>; rel=\"next\", \
                 <https://api.github.com/repositories/1/releases?page=5>; rel=\"last\"",
            ),
        );
        assert!(has_next_page(&headers));

        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/releases?page=1>; rel=\"prev\"",
            ),
        );
        assert!(!has_next_page(&headers));
    }

    #[test]
    fn test_rate_limit_delay() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(rate_limit_delay(StatusCode::FORBIDDEN, &headers, now), None);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000010"));
        assert_eq!(
            rate_limit_delay(StatusCode::FORBIDDEN, &headers, now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(rate_limit_delay(StatusCode::NOT_FOUND, &headers, now), None);

        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700003600"));
        assert_eq!(
            rate_limit_delay(StatusCode::FORBIDDEN, &headers, now),
            Some(MAX_RATE_LIMIT_WAIT)
        );

        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1699999990"));
        assert_eq!(
            rate_limit_delay(StatusCode::FORBIDDEN, &headers, now),
            Some(Duration::ZERO)
        );

        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
        assert_eq!(
            rate_limit_delay(StatusCode::TOO_MANY_REQUESTS, &headers, now),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_already_exists_detection() {
        let body: ApiErrorResponse = serde_json::from_value(serde_json::json!({
            "message": "Validation Failed",
            "errors": [{"resource": "Release", "code": "already_exists", "field": "tag_name"}]
        }))
        .unwrap();
        assert!(body.reports_already_exists());

        let body: ApiErrorResponse = serde_json::from_value(serde_json::json!({
            "message": "Validation Failed",
            "errors": [{"resource": "Release", "code": "invalid", "field": "target_commitish"}]
        }))
        .unwrap();
        assert!(!body.reports_already_exists());
    }
}
