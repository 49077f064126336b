//! GitHub adapter. Implements FeedSource via the GitHub REST API.

use super::models::{GhCommit, GhIssue, GhRelease};
use crate::domain::{CandidateItem, DomainError, EventKind, RepoWatch};
use crate::ports::FeedSource;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub REST adapter.
///
/// Anonymous access works for public repositories but is limited to 60 requests per hour;
/// pass a token for anything beyond a handful of repositories.
pub struct GitHubFeed {
    client: Client,
    api_url: String,
}

impl GitHubFeed {
    /// # Arguments
    /// * `api_url` - API root, e.g. "https://api.github.com" (GitHub Enterprise works too)
    /// * `token` - Personal access token; `None` for anonymous access
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_url: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("tg-herald"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("token {}", token.trim()))
                .map_err(|e| DomainError::Config(format!("Invalid GitHub token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Source(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, watch: &RepoWatch, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, watch.owner, watch.name, path
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DomainError> {
        debug!(url, "GitHub request");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::Source(format!("Request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            let hint = match status {
                StatusCode::NOT_FOUND => " (repository not found or private)",
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => " (rate limited?)",
                _ => "",
            };
            return Err(DomainError::Source(format!(
                "GitHub API error {}{}: {}",
                status, hint, text
            )));
        }

        res.json::<T>()
            .await
            .map_err(|e| DomainError::Source(format!("Invalid GitHub response: {}", e)))
    }
}

#[async_trait::async_trait]
impl FeedSource for GitHubFeed {
    async fn fetch_recent(
        &self,
        watch: &RepoWatch,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, DomainError> {
        let repo = watch.display_name.as_str();
        let mut items = Vec::new();

        if watch.watches(EventKind::Commits) {
            let url = self.endpoint(watch, &format!("commits?per_page={}", limit));
            let commits: Vec<GhCommit> = self.get_json(&url).await?;
            items.extend(
                commits
                    .into_iter()
                    .take(limit)
                    .map(|c| CandidateItem::Commit(c.into_item(repo))),
            );
        }

        if watch.watches(EventKind::Issues) {
            let url = self.endpoint(watch, &format!("issues?state=all&per_page={}", limit));
            let issues: Vec<GhIssue> = self.get_json(&url).await?;
            items.extend(
                issues
                    .into_iter()
                    .take(limit)
                    .map(|i| CandidateItem::Issue(i.into_item(repo))),
            );
        }

        if watch.watches(EventKind::Releases) {
            let url = self.endpoint(watch, &format!("releases?per_page={}", limit));
            let releases: Vec<GhRelease> = self.get_json(&url).await?;
            items.extend(
                releases
                    .into_iter()
                    .take(limit)
                    .map(|r| CandidateItem::Release(r.into_item(repo))),
            );
        }

        debug!(repo = %watch.source_key(), items = items.len(), "GitHub fetch complete");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(events: Vec<EventKind>) -> RepoWatch {
        RepoWatch {
            owner: "octocat".into(),
            name: "Hello-World".into(),
            display_name: "Hello".into(),
            events,
        }
    }

    #[test]
    fn endpoint_joins_api_root_without_double_slash() {
        let feed = GitHubFeed::new("https://ghe.example.com/api/v3/", None, Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            feed.endpoint(&watch(vec![]), "releases?per_page=5"),
            "https://ghe.example.com/api/v3/repos/octocat/Hello-World/releases?per_page=5"
        );
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let result = GitHubFeed::new(DEFAULT_API_URL, Some("abc\ndef"), Duration::from_secs(5));
        assert!(matches!(result, Err(DomainError::Config(_))));
    }

    #[tokio::test]
    async fn watching_nothing_makes_no_requests() {
        // Unroutable root: any request would fail the fetch.
        let feed = GitHubFeed::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
        let items = feed.fetch_recent(&watch(vec![]), 5).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn unreachable_api_fails_whole_fetch() {
        let feed = GitHubFeed::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
        let result = feed
            .fetch_recent(&watch(vec![EventKind::Commits, EventKind::Issues]), 5)
            .await;
        assert!(matches!(result, Err(DomainError::Source(_))));
    }
}
