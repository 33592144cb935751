//! Mirroring published files to a GitHub repository.
//!
//! Each file is written to `site/<name>` through the contents API: a `GET`
//! fetches the current blob sha (if the file exists), then a `PUT` uploads
//! the new content.

use crate::config::GitHubConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Mirror errors.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid GitHub token")]
    InvalidToken,
}

/// Commits published files to GitHub.
pub struct GitHubMirror {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubMirror {
    pub fn new(config: GitHubConfig) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|_| MirrorError::InvalidToken)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("evolve"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Commit each file, one commit per file, with the same message.
    pub async fn commit(&self, files: &[(String, Vec<u8>)], message: &str) -> Result<(), MirrorError> {
        for (name, content) in files {
            let url = self.content_url(name);
            let sha = self.current_sha(&url).await?;

            let body = PutContent {
                message,
                content: STANDARD.encode(content),
                sha: sha.as_deref(),
            };
            self.client
                .put(&url)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;
            debug!(file = %name, updated = sha.is_some(), "Mirrored to GitHub");
        }

        info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            files = files.len(),
            "Mirrored publish to GitHub"
        );
        Ok(())
    }

    fn content_url(&self, name: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/site/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            name
        )
    }

    async fn current_sha(&self, url: &str) -> Result<Option<String>, MirrorError> {
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let existing: ExistingContent = response.error_for_status()?.json().await?;
        Ok(existing.sha)
    }
}

#[derive(Debug, Serialize)]
struct PutContent<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExistingContent {
    sha: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mirror(server: &MockServer) -> GitHubMirror {
        mirror_with_timeout(server, Duration::from_secs(5))
    }

    fn mirror_with_timeout(server: &MockServer, timeout: Duration) -> GitHubMirror {
        GitHubMirror::new(GitHubConfig {
            token: "ghp_test".into(),
            owner: "acme".into(),
            repo: "homepage".into(),
            api_url: server.uri(),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_updates_existing_file_with_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/homepage/contents/site/live.html"))
            .and(header("authorization", "Bearer ghp_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sha": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/homepage/contents/site/live.html"))
            .and(body_json(json!({
                "message": "AI publish 1700000000",
                "content": "PGgxPkI8L2gxPg==",
                "sha": "abc123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        mirror(&server)
            .commit(
                &[("live.html".to_string(), b"<h1>B</h1>".to_vec())],
                "AI publish 1700000000",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_creates_new_file_without_sha() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/homepage/contents/site/main.js"))
            .and(body_json(json!({
                "message": "m",
                "content": "eA=="
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        mirror(&server)
            .commit(&[("main.js".to_string(), b"x".to_vec())], "m")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = mirror(&server)
            .commit(&[("main.js".to_string(), b"x".to_vec())], "m")
            .await;
        assert!(matches!(result, Err(MirrorError::Request(_))));
    }

    #[tokio::test]
    async fn test_stalled_github_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let result = mirror_with_timeout(&server, Duration::from_millis(200))
            .commit(&[("main.js".to_string(), b"x".to_vec())], "m")
            .await;

        assert!(matches!(result, Err(MirrorError::Request(ref e)) if e.is_timeout()));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
