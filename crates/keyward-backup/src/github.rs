// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GitHub Releases implementation of [`ReleaseStore`].

use std::time::Duration;

use async_trait::async_trait;
use keyward_config::model::ReleaseStoreConfig;
use keyward_core::{
    AdapterType, HealthStatus, KeywardError, NewRelease, PluginAdapter, Release, ReleaseAsset,
    ReleaseStore,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

const API_VERSION: &str = "2022-11-28";

/// Error body returned by the GitHub REST API.
#[derive(Debug, Default, Deserialize)]
struct GitHubErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl GitHubErrorResponse {
    fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// `message` plus any per-field error codes (e.g. `already_exists`).
    fn summary(&self) -> String {
        let codes: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.get("code").and_then(|c| c.as_str()))
            .collect();
        match (&self.message, codes.is_empty()) {
            (Some(message), true) => message.clone(),
            (Some(message), false) => format!("{message} ({})", codes.join(", ")),
            (None, false) => codes.join(", "),
            (None, true) => "no error details".to_string(),
        }
    }
}

/// REST client for the releases of one repository.
#[derive(Clone)]
pub struct GitHubReleaseStore {
    client: reqwest::Client,
    api_url: String,
    uploads_url: String,
    owner: String,
    repo: String,
}

impl GitHubReleaseStore {
    pub fn new(
        api_url: &str,
        uploads_url: &str,
        owner: &str,
        repo: &str,
        token: &SecretString,
        timeout: Duration,
    ) -> Result<Self, KeywardError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| {
                KeywardError::Config("release store token is not a valid header value".to_string())
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("keyward/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| KeywardError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            uploads_url: uploads_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Build a store from the `[release_store]` config section.
    pub fn from_config(config: &ReleaseStoreConfig) -> Result<Self, KeywardError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| KeywardError::Config("release_store.token is required".to_string()))?;

        let store = Self::new(
            &config.api_url,
            &config.uploads_url,
            &config.owner,
            &config.repo,
            &token,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(owner = %config.owner, repo = %config.repo, "release store client initialized");
        Ok(store)
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.owner, self.repo)
    }
}

impl std::fmt::Debug for GitHubReleaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubReleaseStore")
            .field("api_url", &self.api_url)
            .field("uploads_url", &self.uploads_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Status and GitHub's error summary for a failed response.
async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{status}: {}", GitHubErrorResponse::from_body(&body).summary())
}

fn describe_send_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("request failed: {e}")
    }
}

#[async_trait]
impl PluginAdapter for GitHubReleaseStore {
    fn name(&self) -> &str {
        "github-releases"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ReleaseStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        let response = match self.client.get(self.repo_url()).send().await {
            Ok(response) => response,
            Err(e) => return Ok(HealthStatus::Unhealthy(describe_send_error(&e))),
        };
        let status = response.status();
        Ok(match status {
            s if s.is_success() => HealthStatus::Healthy,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                HealthStatus::Unhealthy(format!("token rejected ({status})"))
            }
            StatusCode::NOT_FOUND => HealthStatus::Unhealthy(format!(
                "repository {}/{} not found",
                self.owner, self.repo
            )),
            _ => HealthStatus::Degraded(format!("unexpected status {status}")),
        })
    }
}

#[async_trait]
impl ReleaseStore for GitHubReleaseStore {
    async fn get_release_by_tag(&self, tag: &str) -> Result<Option<Release>, KeywardError> {
        let url = format!("{}/releases/tags/{tag}", self.repo_url());
        debug!(tag, "looking up release");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KeywardError::ReleaseLookup(describe_send_error(&e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(KeywardError::ReleaseLookup(describe_failure(response).await));
        }
        let release = response
            .json::<Release>()
            .await
            .map_err(|e| KeywardError::ReleaseLookup(format!("unparseable release: {e}")))?;
        Ok(Some(release))
    }

    async fn create_release(&self, release: &NewRelease) -> Result<Release, KeywardError> {
        let url = format!("{}/releases", self.repo_url());
        debug!(tag = %release.tag_name, "creating release");

        let response = self
            .client
            .post(&url)
            .json(release)
            .send()
            .await
            .map_err(|e| KeywardError::ReleaseCreate(describe_send_error(&e)))?;

        if !response.status().is_success() {
            return Err(KeywardError::ReleaseCreate(describe_failure(response).await));
        }
        response
            .json::<Release>()
            .await
            .map_err(|e| KeywardError::ReleaseCreate(format!("unparseable release: {e}")))
    }

    async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        data: Vec<u8>,
    ) -> Result<ReleaseAsset, KeywardError> {
        let base = format!(
            "{}/repos/{}/{}/releases/{}/assets",
            self.uploads_url, self.owner, self.repo, release.id
        );
        let url = Url::parse_with_params(&base, &[("name", name)])
            .map_err(|e| KeywardError::Upload(format!("invalid upload URL: {e}")))?;
        debug!(release_id = release.id, name, bytes = data.len(), "uploading asset");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| KeywardError::Upload(describe_send_error(&e)))?;

        if !response.status().is_success() {
            return Err(KeywardError::Upload(describe_failure(response).await));
        }
        response
            .json::<ReleaseAsset>()
            .await
            .map_err(|e| KeywardError::Upload(format!("unparseable asset: {e}")))
    }

    async fn delete_asset(&self, asset_id: u64) -> Result<(), KeywardError> {
        let url = format!("{}/releases/assets/{asset_id}", self.repo_url());
        debug!(asset_id, "deleting asset");

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| KeywardError::Upload(describe_send_error(&e)))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(KeywardError::NotFound(format!("asset {asset_id}"))),
            _ => Err(KeywardError::Upload(format!(
                "failed to delete asset {asset_id}: {}",
                describe_failure(response).await
            ))),
        }
    }

    async fn rename_asset(&self, asset_id: u64, name: &str) -> Result<ReleaseAsset, KeywardError> {
        let url = format!("{}/releases/assets/{asset_id}", self.repo_url());
        debug!(asset_id, name, "renaming asset");

        let response = self
            .client
            .patch(&url)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|e| KeywardError::Upload(describe_send_error(&e)))?;

        match response.status() {
            s if s.is_success() => response
                .json::<ReleaseAsset>()
                .await
                .map_err(|e| KeywardError::Upload(format!("unparseable asset: {e}"))),
            StatusCode::NOT_FOUND => Err(KeywardError::NotFound(format!("asset {asset_id}"))),
            _ => Err(KeywardError::Upload(format!(
                "failed to rename asset {asset_id}: {}",
                describe_failure(response).await
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store(server: &MockServer) -> GitHubReleaseStore {
        GitHubReleaseStore::new(
            &server.uri(),
            &server.uri(),
            "acme",
            "backups",
            &SecretString::from("gh-token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn release_json(id: u64, tag: &str) -> serde_json::Value {
        json!({
            "id": id,
            "tag_name": tag,
            "name": format!("Backup for {}", tag.trim_start_matches("backup-")),
            "html_url": format!("https://github.test/acme/backups/releases/{id}"),
            "draft": false,
            "prerelease": false,
            "assets": []
        })
    }

    #[tokio::test]
    async fn lookup_sends_auth_and_api_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/backups/releases/tags/backup-2026-03-07"))
            .and(header("authorization", "Bearer gh-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(release_json(9, "backup-2026-03-07")))
            .expect(1)
            .mount(&server)
            .await;

        let release = store(&server)
            .get_release_by_tag("backup-2026-03-07")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(release.id, 9);
    }

    #[tokio::test]
    async fn lookup_404_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        assert!(store(&server).get_release_by_tag("backup-x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_server_error_is_not_treated_as_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(502).set_body_json(json!({"message": "Server Error"})),
            )
            .mount(&server)
            .await;

        match store(&server).get_release_by_tag("backup-x").await {
            Err(KeywardError::ReleaseLookup(message)) => {
                assert!(message.contains("502"));
                assert!(message.contains("Server Error"));
            }
            other => panic!("expected ReleaseLookup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_posts_release_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/backups/releases"))
            .and(body_json(json!({
                "tag_name": "backup-2026-03-07",
                "name": "Backup for 2026-03-07",
                "draft": false,
                "prerelease": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(release_json(11, "backup-2026-03-07")))
            .expect(1)
            .mount(&server)
            .await;

        let created = store(&server)
            .create_release(&NewRelease {
                tag_name: "backup-2026-03-07".into(),
                name: "Backup for 2026-03-07".into(),
                draft: false,
                prerelease: false,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 11);
    }

    #[tokio::test]
    async fn create_duplicate_tag_reports_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{"resource": "Release", "code": "already_exists", "field": "tag_name"}]
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .create_release(&NewRelease {
                tag_name: "t".into(),
                name: "t".into(),
                draft: false,
                prerelease: false,
            })
            .await
            .unwrap_err();
        match err {
            KeywardError::ReleaseCreate(message) => {
                assert!(message.contains("422"));
                assert!(message.contains("already_exists"));
            }
            other => panic!("expected ReleaseCreate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_posts_octet_stream_with_name_param() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/backups/releases/11/assets"))
            .and(query_param("name", "backup-2026-03-07.sql"))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(b"-- dump\n".to_vec()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 77,
                "name": "backup-2026-03-07.sql",
                "browser_download_url": "https://github.test/acme/backups/releases/download/backup-2026-03-07/backup-2026-03-07.sql",
                "size": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let release: Release = serde_json::from_value(release_json(11, "backup-2026-03-07")).unwrap();
        let asset = store(&server)
            .upload_asset(&release, "backup-2026-03-07.sql", b"-- dump\n".to_vec())
            .await
            .unwrap();
        assert_eq!(asset.id, 77);
        assert!(asset.browser_download_url.ends_with("backup-2026-03-07.sql"));
    }

    #[tokio::test]
    async fn upload_failure_is_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let release: Release = serde_json::from_value(release_json(11, "t")).unwrap();
        assert!(matches!(
            store(&server).upload_asset(&release, "a.sql", vec![1]).await,
            Err(KeywardError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn delete_asset_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/backups/releases/assets/5"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/repos/acme/backups/releases/assets/6"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store(&server);
        store.delete_asset(5).await.unwrap();
        assert!(matches!(store.delete_asset(6).await, Err(KeywardError::NotFound(_))));
    }

    #[tokio::test]
    async fn rename_patches_asset_name() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/backups/releases/assets/78"))
            .and(body_json(json!({"name": "backup-2026-03-07.sql"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 78,
                "name": "backup-2026-03-07.sql",
                "browser_download_url": "https://github.test/acme/backups/releases/download/backup-2026-03-07/backup-2026-03-07.sql"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let asset = store(&server)
            .rename_asset(78, "backup-2026-03-07.sql")
            .await
            .unwrap();
        assert_eq!(asset.id, 78);
        assert_eq!(asset.name, "backup-2026-03-07.sql");
    }

    #[tokio::test]
    async fn rename_conflict_is_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{"resource": "ReleaseAsset", "code": "already_exists", "field": "name"}]
            })))
            .mount(&server)
            .await;

        match store(&server).rename_asset(78, "a.sql").await {
            Err(KeywardError::Upload(message)) => assert!(message.contains("already_exists")),
            other => panic!("expected Upload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_reports_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/backups"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let status = store(&server).health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)));
    }

    #[test]
    fn from_config_requires_token() {
        let err = GitHubReleaseStore::from_config(&ReleaseStoreConfig::default()).unwrap_err();
        assert!(matches!(err, KeywardError::Config(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let store = GitHubReleaseStore::new(
            "https://api.github.test",
            "https://uploads.github.test",
            "acme",
            "backups",
            &SecretString::from("gh-token".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!format!("{store:?}").contains("gh-token"));
    }
}
