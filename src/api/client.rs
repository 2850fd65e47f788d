use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::SubtitleProvider;
use crate::config::{ServerConfig, TranslateConfig};
use crate::error::{Result, SubfillError};
use crate::models::{MediaDetails, Subtitle, WantedEpisode, WantedItem, WantedMovie, WantedPage};
use crate::retry::{run_with_retry, Attempt, BackoffPolicy, Sleeper};

const API_KEY_HEADER: &str = "X-API-KEY";

/// HTTP client for the Bazarr REST API. One reused connection pool, a fixed
/// base URL and API key, and a per-request timeout. Transient failures
/// (timeout, 429, 5xx) are retried with exponential backoff when the call
/// carries a retry budget; everything else fails the call immediately.
pub struct BazarrClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    policy: BackoffPolicy,
    translate_retries: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl BazarrClient {
    pub fn new(
        server: &ServerConfig,
        translate: &TranslateConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(server.request_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SubfillError::Http)?;

        Ok(Self {
            client,
            base_url: api_base_url(&server.hostname, server.port),
            api_key: server.api_key.clone(),
            timeout,
            policy: BackoffPolicy::new(Duration::from_secs(translate.initial_backoff_secs)),
            translate_retries: translate.max_retries,
            sleeper,
        })
    }

    /// Perform one API call with up to `retries` retries on transient
    /// failures. Returns the parsed JSON payload, or `None` for an empty
    /// 2xx body.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        retries: u32,
        params: &[(String, String)],
    ) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Making {} request to: {}", method, url);

        run_with_retry(&self.policy, self.sleeper.as_ref(), retries, |_| {
            self.attempt(method.clone(), &url, params)
        })
        .await
    }

    /// A single request attempt, classified for the retry driver.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
    ) -> Attempt<Option<Value>> {
        let response = match self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Attempt::Transient(SubfillError::Timeout(format!(
                    "Request timed out after {}s: {}",
                    self.timeout.as_secs(),
                    url
                )));
            }
            Err(e) => return Attempt::Fatal(SubfillError::Http(e)),
        };

        let status = response.status();
        if is_transient_status(status) {
            return Attempt::Transient(SubfillError::Api(format!(
                "HTTP {} from {}",
                status, url
            )));
        }
        if !status.is_success() {
            return Attempt::Fatal(SubfillError::Api(format!("HTTP {} from {}", status, url)));
        }

        debug!("API response: {}", status);
        match response.bytes().await {
            Ok(body) if body.is_empty() => Attempt::Success(None),
            Ok(body) => match serde_json::from_slice(&body) {
                Ok(value) => Attempt::Success(Some(value)),
                Err(e) => Attempt::Fatal(SubfillError::Json(e)),
            },
            Err(e) => Attempt::Fatal(SubfillError::Http(e)),
        }
    }

    async fn wanted<T>(&self, endpoint: &str) -> Result<WantedPage<T>>
    where
        T: serde::de::DeserializeOwned + 'static,
    {
        let params = vec![
            ("start".to_string(), "0".to_string()),
            ("length".to_string(), "-1".to_string()),
        ];
        let value = self
            .request(Method::GET, endpoint, 0, &params)
            .await?
            .ok_or_else(|| SubfillError::Api(format!("Empty response from {}", endpoint)))?;
        Ok(serde_json::from_value(value)?)
    }
}

fn api_base_url(hostname: &str, port: u16) -> String {
    format!("http://{}:{}/api", hostname, port)
}

/// Rate-limit and server errors are worth retrying; other statuses are
/// terminal for the call.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl SubtitleProvider for BazarrClient {
    async fn wanted_movies(&self) -> Result<WantedPage<WantedMovie>> {
        self.wanted("movies/wanted").await
    }

    async fn wanted_episodes(&self) -> Result<WantedPage<WantedEpisode>> {
        self.wanted("episodes/wanted").await
    }

    async fn subtitles(&self, item: &WantedItem) -> Result<Vec<Subtitle>> {
        let value = self
            .request(
                Method::GET,
                item.kind().endpoint(),
                0,
                &item.lookup_params(),
            )
            .await?
            .ok_or_else(|| {
                SubfillError::Api(format!("Empty media info for {} {}", item.kind().singular(), item.media_id()))
            })?;

        let page: WantedPage<MediaDetails> = serde_json::from_value(value)?;
        let details = page.data.into_iter().next().ok_or_else(|| {
            SubfillError::Api(format!(
                "No media info returned for {} {}",
                item.kind().singular(),
                item.media_id()
            ))
        })?;
        Ok(details.subtitles)
    }

    async fn request_download(&self, item: &WantedItem, language: &str) -> Result<()> {
        let endpoint = format!("{}/subtitles", item.kind().endpoint());
        let mut params = item.id_params();
        params.push(("language".to_string(), language.to_string()));
        params.push(("forced".to_string(), "false".to_string()));
        params.push(("hi".to_string(), "false".to_string()));

        let result = self.request(Method::PATCH, &endpoint, 0, &params).await?;
        debug!("Download {} subtitles result: {:?}", language, result);
        Ok(())
    }

    async fn request_translation(
        &self,
        item: &WantedItem,
        path: &str,
        target_language: &str,
    ) -> Result<()> {
        let params = vec![
            ("action".to_string(), "translate".to_string()),
            ("language".to_string(), target_language.to_string()),
            ("path".to_string(), path.to_string()),
            ("type".to_string(), item.kind().singular().to_string()),
            ("id".to_string(), item.media_id().to_string()),
            ("forced".to_string(), "false".to_string()),
            ("hi".to_string(), "false".to_string()),
            ("original_format".to_string(), "true".to_string()),
        ];

        // Translation is rate-limited upstream, so this is the one call
        // that carries a retry budget.
        let result = self
            .request(Method::PATCH, "subtitles", self.translate_retries, &params)
            .await?;
        debug!("Translation result: {:?}", result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url() {
        assert_eq!(api_base_url("bazarr.local", 6767), "http://bazarr.local:6767/api");
    }

    #[test]
    fn test_transient_status_classification() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
    }
}
