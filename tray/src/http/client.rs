//! HTTP client implementation

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::MonitorError;

/// JSON client for one build server. Holds the session token once logged in.
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder().timeout(timeout).build()?;

        let parsed = Url::parse(base_url)
            .map_err(|e| MonitorError::ConfigError(format!("Invalid server URL '{}': {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(MonitorError::ConfigError(format!(
                "Server URL '{}' cannot hold request paths",
                base_url
            )));
        }
        let base_url = parsed;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_session(&self) -> bool {
        self.token.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Base URL extended with percent-encoded path segments
    pub fn url(&self, segments: &[&str]) -> Result<Url, MonitorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MonitorError::ConfigError(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().unwrap_or_else(|e| e.into_inner()).clone();
        match token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn check(method: &str, url: &Url, response: Response) -> Result<Response, MonitorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} {} failed: {} - {}", method, url, status, body);
        match status {
            StatusCode::UNAUTHORIZED => Err(MonitorError::SessionInvalid(format!("{}: {}", status, body))),
            StatusCode::NOT_FOUND => Err(MonitorError::ConnectionError(format!("{} not found", url))),
            _ => Err(MonitorError::ConnectionError(format!("{}: {}", status, body))),
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, MonitorError> {
        let url = self.url(segments)?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let response = Self::check("GET", &url, response).await?;

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request, ignoring any response body
    pub async fn post<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<(), MonitorError> {
        let url = self.url(segments)?;
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(url.clone()).json(body))
            .send()
            .await?;
        Self::check("POST", &url, response).await?;
        Ok(())
    }

    /// Log in and keep the session token
    pub async fn login(&self, credentials: &Credentials) -> Result<(), MonitorError> {
        let url = self.url(&["session", "login"])?;
        debug!("POST {} (login)", url);

        let response = self.client.post(url.clone()).json(credentials).send().await?;
        let response = Self::check("POST", &url, response).await?;

        let body: LoginResponse = response.json().await?;
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(body.token);
        Ok(())
    }

    /// Drop the session, telling the server when there is one
    pub async fn logout(&self) -> Result<(), MonitorError> {
        if !self.has_session() {
            return Ok(());
        }

        let result = self.post(&["session", "logout"], &serde_json::json!({})).await;
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        result
    }
}
