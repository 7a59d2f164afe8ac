//! Project and server sources backed by the JSON HTTP client

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::MonitorError;
use crate::http::client::{Credentials, HttpClient};
use crate::monitor::{ProjectCommand, ProjectSource, ServerSource};
use crate::status::{ProjectStatus, ServerSnapshot, StatusItem};

#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<&'a str>,
}

/// Connection to one server, shared by its project sources
pub struct ServerConnection {
    client: HttpClient,
    credentials: Option<Credentials>,
}

impl ServerConnection {
    pub fn new(client: HttpClient, credentials: Option<Credentials>) -> Self {
        Self { client, credentials }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Log in when credentials are configured. Anonymous servers always succeed.
    pub async fn login(&self) -> Result<bool, MonitorError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Ok(true);
        };

        match self.client.login(credentials).await {
            Ok(()) => {
                info!("Logged in to {} as {}", self.client.base_url(), credentials.user_name);
                Ok(true)
            }
            Err(e) if e.is_session_invalid() => {
                warn!("Login to {} rejected: {}", self.client.base_url(), e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self) -> Result<(), MonitorError> {
        self.client.logout().await
    }
}

pub struct HttpProjectSource {
    connection: Arc<ServerConnection>,
    project_name: String,
}

impl HttpProjectSource {
    pub fn new(connection: Arc<ServerConnection>, project_name: impl Into<String>) -> Self {
        Self {
            connection,
            project_name: project_name.into(),
        }
    }
}

#[async_trait]
impl ProjectSource for HttpProjectSource {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    async fn fetch_project_status(&self) -> Result<ProjectStatus, MonitorError> {
        self.connection
            .client()
            .get(&["projects", self.project_name.as_str()])
            .await
    }

    async fn execute(&self, command: ProjectCommand) -> Result<(), MonitorError> {
        let body = CommandRequest {
            command: command.name(),
            user_name: match &command {
                ProjectCommand::FixBuild { user_name } => Some(user_name.as_str()),
                _ => None,
            },
        };

        self.connection
            .client()
            .post(&["projects", self.project_name.as_str(), "commands"], &body)
            .await
            .map_err(|e| match e {
                MonitorError::SessionInvalid(_) => e,
                other => MonitorError::CommandError(format!(
                    "{} for '{}' failed: {}",
                    command, self.project_name, other
                )),
            })
    }

    async fn refresh_session(&self) -> Result<bool, MonitorError> {
        self.connection.logout().await?;
        self.connection.login().await
    }

    async fn retrieve_snapshot(&self) -> Result<StatusItem, MonitorError> {
        self.connection
            .client()
            .get(&["projects", self.project_name.as_str(), "snapshot"])
            .await
    }
}

pub struct HttpServerSource {
    connection: Arc<ServerConnection>,
    display_name: String,
}

impl HttpServerSource {
    pub fn new(connection: Arc<ServerConnection>, display_name: impl Into<String>) -> Self {
        Self {
            connection,
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
impl ServerSource for HttpServerSource {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn fetch_server_snapshot(&self) -> Result<ServerSnapshot, MonitorError> {
        self.connection.client().get(&["server", "snapshot"]).await
    }

    async fn cancel_pending_request(&self, project_name: &str) -> Result<(), MonitorError> {
        self.connection
            .client()
            .post(&["queues", "requests", project_name, "cancel"], &serde_json::json!({}))
            .await
    }

    async fn login(&self) -> Result<bool, MonitorError> {
        self.connection.login().await
    }

    async fn logout(&self) -> Result<(), MonitorError> {
        self.connection.logout().await
    }
}
