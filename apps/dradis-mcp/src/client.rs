//! # Dradis HTTP Client
//!
//! Wrapper around the Dradis Pro REST API for use by the MCP server.
//!
//! Every call is one round trip with a fixed timeout. Nothing is retried:
//! transport failures and non-2xx answers are returned to the caller as
//! they happen.

use crate::config::Config;
use dradis_core::{
    ContentBlock, DradisError, FieldMap, Issue, NewProject, ProjectDetails, ProjectId,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header naming the project a request is scoped to.
pub const PROJECT_HEADER: &str = "Dradis-Project-Id";

/// HTTP client that wraps calls to the Dradis Pro REST API.
#[derive(Clone)]
pub struct DradisClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl DradisClient {
    /// Create a client for the configured Dradis instance.
    pub fn new(config: &Config) -> Result<Self, DradisError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(|e| DradisError::Transport {
                url: config.url.clone(),
                message: format!("cannot build HTTP client: {e}"),
            })?;
        if config.insecure_tls {
            tracing::warn!("TLS certificate verification is disabled");
        }
        Ok(Self {
            http,
            base_url: config.url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL under `/pro/api/{collection}/` with `name` escaped as a single
    /// path segment, so `#`, `?` and `/` stay part of the name.
    fn segment_url(&self, collection: &str, name: &str) -> Result<String, DradisError> {
        let invalid = |message: String| DradisError::Transport {
            url: self.base_url.clone(),
            message,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["pro", "api", collection, name]);
        Ok(url.into())
    }

    /// Build a request with token auth and, when scoped, the project header.
    fn request(
        &self,
        method: reqwest::Method,
        url: String,
        project: Option<ProjectId>,
    ) -> (String, reqwest::RequestBuilder) {
        tracing::debug!(%method, %url, project = ?project, "dradis request");
        let mut req = self
            .http
            .request(method, &url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token token={}", self.api_token),
            )
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(id) = project {
            req = req.header(PROJECT_HEADER, id.to_string());
        }
        (url, req)
    }

    /// Send a request, check the status and decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        url: String,
        req: reqwest::RequestBuilder,
    ) -> Result<T, DradisError> {
        let resp = req.send().await.map_err(|e| DradisError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| DradisError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %url, "dradis request failed");
            let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            return Err(DradisError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                url,
                body,
            });
        }

        serde_json::from_str(&text).map_err(|e| DradisError::InvalidResponse {
            url,
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        project: Option<ProjectId>,
    ) -> Result<T, DradisError> {
        let (url, req) = self.request(reqwest::Method::GET, self.url(path), project);
        self.execute(url, req).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: String,
        project: Option<ProjectId>,
        body: &Value,
    ) -> Result<T, DradisError> {
        let (url, req) = self.request(method, url, project);
        self.execute(url, req.json(body)).await
    }

    // =========================================================================
    // PROJECTS
    // =========================================================================

    /// GET /pro/api/projects/{id}
    pub async fn project(&self, id: ProjectId) -> Result<ProjectDetails, DradisError> {
        self.get(&format!("/pro/api/projects/{id}"), None).await
    }

    /// POST /pro/api/projects
    pub async fn create_project(&self, project: &NewProject) -> Result<ProjectDetails, DradisError> {
        let body = json!({ "project": project });
        self.send_json(reqwest::Method::POST, self.url("/pro/api/projects"), None, &body)
            .await
    }

    // =========================================================================
    // ISSUES
    // =========================================================================

    /// GET /pro/api/issues[?page=N]
    pub async fn issues(
        &self,
        project: ProjectId,
        page: Option<u32>,
    ) -> Result<Vec<Issue>, DradisError> {
        let path = match page.filter(|p| *p > 0) {
            Some(page) => format!("/pro/api/issues?page={page}"),
            None => "/pro/api/issues".to_string(),
        };
        self.get(&path, Some(project)).await
    }

    /// GET /pro/api/issues/{id}
    pub async fn issue(&self, project: ProjectId, id: u64) -> Result<Issue, DradisError> {
        self.get(&format!("/pro/api/issues/{id}"), Some(project))
            .await
    }

    /// POST /pro/api/issues with the encoded field block.
    pub async fn create_issue(
        &self,
        project: ProjectId,
        fields: &FieldMap,
    ) -> Result<Issue, DradisError> {
        let body = json!({ "issue": { "text": fields.encode() } });
        self.send_json(
            reqwest::Method::POST,
            self.url("/pro/api/issues"),
            Some(project),
            &body,
        )
            .await
    }

    /// PUT /pro/api/issues/{id} replacing the whole field block.
    pub async fn update_issue(
        &self,
        project: ProjectId,
        id: u64,
        fields: &FieldMap,
    ) -> Result<Issue, DradisError> {
        let body = json!({ "issue": { "text": fields.encode() } });
        self.send_json(
            reqwest::Method::PUT,
            self.url(&format!("/pro/api/issues/{id}")),
            Some(project),
            &body,
        )
        .await
    }

    // =========================================================================
    // CONTENT BLOCKS
    // =========================================================================

    /// GET /pro/api/content_blocks
    pub async fn content_blocks(&self, project: ProjectId) -> Result<Vec<ContentBlock>, DradisError> {
        self.get("/pro/api/content_blocks", Some(project)).await
    }

    /// GET /pro/api/content_blocks/{id}
    pub async fn content_block(
        &self,
        project: ProjectId,
        id: u64,
    ) -> Result<ContentBlock, DradisError> {
        self.get(&format!("/pro/api/content_blocks/{id}"), Some(project))
            .await
    }

    /// PUT /pro/api/content_blocks/{id} replacing the whole field block.
    pub async fn update_content_block(
        &self,
        project: ProjectId,
        id: u64,
        block_group: &str,
        fields: &FieldMap,
    ) -> Result<ContentBlock, DradisError> {
        let body = json!({
            "content_block": {
                "block_group": block_group,
                "content": fields.encode(),
            }
        });
        self.send_json(
            reqwest::Method::PUT,
            self.url(&format!("/pro/api/content_blocks/{id}")),
            Some(project),
            &body,
        )
        .await
    }

    // =========================================================================
    // DOCUMENT PROPERTIES
    // =========================================================================

    /// GET /pro/api/document_properties
    pub async fn document_properties(&self, project: ProjectId) -> Result<Vec<Value>, DradisError> {
        self.get("/pro/api/document_properties", Some(project))
            .await
    }

    /// POST /pro/api/document_properties
    pub async fn create_document_property(
        &self,
        project: ProjectId,
        name: &str,
        value: &str,
    ) -> Result<Value, DradisError> {
        let mut properties = Map::new();
        properties.insert(name.to_string(), Value::from(value));
        let body = json!({ "document_properties": properties });
        self.send_json(
            reqwest::Method::POST,
            self.url("/pro/api/document_properties"),
            Some(project),
            &body,
        )
        .await
    }

    /// PUT /pro/api/document_properties/{name}
    pub async fn update_document_property(
        &self,
        project: ProjectId,
        name: &str,
        value: &str,
    ) -> Result<Value, DradisError> {
        let body = json!({ "document_property": { "value": value } });
        self.send_json(
            reqwest::Method::PUT,
            self.segment_url("document_properties", name)?,
            Some(project),
            &body,
        )
        .await
    }
}
