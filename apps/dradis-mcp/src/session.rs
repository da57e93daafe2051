//! # Bridge Session
//!
//! The context every tool call runs against: configuration, the HTTP
//! client and the active project selector. One session serves one MCP
//! connection.
//!
//! ## Concurrency
//!
//! The selector sits behind an async `RwLock`. `set_project` holds the
//! write lock across its validation request, so selections are serialized
//! and project-scoped calls never observe an unvalidated id.
//!
//! Updates are fetch-merge-write and are not transactional: two updates of
//! the same record in flight at once can lose one of them. Dradis offers no
//! version check on these endpoints, so the hazard is left in place.

use crate::client::DradisClient;
use crate::config::Config;
use dradis_core::{
    ContentBlock, ContentBlockSummary, DradisError, FieldMap, Issue, IssuePage, NewProject,
    ProjectDetails, ProjectId, ProjectSelector, has_document_property, merge,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Arguments of `create_project` before configured defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct ProjectRequest {
    pub name: String,
    pub team_id: Option<u64>,
    pub report_template_properties_id: Option<u64>,
    pub author_ids: Option<Vec<u64>>,
    pub template: Option<String>,
}

/// Result of an upsert, telling which endpoint was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Shared state of one bridge session.
pub struct DradisSession {
    config: Config,
    client: DradisClient,
    selector: RwLock<ProjectSelector>,
}

impl DradisSession {
    /// Build the session and its HTTP client.
    pub fn new(config: Config) -> Result<Self, DradisError> {
        let client = DradisClient::new(&config)?;
        Ok(Self {
            config,
            client,
            selector: RwLock::new(ProjectSelector::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &DradisClient {
        &self.client
    }

    pub async fn active_project(&self) -> Option<ProjectId> {
        self.selector.read().await.current()
    }

    /// The active project; fails before any network call when unset.
    async fn require_project(&self) -> Result<ProjectId, DradisError> {
        self.selector.read().await.require()
    }

    // =========================================================================
    // PROJECTS
    // =========================================================================

    /// Select `id` after confirming it exists. On failure the previous
    /// selection is kept.
    pub async fn set_project(&self, id: ProjectId) -> Result<ProjectDetails, DradisError> {
        let mut selector = self.selector.write().await;
        let project = self.client.project(id).await?;
        let previous = selector.commit(id);
        tracing::info!(project = id, previous = ?previous, "active project selected");
        Ok(project)
    }

    /// Details of the active project.
    pub async fn project_details(&self) -> Result<ProjectDetails, DradisError> {
        let id = self.require_project().await?;
        self.client.project(id).await
    }

    /// Create a project, filling omitted values from the configuration, and
    /// make it the active project.
    pub async fn create_project(
        &self,
        request: ProjectRequest,
    ) -> Result<ProjectDetails, DradisError> {
        let new_project = self.resolve_project(request)?;
        let mut selector = self.selector.write().await;
        let project = self.client.create_project(&new_project).await?;
        selector.commit(project.id);
        tracing::info!(project = project.id, "project created and selected");
        Ok(project)
    }

    fn resolve_project(&self, request: ProjectRequest) -> Result<NewProject, DradisError> {
        if request.name.trim().is_empty() {
            return Err(DradisError::Validation("Project name must not be empty".into()));
        }
        let team_id = request
            .team_id
            .or(self.config.default_team_id)
            .ok_or_else(|| {
                DradisError::Validation(
                    "team_id is required and DRADIS_DEFAULT_TEAM_ID is not set".into(),
                )
            })?;
        Ok(NewProject {
            name: request.name,
            team_id,
            report_template_properties_id: request
                .report_template_properties_id
                .or(self.config.default_template_id),
            author_ids: request.author_ids,
            template: request
                .template
                .or_else(|| self.config.default_template.clone()),
        })
    }

    // =========================================================================
    // ISSUES
    // =========================================================================

    /// Create an issue from allow-listed field arguments.
    pub async fn create_issue(&self, args: &Map<String, Value>) -> Result<Issue, DradisError> {
        let project = self.require_project().await?;
        let fields = self.config.fields.accept(args)?;
        if fields.is_empty() {
            return Err(DradisError::Validation(format!(
                "At least one field is required. Allowed fields: {}",
                self.config.fields.names().join(", ")
            )));
        }
        self.client.create_issue(project, &fields).await
    }

    /// One page of issues reduced to id, title and the rating field.
    pub async fn issue_page(&self, page: Option<u32>) -> Result<IssuePage, DradisError> {
        let project = self.require_project().await?;
        let issues = self.client.issues(project, page).await?;
        let rating = self.config.rating_field.as_str();
        Ok(IssuePage::new(
            page,
            issues.iter().map(|issue| issue.rated_summary(rating)).collect(),
        ))
    }

    /// One page of issues with every field.
    pub async fn issue_details_page(&self, page: Option<u32>) -> Result<IssuePage, DradisError> {
        let project = self.require_project().await?;
        let issues = self.client.issues(project, page).await?;
        Ok(IssuePage::new(
            page,
            issues.iter().map(Issue::summary).collect(),
        ))
    }

    /// A single issue flattened to `{id, author, ...fields}`.
    pub async fn issue(&self, id: u64) -> Result<FieldMap, DradisError> {
        let project = self.require_project().await?;
        Ok(self.client.issue(project, id).await?.flattened())
    }

    /// Merge allow-listed field arguments onto the issue's current fields
    /// and write the result back.
    pub async fn update_issue(
        &self,
        id: u64,
        args: &Map<String, Value>,
    ) -> Result<Issue, DradisError> {
        let project = self.require_project().await?;
        let update = self.config.fields.accept(args)?;
        let snapshot = self.client.issue(project, id).await?;
        let merged = merge(&snapshot.fields, &update);
        tracing::debug!(issue = id, fields = merged.len(), "writing merged issue");
        self.client.update_issue(project, id, &merged).await
    }

    // =========================================================================
    // CONTENT BLOCKS
    // =========================================================================

    pub async fn content_blocks(&self) -> Result<Vec<ContentBlockSummary>, DradisError> {
        let project = self.require_project().await?;
        let blocks = self.client.content_blocks(project).await?;
        Ok(blocks.into_iter().map(ContentBlockSummary::from).collect())
    }

    /// Merge `content` onto the block's current fields and write it back
    /// under `block_group`.
    pub async fn update_content_block(
        &self,
        id: u64,
        block_group: &str,
        content: &FieldMap,
    ) -> Result<ContentBlock, DradisError> {
        let project = self.require_project().await?;
        if content.is_empty() {
            return Err(DradisError::Validation(
                "content must contain at least one field".into(),
            ));
        }
        let snapshot = self.client.content_block(project, id).await?;
        let merged = merge(&snapshot.fields, content);
        self.client
            .update_content_block(project, id, block_group, &merged)
            .await
    }

    // =========================================================================
    // DOCUMENT PROPERTIES
    // =========================================================================

    pub async fn document_properties(&self) -> Result<Vec<Value>, DradisError> {
        let project = self.require_project().await?;
        self.client.document_properties(project).await
    }

    /// Update `name` when it currently holds a value, create it otherwise.
    pub async fn upsert_document_property(
        &self,
        name: &str,
        value: &str,
    ) -> Result<(Upsert, Value), DradisError> {
        let project = self.require_project().await?;
        if name.trim().is_empty() {
            return Err(DradisError::Validation(
                "property_name must not be empty".into(),
            ));
        }
        let properties = self.client.document_properties(project).await?;
        if has_document_property(&properties, name) {
            let result = self
                .client
                .update_document_property(project, name, value)
                .await?;
            Ok((Upsert::Updated, result))
        } else {
            let result = self
                .client
                .create_document_property(project, name, value)
                .await?;
            Ok((Upsert::Created, result))
        }
    }
}
