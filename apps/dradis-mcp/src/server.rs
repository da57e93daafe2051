//! # Dradis MCP Server
//!
//! Implements `ServerHandler` with 12 MCP tools that proxy to the Dradis
//! Pro API through a [`DradisSession`].

use crate::session::{DradisSession, ProjectRequest};
use dradis_core::{DradisError, FieldMap};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Appended to the properties listing so the agent reproduces it verbatim.
const PROPERTIES_HINT: &str = "List the following properties with <name>: <value>. \
                               Don't change any details of the names and values: \n";

/// Prefixed to the content block listing.
const CONTENT_BLOCKS_HINT: &str = "Output the content blocks in a list, with the ID followed \
                                   by the fields (even empty fields with no values): ";

// =============================================================================
// MCP SERVER
// =============================================================================

/// MCP server that bridges to a Dradis Pro instance.
#[derive(Clone)]
pub struct DradisMcp {
    session: Arc<DradisSession>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// =============================================================================
// TOOL PARAMETER STRUCTS
// =============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetProjectParams {
    /// The ID of the project to set as current.
    #[schemars(description = "The ID of the project to set as current")]
    pub project_id: u64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateProjectParams {
    #[schemars(description = "Name of the project")]
    pub name: String,
    #[schemars(description = "Team ID (optional if DRADIS_DEFAULT_TEAM_ID is set)")]
    pub team_id: Option<u64>,
    #[schemars(
        description = "Report template properties ID (optional if DRADIS_DEFAULT_TEMPLATE_ID is set)"
    )]
    pub report_template_properties_id: Option<u64>,
    #[schemars(description = "IDs of the users to add as authors")]
    pub author_ids: Option<Vec<u64>>,
    #[schemars(description = "Project template name (optional if DRADIS_DEFAULT_TEMPLATE is set)")]
    pub template: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PageParams {
    /// Page number for pagination (25 items per page).
    #[schemars(description = "Page number for pagination (optional, 25 items per page)")]
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateVulnerabilityParams {
    /// Field name to value, restricted to the configured vulnerability fields.
    #[schemars(
        description = "Vulnerability fields as an object of field name to text value. \
                       Only the configured fields are accepted; null values are ignored."
    )]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct VulnerabilityParams {
    #[schemars(description = "ID of the vulnerability to retrieve")]
    pub vulnerability_id: u64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateVulnerabilityParams {
    #[schemars(description = "ID of the vulnerability to update")]
    pub issue_id: u64,
    /// Fields to change. Blank or null values leave the current value untouched.
    #[schemars(
        description = "Fields to change as an object of field name to text value. \
                       Omitted, blank or null fields keep their current value."
    )]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateContentBlockParams {
    #[schemars(description = "ID of the content block to update")]
    pub block_id: u64,
    #[schemars(description = "Block group name")]
    pub block_group: String,
    /// Field name to new value; at least one entry.
    #[schemars(description = "Object of field names and values to update (at least one)")]
    pub content: Map<String, Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpsertPropertyParams {
    #[schemars(description = "Name of the document property")]
    pub property_name: String,
    #[schemars(description = "Value to set")]
    pub value: String,
}

// =============================================================================
// TOOL IMPLEMENTATIONS
// =============================================================================

#[tool_router]
impl DradisMcp {
    pub fn new(session: Arc<DradisSession>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Set the current Dradis project. The project must exist.")]
    async fn set_project(
        &self,
        params: Parameters<SetProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let project_id = params.0.project_id;
        self.session
            .set_project(project_id)
            .await
            .map_err(to_mcp_error)?;
        json_result(&json!({ "message": format!("Project ID set to {project_id}") }))
    }

    #[tool(description = "Get details of the current Dradis project")]
    async fn get_project_details(&self) -> Result<CallToolResult, McpError> {
        let details = self.session.project_details().await.map_err(to_mcp_error)?;
        json_result(&details)
    }

    #[tool(
        description = "Create a new Dradis project and make it the current project. \
                       Omitted team and template values fall back to the server defaults."
    )]
    async fn create_project(
        &self,
        params: Parameters<CreateProjectParams>,
    ) -> Result<CallToolResult, McpError> {
        let CreateProjectParams {
            name,
            team_id,
            report_template_properties_id,
            author_ids,
            template,
        } = params.0;
        let project = self
            .session
            .create_project(ProjectRequest {
                name,
                team_id,
                report_template_properties_id,
                author_ids,
                template,
            })
            .await
            .map_err(to_mcp_error)?;
        json_result(&json!({
            "message": format!("Project created successfully with ID {}", project.id),
            "project": project,
        }))
    }

    #[tool(description = "Create a new vulnerability in the current project")]
    async fn create_vulnerability(
        &self,
        params: Parameters<CreateVulnerabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let issue = self
            .session
            .create_issue(&params.0.fields)
            .await
            .map_err(to_mcp_error)?;
        json_result(&json!({
            "message": "Vulnerability created successfully",
            "vulnerability": issue,
        }))
    }

    #[tool(description = "Get a page of vulnerabilities in the current project (id, title and rating)")]
    async fn get_vulnerabilities(
        &self,
        params: Parameters<PageParams>,
    ) -> Result<CallToolResult, McpError> {
        let page = self
            .session
            .issue_page(params.0.page)
            .await
            .map_err(to_mcp_error)?;
        let text = format!(
            "{}\n\n{}",
            format_response(&page)?,
            listing_hint(&self.session.config().rating_field)
        );
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Get a page of vulnerabilities in the current project with all their fields")]
    async fn get_all_vulnerability_details(
        &self,
        params: Parameters<PageParams>,
    ) -> Result<CallToolResult, McpError> {
        let page = self
            .session
            .issue_details_page(params.0.page)
            .await
            .map_err(to_mcp_error)?;
        let text = format!(
            "{}\n\n{}",
            format_response(&page)?,
            listing_hint(&self.session.config().rating_field)
        );
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Get a specific vulnerability from the current project")]
    async fn get_vulnerability(
        &self,
        params: Parameters<VulnerabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let issue = self
            .session
            .issue(params.0.vulnerability_id)
            .await
            .map_err(to_mcp_error)?;
        json_result(&issue)
    }

    #[tool(
        description = "Update fields of an existing vulnerability. Only the given non-empty \
                       fields change; all other fields keep their current value."
    )]
    async fn update_vulnerability(
        &self,
        params: Parameters<UpdateVulnerabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let UpdateVulnerabilityParams { issue_id, fields } = params.0;
        let issue = self
            .session
            .update_issue(issue_id, &fields)
            .await
            .map_err(to_mcp_error)?;
        json_result(&json!({
            "message": "Vulnerability updated successfully",
            "vulnerability": issue,
        }))
    }

    #[tool(description = "Get all content blocks in the current project")]
    async fn get_content_blocks(&self) -> Result<CallToolResult, McpError> {
        let blocks = self.session.content_blocks().await.map_err(to_mcp_error)?;
        let text = format!("{CONTENT_BLOCKS_HINT}{}", format_response(&blocks)?);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Update fields of a content block in the current project")]
    async fn update_content_block(
        &self,
        params: Parameters<UpdateContentBlockParams>,
    ) -> Result<CallToolResult, McpError> {
        let UpdateContentBlockParams {
            block_id,
            block_group,
            content,
        } = params.0;
        let block = self
            .session
            .update_content_block(block_id, &block_group, &FieldMap::from(content))
            .await
            .map_err(to_mcp_error)?;
        json_result(&block)
    }

    #[tool(description = "Get all document properties of the current project")]
    async fn get_document_properties(&self) -> Result<CallToolResult, McpError> {
        let properties = self
            .session
            .document_properties()
            .await
            .map_err(to_mcp_error)?;
        let text = format!("{PROPERTIES_HINT}{}", format_response(&properties)?);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Create or update a document property in the current project")]
    async fn upsert_document_property(
        &self,
        params: Parameters<UpsertPropertyParams>,
    ) -> Result<CallToolResult, McpError> {
        let UpsertPropertyParams {
            property_name,
            value,
        } = params.0;
        let (outcome, result) = self
            .session
            .upsert_document_property(&property_name, &value)
            .await
            .map_err(to_mcp_error)?;
        tracing::info!(property = %property_name, ?outcome, "document property written");
        json_result(&result)
    }
}

// =============================================================================
// SERVER HANDLER
// =============================================================================

#[tool_handler]
impl ServerHandler for DradisMcp {
    fn get_info(&self) -> ServerInfo {
        let config = self.session.config();
        ServerInfo {
            instructions: Some(format!(
                "Dradis Pro reporting server. Select a project with set_project or \
                 create_project before using the other tools. Vulnerability tools accept \
                 these fields: {}.",
                config.fields.names().join(", ")
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// =============================================================================
// RESPONSE FORMATTING
// =============================================================================

/// Pretty-printed JSON for agent consumption.
fn format_response<T: Serialize>(data: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(data).map_err(|e| McpError::internal_error(e.to_string(), None))
}

fn json_result<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        format_response(data)?,
    )]))
}

/// Formatting instruction appended to issue listings.
fn listing_hint(rating_field: &str) -> String {
    format!("Generate the results as a list of '<ID>: <{rating_field}> - <title>'")
}

/// Map bridge errors onto MCP error codes.
pub fn to_mcp_error(err: DradisError) -> McpError {
    let message = err.to_string();
    match err {
        DradisError::Validation(_) => McpError::invalid_params(message, None),
        DradisError::NoActiveProject => McpError::invalid_request(message, None),
        _ => McpError::internal_error(message, None),
    }
}

// =============================================================================
// TESTS
// =============================================================================
