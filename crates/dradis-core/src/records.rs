//! # Dradis Records
//!
//! Typed views over the JSON the Dradis Pro API returns. Only the keys the
//! bridge inspects are typed; everything else is carried through `extra`
//! so nothing the platform sends is lost on the way to the agent.

use crate::fields::FieldMap;
use crate::selector::ProjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page size Dradis uses for issue listings.
pub const ITEMS_PER_PAGE: u32 = 25;

/// Field shown next to each issue in summary listings.
pub const DEFAULT_RATING_FIELD: &str = "Rating";

// =============================================================================
// PROJECTS
// =============================================================================

/// Client (customer) a project belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectClient {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUser {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCustomField {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// `being_created` while Dradis is still applying the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCreation {
    pub state: String,
}

/// Project as returned by `GET /pro/api/projects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ProjectClient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_creation: Option<ProjectCreation>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub authors: Vec<ProjectUser>,
    #[serde(default)]
    pub owners: Vec<ProjectUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<ProjectCustomField>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /pro/api/projects`, wrapped as `{"project": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub team_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_template_properties_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_ids: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

// =============================================================================
// ISSUES
// =============================================================================

/// Issue (vulnerability) as returned by the issue endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Flat view handed to agents: `id` and `author` followed by every
    /// field.
    ///
    /// A field literally named `id` or `author` overrides the metadata
    /// entry.
    pub fn flattened(&self) -> FieldMap {
        let mut flat = FieldMap::new();
        flat.insert("id", self.id);
        flat.insert(
            "author",
            self.author.clone().map(Value::String).unwrap_or(Value::Null),
        );
        for (name, value) in &self.fields {
            flat.insert(name.clone(), value.clone());
        }
        flat
    }

    /// Summary entry keeping every field.
    pub fn summary(&self) -> IssueSummary {
        IssueSummary {
            id: self.id,
            title: self.title.clone().unwrap_or_default(),
            fields: self.fields.clone(),
        }
    }

    /// Summary entry keeping only `rating_field` (empty when missing).
    pub fn rated_summary(&self, rating_field: &str) -> IssueSummary {
        let mut fields = FieldMap::new();
        fields.insert(
            rating_field,
            self.fields
                .get(rating_field)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        );
        IssueSummary {
            id: self.id,
            title: self.title.clone().unwrap_or_default(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: u64,
    pub title: String,
    pub fields: FieldMap,
}

/// One page of an issue listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePage {
    pub page: u32,
    pub items_per_page: u32,
    pub vulnerabilities: Vec<IssueSummary>,
}

impl IssuePage {
    /// A missing or zero `page` is the first page.
    pub fn new(page: Option<u32>, vulnerabilities: Vec<IssueSummary>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            items_per_page: ITEMS_PER_PAGE,
            vulnerabilities,
        }
    }
}

// =============================================================================
// CONTENT BLOCKS
// =============================================================================

/// Content block (free-form report section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub block_group: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockSummary {
    pub id: u64,
    pub fields: FieldMap,
}

impl From<ContentBlock> for ContentBlockSummary {
    fn from(block: ContentBlock) -> Self {
        Self {
            id: block.id,
            fields: block.fields,
        }
    }
}

// =============================================================================
// DOCUMENT PROPERTIES
// =============================================================================

/// Whether a document property listing holds a value for `name`.
///
/// Dradis lists properties as objects; an entry whose value is `null` does
/// not count, the property has to be created rather than updated.
pub fn has_document_property(properties: &[Value], name: &str) -> bool {
    properties
        .iter()
        .any(|entry| entry.get(name).is_some_and(|value| !value.is_null()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue() -> Issue {
        serde_json::from_value(json!({
            "id": 12,
            "author": "rachel@dradis.local",
            "title": "Stored XSS",
            "fields": {"Title": "Stored XSS", "Rating": "High", "Description": "..."},
            "text": "#[Title]#\r\nStored XSS\r\n\r\n",
            "created_at": "2024-01-02T10:00:00Z",
            "updated_at": "2024-01-03T10:00:00Z",
            "state": "published"
        }))
        .unwrap()
    }

    #[test]
    fn project_keeps_unknown_keys() {
        let project: ProjectDetails = serde_json::from_value(json!({
            "id": 4,
            "name": "Acme external",
            "client": {"id": 1, "name": "Acme"},
            "authors": [{"email": "a@acme.test"}],
            "owners": [],
            "created_at": "2024-01-01",
            "updated_at": "2024-01-01",
            "team": {"id": 2, "name": "Red"}
        }))
        .unwrap();

        assert_eq!(project.id, 4);
        assert_eq!(project.client.as_ref().map(|c| c.name.as_str()), Some("Acme"));
        let back = serde_json::to_value(&project).unwrap();
        assert_eq!(back["team"]["name"], "Red");
    }

    #[test]
    fn flattened_puts_identity_before_fields() {
        let names: Vec<String> = issue().flattened().names().cloned().collect();
        assert_eq!(names, ["id", "author", "Title", "Rating", "Description"]);
    }

    #[test]
    fn rated_summary_keeps_only_rating() {
        let summary = issue().rated_summary("Rating");
        assert_eq!(summary.title, "Stored XSS");
        assert_eq!(summary.fields.len(), 1);
        assert_eq!(summary.fields.text("Rating").as_deref(), Some("High"));
    }

    #[test]
    fn rated_summary_defaults_missing_rating_to_empty() {
        let summary = issue().rated_summary("Severity");
        assert_eq!(summary.fields.get("Severity"), Some(&json!("")));
    }

    #[test]
    fn issue_page_defaults_to_first_page() {
        let page = IssuePage::new(None, vec![issue().summary()]);
        assert_eq!(page.page, 1);
        assert_eq!(page.items_per_page, ITEMS_PER_PAGE);
        assert_eq!(page.vulnerabilities[0].fields.len(), 3);
    }

    #[test]
    fn issue_page_zero_is_first_page() {
        assert_eq!(IssuePage::new(Some(0), Vec::new()).page, 1);
        assert_eq!(IssuePage::new(Some(4), Vec::new()).page, 4);
    }

    #[test]
    fn null_document_property_does_not_exist() {
        let properties = vec![json!({"owner": null}), json!({"dradis.client": "Acme"})];
        assert!(!has_document_property(&properties, "owner"));
        assert!(has_document_property(&properties, "dradis.client"));
        assert!(!has_document_property(&properties, "dradis.version"));
    }
}
