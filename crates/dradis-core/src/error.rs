//! # Error Types
//!
//! Every failure in the bridge is single-shot: nothing is retried or
//! recovered locally, errors surface to the tool caller as they are.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while serving a tool call.
#[derive(Debug, Error)]
pub enum DradisError {
    /// Startup configuration is incomplete or malformed.
    ///
    /// Lists every problem at once instead of stopping at the first.
    #[error("Invalid configuration: {}", .problems.join("; "))]
    Configuration { problems: Vec<String> },

    /// Dradis answered with a non-2xx status.
    #[error("HTTP {status} {reason} for {url}\nResponse: {}", render_body(.body))]
    Upstream {
        status: u16,
        reason: String,
        url: String,
        /// Parsed JSON when the body was JSON, the raw text otherwise.
        body: Value,
    },

    /// The request never produced an HTTP response (DNS, TLS, refused, timeout).
    #[error("Network error while accessing {url}: {message}")]
    Transport { url: String, message: String },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// A project-scoped operation was called before a project was selected.
    #[error("No project ID set. Use set_project or create_project first.")]
    NoActiveProject,

    /// Tool arguments are missing or malformed.
    #[error("{0}")]
    Validation(String),
}

impl DradisError {
    /// HTTP status of an upstream failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The record addressed by the request does not exist upstream.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn render_body(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upstream_message_embeds_status_url_and_body() {
        let err = DradisError::Upstream {
            status: 404,
            reason: "Not Found".into(),
            url: "https://dradis.local/pro/api/projects/42".into(),
            body: json!({"message": "Couldn't find Project"}),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 404 Not Found for https://dradis.local/pro/api/projects/42\n\
             Response: {\"message\":\"Couldn't find Project\"}"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn upstream_text_body_is_not_quoted() {
        let err = DradisError::Upstream {
            status: 502,
            reason: "Bad Gateway".into(),
            url: "https://dradis.local/pro/api/issues".into(),
            body: Value::String("<html>upstream down</html>".into()),
        };
        assert!(err.to_string().ends_with("Response: <html>upstream down</html>"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn configuration_lists_every_problem() {
        let err = DradisError::Configuration {
            problems: vec![
                "DRADIS_URL is not set".into(),
                "DRADIS_API_TOKEN is not set".into(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("DRADIS_URL"));
        assert!(text.contains("DRADIS_API_TOKEN"));
    }
}
