//! # Configuration
//!
//! Settings are read once at startup from the environment (after loading an
//! optional `.env` file) and validated eagerly. Every problem is reported
//! in one error so a misconfigured deployment is fixed in one pass.
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `DRADIS_URL` | yes | Dradis Pro base URL |
//! | `DRADIS_API_TOKEN` | yes | API token |
//! | `DRADIS_DEFAULT_TEAM_ID` | no | team used by `create_project` |
//! | `DRADIS_DEFAULT_TEMPLATE_ID` | no | report template properties id |
//! | `DRADIS_DEFAULT_TEMPLATE` | no | project template name |
//! | `DRADIS_VULNERABILITY_PARAMETERS` | no | comma-separated issue fields |
//! | `DRADIS_RATING_FIELD` | no | field shown in issue summaries |
//! | `DRADIS_INSECURE_TLS` | no | accept self-signed certificates |

use dradis_core::{DEFAULT_RATING_FIELD, DradisError, FieldAllowList};
use std::fmt;
use std::path::PathBuf;

pub const ENV_URL: &str = "DRADIS_URL";
pub const ENV_API_TOKEN: &str = "DRADIS_API_TOKEN";
pub const ENV_DEFAULT_TEAM_ID: &str = "DRADIS_DEFAULT_TEAM_ID";
pub const ENV_DEFAULT_TEMPLATE_ID: &str = "DRADIS_DEFAULT_TEMPLATE_ID";
pub const ENV_DEFAULT_TEMPLATE: &str = "DRADIS_DEFAULT_TEMPLATE";
pub const ENV_VULNERABILITY_PARAMETERS: &str = "DRADIS_VULNERABILITY_PARAMETERS";
pub const ENV_RATING_FIELD: &str = "DRADIS_RATING_FIELD";
pub const ENV_INSECURE_TLS: &str = "DRADIS_INSECURE_TLS";

/// Help text printed when startup configuration is rejected.
pub const USAGE: &str = "\
Required environment variables:
  DRADIS_URL                       Your Dradis Pro instance URL
  DRADIS_API_TOKEN                 Your Dradis API token

Optional variables:
  DRADIS_DEFAULT_TEAM_ID           Default team ID for project creation
  DRADIS_DEFAULT_TEMPLATE_ID       Default template ID for project creation
  DRADIS_DEFAULT_TEMPLATE          Default template name
  DRADIS_VULNERABILITY_PARAMETERS  Comma-separated vulnerability parameters
  DRADIS_RATING_FIELD              Field listed next to each vulnerability (default: Rating)
  DRADIS_INSECURE_TLS              Accept self-signed certificates (true/false)

Create a .env file with these variables or set them in your environment.";

/// Validated bridge configuration.
#[derive(Clone)]
pub struct Config {
    /// Base URL without trailing slash.
    pub url: String,
    pub api_token: String,
    pub default_team_id: Option<u64>,
    pub default_template_id: Option<u64>,
    pub default_template: Option<String>,
    /// Issue fields accepted by the record tools.
    pub fields: FieldAllowList,
    pub rating_field: String,
    pub insecure_tls: bool,
}

// The token stays out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("api_token", &"<redacted>")
            .field("default_team_id", &self.default_team_id)
            .field("default_template_id", &self.default_template_id)
            .field("default_template", &self.default_template)
            .field("fields", &self.fields.names())
            .field("rating_field", &self.rating_field)
            .field("insecure_tls", &self.insecure_tls)
            .finish()
    }
}

impl Config {
    /// Read the process environment. Call [`load_dotenv`] first so `.env`
    /// values are visible.
    pub fn from_env() -> Result<Self, DradisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DradisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let mut problems = Vec::new();

        let url = match get(ENV_URL) {
            Some(raw) => match normalize_url(&raw) {
                Ok(url) => Some(url),
                Err(reason) => {
                    problems.push(format!("{ENV_URL} {reason}"));
                    None
                }
            },
            None => {
                missing.push(ENV_URL);
                None
            }
        };

        let api_token = get(ENV_API_TOKEN);
        if api_token.is_none() {
            missing.push(ENV_API_TOKEN);
        }

        let default_team_id = parse_id(ENV_DEFAULT_TEAM_ID, get(ENV_DEFAULT_TEAM_ID), &mut problems);
        let default_template_id =
            parse_id(ENV_DEFAULT_TEMPLATE_ID, get(ENV_DEFAULT_TEMPLATE_ID), &mut problems);

        let insecure_tls = match get(ENV_INSECURE_TLS) {
            None => false,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                problems.push(format!("{ENV_INSECURE_TLS} must be true or false, got {raw:?}"));
                false
            }),
        };

        if !missing.is_empty() {
            problems.insert(
                0,
                format!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                ),
            );
        }

        match (url, api_token) {
            (Some(url), Some(api_token)) if problems.is_empty() => Ok(Self {
                url,
                api_token,
                default_team_id,
                default_template_id,
                default_template: get(ENV_DEFAULT_TEMPLATE),
                fields: get(ENV_VULNERABILITY_PARAMETERS)
                    .map(|raw| FieldAllowList::parse(&raw))
                    .unwrap_or_default(),
                rating_field: get(ENV_RATING_FIELD)
                    .unwrap_or_else(|| DEFAULT_RATING_FIELD.to_string()),
                insecure_tls,
            }),
            _ => Err(DradisError::Configuration { problems }),
        }
    }
}

/// Load `.env` from the working directory into the process environment.
///
/// Variables already set are left alone. Must run before logging is set up,
/// since `RUST_LOG` and `DRADIS_LOG_FORMAT` may come from the file.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Require an http(s) URL and strip trailing slashes.
fn normalize_url(raw: &str) -> Result<String, String> {
    let parsed =
        reqwest::Url::parse(raw).map_err(|e| format!("is not a valid URL ({e}): {raw:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("must use http or https, got {raw:?}"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_id(key: &str, raw: Option<String>, problems: &mut Vec<String>) -> Option<u64> {
    let raw = raw?;
    match raw.parse::<u64>() {
        Ok(id) => Some(id),
        Err(_) => {
            problems.push(format!("{key} must be a positive integer, got {raw:?}"));
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, DradisError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    fn problems(err: DradisError) -> Vec<String> {
        match err {
            DradisError::Configuration { problems } => problems,
            other => panic!("expected configuration error, got {other}"),
        }
    }

    #[test]
    fn minimal_configuration() {
        let config = load(&[
            (ENV_URL, "https://dradis.example.com/"),
            (ENV_API_TOKEN, "secret"),
        ])
        .unwrap();

        assert_eq!(config.url, "https://dradis.example.com");
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.default_team_id, None);
        assert_eq!(config.fields.names(), ["Title", "Description"]);
        assert_eq!(config.rating_field, "Rating");
        assert!(!config.insecure_tls);
    }

    #[test]
    fn all_missing_variables_reported_together() {
        let problems = problems(load(&[]).unwrap_err());
        assert_eq!(
            problems,
            ["Missing required environment variables: DRADIS_URL, DRADIS_API_TOKEN"]
        );
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let problems = problems(
            load(&[(ENV_URL, "https://dradis.local"), (ENV_API_TOKEN, "   ")]).unwrap_err(),
        );
        assert_eq!(problems, ["Missing required environment variables: DRADIS_API_TOKEN"]);
    }

    #[test]
    fn invalid_values_reported_with_missing_ones() {
        let problems = problems(
            load(&[
                (ENV_URL, "ftp://dradis.local"),
                (ENV_DEFAULT_TEAM_ID, "red-team"),
                (ENV_INSECURE_TLS, "maybe"),
            ])
            .unwrap_err(),
        );
        assert_eq!(problems.len(), 4);
        assert!(problems[0].contains("DRADIS_API_TOKEN"));
        assert!(problems.iter().any(|p| p.starts_with("DRADIS_URL must use http")));
        assert!(problems.iter().any(|p| p.starts_with("DRADIS_DEFAULT_TEAM_ID")));
        assert!(problems.iter().any(|p| p.starts_with("DRADIS_INSECURE_TLS")));
    }

    #[test]
    fn optional_settings_are_parsed() {
        let config = load(&[
            (ENV_URL, "http://10.0.0.5:3000//"),
            (ENV_API_TOKEN, "t0k3n"),
            (ENV_DEFAULT_TEAM_ID, "3"),
            (ENV_DEFAULT_TEMPLATE_ID, " 8 "),
            (ENV_DEFAULT_TEMPLATE, "Web application"),
            (ENV_VULNERABILITY_PARAMETERS, "Title, Rating ,CVE,,"),
            (ENV_RATING_FIELD, "Severity"),
            (ENV_INSECURE_TLS, "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.url, "http://10.0.0.5:3000");
        assert_eq!(config.default_team_id, Some(3));
        assert_eq!(config.default_template_id, Some(8));
        assert_eq!(config.default_template.as_deref(), Some("Web application"));
        assert_eq!(config.fields.names(), ["Title", "Rating", "CVE"]);
        assert_eq!(config.rating_field, "Severity");
        assert!(config.insecure_tls);
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = load(&[(ENV_URL, "https://dradis.local"), (ENV_API_TOKEN, "hunter2")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
