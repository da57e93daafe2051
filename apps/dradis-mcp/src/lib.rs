//! # Dradis MCP Bridge
//!
//! Exposes the Dradis Pro REST API as MCP tools.
//!
//! ```text
//! MCP client <--stdio--> DradisMcp --> DradisSession --> DradisClient <--HTTPS--> Dradis Pro
//!                                         |
//!                                   ProjectSelector
//! ```
//!
//! - `config`: environment configuration, validated once at startup
//! - `client`: one method per Dradis endpoint
//! - `session`: active project plus the tool operations
//! - `server`: MCP tool surface and response formatting

pub mod client;
pub mod config;
pub mod server;
pub mod session;

pub use client::DradisClient;
pub use config::Config;
pub use server::DradisMcp;
pub use session::{DradisSession, ProjectRequest, Upsert};
