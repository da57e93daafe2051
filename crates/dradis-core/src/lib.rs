//! # dradis-core
//!
//! The record logic behind the Dradis MCP bridge - THE LOGIC.
//!
//! Dradis Pro keeps issue and content-block content as one `#[Field]#`
//! text block. This crate owns everything about that representation that
//! does not need the network:
//!
//! - `fields`: ordered field mappings and the block encoder
//! - `merge`: folding partial updates onto a fetched record
//! - `allow_list`: the per-deployment set of accepted issue fields
//! - `selector`: the session's active project
//! - `records`: typed views of the API's JSON
//! - `error`: the error taxonomy shared with the app layer
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Encoding and merging are total and never mutate their inputs

// =============================================================================
// MODULES
// =============================================================================

pub mod allow_list;
pub mod error;
pub mod fields;
pub mod merge;
pub mod records;
pub mod selector;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use allow_list::{DEFAULT_FIELDS, FieldAllowList};
pub use error::DradisError;
pub use fields::{FieldMap, field_text};
pub use merge::{carries_content, merge};
pub use records::{
    ContentBlock, ContentBlockSummary, DEFAULT_RATING_FIELD, ITEMS_PER_PAGE, Issue, IssuePage,
    IssueSummary, NewProject, ProjectClient, ProjectCreation, ProjectCustomField, ProjectDetails,
    ProjectUser, has_document_property,
};
pub use selector::{ProjectId, ProjectSelector};
