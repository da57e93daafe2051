//! # Project Selector
//!
//! Holds the active project id for a session. Every project-scoped
//! operation asks the selector for its id and fails closed when none has
//! been selected.
//!
//! The selector does not talk to Dradis. Callers verify that a project
//! exists first and only then [`commit`](ProjectSelector::commit) it.

use crate::DradisError;

/// Dradis project identifier.
pub type ProjectId = u64;

/// The session's active project, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectSelector {
    current: Option<ProjectId>,
}

impl ProjectSelector {
    /// Create a selector with no active project.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the active project, returning the one it replaces.
    pub fn commit(&mut self, id: ProjectId) -> Option<ProjectId> {
        self.current.replace(id)
    }

    pub fn current(&self) -> Option<ProjectId> {
        self.current
    }

    /// The active project, or [`DradisError::NoActiveProject`].
    pub fn require(&self) -> Result<ProjectId, DradisError> {
        self.current.ok_or(DradisError::NoActiveProject)
    }
}
