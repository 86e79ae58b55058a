use serde::{Deserialize, Serialize};
use thiserror::Error;

mod api;
pub use api::*;

mod wire;
pub use wire::*;

mod http;
pub use http::*;

mod notice;
pub use notice::*;

mod engine;
pub use engine::*;

mod loader;
pub use loader::*;

#[cfg(test)]
mod testing;

use catalog::{CatalogError, CourseId};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no enrollment found for course {0}")]
    EnrollmentNotFound(CourseId),

    #[error("failed to load course content: {0}")]
    Load(#[source] ApiError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Identifier for one reconciliation attempt, carried through log lines so
/// a failed push can be traced end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub uuid::Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only authentication context, passed explicitly to whatever needs
/// the current user instead of living in ambient global state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub student_id: i64,
    pub auth_token: Option<String>,
}

impl SessionContext {
    pub fn new(student_id: i64) -> Self {
        Self {
            student_id,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}
