use crate::{database::ConnectionError, strategy::BulkIdState};

#[derive(thiserror::Error, Debug)]
pub enum BulkIdError {
    #[error("Identifier shape can not be staged: {reason}")]
    UnsupportedShape { reason: String },

    #[error("No bulk id strategy is compatible with backend {backend}: {reason}")]
    NoCompatibleStrategy { backend: String, reason: String },

    #[error("Invalid bulk operation plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid session token: {0}")]
    InvalidSessionToken(String),

    #[error("Could not create staging table with `{statement}`: {source}")]
    StagingCreation {
        statement: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Could not populate staging table with `{statement}`: {source}")]
    Population {
        statement: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Bulk statement on table {table} failed (already applied: [{}]) `{statement}`: {source}", .applied_tables.join(", "))]
    Apply {
        table: String,
        statement: String,
        applied_tables: Vec<String>,
        #[source]
        source: ConnectionError,
    },

    #[error("Could not clean up staging table with `{statement}`: {source}")]
    Cleanup {
        statement: String,
        #[source]
        source: ConnectionError,
    },
}

impl BulkIdError {
    pub(crate) fn unsupported_shape(reason: impl Into<String>) -> Self {
        BulkIdError::UnsupportedShape { reason: reason.into() }
    }

    /// State the invocation was in when the error was raised.
    pub fn stage(&self) -> BulkIdState {
        match self {
            BulkIdError::UnsupportedShape { .. }
            | BulkIdError::NoCompatibleStrategy { .. }
            | BulkIdError::InvalidPlan(_)
            | BulkIdError::InvalidSessionToken(_) => BulkIdState::Idle,
            BulkIdError::StagingCreation { .. } => BulkIdState::Ensuring,
            BulkIdError::Population { .. } => BulkIdState::Populating,
            BulkIdError::Apply { .. } => BulkIdState::Applying,
            BulkIdError::Cleanup { .. } => BulkIdState::CleaningUp,
        }
    }

    /// Backend statement that failed, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            BulkIdError::StagingCreation { statement, .. }
            | BulkIdError::Population { statement, .. }
            | BulkIdError::Apply { statement, .. }
            | BulkIdError::Cleanup { statement, .. } => Some(statement),
            _ => None,
        }
    }
}
