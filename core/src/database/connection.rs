use async_trait::async_trait;

use crate::database::postgres::PostgresError;

#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("{0}")]
    Postgres(#[from] PostgresError),

    #[error("{0}")]
    Backend(String),
}

/// The caller's open connection (normally inside its transaction).
///
/// Staging statements are plain SQL text; an implementation runs each one
/// and reports the number of affected rows.
#[async_trait]
pub trait StagingConnection: Send {
    async fn execute(&mut self, sql: &str) -> Result<u64, ConnectionError>;
}

