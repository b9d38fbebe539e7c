use std::{env, time::Duration};

use async_trait::async_trait;
use bb8::{Pool, RunError};
use bb8_postgres::PostgresConnectionManager;
use dotenv::dotenv;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::{task, time::timeout};
use tokio_postgres::{config::SslMode, Config, Error as PgError, Transaction as PgTransaction};
use tracing::{debug, error, info};

use crate::{
    database::{ConnectionError, StagingConnection},
    staging::SessionToken,
    strategy::{BulkIdError, BulkIdStrategy, BulkOperationOutcome, BulkOperationPlan},
};

pub fn connection_string() -> Result<String, env::VarError> {
    dotenv().ok();
    let connection = env::var("DATABASE_URL")?;
    Ok(connection)
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresConnectionError {
    #[error("The database connection string is wrong please check your environment: {0}")]
    DatabaseConnectionConfigWrong(#[from] env::VarError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] tokio_postgres::Error),

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Could not create tls connector")]
    CouldNotCreateTlsConnector,
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresError {
    #[error("PgError {0}")]
    PgError(#[from] PgError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] RunError<tokio_postgres::Error>),
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresBulkOperationError {
    #[error("{0}")]
    PostgresError(#[from] PostgresError),

    #[error("{0}")]
    BulkId(#[from] BulkIdError),
}

pub struct PostgresTransaction<'a> {
    pub transaction: PgTransaction<'a>,
}

impl<'a> PostgresTransaction<'a> {
    pub async fn commit(self) -> Result<(), PostgresError> {
        self.transaction.commit().await.map_err(PostgresError::PgError)
    }

    pub async fn rollback(self) -> Result<(), PostgresError> {
        self.transaction.rollback().await.map_err(PostgresError::PgError)
    }
}

#[async_trait]
impl StagingConnection for PostgresTransaction<'_> {
    async fn execute(&mut self, sql: &str) -> Result<u64, ConnectionError> {
        let count = self.transaction.execute(sql, &[]).await.map_err(PostgresError::PgError)?;
        Ok(count)
    }
}

pub struct PostgresClient {
    pool: Pool<PostgresConnectionManager<MakeTlsConnector>>,
}

impl PostgresClient {
    pub async fn new() -> Result<Self, PostgresConnectionError> {
        async fn _new(disable_ssl: bool) -> Result<PostgresClient, PostgresConnectionError> {
            let connection_str = connection_string()?;
            let mut config: Config = connection_str
                .parse()
                .map_err(|_| PostgresConnectionError::CouldNotParseConnectionString)?;

            if disable_ssl {
                config.ssl_mode(SslMode::Disable);
            }

            let connector = TlsConnector::builder()
                .build()
                .map_err(|_| PostgresConnectionError::CouldNotCreateTlsConnector)?;
            let tls_connector = MakeTlsConnector::new(connector);

            // Perform a direct connection test
            let (client, connection) =
                match timeout(Duration::from_millis(5000), config.connect(tls_connector.clone()))
                    .await
                {
                    Ok(Ok((client, connection))) => (client, connection),
                    Ok(Err(e)) => {
                        // retry without ssl if ssl has been attempted and failed
                        if !disable_ssl
                            && config.get_ssl_mode() != SslMode::Disable
                            && !connection_str.contains("sslmode=require")
                        {
                            return Box::pin(_new(true)).await;
                        }
                        error!("Error connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                    Err(e) => {
                        error!("Timeout connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                };

            let connection_handle = task::spawn(connection);

            if client.query_one("SELECT 1", &[]).await.is_err() {
                return Err(PostgresConnectionError::CanNotConnectToDatabase);
            }

            drop(client);
            match connection_handle.await {
                Ok(Ok(())) => (),
                Ok(Err(_)) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
                Err(_) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
            }

            let manager = PostgresConnectionManager::new(config, tls_connector);

            let pool = Pool::builder().build(manager).await?;

            Ok(PostgresClient { pool })
        }

        _new(false).await
    }

    /// Runs one bulk operation inside its own transaction. The transaction is
    /// committed when the strategy succeeds and rolled back otherwise, so the
    /// tables applied before a failing one are restored.
    pub async fn run_bulk_operation(
        &self,
        strategy: &BulkIdStrategy,
        plan: &BulkOperationPlan,
        session: &SessionToken,
    ) -> Result<BulkOperationOutcome, PostgresBulkOperationError> {
        let mut conn = self.pool.get().await.map_err(PostgresError::ConnectionPoolError)?;
        let transaction = conn.transaction().await.map_err(PostgresError::PgError)?;
        let mut transaction = PostgresTransaction { transaction };

        match strategy.execute(plan, &mut transaction, session).await {
            Ok(outcome) => {
                transaction.commit().await?;
                info!(
                    "Bulk {} committed, {} rows affected",
                    plan.operation, outcome.affected_rows
                );
                Ok(outcome)
            }
            Err(e) => {
                debug!("Rolling back bulk {} after failure: {}", plan.operation, e);
                if let Err(rollback_error) = transaction.rollback().await {
                    error!("Could not roll back bulk {}: {}", plan.operation, rollback_error);
                }
                Err(e.into())
            }
        }
    }
}
