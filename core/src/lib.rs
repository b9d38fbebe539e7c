// public
pub mod config;
pub mod dialect;
pub mod staging;
pub mod strategy;

mod database;
pub use database::{
    postgres::{
        connection_string, PostgresBulkOperationError, PostgresClient, PostgresConnectionError,
        PostgresError, PostgresTransaction,
    },
    ConnectionError, DryRunConnection, StagingConnection,
};

mod helpers;
pub use helpers::{generate_random_id, quote_identifier, quote_literal};

mod logger;
pub use config::{read_config, BulkIdConfig, ReadConfigError};
pub use logger::{setup_info_logger, setup_logger};
pub use staging::SessionToken;
pub use strategy::{
    read_plan, BulkIdError, BulkIdStrategy, BulkOperationKind, BulkOperationOutcome,
    BulkOperationPlan, StrategyKind, StrategySelector,
};
// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tracing::level_filters::LevelFilter;
