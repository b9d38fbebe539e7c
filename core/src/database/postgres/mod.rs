mod client;

pub use client::{
    connection_string, PostgresBulkOperationError, PostgresClient, PostgresConnectionError,
    PostgresError, PostgresTransaction,
};
