//! Staging tables: identifier shapes, their backend-independent table
//! definitions and what happens to them after use.

mod cleanup;
mod columns;
mod descriptor;
mod registry;
mod schema;
mod session;

pub use cleanup::{CleanupPolicy, StagingLifetime};
pub use columns::{ColumnType, IdentifierColumn, IdentifierColumnSet, ParseColumnTypeError};
pub use descriptor::{StagingTableDescriptor, StagingTableKind};
pub use registry::StagingTableRegistry;
pub use schema::{StagingSchemaBuilder, DEFAULT_SESSION_COLUMN, DEFAULT_STAGING_TABLE_PREFIX};
pub use session::{SessionToken, SESSION_COLUMN_TYPE, SESSION_TOKEN_LENGTH};
