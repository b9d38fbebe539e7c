use crate::{
    dialect::{ansi_sql_type, BackendCapabilities},
    staging::{ColumnType, StagingTableKind},
};

/// PostgreSQL: session-local temporary tables, no global ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend;

impl BackendCapabilities for PostgresBackend {
    fn name(&self) -> &str {
        "postgres"
    }

    fn supports_global_temporary_tables(&self) -> bool {
        false
    }

    fn supports_local_temporary_tables(&self) -> bool {
        true
    }

    fn supports_create_as_select(&self) -> bool {
        true
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary | StagingTableKind::LocalTemporary => {
                "create temporary table"
            }
            // a failed create aborts the surrounding transaction, so the
            // shared table can not be checked after the fact
            StagingTableKind::Persistent => "create table if not exists",
        }
    }

    fn sql_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Uuid => "uuid".to_string(),
            other => ansi_sql_type(other),
        }
    }
}
