use crate::{
    dialect::{ansi_sql_type, BackendCapabilities},
    helpers::quote_identifier_with,
    staging::{ColumnType, StagingTableKind},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

impl BackendCapabilities for MySqlBackend {
    fn name(&self) -> &str {
        "mysql"
    }

    fn supports_global_temporary_tables(&self) -> bool {
        false
    }

    fn supports_local_temporary_tables(&self) -> bool {
        true
    }

    fn max_identifier_length(&self) -> usize {
        64
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            // a table left behind by a failed drop must not be silently reused
            StagingTableKind::GlobalTemporary | StagingTableKind::LocalTemporary => {
                "create temporary table"
            }
            StagingTableKind::Persistent => "create table if not exists",
        }
    }

    fn drop_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary | StagingTableKind::LocalTemporary => {
                "drop temporary table"
            }
            StagingTableKind::Persistent => "drop table",
        }
    }

    fn sql_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Timestamp => "datetime(6)".to_string(),
            other => ansi_sql_type(other),
        }
    }

    // double quotes delimit strings unless ANSI_QUOTES is set
    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier_with(name, '`')
    }
}
