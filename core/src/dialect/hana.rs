use crate::{
    dialect::{ansi_sql_type, BackendCapabilities},
    staging::{ColumnType, StagingTableKind},
};

fn hana_sql_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Numeric { precision, scale } => format!("decimal({},{})", precision, scale),
        ColumnType::Varchar(len) => format!("nvarchar({})", len),
        ColumnType::Char(len) => format!("nchar({})", len),
        ColumnType::Uuid => "nvarchar(36)".to_string(),
        other => ansi_sql_type(other),
    }
}

/// SAP HANA with column tables. Staging tables are global temporary column
/// tables emptied with `truncate table` between uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct HanaColumnStoreBackend;

impl BackendCapabilities for HanaColumnStoreBackend {
    fn name(&self) -> &str {
        "hana_column_store"
    }

    fn supports_global_temporary_tables(&self) -> bool {
        true
    }

    fn supports_local_temporary_tables(&self) -> bool {
        false
    }

    fn supports_row_value_in_subquery(&self) -> bool {
        false
    }

    fn max_identifier_length(&self) -> usize {
        127
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary => "create global temporary column table",
            StagingTableKind::LocalTemporary => "create local temporary column table",
            StagingTableKind::Persistent => "create column table",
        }
    }

    fn clear_table_command(&self) -> &str {
        "truncate table"
    }

    fn sql_type(&self, column_type: &ColumnType) -> String {
        hana_sql_type(column_type)
    }
}

/// SAP HANA with row tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct HanaRowStoreBackend;

impl BackendCapabilities for HanaRowStoreBackend {
    fn name(&self) -> &str {
        "hana_row_store"
    }

    fn supports_global_temporary_tables(&self) -> bool {
        true
    }

    fn supports_local_temporary_tables(&self) -> bool {
        false
    }

    fn supports_row_value_in_subquery(&self) -> bool {
        false
    }

    fn max_identifier_length(&self) -> usize {
        127
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary => "create global temporary row table",
            StagingTableKind::LocalTemporary => "create local temporary row table",
            StagingTableKind::Persistent => "create row table",
        }
    }

    fn clear_table_command(&self) -> &str {
        "truncate table"
    }

    fn sql_type(&self, column_type: &ColumnType) -> String {
        hana_sql_type(column_type)
    }
}
