use crate::{dialect::BackendCapabilities, staging::StagingTableKind};

/// SQL-standard global temporary tables, as found on Oracle, DB2 and H2.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiBackend;

impl BackendCapabilities for AnsiBackend {
    fn name(&self) -> &str {
        "ansi"
    }

    fn supports_global_temporary_tables(&self) -> bool {
        true
    }

    fn supports_local_temporary_tables(&self) -> bool {
        false
    }

    fn max_identifier_length(&self) -> usize {
        30
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary => "create global temporary table",
            StagingTableKind::LocalTemporary => "create local temporary table",
            StagingTableKind::Persistent => "create table",
        }
    }

    fn create_table_postfix(&self, kind: StagingTableKind) -> Option<&str> {
        match kind {
            StagingTableKind::GlobalTemporary => Some("on commit delete rows"),
            StagingTableKind::LocalTemporary | StagingTableKind::Persistent => None,
        }
    }
}
