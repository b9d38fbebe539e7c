use serde::{Deserialize, Serialize};

use crate::{dialect::BackendCapabilities, staging::StagingTableKind};

fn default_name() -> String {
    "custom".to_string()
}

fn default_create_global() -> String {
    "create global temporary table".to_string()
}

fn default_create_local() -> String {
    "create temporary table".to_string()
}

fn default_create_persistent() -> String {
    "create table".to_string()
}

fn default_drop() -> String {
    "drop table".to_string()
}

fn default_clear() -> String {
    "delete from".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_identifier_length() -> usize {
    30
}

fn default_max_identifier_columns() -> usize {
    16
}

/// Backend described entirely by configuration.
///
/// ```yaml
/// backend:
///   type: custom
///   name: legacy
///   supports_global_temporary_tables: false
///   supports_local_temporary_tables: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBackend {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub supports_global_temporary_tables: bool,

    #[serde(default)]
    pub supports_local_temporary_tables: bool,

    #[serde(default = "default_true")]
    pub supports_persistent_tables: bool,

    #[serde(default)]
    pub supports_create_as_select: bool,

    #[serde(default = "default_true")]
    pub supports_row_value_in_subquery: bool,

    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,

    #[serde(default = "default_max_identifier_columns")]
    pub max_identifier_columns: usize,

    #[serde(default = "default_create_global")]
    pub create_global_temporary_table: String,

    #[serde(default = "default_create_local")]
    pub create_local_temporary_table: String,

    #[serde(default = "default_create_persistent")]
    pub create_persistent_table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_temporary_table_postfix: Option<String>,

    #[serde(default = "default_drop")]
    pub drop_table: String,

    #[serde(default = "default_clear")]
    pub clear_table: String,
}

impl Default for CustomBackend {
    fn default() -> Self {
        CustomBackend {
            name: default_name(),
            supports_global_temporary_tables: false,
            supports_local_temporary_tables: false,
            supports_persistent_tables: true,
            supports_create_as_select: false,
            supports_row_value_in_subquery: true,
            max_identifier_length: default_max_identifier_length(),
            max_identifier_columns: default_max_identifier_columns(),
            create_global_temporary_table: default_create_global(),
            create_local_temporary_table: default_create_local(),
            create_persistent_table: default_create_persistent(),
            create_temporary_table_postfix: None,
            drop_table: default_drop(),
            clear_table: default_clear(),
        }
    }
}

impl BackendCapabilities for CustomBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_global_temporary_tables(&self) -> bool {
        self.supports_global_temporary_tables
    }

    fn supports_local_temporary_tables(&self) -> bool {
        self.supports_local_temporary_tables
    }

    fn supports_persistent_tables(&self) -> bool {
        self.supports_persistent_tables
    }

    fn supports_create_as_select(&self) -> bool {
        self.supports_create_as_select
    }

    fn supports_row_value_in_subquery(&self) -> bool {
        self.supports_row_value_in_subquery
    }

    fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    fn max_identifier_columns(&self) -> usize {
        self.max_identifier_columns
    }

    fn create_table_command(&self, kind: StagingTableKind) -> &str {
        match kind {
            StagingTableKind::GlobalTemporary => &self.create_global_temporary_table,
            StagingTableKind::LocalTemporary => &self.create_local_temporary_table,
            StagingTableKind::Persistent => &self.create_persistent_table,
        }
    }

    fn create_table_postfix(&self, kind: StagingTableKind) -> Option<&str> {
        match kind {
            StagingTableKind::Persistent => None,
            StagingTableKind::GlobalTemporary | StagingTableKind::LocalTemporary => {
                self.create_temporary_table_postfix.as_deref()
            }
        }
    }

    fn drop_table_command(&self, _kind: StagingTableKind) -> &str {
        &self.drop_table
    }

    fn clear_table_command(&self) -> &str {
        &self.clear_table
    }
}
