//! Backend capability descriptors.
//!
//! Every piece of backend-specific staging vocabulary lives behind
//! [`BackendCapabilities`]: the create/drop/clear verbs per staging table
//! kind, which kinds exist at all, naming limits and the SQL name of each
//! semantic column type. The orchestrator only ever asks a descriptor for
//! statements, so adding a backend means implementing this trait and
//! nothing else.

mod ansi;
mod custom;
mod hana;
mod mysql;
mod postgres;

use std::fmt::Debug;

pub use ansi::AnsiBackend;
pub use custom::CustomBackend;
pub use hana::{HanaColumnStoreBackend, HanaRowStoreBackend};
pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;

use crate::{
    helpers::quote_identifier,
    staging::{ColumnType, SessionToken, StagingTableDescriptor, StagingTableKind},
};

/// Static knowledge about one backend. Pure, no I/O.
pub trait BackendCapabilities: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn supports_global_temporary_tables(&self) -> bool;

    fn supports_local_temporary_tables(&self) -> bool;

    /// Whether ordinary tables may be created for staging.
    fn supports_persistent_tables(&self) -> bool {
        true
    }

    fn supports_create_as_select(&self) -> bool {
        false
    }

    /// Whether `(a, b) in (select a, b from ...)` is understood.
    fn supports_row_value_in_subquery(&self) -> bool {
        true
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn max_identifier_columns(&self) -> usize {
        16
    }

    /// Create verb for a staging table kind, e.g. `create global temporary table`.
    fn create_table_command(&self, kind: StagingTableKind) -> &str;

    /// Trailing options of the create statement, e.g. `on commit delete rows`.
    fn create_table_postfix(&self, _kind: StagingTableKind) -> Option<&str> {
        None
    }

    fn drop_table_command(&self, _kind: StagingTableKind) -> &str {
        "drop table"
    }

    /// Verb that empties a table not shared between sessions.
    fn clear_table_command(&self) -> &str {
        "delete from"
    }

    fn sql_type(&self, column_type: &ColumnType) -> String {
        ansi_sql_type(column_type)
    }

    /// Quotes a column name when it is a reserved word.
    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name)
    }

    fn create_staging_table_statement(&self, descriptor: &StagingTableDescriptor) -> String {
        let mut sql = format!(
            "{} {}",
            self.create_table_command(descriptor.kind()),
            descriptor.creation_template()
        );
        if let Some(postfix) = self.create_table_postfix(descriptor.kind()) {
            sql.push(' ');
            sql.push_str(postfix);
        }
        sql
    }

    /// Creates and populates the staging table in one statement. The select
    /// must alias its columns to the staging column names.
    fn create_staging_table_as_select_statement(
        &self,
        descriptor: &StagingTableDescriptor,
        select: &str,
    ) -> String {
        format!(
            "{} {} as {}",
            self.create_table_command(descriptor.kind()),
            descriptor.name(),
            select
        )
    }

    fn drop_staging_table_statement(&self, descriptor: &StagingTableDescriptor) -> String {
        format!("{} {}", self.drop_table_command(descriptor.kind()), descriptor.name())
    }

    /// Removes the rows of one invocation. Tables with a session column only
    /// lose the caller's rows, never another session's.
    fn clear_staging_table_statement(
        &self,
        descriptor: &StagingTableDescriptor,
        session: &SessionToken,
    ) -> String {
        match descriptor.session_column() {
            Some(column) => format!(
                "delete from {} where {} = {}",
                descriptor.name(),
                self.quote_identifier(&column.name),
                session.sql_literal()
            ),
            None => format!("{} {}", self.clear_table_command(), descriptor.name()),
        }
    }

    /// Zero-row select that only succeeds when the staging table exists.
    fn staging_table_probe_statement(&self, descriptor: &StagingTableDescriptor) -> String {
        format!("select 1 from {} where 1 = 0", descriptor.name())
    }
}

/// Comma separated column list, each name quoted the backend's way.
pub(crate) fn quote_identifier_list<'a, I>(
    backend: &dyn BackendCapabilities,
    names: I,
) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().map(|name| backend.quote_identifier(name)).collect::<Vec<_>>().join(", ")
}

pub(crate) fn ansi_sql_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::SmallInt => "smallint".to_string(),
        ColumnType::Integer => "integer".to_string(),
        ColumnType::BigInt => "bigint".to_string(),
        ColumnType::Numeric { precision, scale } => format!("numeric({},{})", precision, scale),
        ColumnType::Varchar(len) => format!("varchar({})", len),
        ColumnType::Char(len) => format!("char({})", len),
        ColumnType::Uuid => "char(36)".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::Timestamp => "timestamp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::{IdentifierColumn, IdentifierColumnSet};

    fn descriptor(kind: StagingTableKind, session: bool) -> StagingTableDescriptor {
        StagingTableDescriptor::new(
            "ht_id_bigint".to_string(),
            kind,
            IdentifierColumnSet::single("id", ColumnType::BigInt),
            session.then(|| IdentifierColumn::new("bulk_sess_id", ColumnType::Varchar(36))),
            "ht_id_bigint (id bigint not null)".to_string(),
        )
    }

    #[test]
    fn test_hana_column_store_vocabulary() {
        let backend = HanaColumnStoreBackend;
        let d = descriptor(StagingTableKind::GlobalTemporary, false);
        let token = SessionToken::new("s1").unwrap();

        assert_eq!(
            backend.create_staging_table_statement(&d),
            "create global temporary column table ht_id_bigint (id bigint not null)"
        );
        assert_eq!(backend.clear_staging_table_statement(&d, &token), "truncate table ht_id_bigint");
        assert_eq!(backend.drop_staging_table_statement(&d), "drop table ht_id_bigint");
    }

    #[test]
    fn test_ansi_global_temporary_postfix() {
        let d = descriptor(StagingTableKind::GlobalTemporary, false);
        assert_eq!(
            AnsiBackend.create_staging_table_statement(&d),
            "create global temporary table ht_id_bigint (id bigint not null) on commit delete rows"
        );
    }

    #[test]
    fn test_clear_is_session_scoped_with_discriminator() {
        let d = descriptor(StagingTableKind::Persistent, true);
        let token = SessionToken::new("s1").unwrap();

        // even a truncating backend must not wipe other sessions' rows
        assert_eq!(
            HanaColumnStoreBackend.clear_staging_table_statement(&d, &token),
            "delete from ht_id_bigint where bulk_sess_id = 's1'"
        );
    }

    #[test]
    fn test_mysql_local_temporary_drop() {
        let d = descriptor(StagingTableKind::LocalTemporary, false);
        assert_eq!(
            MySqlBackend.drop_staging_table_statement(&d),
            "drop temporary table ht_id_bigint"
        );
    }

    #[test]
    fn test_mysql_temporary_create_fails_on_leftover_table() {
        let d = descriptor(StagingTableKind::LocalTemporary, false);
        assert_eq!(
            MySqlBackend.create_staging_table_statement(&d),
            "create temporary table ht_id_bigint (id bigint not null)"
        );
    }

    #[test]
    fn test_reserved_session_column_is_quoted_per_backend() {
        let d = StagingTableDescriptor::new(
            "ht_id_bigint_sess".to_string(),
            StagingTableKind::Persistent,
            IdentifierColumnSet::single("id", ColumnType::BigInt),
            Some(IdentifierColumn::new("session", ColumnType::Varchar(36))),
            "ht_id_bigint_sess (id bigint not null, session varchar(36) not null)".to_string(),
        );
        let token = SessionToken::new("s1").unwrap();

        assert_eq!(
            MySqlBackend.clear_staging_table_statement(&d, &token),
            "delete from ht_id_bigint_sess where `session` = 's1'"
        );
        assert_eq!(
            PostgresBackend.clear_staging_table_statement(&d, &token),
            "delete from ht_id_bigint_sess where \"session\" = 's1'"
        );
    }

    #[test]
    fn test_postgres_create_as_select() {
        let d = descriptor(StagingTableKind::LocalTemporary, false);
        assert_eq!(
            PostgresBackend.create_staging_table_as_select_statement(&d, "select id as id from t"),
            "create temporary table ht_id_bigint as select id as id from t"
        );
    }

    #[test]
    fn test_existence_check_statement() {
        let d = descriptor(StagingTableKind::Persistent, true);
        assert_eq!(
            AnsiBackend.staging_table_probe_statement(&d),
            "select 1 from ht_id_bigint where 1 = 0"
        );
    }
}
