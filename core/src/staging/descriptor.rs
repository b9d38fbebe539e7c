use serde::{Deserialize, Serialize};

use crate::{
    dialect::{quote_identifier_list, BackendCapabilities},
    staging::{IdentifierColumn, IdentifierColumnSet, StagingLifetime},
};

/// Physical flavour of a staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingTableKind {
    /// Schema-level definition, rows private to the session.
    GlobalTemporary,
    /// Exists only on the connection that created it.
    LocalTemporary,
    /// Ordinary table shared by every session, rows tagged with a session token.
    Persistent,
}

impl StagingTableKind {
    pub fn lifetime(&self) -> StagingLifetime {
        match self {
            StagingTableKind::LocalTemporary => StagingLifetime::Connection,
            StagingTableKind::GlobalTemporary | StagingTableKind::Persistent => {
                StagingLifetime::Process
            }
        }
    }
}

/// Canonical staging table for one identifier shape. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTableDescriptor {
    name: String,
    kind: StagingTableKind,
    id_columns: IdentifierColumnSet,
    session_column: Option<IdentifierColumn>,
    creation_template: String,
}

impl StagingTableDescriptor {
    pub(crate) fn new(
        name: String,
        kind: StagingTableKind,
        id_columns: IdentifierColumnSet,
        session_column: Option<IdentifierColumn>,
        creation_template: String,
    ) -> Self {
        StagingTableDescriptor { name, kind, id_columns, session_column, creation_template }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StagingTableKind {
        self.kind
    }

    pub fn id_columns(&self) -> &IdentifierColumnSet {
        &self.id_columns
    }

    pub fn session_column(&self) -> Option<&IdentifierColumn> {
        self.session_column.as_ref()
    }

    /// `name (column definitions)`, the part of the DDL that follows the create verb.
    pub fn creation_template(&self) -> &str {
        &self.creation_template
    }

    /// Identifier column list, quoted where `backend` needs it.
    pub fn id_column_list(&self, backend: &dyn BackendCapabilities) -> String {
        quote_identifier_list(backend, self.id_columns.names())
    }

    /// Identifier columns followed by the session column, if any.
    pub fn insert_column_list(&self, backend: &dyn BackendCapabilities) -> String {
        let mut names = self.id_columns.names();
        if let Some(session) = &self.session_column {
            names.push(session.name.as_str());
        }
        quote_identifier_list(backend, names)
    }
}
