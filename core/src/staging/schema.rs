use std::{collections::HashSet, sync::Arc};

use sha2::{Digest, Sha256};

use crate::{
    dialect::BackendCapabilities,
    helpers::sanitize_name_segment,
    staging::{
        IdentifierColumn, IdentifierColumnSet, StagingTableDescriptor, StagingTableKind,
        SESSION_COLUMN_TYPE,
    },
    strategy::BulkIdError,
};

pub const DEFAULT_STAGING_TABLE_PREFIX: &str = "ht_";

pub const DEFAULT_SESSION_COLUMN: &str = "bulk_sess_id";

const SESSION_NAME_SUFFIX: &str = "_sess";

/// Length of the shape digest closing every staging table name.
const NAME_DIGEST_LENGTH: usize = 8;

/// Derives staging table definitions for one backend and staging table kind.
#[derive(Debug, Clone)]
pub struct StagingSchemaBuilder {
    backend: Arc<dyn BackendCapabilities>,
    kind: StagingTableKind,
    table_prefix: String,
    session_column: String,
}

impl StagingSchemaBuilder {
    pub fn new(
        backend: Arc<dyn BackendCapabilities>,
        kind: StagingTableKind,
        table_prefix: impl Into<String>,
        session_column: impl Into<String>,
    ) -> Self {
        StagingSchemaBuilder {
            backend,
            kind,
            table_prefix: table_prefix.into(),
            session_column: session_column.into(),
        }
    }

    pub fn kind(&self) -> StagingTableKind {
        self.kind
    }

    /// Builds the descriptor for an identifier shape. Identical inputs always
    /// produce identical descriptors, name included.
    pub fn build(
        &self,
        id_columns: &IdentifierColumnSet,
        needs_session_discriminator: bool,
    ) -> Result<StagingTableDescriptor, BulkIdError> {
        self.validate_shape(id_columns, needs_session_discriminator)?;

        let name = self.table_name(id_columns, needs_session_discriminator);
        let session_column = needs_session_discriminator
            .then(|| IdentifierColumn::new(self.session_column.clone(), SESSION_COLUMN_TYPE));

        let column_definitions = id_columns
            .iter()
            .chain(session_column.iter())
            .map(|column| {
                format!(
                    "{} {} not null",
                    self.backend.quote_identifier(&column.name),
                    self.backend.sql_type(&column.column_type)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let creation_template = format!("{} ({})", name, column_definitions);

        Ok(StagingTableDescriptor::new(
            name,
            self.kind,
            id_columns.clone(),
            session_column,
            creation_template,
        ))
    }

    fn validate_shape(
        &self,
        id_columns: &IdentifierColumnSet,
        needs_session_discriminator: bool,
    ) -> Result<(), BulkIdError> {
        if id_columns.is_empty() {
            return Err(BulkIdError::unsupported_shape("identifier column set is empty"));
        }

        let total_columns = id_columns.len() + usize::from(needs_session_discriminator);
        let max_columns = self.backend.max_identifier_columns();
        if total_columns > max_columns {
            return Err(BulkIdError::unsupported_shape(format!(
                "staging table needs {} columns but {} allows at most {}",
                total_columns,
                self.backend.name(),
                max_columns
            )));
        }

        let max_length = self.backend.max_identifier_length();
        let mut seen = HashSet::new();
        for column in id_columns.iter().map(|c| c.name.as_str()).chain(
            needs_session_discriminator.then_some(self.session_column.as_str()),
        ) {
            if column.is_empty() {
                return Err(BulkIdError::unsupported_shape("identifier column name is empty"));
            }
            if column.len() > max_length {
                return Err(BulkIdError::unsupported_shape(format!(
                    "column name `{}` exceeds the {} character limit of {}",
                    column,
                    max_length,
                    self.backend.name()
                )));
            }
            if !seen.insert(column.to_ascii_lowercase()) {
                return Err(BulkIdError::unsupported_shape(format!(
                    "column name `{}` appears more than once",
                    column
                )));
            }
        }

        if self.table_prefix.len() + NAME_DIGEST_LENGTH + 1 > max_length {
            return Err(BulkIdError::unsupported_shape(format!(
                "staging table prefix `{}` leaves no room for a name within {} characters",
                self.table_prefix, max_length
            )));
        }

        Ok(())
    }

    /// Readable `<prefix><column>_<type>..[_sess]` head followed by a digest of
    /// the shape, so shapes whose readable parts coincide never share a table.
    fn table_name(&self, id_columns: &IdentifierColumnSet, session: bool) -> String {
        let mut readable = sanitize_name_segment(&self.table_prefix);
        readable.push_str(
            &id_columns
                .iter()
                .map(|c| {
                    format!(
                        "{}_{}",
                        sanitize_name_segment(&c.name),
                        c.column_type.name_token()
                    )
                })
                .collect::<Vec<_>>()
                .join("_"),
        );
        if session {
            readable.push_str(SESSION_NAME_SUFFIX);
        }

        let mut identity = id_columns.shape_key();
        if session {
            identity.push('|');
            identity.push_str(&self.session_column);
        }

        name_with_shape_digest(
            readable,
            &identity,
            self.table_prefix.len(),
            self.backend.max_identifier_length(),
        )
    }
}

/// Appends a digest of `identity` to `readable`, cutting the readable part
/// short when the whole would exceed `max_length`.
fn name_with_shape_digest(
    mut readable: String,
    identity: &str,
    keep_at_least: usize,
    max_length: usize,
) -> String {
    let digest = hex::encode(Sha256::digest(identity.as_bytes()));
    let head_length = max_length.saturating_sub(NAME_DIGEST_LENGTH + 1).max(keep_at_least);
    readable.truncate(head_length);

    format!("{}_{}", readable, &digest[..NAME_DIGEST_LENGTH])
}
