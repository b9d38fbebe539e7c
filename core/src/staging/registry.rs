use std::sync::Arc;

use mini_moka::sync::Cache;
use tracing::debug;

use crate::{
    staging::{IdentifierColumnSet, StagingSchemaBuilder, StagingTableDescriptor},
    strategy::BulkIdError,
};

#[derive(Clone, PartialEq, Eq, Hash)]
struct StagingShapeKey {
    shape: IdentifierColumnSet,
    session_discriminator: bool,
}

/// Process-wide store of staging descriptors and of the staging tables
/// already created by this process.
///
/// Entries are added lazily on first use and never evicted for the lifetime
/// of the registry. A registry belongs to one strategy, so its lifetime is
/// the strategy's.
pub struct StagingTableRegistry {
    descriptors: Cache<StagingShapeKey, Arc<StagingTableDescriptor>>,
    ensured: Cache<String, ()>,
}

impl Default for StagingTableRegistry {
    fn default() -> Self {
        StagingTableRegistry::new()
    }
}

impl std::fmt::Debug for StagingTableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingTableRegistry")
            .field("descriptors", &self.descriptors.entry_count())
            .field("ensured", &self.ensured.entry_count())
            .finish()
    }
}

impl StagingTableRegistry {
    pub fn new() -> Self {
        StagingTableRegistry {
            descriptors: Cache::builder().build(),
            ensured: Cache::builder().build(),
        }
    }

    /// Returns the cached descriptor for the shape, building it on first use.
    pub fn descriptor_for(
        &self,
        builder: &StagingSchemaBuilder,
        id_columns: &IdentifierColumnSet,
        session_discriminator: bool,
    ) -> Result<Arc<StagingTableDescriptor>, BulkIdError> {
        let key = StagingShapeKey { shape: id_columns.clone(), session_discriminator };

        if let Some(descriptor) = self.descriptors.get(&key) {
            return Ok(descriptor);
        }

        let descriptor = Arc::new(builder.build(id_columns, session_discriminator)?);
        debug!(
            "Registered staging table {} for shape [{}]",
            descriptor.name(),
            id_columns.shape_key()
        );
        self.descriptors.insert(key, Arc::clone(&descriptor));

        Ok(descriptor)
    }

    pub fn is_ensured(&self, table_name: &str) -> bool {
        self.ensured.contains_key(&table_name.to_string())
    }

    pub fn mark_ensured(&self, table_name: &str) {
        self.ensured.insert(table_name.to_string(), ());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::HanaColumnStoreBackend,
        staging::{ColumnType, StagingTableKind},
    };

    #[test]
    fn test_descriptor_is_cached_by_shape() {
        let registry = StagingTableRegistry::new();
        let builder = StagingSchemaBuilder::new(
            Arc::new(HanaColumnStoreBackend),
            StagingTableKind::GlobalTemporary,
            "ht_",
            "bulk_sess_id",
        );
        let ids = IdentifierColumnSet::single("id", ColumnType::BigInt);

        let first = registry.descriptor_for(&builder, &ids, false).unwrap();
        let second = registry.descriptor_for(&builder, &ids, false).unwrap();
        let with_session = registry.descriptor_for(&builder, &ids, true).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &with_session));
        assert!(with_session.session_column().is_some());
    }

    #[test]
    fn test_invalid_shapes_are_not_cached() {
        let registry = StagingTableRegistry::new();
        let builder = StagingSchemaBuilder::new(
            Arc::new(HanaColumnStoreBackend),
            StagingTableKind::GlobalTemporary,
            "ht_",
            "bulk_sess_id",
        );

        assert!(registry.descriptor_for(&builder, &IdentifierColumnSet::new(vec![]), false).is_err());
        assert!(registry.descriptor_for(&builder, &IdentifierColumnSet::new(vec![]), false).is_err());
    }

    #[test]
    fn test_ensured_tables() {
        let registry = StagingTableRegistry::new();
        assert!(!registry.is_ensured("ht_id_bigint"));
        registry.mark_ensured("ht_id_bigint");
        assert!(registry.is_ensured("ht_id_bigint"));
    }
}
