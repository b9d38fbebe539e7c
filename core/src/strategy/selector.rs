use std::sync::Arc;

use tracing::info;

use crate::{
    config::BulkIdConfig,
    dialect::BackendCapabilities,
    staging::CleanupPolicy,
    strategy::{BulkIdError, BulkIdStrategy, StrategyKind},
};

/// Preference order, most efficient first. Inline is always compatible.
const PREFERENCE: [StrategyKind; 4] = [
    StrategyKind::GlobalTemporary,
    StrategyKind::LocalTemporary,
    StrategyKind::Persistent,
    StrategyKind::InlineSubquery,
];

pub struct StrategySelector;

impl StrategySelector {
    pub fn select(backend: &dyn BackendCapabilities) -> Result<StrategyKind, BulkIdError> {
        PREFERENCE.into_iter().find(|kind| kind.is_supported_by(backend)).ok_or_else(|| {
            BulkIdError::NoCompatibleStrategy {
                backend: backend.name().to_string(),
                reason: "no staging strategy is supported".to_string(),
            }
        })
    }

    /// Cleanup policy bound to a strategy when none is configured. `None` for
    /// the inline strategy, which stages nothing.
    pub fn default_cleanup(
        kind: StrategyKind,
        backend: &dyn BackendCapabilities,
    ) -> Option<CleanupPolicy> {
        kind.staging_table_kind().map(|table_kind| {
            CleanupPolicy::for_lifetime(table_kind.lifetime(), backend.supports_create_as_select())
        })
    }

    /// Builds the strategy for a backend, honouring the overrides in `config`.
    pub fn strategy_for(
        backend: Arc<dyn BackendCapabilities>,
        config: &BulkIdConfig,
    ) -> Result<BulkIdStrategy, BulkIdError> {
        let kind = match config.strategy {
            Some(kind) => kind,
            None => StrategySelector::select(backend.as_ref())?,
        };

        info!(
            "Selected {} bulk id strategy for backend {}{}",
            kind,
            backend.name(),
            if config.strategy.is_some() { " (configured)" } else { "" }
        );

        BulkIdStrategy::new(backend, kind, config.cleanup, &config.staging)
    }
}
