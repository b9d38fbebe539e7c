//! The bulk identifier protocol: stage the identifiers matching a predicate
//! once, then run one statement per physical table against them.

mod error;
mod plan;
mod selector;
mod state;
mod statements;

#[cfg(test)]
mod test_support;

use std::{fmt, sync::Arc};

pub use error::BulkIdError;
pub use plan::{
    read_plan, BulkOperationKind, BulkOperationPlan, IdSource, TableOrdering, TableStep,
};
pub use selector::StrategySelector;
use serde::{Deserialize, Serialize};
pub use state::BulkIdState;
use state::Invocation;
use tracing::{debug, error, info, warn};

use crate::{
    config::{BulkIdConfig, StagingSettings},
    database::{ConnectionError, StagingConnection},
    dialect::BackendCapabilities,
    staging::{
        CleanupPolicy, SessionToken, StagingSchemaBuilder, StagingTableDescriptor,
        StagingTableKind, StagingTableRegistry,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    GlobalTemporary,
    LocalTemporary,
    /// Ordinary table shared between sessions, rows tagged with the session token.
    Persistent,
    /// No staging table; the identifier select is embedded in every statement.
    InlineSubquery,
}

impl StrategyKind {
    pub fn staging_table_kind(&self) -> Option<StagingTableKind> {
        match self {
            StrategyKind::GlobalTemporary => Some(StagingTableKind::GlobalTemporary),
            StrategyKind::LocalTemporary => Some(StagingTableKind::LocalTemporary),
            StrategyKind::Persistent => Some(StagingTableKind::Persistent),
            StrategyKind::InlineSubquery => None,
        }
    }

    pub fn needs_session_discriminator(&self) -> bool {
        matches!(self, StrategyKind::Persistent)
    }

    pub fn is_supported_by(&self, backend: &dyn BackendCapabilities) -> bool {
        match self {
            StrategyKind::GlobalTemporary => backend.supports_global_temporary_tables(),
            StrategyKind::LocalTemporary => backend.supports_local_temporary_tables(),
            StrategyKind::Persistent => backend.supports_persistent_tables(),
            StrategyKind::InlineSubquery => true,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::GlobalTemporary => f.write_str("global temporary table"),
            StrategyKind::LocalTemporary => f.write_str("local temporary table"),
            StrategyKind::Persistent => f.write_str("persistent table"),
            StrategyKind::InlineSubquery => f.write_str("inline subquery"),
        }
    }
}

#[derive(Debug)]
pub struct BulkOperationOutcome {
    /// Rows affected in the count table, the result of the logical operation.
    pub affected_rows: u64,

    /// Identifiers staged by the populate step. `None` when nothing was staged.
    pub staged_rows: Option<u64>,

    /// Affected rows per table, in execution order.
    pub per_table: Vec<(String, u64)>,

    /// Set when the operation succeeded but the staging table could not be
    /// dropped or cleared afterwards.
    pub cleanup_warning: Option<BulkIdError>,
}

impl BulkOperationOutcome {
    pub fn rows_for(&self, table: &str) -> Option<u64> {
        self.per_table.iter().find(|(name, _)| name == table).map(|(_, count)| *count)
    }
}

#[derive(Debug)]
struct Staging {
    schema: StagingSchemaBuilder,
    cleanup: CleanupPolicy,
    registry: StagingTableRegistry,
}

/// One bulk identifier strategy bound to a backend and, unless it is inline,
/// to a cleanup policy. Shareable between concurrent invocations.
#[derive(Debug)]
pub struct BulkIdStrategy {
    kind: StrategyKind,
    backend: Arc<dyn BackendCapabilities>,
    staging: Option<Staging>,
}

impl BulkIdStrategy {
    pub fn new(
        backend: Arc<dyn BackendCapabilities>,
        kind: StrategyKind,
        cleanup: Option<CleanupPolicy>,
        settings: &StagingSettings,
    ) -> Result<Self, BulkIdError> {
        let incompatible = |reason: String| BulkIdError::NoCompatibleStrategy {
            backend: backend.name().to_string(),
            reason,
        };

        if !kind.is_supported_by(backend.as_ref()) {
            return Err(incompatible(format!("{} staging is not supported", kind)));
        }

        let staging = match (kind.staging_table_kind(), cleanup) {
            (None, Some(policy)) => {
                return Err(incompatible(format!(
                    "{:?} does not apply to the inline strategy, which stages nothing",
                    policy
                )));
            }
            (None, None) => None,
            (Some(table_kind), policy) => {
                let cleanup = match policy {
                    Some(policy) => policy,
                    None => CleanupPolicy::for_lifetime(
                        table_kind.lifetime(),
                        backend.supports_create_as_select(),
                    ),
                };
                if !cleanup.is_compatible_with(table_kind) {
                    return Err(incompatible(format!(
                        "{:?} can not be used with a {} strategy",
                        cleanup, kind
                    )));
                }
                if cleanup.folds_create_into_populate() && !backend.supports_create_as_select() {
                    return Err(incompatible(
                        "create-as-select is not supported".to_string(),
                    ));
                }

                Some(Staging {
                    schema: StagingSchemaBuilder::new(
                        Arc::clone(&backend),
                        table_kind,
                        settings.table_prefix.clone(),
                        settings.session_column.clone(),
                    ),
                    cleanup,
                    registry: StagingTableRegistry::new(),
                })
            }
        };

        Ok(BulkIdStrategy { kind, backend, staging })
    }

    /// The most efficient strategy the backend supports, with default settings.
    pub fn for_backend(backend: Arc<dyn BackendCapabilities>) -> Result<Self, BulkIdError> {
        let kind = StrategySelector::select(backend.as_ref())?;
        info!("Selected {} bulk id strategy for backend {}", kind, backend.name());
        BulkIdStrategy::new(backend, kind, None, &StagingSettings::default())
    }

    pub fn from_config(config: &BulkIdConfig) -> Result<Self, BulkIdError> {
        StrategySelector::strategy_for(config.backend(), config)
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn cleanup(&self) -> Option<CleanupPolicy> {
        self.staging.as_ref().map(|staging| staging.cleanup)
    }

    pub fn backend(&self) -> &dyn BackendCapabilities {
        self.backend.as_ref()
    }

    /// Staging table this strategy uses for the plan's identifier shape.
    pub fn staging_table_for(
        &self,
        plan: &BulkOperationPlan,
    ) -> Result<Option<Arc<StagingTableDescriptor>>, BulkIdError> {
        self.staging
            .as_ref()
            .map(|staging| {
                staging.registry.descriptor_for(
                    &staging.schema,
                    &plan.identifier_columns,
                    self.kind.needs_session_discriminator(),
                )
            })
            .transpose()
    }

    /// Runs `plan` on the caller's connection. Every statement goes through
    /// `conn`, so the caller's transaction decides what survives a failure:
    /// tables applied before a failing one are not restored here.
    pub async fn execute<C>(
        &self,
        plan: &BulkOperationPlan,
        conn: &mut C,
        session: &SessionToken,
    ) -> Result<BulkOperationOutcome, BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        let mut invocation =
            Invocation::new(format!("bulk {} of {}", plan.operation, plan.id_source.root_table));

        let result = match plan.validate() {
            Err(e) => Err(e),
            Ok(()) => match &self.staging {
                Some(staging) => {
                    self.execute_staged(staging, plan, conn, session, &mut invocation).await
                }
                None => self.execute_inline(plan, conn, session, &mut invocation).await,
            },
        };

        match result {
            Ok(outcome) => {
                debug!(
                    "{} affected {} rows in {}",
                    plan.operation,
                    outcome.affected_rows,
                    plan.count_table()
                );
                Ok(outcome)
            }
            Err(e) => {
                error!("Bulk {} failed while {}: {}", plan.operation, invocation.state(), e);
                invocation.fail();
                Err(e)
            }
        }
    }

    async fn execute_staged<C>(
        &self,
        staging: &Staging,
        plan: &BulkOperationPlan,
        conn: &mut C,
        session: &SessionToken,
        invocation: &mut Invocation,
    ) -> Result<BulkOperationOutcome, BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        let descriptor = staging.registry.descriptor_for(
            &staging.schema,
            &plan.identifier_columns,
            self.kind.needs_session_discriminator(),
        )?;
        let cleanup = staging.cleanup;

        let staged_rows = if cleanup.folds_create_into_populate() {
            invocation.advance(BulkIdState::Populating);
            let select = statements::source_select(
                self.backend.as_ref(),
                plan,
                Some(descriptor.as_ref()),
                session,
            );
            let sql = self.backend.create_staging_table_as_select_statement(&descriptor, &select);
            run(conn, &sql)
                .await
                .map_err(|source| BulkIdError::Population { statement: sql, source })?
        } else {
            invocation.advance(BulkIdState::Ensuring);
            self.ensure_staging_table(staging, &descriptor, conn, session).await?;

            invocation.advance(BulkIdState::Populating);
            let sql =
                statements::populate_statement(self.backend.as_ref(), &descriptor, plan, session);
            match run(conn, &sql).await {
                Ok(count) => count,
                Err(source) => {
                    if cleanup.cleans_after_population_failure() {
                        self.cleanup_quietly(cleanup, &descriptor, conn, session).await;
                    }
                    return Err(BulkIdError::Population { statement: sql, source });
                }
            }
        };
        debug!("Staged {} identifiers in {}", staged_rows, descriptor.name());

        invocation.advance(BulkIdState::Applying);
        let subquery =
            statements::staged_ids_subquery(self.backend.as_ref(), &descriptor, session);
        let per_table = match self.apply(plan, conn, &subquery).await {
            Ok(per_table) => per_table,
            Err(e) => {
                self.cleanup_quietly(cleanup, &descriptor, conn, session).await;
                return Err(e);
            }
        };

        invocation.advance(BulkIdState::CleaningUp);
        let cleanup_warning = match self.clean_up(cleanup, &descriptor, conn, session).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Bulk {} succeeded but staging cleanup failed: {}", plan.operation, e);
                Some(e)
            }
        };

        invocation.advance(BulkIdState::Done);
        Ok(outcome(plan, Some(staged_rows), per_table, cleanup_warning))
    }

    async fn execute_inline<C>(
        &self,
        plan: &BulkOperationPlan,
        conn: &mut C,
        session: &SessionToken,
        invocation: &mut Invocation,
    ) -> Result<BulkOperationOutcome, BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        invocation.advance(BulkIdState::Applying);
        let subquery = statements::source_select(self.backend.as_ref(), plan, None, session);
        let per_table = self.apply(plan, conn, &subquery).await?;

        invocation.advance(BulkIdState::Done);
        Ok(outcome(plan, None, per_table, None))
    }

    /// Makes sure the staging table exists and holds none of this session's
    /// identifiers before populating it.
    ///
    /// A kept table may still carry rows from an invocation whose clear failed,
    /// and a connection-scoped one may survive a failed drop on a pooled
    /// connection, so a table that was not created just now is emptied of the
    /// caller's rows first.
    async fn ensure_staging_table<C>(
        &self,
        staging: &Staging,
        descriptor: &StagingTableDescriptor,
        conn: &mut C,
        session: &SessionToken,
    ) -> Result<(), BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        let keeps_table = staging.cleanup.ensures_once();

        let existed = if keeps_table && staging.registry.is_ensured(descriptor.name()) {
            debug!("Staging table {} already ensured", descriptor.name());
            true
        } else {
            let sql = self.backend.create_staging_table_statement(descriptor);
            match run(conn, &sql).await {
                Ok(_) => false,
                Err(source) => {
                    let check = self.backend.staging_table_probe_statement(descriptor);
                    if run(conn, &check).await.is_err() {
                        return Err(BulkIdError::StagingCreation { statement: sql, source });
                    }
                    debug!("Staging table {} already exists: {}", descriptor.name(), source);
                    true
                }
            }
        };

        if keeps_table {
            staging.registry.mark_ensured(descriptor.name());
        }

        // `create ... if not exists` succeeds on a kept table too
        if existed || keeps_table {
            let sql = self.backend.clear_staging_table_statement(descriptor, session);
            run(conn, &sql)
                .await
                .map_err(|source| BulkIdError::StagingCreation { statement: sql, source })?;
        }

        Ok(())
    }

    /// One statement per table in execution order. Stops at the first failure.
    async fn apply<C>(
        &self,
        plan: &BulkOperationPlan,
        conn: &mut C,
        subquery: &str,
    ) -> Result<Vec<(String, u64)>, BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        let id_columns = plan.identifier_columns.names();
        let mut per_table: Vec<(String, u64)> = Vec::with_capacity(plan.tables.len());

        for step in plan.ordered_steps() {
            let restriction =
                statements::restriction(self.backend.as_ref(), step, subquery, &id_columns);
            let sql = statements::apply_statement(plan.operation, step, &restriction);

            match run(conn, &sql).await {
                Ok(count) => per_table.push((step.table.clone(), count)),
                Err(source) => {
                    return Err(BulkIdError::Apply {
                        table: step.table.clone(),
                        statement: sql,
                        applied_tables: per_table.into_iter().map(|(table, _)| table).collect(),
                        source,
                    });
                }
            }
        }

        Ok(per_table)
    }

    async fn clean_up<C>(
        &self,
        cleanup: CleanupPolicy,
        descriptor: &StagingTableDescriptor,
        conn: &mut C,
        session: &SessionToken,
    ) -> Result<(), BulkIdError>
    where
        C: StagingConnection + ?Sized,
    {
        let sql = if cleanup.drops_after_use() {
            self.backend.drop_staging_table_statement(descriptor)
        } else {
            self.backend.clear_staging_table_statement(descriptor, session)
        };

        run(conn, &sql)
            .await
            .map(|_| ())
            .map_err(|source| BulkIdError::Cleanup { statement: sql, source })
    }

    /// Cleanup after a fatal error, attempted once and its outcome discarded.
    async fn cleanup_quietly<C>(
        &self,
        cleanup: CleanupPolicy,
        descriptor: &StagingTableDescriptor,
        conn: &mut C,
        session: &SessionToken,
    ) where
        C: StagingConnection + ?Sized,
    {
        if let Err(e) = self.clean_up(cleanup, descriptor, conn, session).await {
            debug!("Ignoring failed cleanup after bulk failure: {}", e);
        }
    }
}

async fn run<C>(conn: &mut C, sql: &str) -> Result<u64, ConnectionError>
where
    C: StagingConnection + ?Sized,
{
    debug!("Executing bulk id statement: {}", sql);
    conn.execute(sql).await
}

fn outcome(
    plan: &BulkOperationPlan,
    staged_rows: Option<u64>,
    per_table: Vec<(String, u64)>,
    cleanup_warning: Option<BulkIdError>,
) -> BulkOperationOutcome {
    let count_table = plan.count_table();
    let affected_rows = per_table
        .iter()
        .find(|(table, _)| table == count_table)
        .map_or(0, |(_, count)| *count);

    BulkOperationOutcome { affected_rows, staged_rows, per_table, cleanup_warning }
}
