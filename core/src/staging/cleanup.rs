use serde::{Deserialize, Serialize};

use crate::staging::StagingTableKind;

/// How long a staging object is expected to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingLifetime {
    /// Disappears with the connection.
    Connection,
    /// Outlives connections: a schema-level or ordinary table.
    Process,
}

/// What happens to the staging table once a bulk operation is done.
///
/// Exactly one policy is bound to a staging strategy when it is built. The
/// orchestrator interprets it; the policy itself does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Create before populating, drop after applying.
    DropAfterUse,
    /// Create once, keep the table and delete this invocation's rows afterwards.
    ClearAfterUse,
    /// Create and populate in one `create ... as select`, drop afterwards.
    CreateAsSelectThenDrop,
}

impl CleanupPolicy {
    /// Connection-scoped tables are dropped so nothing survives into another
    /// session; process-scoped tables are cleared to amortise the DDL.
    pub fn for_lifetime(lifetime: StagingLifetime, supports_create_as_select: bool) -> Self {
        match lifetime {
            StagingLifetime::Connection if supports_create_as_select => {
                CleanupPolicy::CreateAsSelectThenDrop
            }
            StagingLifetime::Connection => CleanupPolicy::DropAfterUse,
            StagingLifetime::Process => CleanupPolicy::ClearAfterUse,
        }
    }

    pub fn drops_after_use(&self) -> bool {
        matches!(self, CleanupPolicy::DropAfterUse | CleanupPolicy::CreateAsSelectThenDrop)
    }

    /// The table is created once per process and reused afterwards.
    pub fn ensures_once(&self) -> bool {
        matches!(self, CleanupPolicy::ClearAfterUse)
    }

    pub fn folds_create_into_populate(&self) -> bool {
        matches!(self, CleanupPolicy::CreateAsSelectThenDrop)
    }

    /// A failed create-as-select leaves nothing behind, every other policy has
    /// a table (and maybe rows) to get rid of.
    pub fn cleans_after_population_failure(&self) -> bool {
        !self.folds_create_into_populate()
    }

    /// Persistent tables are shared, dropping one would pull it out from
    /// under concurrent sessions. A connection-scoped table can not be
    /// remembered across pooled connections, so it is always dropped.
    pub fn is_compatible_with(&self, kind: StagingTableKind) -> bool {
        match kind {
            StagingTableKind::Persistent => matches!(self, CleanupPolicy::ClearAfterUse),
            StagingTableKind::LocalTemporary => self.drops_after_use(),
            StagingTableKind::GlobalTemporary => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for_lifetime() {
        assert_eq!(
            CleanupPolicy::for_lifetime(StagingLifetime::Connection, false),
            CleanupPolicy::DropAfterUse
        );
        assert_eq!(
            CleanupPolicy::for_lifetime(StagingLifetime::Connection, true),
            CleanupPolicy::CreateAsSelectThenDrop
        );
        assert_eq!(
            CleanupPolicy::for_lifetime(StagingLifetime::Process, true),
            CleanupPolicy::ClearAfterUse
        );
    }

    #[test]
    fn test_persistent_tables_only_clear() {
        assert!(CleanupPolicy::ClearAfterUse.is_compatible_with(StagingTableKind::Persistent));
        assert!(!CleanupPolicy::DropAfterUse.is_compatible_with(StagingTableKind::Persistent));
        assert!(!CleanupPolicy::CreateAsSelectThenDrop
            .is_compatible_with(StagingTableKind::Persistent));
        assert!(CleanupPolicy::DropAfterUse.is_compatible_with(StagingTableKind::GlobalTemporary));
    }

    #[test]
    fn test_local_temporary_tables_are_never_kept() {
        assert!(!CleanupPolicy::ClearAfterUse.is_compatible_with(StagingTableKind::LocalTemporary));
        assert!(CleanupPolicy::DropAfterUse.is_compatible_with(StagingTableKind::LocalTemporary));
        assert!(CleanupPolicy::CreateAsSelectThenDrop
            .is_compatible_with(StagingTableKind::LocalTemporary));
    }

    #[test]
    fn test_policy_flags() {
        assert!(CleanupPolicy::CreateAsSelectThenDrop.drops_after_use());
        assert!(!CleanupPolicy::CreateAsSelectThenDrop.cleans_after_population_failure());
        assert!(CleanupPolicy::ClearAfterUse.ensures_once());
        assert!(!CleanupPolicy::DropAfterUse.ensures_once());
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: CleanupPolicy = serde_yaml::from_str("create_as_select_then_drop").unwrap();
        assert_eq!(policy, CleanupPolicy::CreateAsSelectThenDrop);
    }
}
