use std::{
    collections::HashSet,
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    config::ReadConfigError,
    staging::IdentifierColumnSet,
    strategy::BulkIdError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperationKind {
    Delete,
    Update,
}

impl fmt::Display for BulkOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkOperationKind::Delete => f.write_str("delete"),
            BulkOperationKind::Update => f.write_str("update"),
        }
    }
}

/// How the order of [`BulkOperationPlan::tables`] should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrdering {
    /// The caller already put the tables in dependency order.
    AsGiven,
    /// Tables are listed root first without a dependency hint; they run leaf
    /// first and the root last.
    #[default]
    Hierarchy,
}

/// Where the identifiers matching the predicate are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSource {
    pub root_table: String,

    /// Full `from` clause body when the predicate needs more than the root
    /// table, e.g. `invoice_root r join customer c on c.id = r.customer_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_clause: Option<String>,

    /// Expressions selecting the identifier, one per identifier column.
    /// Defaults to the identifier column names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_expressions: Vec<String>,
}

impl IdSource {
    pub fn new(root_table: impl Into<String>) -> Self {
        IdSource { root_table: root_table.into(), from_clause: None, id_expressions: vec![] }
    }

    pub fn with_from_clause(mut self, from_clause: impl Into<String>) -> Self {
        self.from_clause = Some(from_clause.into());
        self
    }

    pub fn with_id_expressions(mut self, expressions: Vec<String>) -> Self {
        self.id_expressions = expressions;
        self
    }
}

/// One physical table of the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStep {
    pub table: String,

    /// Columns of this table holding the identifier, in identifier order.
    pub id_columns: Vec<String>,

    /// `set` clause body, required for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_clause: Option<String>,
}

impl TableStep {
    pub fn new(table: impl Into<String>, id_columns: Vec<String>) -> Self {
        TableStep { table: table.into(), id_columns, set_clause: None }
    }

    pub fn with_set_clause(mut self, set_clause: impl Into<String>) -> Self {
        self.set_clause = Some(set_clause.into());
        self
    }
}

/// A single logical UPDATE or DELETE over every physical table of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationPlan {
    pub operation: BulkOperationKind,

    pub identifier_columns: IdentifierColumnSet,

    pub id_source: IdSource,

    /// Original predicate without the `where` keyword. Empty matches every row.
    #[serde(default)]
    pub predicate: String,

    pub tables: Vec<TableStep>,

    #[serde(default)]
    pub ordering: TableOrdering,

    /// Table whose affected-row count is the logical result. Defaults to the
    /// root table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_table: Option<String>,
}

impl BulkOperationPlan {
    pub fn new(
        operation: BulkOperationKind,
        identifier_columns: IdentifierColumnSet,
        id_source: IdSource,
        predicate: impl Into<String>,
    ) -> Self {
        BulkOperationPlan {
            operation,
            identifier_columns,
            id_source,
            predicate: predicate.into(),
            tables: vec![],
            ordering: TableOrdering::default(),
            count_table: None,
        }
    }

    pub fn with_table(mut self, step: TableStep) -> Self {
        self.tables.push(step);
        self
    }

    pub fn with_ordering(mut self, ordering: TableOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_count_table(mut self, table: impl Into<String>) -> Self {
        self.count_table = Some(table.into());
        self
    }

    pub fn validate(&self) -> Result<(), BulkIdError> {
        if self.tables.is_empty() {
            return Err(BulkIdError::InvalidPlan("plan has no tables".to_string()));
        }

        let arity = self.identifier_columns.len();
        if !self.id_source.id_expressions.is_empty() && self.id_source.id_expressions.len() != arity
        {
            return Err(BulkIdError::InvalidPlan(format!(
                "{} id expressions given for {} identifier columns",
                self.id_source.id_expressions.len(),
                arity
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.tables {
            if !seen.insert(step.table.as_str()) {
                return Err(BulkIdError::InvalidPlan(format!(
                    "table {} appears more than once",
                    step.table
                )));
            }
            if step.id_columns.len() != arity {
                return Err(BulkIdError::InvalidPlan(format!(
                    "table {} joins on {} columns but the identifier has {}",
                    step.table,
                    step.id_columns.len(),
                    arity
                )));
            }
            if self.operation == BulkOperationKind::Update
                && step.set_clause.as_deref().map_or(true, |s| s.trim().is_empty())
            {
                return Err(BulkIdError::InvalidPlan(format!(
                    "update of table {} has no set clause",
                    step.table
                )));
            }
        }

        let count_table = self.count_table();
        if !self.tables.iter().any(|step| step.table == count_table) {
            return Err(BulkIdError::InvalidPlan(format!(
                "count table {} is not one of the plan's tables",
                count_table
            )));
        }

        Ok(())
    }

    /// Tables in execution order.
    pub fn ordered_steps(&self) -> Vec<&TableStep> {
        match self.ordering {
            TableOrdering::AsGiven => self.tables.iter().collect(),
            TableOrdering::Hierarchy => self.tables.iter().rev().collect(),
        }
    }

    pub fn count_table(&self) -> &str {
        self.count_table.as_deref().unwrap_or(&self.id_source.root_table)
    }

    pub fn from_clause(&self) -> &str {
        self.id_source.from_clause.as_deref().unwrap_or(&self.id_source.root_table)
    }

    pub fn id_select_expressions(&self) -> Vec<String> {
        if self.id_source.id_expressions.is_empty() {
            self.identifier_columns.names().into_iter().map(str::to_string).collect()
        } else {
            self.id_source.id_expressions.clone()
        }
    }

    /// ` where <predicate>`, or nothing for an empty predicate.
    pub fn where_clause(&self) -> String {
        let predicate = self.predicate.trim();
        if predicate.is_empty() {
            String::new()
        } else {
            format!(" where {}", predicate)
        }
    }
}

pub fn read_plan(file_path: &Path) -> Result<BulkOperationPlan, ReadConfigError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    let plan: BulkOperationPlan = serde_yaml::from_str(&contents)?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::staging::ColumnType;

    fn invoice_plan() -> BulkOperationPlan {
        BulkOperationPlan::new(
            BulkOperationKind::Delete,
            IdentifierColumnSet::single("id", ColumnType::BigInt),
            IdSource::new("invoice_root"),
            "status = 'VOID'",
        )
        .with_table(TableStep::new("invoice_root", vec!["id".to_string()]))
        .with_table(TableStep::new("invoice_detail", vec!["invoice_id".to_string()]))
    }

    #[test]
    fn test_hierarchy_runs_leaf_first() {
        let plan = invoice_plan();
        let order: Vec<&str> = plan.ordered_steps().iter().map(|s| s.table.as_str()).collect();
        assert_eq!(order, vec!["invoice_detail", "invoice_root"]);
    }

    #[test]
    fn test_as_given_keeps_order() {
        let plan = invoice_plan().with_ordering(TableOrdering::AsGiven);
        let order: Vec<&str> = plan.ordered_steps().iter().map(|s| s.table.as_str()).collect();
        assert_eq!(order, vec!["invoice_root", "invoice_detail"]);
    }

    #[test]
    fn test_validate() {
        assert!(invoice_plan().validate().is_ok());
        assert_eq!(invoice_plan().count_table(), "invoice_root");

        let unknown_count = invoice_plan().with_count_table("nope");
        assert!(matches!(unknown_count.validate(), Err(BulkIdError::InvalidPlan(_))));

        let wrong_arity = invoice_plan()
            .with_table(TableStep::new("invoice_note", vec!["a".to_string(), "b".to_string()]));
        assert!(wrong_arity.validate().is_err());

        let mut update = invoice_plan();
        update.operation = BulkOperationKind::Update;
        assert!(update.validate().is_err());

        let mut empty = invoice_plan();
        empty.tables.clear();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_where_clause() {
        let mut plan = invoice_plan();
        assert_eq!(plan.where_clause(), " where status = 'VOID'");
        plan.predicate = "  ".to_string();
        assert_eq!(plan.where_clause(), "");
    }

    #[test]
    fn test_read_plan_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        let mut file = File::create(&path).unwrap();
        file.write_all(
            br#"
operation: update
identifier_columns:
  - name: id
    type: bigint
id_source:
  root_table: invoice_root
predicate: status = 'VOID'
tables:
  - table: invoice_root
    id_columns: [id]
    set_clause: archived = true
  - table: invoice_detail
    id_columns: [invoice_id]
    set_clause: archived = true
"#,
        )
        .unwrap();

        let plan = read_plan(&path).unwrap();

        assert_eq!(plan.operation, BulkOperationKind::Update);
        assert_eq!(plan.ordering, TableOrdering::Hierarchy);
        assert_eq!(plan.tables.len(), 2);
        assert_eq!(plan.from_clause(), "invoice_root");
        assert_eq!(plan.id_select_expressions(), vec!["id".to_string()]);
        assert!(plan.validate().is_ok());
    }
}
