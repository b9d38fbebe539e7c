use crate::{
    dialect::{quote_identifier_list, BackendCapabilities},
    staging::{SessionToken, StagingTableDescriptor},
    strategy::{BulkOperationKind, BulkOperationPlan, TableStep},
};

/// Alias of the derived table in the correlated `exists` restriction.
const STAGED_IDS_ALIAS: &str = "bulk_ids";

/// Identifier select list of the source query. Expressions are aliased to the
/// identifier column names whenever they differ from them.
fn id_select_list(backend: &dyn BackendCapabilities, plan: &BulkOperationPlan) -> Vec<String> {
    plan.id_select_expressions()
        .into_iter()
        .zip(plan.identifier_columns.names())
        .map(|(expression, column)| {
            let quoted = backend.quote_identifier(column);
            if expression == column || expression == quoted {
                quoted
            } else {
                format!("{} as {}", expression, quoted)
            }
        })
        .collect()
}

/// The one and only evaluation of the caller's predicate.
pub(crate) fn source_select(
    backend: &dyn BackendCapabilities,
    plan: &BulkOperationPlan,
    descriptor: Option<&StagingTableDescriptor>,
    session: &SessionToken,
) -> String {
    let mut columns = id_select_list(backend, plan);
    if let Some(column) = descriptor.and_then(|d| d.session_column()) {
        columns.push(format!(
            "{} as {}",
            session.sql_literal(),
            backend.quote_identifier(&column.name)
        ));
    }

    format!("select {} from {}{}", columns.join(", "), plan.from_clause(), plan.where_clause())
}

pub(crate) fn populate_statement(
    backend: &dyn BackendCapabilities,
    descriptor: &StagingTableDescriptor,
    plan: &BulkOperationPlan,
    session: &SessionToken,
) -> String {
    format!(
        "insert into {} ({}) {}",
        descriptor.name(),
        descriptor.insert_column_list(backend),
        source_select(backend, plan, Some(descriptor), session)
    )
}

/// Identifiers of this invocation, read back from the staging table.
pub(crate) fn staged_ids_subquery(
    backend: &dyn BackendCapabilities,
    descriptor: &StagingTableDescriptor,
    session: &SessionToken,
) -> String {
    let mut sql =
        format!("select {} from {}", descriptor.id_column_list(backend), descriptor.name());
    if let Some(column) = descriptor.session_column() {
        sql.push_str(&format!(
            " where {} = {}",
            backend.quote_identifier(&column.name),
            session.sql_literal()
        ));
    }
    sql
}

/// Restricts `step.table` to the identifiers produced by `subquery`, whose
/// columns are named like `id_columns`.
pub(crate) fn restriction(
    backend: &dyn BackendCapabilities,
    step: &TableStep,
    subquery: &str,
    id_columns: &[&str],
) -> String {
    match step.id_columns.as_slice() {
        [column] => format!("{} in ({})", backend.quote_identifier(column), subquery),
        columns if backend.supports_row_value_in_subquery() => {
            format!(
                "({}) in ({})",
                quote_identifier_list(backend, columns.iter().map(String::as_str)),
                subquery
            )
        }
        columns => {
            let correlation = id_columns
                .iter()
                .zip(columns)
                .map(|(staged, column)| {
                    format!(
                        "{}.{} = {}.{}",
                        STAGED_IDS_ALIAS,
                        backend.quote_identifier(staged),
                        step.table,
                        backend.quote_identifier(column)
                    )
                })
                .collect::<Vec<_>>()
                .join(" and ");
            format!(
                "exists (select 1 from ({}) {} where {})",
                subquery, STAGED_IDS_ALIAS, correlation
            )
        }
    }
}

pub(crate) fn apply_statement(
    operation: BulkOperationKind,
    step: &TableStep,
    restriction: &str,
) -> String {
    match operation {
        BulkOperationKind::Delete => format!("delete from {} where {}", step.table, restriction),
        BulkOperationKind::Update => format!(
            "update {} set {} where {}",
            step.table,
            step.set_clause.as_deref().unwrap_or_default(),
            restriction
        ),
    }
}
