use std::collections::HashMap;

use async_trait::async_trait;

use crate::database::{ConnectionError, StagingConnection};

const SESSION_COLUMN: &str = "bulk_sess_id";

/// In-memory stand-in for a database, understanding just enough of the
/// generated statements to play the protocol through.
///
/// Entity rows are stored as the identifier they belong to. A predicate is
/// matched by its text and yields the identifiers still present in its root
/// table; staging rows remember the session token stamped on them.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnection {
    statements: Vec<String>,
    tables: HashMap<String, Vec<i64>>,
    predicates: Vec<(String, String, Vec<i64>)>,
    staging_tables: HashMap<String, Vec<(i64, Option<String>)>>,
    failing: Vec<String>,
}

impl ScriptedConnection {
    pub(crate) fn new() -> Self {
        ScriptedConnection::default()
    }

    pub(crate) fn with_table(mut self, table: &str, ids: Vec<i64>) -> Self {
        self.tables.insert(table.to_string(), ids);
        self
    }

    pub(crate) fn with_predicate(mut self, predicate: &str, root_table: &str, ids: Vec<i64>) -> Self {
        self.predicates.push((predicate.to_string(), root_table.to_string(), ids));
        self
    }

    /// Staging table left behind by another session or process.
    pub(crate) fn with_staging_rows(
        mut self,
        table: &str,
        rows: Vec<(i64, Option<&str>)>,
    ) -> Self {
        self.staging_tables.insert(
            table.to_string(),
            rows.into_iter().map(|(id, token)| (id, token.map(str::to_string))).collect(),
        );
        self
    }

    /// Every statement containing `fragment` fails.
    pub(crate) fn fail_on(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    pub(crate) fn statements(&self) -> &[String] {
        &self.statements
    }

    pub(crate) fn take_statements(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }

    pub(crate) fn rows(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }

    pub(crate) fn staged(&self, table: &str) -> Option<&[(i64, Option<String>)]> {
        self.staging_tables.get(table).map(Vec::as_slice)
    }

    fn matching(&self, sql: &str) -> Vec<i64> {
        self.predicates
            .iter()
            .find(|(predicate, _, _)| sql.contains(predicate.as_str()))
            .map(|(_, root, ids)| {
                let present = self.tables.get(root).cloned().unwrap_or_default();
                ids.iter().copied().filter(|id| present.contains(id)).collect()
            })
            .unwrap_or_default()
    }

    fn referenced_staging_table(&self, sql: &str) -> Option<&String> {
        self.staging_tables.keys().find(|name| {
            let needle = format!("from {}", name);
            sql.match_indices(&needle).any(|(at, _)| {
                matches!(sql[at + needle.len()..].chars().next(), None | Some(' ') | Some(')'))
            })
        })
    }

    fn ids_for(&self, sql: &str) -> Vec<i64> {
        match self.referenced_staging_table(sql) {
            Some(name) => {
                let token = session_in(sql);
                self.staging_tables[name]
                    .iter()
                    .filter(|(_, row_token)| token.is_none() || *row_token == token)
                    .map(|(id, _)| *id)
                    .collect()
            }
            None => self.matching(sql),
        }
    }

    fn run(&mut self, sql: &str) -> Result<u64, String> {
        let tokens: Vec<&str> = sql.split_whitespace().collect();

        if sql.starts_with("create") {
            let name = created_table_name(&tokens).ok_or("no table name")?;
            if self.staging_tables.contains_key(&name) {
                return if sql.contains("if not exists") {
                    Ok(0)
                } else {
                    Err(format!("table {} already exists", name))
                };
            }
            let rows: Vec<(i64, Option<String>)> = if sql.contains(" as select ") {
                self.matching(sql).into_iter().map(|id| (id, session_in(sql))).collect()
            } else {
                vec![]
            };
            let count = rows.len() as u64;
            self.staging_tables.insert(name, rows);
            return Ok(count);
        }

        if sql.starts_with("select 1 from") {
            return if self.staging_tables.contains_key(tokens[3]) {
                Ok(0)
            } else {
                Err(format!("table {} does not exist", tokens[3]))
            };
        }

        if sql.starts_with("insert into") {
            let name = tokens[2].to_string();
            if !self.staging_tables.contains_key(&name) {
                return Err(format!("table {} does not exist", name));
            }
            let token = session_in(sql);
            let rows: Vec<(i64, Option<String>)> =
                self.matching(sql).into_iter().map(|id| (id, token.clone())).collect();
            let count = rows.len() as u64;
            self.staging_tables.entry(name).or_default().extend(rows);
            return Ok(count);
        }

        if sql.starts_with("drop") {
            let name = tokens[tokens.len() - 1];
            return match self.staging_tables.remove(name) {
                Some(_) => Ok(0),
                None => Err(format!("table {} does not exist", name)),
            };
        }

        if sql.starts_with("truncate table") {
            let rows = self.staging_tables.get_mut(tokens[2]).ok_or("no such table")?;
            let count = rows.len() as u64;
            rows.clear();
            return Ok(count);
        }

        if sql.starts_with("delete from") && self.staging_tables.contains_key(tokens[2]) {
            let token = session_in(sql);
            let rows = self.staging_tables.get_mut(tokens[2]).ok_or("no such table")?;
            let before = rows.len();
            rows.retain(|(_, row_token)| token.is_some() && *row_token != token);
            return Ok((before - rows.len()) as u64);
        }

        let (table, delete) = if sql.starts_with("delete from") {
            (tokens[2], true)
        } else if sql.starts_with("update") {
            (tokens[1], false)
        } else {
            return Err(format!("unexpected statement {}", sql));
        };

        let ids = self.ids_for(sql);
        let rows = self.tables.get_mut(table).ok_or(format!("table {} does not exist", table))?;
        let count = rows.iter().filter(|id| ids.contains(id)).count() as u64;
        if delete {
            rows.retain(|id| !ids.contains(id));
        }
        Ok(count)
    }
}

fn created_table_name(tokens: &[&str]) -> Option<String> {
    let at = tokens.iter().position(|t| *t == "table")?;
    tokens[at + 1..]
        .iter()
        .find(|t| !matches!(**t, "if" | "not" | "exists"))
        .map(|t| t.to_string())
}

fn session_in(sql: &str) -> Option<String> {
    let filter = format!("{} = '", SESSION_COLUMN);
    if let Some(start) = sql.find(&filter) {
        return sql[start + filter.len()..].split('\'').next().map(str::to_string);
    }
    let end = sql.find(&format!("' as {}", SESSION_COLUMN))?;
    let start = sql[..end].rfind('\'')?;
    Some(sql[start + 1..end].to_string())
}

#[async_trait]
impl StagingConnection for ScriptedConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, ConnectionError> {
        self.statements.push(sql.to_string());
        if self.failing.iter().any(|fragment| sql.contains(fragment.as_str())) {
            return Err(ConnectionError::Backend(format!("scripted failure: {}", sql)));
        }
        self.run(sql).map_err(ConnectionError::Backend)
    }
}
