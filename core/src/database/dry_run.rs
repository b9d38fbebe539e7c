use async_trait::async_trait;
use tracing::debug;

use crate::database::{ConnectionError, StagingConnection};

/// Records every statement instead of running it. Every statement reports
/// zero affected rows.
#[derive(Debug, Default)]
pub struct DryRunConnection {
    statements: Vec<String>,
}

impl DryRunConnection {
    pub fn new() -> Self {
        DryRunConnection::default()
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<String> {
        self.statements
    }
}

#[async_trait]
impl StagingConnection for DryRunConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64, ConnectionError> {
        debug!("Dry run statement: {}", sql);
        self.statements.push(sql.to_string());
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_records_statements() {
        let mut conn = DryRunConnection::new();

        assert_eq!(conn.execute("delete from a").await.unwrap(), 0);
        assert_eq!(conn.execute("delete from b").await.unwrap(), 0);

        assert_eq!(conn.statements(), ["delete from a", "delete from b"]);
    }
}
