use std::{
    env,
    fs::File,
    io::Read,
    path::Path,
    sync::Arc,
};

use dotenv::dotenv;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    dialect::{
        AnsiBackend, BackendCapabilities, CustomBackend, HanaColumnStoreBackend,
        HanaRowStoreBackend, MySqlBackend, PostgresBackend,
    },
    staging::{CleanupPolicy, DEFAULT_SESSION_COLUMN, DEFAULT_STAGING_TABLE_PREFIX},
    strategy::StrategyKind,
};

pub const YAML_CONFIG_NAME: &str = "bulkid.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Ansi,
    Postgres,
    Mysql,
    HanaColumnStore,
    HanaRowStore,
    Custom(CustomBackend),
}

impl BackendConfig {
    pub fn capabilities(&self) -> Arc<dyn BackendCapabilities> {
        match self {
            BackendConfig::Ansi => Arc::new(AnsiBackend),
            BackendConfig::Postgres => Arc::new(PostgresBackend),
            BackendConfig::Mysql => Arc::new(MySqlBackend),
            BackendConfig::HanaColumnStore => Arc::new(HanaColumnStoreBackend),
            BackendConfig::HanaRowStore => Arc::new(HanaRowStoreBackend),
            BackendConfig::Custom(custom) => Arc::new(custom.clone()),
        }
    }

    /// Whether the generated statements can be sent to a Postgres connection.
    /// A custom profile is trusted to describe whatever it is run against.
    pub fn runs_on_postgres(&self) -> bool {
        matches!(self, BackendConfig::Postgres | BackendConfig::Custom(_))
    }
}

fn default_staging_table_prefix() -> String {
    DEFAULT_STAGING_TABLE_PREFIX.to_string()
}

fn default_session_column() -> String {
    DEFAULT_SESSION_COLUMN.to_string()
}

/// Naming of the staging objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSettings {
    #[serde(default = "default_staging_table_prefix")]
    pub table_prefix: String,

    #[serde(default = "default_session_column")]
    pub session_column: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        StagingSettings {
            table_prefix: default_staging_table_prefix(),
            session_column: default_session_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIdConfig {
    pub backend: BackendConfig,

    /// Forces a strategy instead of the best one the backend supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,

    /// Forces a cleanup policy instead of the one derived from the staging
    /// table's lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupPolicy>,

    #[serde(default)]
    pub staging: StagingSettings,
}

impl BulkIdConfig {
    pub fn new(backend: BackendConfig) -> Self {
        BulkIdConfig { backend, strategy: None, cleanup: None, staging: StagingSettings::default() }
    }

    pub fn backend(&self) -> Arc<dyn BackendCapabilities> {
        self.backend.capabilities()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadConfigError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse config: {0}")]
    CouldNotParseConfig(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] regex::Error),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),
}

fn substitute_env_variables(contents: &str) -> Result<String, ReadConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let mut missing = None;
    let result = re.replace_all(contents, |caps: &Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                error!("Environment variable {} not found", var_name);
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(ReadConfigError::EnvironmentVariableNotFound(var_name)),
        None => Ok(result.into_owned()),
    }
}

pub fn read_config(file_path: &Path) -> Result<BulkIdConfig, ReadConfigError> {
    dotenv().ok();

    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    contents = substitute_env_variables(&contents)?;

    let config: BulkIdConfig = serde_yaml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(YAML_CONFIG_NAME);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_only_postgres_compatible_backends_run_on_postgres() {
        assert!(BackendConfig::Postgres.runs_on_postgres());
        assert!(BackendConfig::Custom(CustomBackend::default()).runs_on_postgres());
        assert!(!BackendConfig::Mysql.runs_on_postgres());
        assert!(!BackendConfig::HanaColumnStore.runs_on_postgres());
        assert!(!BackendConfig::Ansi.runs_on_postgres());
    }

    #[test]
    fn test_read_config_defaults() {
        let (_dir, path) = write_config("backend:\n  type: hana_column_store\n");

        let config = read_config(&path).unwrap();

        assert_eq!(config.backend, BackendConfig::HanaColumnStore);
        assert_eq!(config.strategy, None);
        assert_eq!(config.cleanup, None);
        assert_eq!(config.staging, StagingSettings::default());
        assert_eq!(config.backend().name(), "hana_column_store");
    }

    #[test]
    fn test_read_config_custom_backend_and_overrides() {
        let (_dir, path) = write_config(
            r#"
backend:
  type: custom
  name: legacy
  max_identifier_length: 18
strategy: persistent
cleanup: clear_after_use
staging:
  table_prefix: bulk_
  session_column: sess
"#,
        );

        let config = read_config(&path).unwrap();

        match &config.backend {
            BackendConfig::Custom(custom) => {
                assert_eq!(custom.name, "legacy");
                assert_eq!(custom.max_identifier_length, 18);
                assert!(!custom.supports_global_temporary_tables);
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.strategy, Some(StrategyKind::Persistent));
        assert_eq!(config.cleanup, Some(CleanupPolicy::ClearAfterUse));
        assert_eq!(config.staging.table_prefix, "bulk_");
        assert_eq!(config.staging.session_column, "sess");
    }

    #[test]
    fn test_env_substitution() {
        env::set_var("BULKID_TEST_BACKEND", "mysql");
        let (_dir, path) = write_config("backend:\n  type: ${BULKID_TEST_BACKEND}\n");

        assert_eq!(read_config(&path).unwrap().backend, BackendConfig::Mysql);

        let (_dir, path) = write_config("backend:\n  type: ${BULKID_TEST_MISSING_VAR}\n");
        assert!(matches!(
            read_config(&path),
            Err(ReadConfigError::EnvironmentVariableNotFound(name)) if name == "BULKID_TEST_MISSING_VAR"
        ));
    }
}
