//! Inventory sources

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nimcust_exec::{CommandExecutor, CommandSpec};
use tracing::{debug, info, instrument};

use crate::error::InventoryError;
use crate::types::InventorySnapshot;

/// Provider of an inventory snapshot
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Read the snapshot once for the current run
    async fn load(&self) -> Result<InventorySnapshot, InventoryError>;

    /// Short description for diagnostics
    fn describe(&self) -> String;
}

/// Snapshot stored as a JSON file on the NIM master
#[derive(Debug, Clone)]
pub struct JsonFileInventory {
    path: PathBuf,
}

impl JsonFileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InventorySource for JsonFileInventory {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<InventorySnapshot, InventoryError> {
        debug!("reading inventory snapshot");

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| InventoryError::ReadFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let snapshot = InventorySnapshot::from_json(&content)?;
        info!(
            clients = snapshot.clients.len(),
            lpp_sources = snapshot.lpp_sources.len(),
            "loaded inventory snapshot"
        );

        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Snapshot printed as JSON on stdout by a collection command
pub struct CommandInventory {
    executor: Arc<dyn CommandExecutor>,
    command: CommandSpec,
}

impl CommandInventory {
    pub fn new(executor: Arc<dyn CommandExecutor>, command: CommandSpec) -> Self {
        Self { executor, command }
    }
}

#[async_trait]
impl InventorySource for CommandInventory {
    #[instrument(skip(self), fields(command = %self.command))]
    async fn load(&self) -> Result<InventorySnapshot, InventoryError> {
        debug!("collecting inventory snapshot");

        let result = self
            .executor
            .run(&self.command)
            .await
            .map_err(|e| InventoryError::ExecutionError(e.to_string()))?;

        if !result.success() {
            return Err(InventoryError::CommandFailed {
                status: result.status,
                stderr: result.stderr,
            });
        }

        InventorySnapshot::from_json(&result.stdout)
    }

    fn describe(&self) -> String {
        format!("command `{}`", self.command)
    }
}

/// Fixed in-memory snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    snapshot: InventorySnapshot,
}

impl StaticInventory {
    #[must_use]
    pub fn new(snapshot: InventorySnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn load(&self) -> Result<InventorySnapshot, InventoryError> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        "static snapshot".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use nimcust_exec::LocalExecutor;

    use super::*;

    #[tokio::test]
    async fn test_json_file_inventory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nim": {{"clients": {{"host1": {{"oslevel": "2023-01-01-0001"}}}},
                "lpp_sources": {{"2023-04-01-1234-lpp_source": {{}}}}}}}}"#
        )
        .unwrap();

        let source = JsonFileInventory::new(file.path());
        let snapshot = source.load().await.unwrap();

        assert_eq!(snapshot.oslevel("host1"), Some("2023-01-01-0001"));
        assert!(snapshot.has_lpp_source("2023-04-01-1234-lpp_source"));
    }

    #[tokio::test]
    async fn test_json_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileInventory::new(dir.path().join("absent.json"));

        let err = source.load().await.unwrap_err();
        assert!(matches!(err, InventoryError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_command_inventory() {
        let command = CommandSpec::new("sh").arg("-c").arg(
            r#"echo '{"nim": {"clients": {"host2": {"oslevel": "7200-05-03-2148"}}}}'"#,
        );
        let source = CommandInventory::new(Arc::new(LocalExecutor::new()), command);

        let snapshot = source.load().await.unwrap();
        assert_eq!(snapshot.oslevel("host2"), Some("7200-05-03-2148"));
    }

    #[tokio::test]
    async fn test_command_inventory_failure() {
        let command = CommandSpec::new("sh").arg("-c").arg("echo boom >&2; exit 2");
        let source = CommandInventory::new(Arc::new(LocalExecutor::new()), command);

        let err = source.load().await.unwrap_err();
        assert!(matches!(err, InventoryError::CommandFailed { status: 2, .. }));
    }
}
