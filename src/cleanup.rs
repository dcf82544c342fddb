//! Setup and teardown actions
//!
//! Actions are declared in the suite header and run once before the first
//! scenario (setup) and once after the last (teardown). `api_call` actions
//! go through the runner's transport; everything else is delegated to a
//! [`CleanupHandler`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::common::{Error, Result};
use crate::engine::RequestTemplate;

/// One setup or teardown step
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Mark matching rows deleted instead of removing them
    SoftDeleteCleanup {
        table: String,
        #[serde(default)]
        condition: Option<String>,
    },
    /// Same as `soft_delete_cleanup`
    Cleanup {
        table: String,
        #[serde(default)]
        condition: Option<String>,
    },
    /// Raw SQL
    Sql { sql: String },
    /// HTTP request through the suite's transport
    ApiCall { request: RequestTemplate },
    /// Shell command run with `sh -c`
    Shell { command: String },
}

impl Action {
    /// Tag name as written in the scenario file
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SoftDeleteCleanup { .. } => "soft_delete_cleanup",
            Action::Cleanup { .. } => "cleanup",
            Action::Sql { .. } => "sql",
            Action::ApiCall { .. } => "api_call",
            Action::Shell { .. } => "shell",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Action::SoftDeleteCleanup { table, .. } | Action::Cleanup { table, .. } => {
                check_table(table)
            }
            Action::Sql { sql } if sql.trim().is_empty() => {
                Err(Error::Config("sql action requires a statement".into()))
            }
            Action::Shell { command } if command.trim().is_empty() => {
                Err(Error::Config("shell action requires a command".into()))
            }
            Action::ApiCall { request } => request.validate(),
            _ => Ok(()),
        }
    }
}

/// Executes the non-HTTP actions
#[async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn execute(&self, action: &Action) -> Result<()>;
}

/// Database access used by soft-delete and raw SQL actions
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute one statement, returning the number of affected rows
    async fn execute(&self, sql: &str) -> Result<u64>;
}

/// Build the soft-delete statement for `table`
pub fn soft_delete_statement(table: &str, condition: Option<&str>) -> Result<String> {
    check_table(table)?;

    let mut sql = format!(
        "UPDATE {table} SET soft_deleted = 1, deleted_at = NOW() WHERE soft_deleted = 0"
    );
    if let Some(condition) = condition.map(str::trim).filter(|c| !c.is_empty()) {
        sql.push_str(" AND ");
        sql.push_str(condition);
    }
    Ok(sql)
}

/// Table names are spliced into SQL, so only plain (optionally
/// schema-qualified) identifiers are accepted.
fn check_table(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(Error::Config("table name is required".into()));
    }

    let valid = table.split('.').all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid table name '{table}'")))
    }
}

/// Runs shell and database actions on the local machine
#[derive(Default)]
pub struct LocalCleanup {
    working_dir: Option<PathBuf>,
    sql: Option<Box<dyn SqlExecutor>>,
}

impl LocalCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory shell commands run in
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_sql_executor(mut self, executor: Box<dyn SqlExecutor>) -> Self {
        self.sql = Some(executor);
        self
    }

    async fn run_sql(&self, action: &Action, sql: &str) -> Result<()> {
        let executor = self
            .sql
            .as_ref()
            .ok_or_else(|| Error::cleanup(action.kind(), "no database configured"))?;

        let rows = executor
            .execute(sql)
            .await
            .map_err(|e| Error::cleanup(action.kind(), e.to_string()))?;

        tracing::info!(action = action.kind(), rows, "SQL executed");
        Ok(())
    }

    async fn run_shell(&self, command: &str) -> Result<()> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.args(["-c", command]);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| Error::cleanup("shell", format!("failed to run '{command}': {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::cleanup(
                "shell",
                format!("'{command}' exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(command, stdout = %stdout.trim(), "Shell action finished");
        Ok(())
    }
}

#[async_trait]
impl CleanupHandler for LocalCleanup {
    async fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::SoftDeleteCleanup { table, condition }
            | Action::Cleanup { table, condition } => {
                let sql = soft_delete_statement(table, condition.as_deref())
                    .map_err(|e| Error::cleanup(action.kind(), e.to_string()))?;
                self.run_sql(action, &sql).await
            }
            Action::Sql { sql } => self.run_sql(action, sql).await,
            Action::Shell { command } => self.run_shell(command).await,
            Action::ApiCall { .. } => Err(Error::cleanup(
                action.kind(),
                "api_call actions are executed by the runner",
            )),
        }
    }
}
