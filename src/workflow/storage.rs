/// SQLite persistence for workflow definitions
///
/// Definitions are stored as a JSON column so the wire shape and the stored
/// shape stay identical, with indexed id/name columns for lookups. Listing
/// returns lightweight metadata only; the definition JSON is never parsed
/// for a list call.

use anyhow::Result;
use sqlx::{sqlite::SqlitePool, Row};

use crate::workflow::types::WorkflowDefinition;

/// SQLite-backed workflow store
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// Connection pool for the workflow database
    pool: SqlitePool,
}

/// Lightweight listing entry, definition JSON not included
#[derive(Debug, serde::Serialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub node_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkflowStorage {
    /// Create a storage instance over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the workflow schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                definition JSON NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_workflows_name
            ON workflows(name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or update a workflow definition
    ///
    /// UPSERT keeps create and update a single atomic statement and bumps
    /// updated_at on the update path.
    pub async fn save_workflow(&self, definition: &WorkflowDefinition) -> Result<()> {
        let definition_json = serde_json::to_string(definition)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, definition, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&definition.id)
        .bind(&definition.name)
        .bind(&definition_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one definition by id
    pub async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        let row = sqlx::query("SELECT definition FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition_json: String = row.get("definition");
                let definition: WorkflowDefinition = serde_json::from_str(&definition_json)?;
                Ok(Some(definition))
            }
            None => Ok(None),
        }
    }

    /// List stored workflows as metadata, most recently updated first
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowMetadata>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name,
                   json_array_length(definition, '$.nodes') AS node_count,
                   created_at, updated_at
            FROM workflows
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::new();
        for row in rows {
            workflows.push(WorkflowMetadata {
                id: row.get("id"),
                name: row.get("name"),
                node_count: row.get("node_count"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(workflows)
    }

    /// Delete a workflow; true when a row was removed
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
