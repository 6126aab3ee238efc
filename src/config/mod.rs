/// Configuration management for the Swarmflow backend
///
/// Handles server configuration, storage location, and runtime parameters.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Storage configuration for workflow persistence and file nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for the workflow database and file-node I/O (default: "data")
    /// Creates: {data_dir}/swarm.db
    pub data_dir: String,
}

impl StorageConfig {
    /// Path of the SQLite database holding saved workflows
    pub fn database_path(&self) -> String {
        format!("{}/swarm.db", self.data_dir)
    }

    /// Directory the file capabilities read and write under
    pub fn workspace_dir(&self) -> String {
        format!("{}/workspace", self.data_dir)
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("SWARMFLOW_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SWARMFLOW_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            storage: StorageConfig {
                data_dir: std::env::var("SWARMFLOW_DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string()),
            },
        }
    }
}
