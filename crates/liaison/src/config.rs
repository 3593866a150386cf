//! Configuration for a liaison repository.
//!
//! Stored as YAML in `.liaison/config.yaml`:
//!
//! ```yaml
//! storage:
//!   backend: jsonl
//!   users_file: .liaison/users.jsonl
//!   connections_file: .liaison/connections.jsonl
//! policy:
//!   mentor: [user, freelancer, company, mentor, headhunter]
//! network:
//!   suggestion_limit: 8
//! ```
//!
//! `policy` entries replace the built-in allowed set for the listed roles
//! only; every other role keeps its built-in rules.

use crate::domain::Role;
use crate::error::{Error, Result};
use crate::network::DEFAULT_SUGGESTION_LIMIT;
use crate::policy::PolicyMatrix;
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the liaison directory
pub const LIAISON_DIR_NAME: &str = ".liaison";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the users data file
pub const USERS_FILE_NAME: &str = "users.jsonl";

/// Name of the connections data file
pub const CONNECTIONS_FILE_NAME: &str = "connections.jsonl";

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiaisonConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Per-role overrides of the connection policy
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub policy: BTreeMap<Role, Vec<Role>>,

    /// Network query settings
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Backend type: "jsonl" (persistent) or "memory" (ephemeral)
    pub backend: String,

    /// Users file, relative to the repository root
    pub users_file: String,

    /// Connections file, relative to the repository root
    pub connections_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "jsonl".to_string(),
            users_file: format!("{LIAISON_DIR_NAME}/{USERS_FILE_NAME}"),
            connections_file: format!("{LIAISON_DIR_NAME}/{CONNECTIONS_FILE_NAME}"),
        }
    }
}

impl StorageConfig {
    /// Resolve the backend against the repository root.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend name or a data file
    /// path that escapes the repository root.
    pub fn to_backend(&self, root: &Path) -> Result<StorageBackend> {
        match self.backend.trim() {
            "memory" => Ok(StorageBackend::InMemory),
            "jsonl" => Ok(StorageBackend::Jsonl {
                users: resolve_data_path(root, &self.users_file)?,
                connections: resolve_data_path(root, &self.connections_file)?,
            }),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}'. Expected 'jsonl' or 'memory'"
            ))),
        }
    }
}

/// Network query settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Number of suggested connections per network
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

fn default_suggestion_limit() -> usize {
    DEFAULT_SUGGESTION_LIMIT
}

impl LiaisonConfig {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read or `Error::Config` if
    /// it is not valid configuration YAML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid {}: {e}", path.display())))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// The built-in matrix with this configuration's overrides applied.
    #[must_use]
    pub fn policy_matrix(&self) -> PolicyMatrix {
        PolicyMatrix::builtin().with_overrides(&self.policy)
    }
}

/// Join a configured data path onto `root`, rejecting absolute paths and
/// parent-directory components.
fn resolve_data_path(root: &Path, configured: &str) -> Result<PathBuf> {
    let relative = Path::new(configured.trim());
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));

    if configured.trim().is_empty() || escapes {
        return Err(Error::Config(format!(
            "Data file '{configured}' must be a relative path inside the repository"
        )));
    }
    Ok(root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        let config = LiaisonConfig::default();
        assert_eq!(config.storage.backend, "jsonl");
        assert_eq!(config.storage.users_file, ".liaison/users.jsonl");
        assert_eq!(config.network.suggestion_limit, 8);
        assert!(config.policy.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let mut original = LiaisonConfig::default();
        original.policy.insert(Role::Admin, vec![Role::Admin, Role::User]);
        original.network.suggestion_limit = 3;
        original.save(&path).await.unwrap();

        let loaded = LiaisonConfig::load(&path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = "\
storage:
  backend: memory
  users_file: u.jsonl
  connections_file: c.jsonl
";
        let config: LiaisonConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.network.suggestion_limit, DEFAULT_SUGGESTION_LIMIT);
        assert_eq!(
            config.storage.to_backend(Path::new("/repo")).unwrap(),
            StorageBackend::InMemory
        );
    }

    #[test]
    fn test_policy_overrides_apply() {
        let yaml = "\
storage:
  backend: jsonl
  users_file: .liaison/users.jsonl
  connections_file: .liaison/connections.jsonl
policy:
  admin: [admin, freelancer]
  freelancer: [admin, freelancer]
";
        let config: LiaisonConfig = serde_yaml::from_str(yaml).unwrap();
        let matrix = config.policy_matrix();
        assert!(matrix.is_allowed(Role::Admin, Role::Freelancer));
        assert!(!matrix.is_allowed(Role::Freelancer, Role::User));
        assert!(matrix.is_allowed(Role::User, Role::Company));
    }

    #[test]
    fn test_jsonl_backend_resolves_against_root() {
        let backend = StorageConfig::default()
            .to_backend(Path::new("/repo"))
            .unwrap();
        assert_eq!(
            backend,
            StorageBackend::Jsonl {
                users: PathBuf::from("/repo/.liaison/users.jsonl"),
                connections: PathBuf::from("/repo/.liaison/connections.jsonl"),
            }
        );
    }

    #[rstest]
    #[case::unknown_backend("sqlite", "u.jsonl", "unknown storage backend")]
    #[case::parent_dir("jsonl", "../u.jsonl", "relative path")]
    #[case::absolute("jsonl", "/etc/u.jsonl", "relative path")]
    #[case::blank("jsonl", "  ", "relative path")]
    fn test_to_backend_rejects(
        #[case] backend: &str,
        #[case] users_file: &str,
        #[case] expected: &str,
    ) {
        let config = StorageConfig {
            backend: backend.to_string(),
            users_file: users_file.to_string(),
            connections_file: "c.jsonl".to_string(),
        };
        let err = config.to_backend(Path::new("/repo")).unwrap_err();
        assert!(
            err.to_string().to_lowercase().contains(expected),
            "unexpected error: {err}"
        );
    }
}
