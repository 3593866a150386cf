//! Application context for CLI command execution.
//!
//! # Example
//!
//! ```no_run
//! use liaison::app::App;
//! use liaison::domain::UserId;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let me = UserId::new("u-123");
//!     let payload = app.network().build_connection_network(&me, &me, true).await?;
//!     println!("{} connections", payload.summary.total);
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_liaison_root;
use crate::config::{CONFIG_FILE_NAME, LIAISON_DIR_NAME, LiaisonConfig};
use crate::error::{Error, Result};
use crate::lifecycle::ConnectionLifecycle;
use crate::network::NetworkService;
use crate::policy::PolicyMatrix;
use crate::storage::{NetworkStore, create_storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded repository: configuration, policy and storage.
pub struct App {
    store: Arc<dyn NetworkStore>,
    policy: Arc<PolicyMatrix>,
    config: LiaisonConfig,
    liaison_dir: PathBuf,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("liaison_dir", &self.liaison_dir)
            .field("config", &self.config)
            .field("store", &"<dyn NetworkStore>")
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App from `working_dir` or the nearest parent containing
    /// `.liaison/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No liaison repository is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage initialization fails
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_liaison_root(working_dir).ok_or_else(|| {
            Error::Config("Not a liaison repository. Run 'liaison init' first".to_string())
        })?;

        let liaison_dir = root_dir.join(LIAISON_DIR_NAME);
        let config = LiaisonConfig::load(&liaison_dir.join(CONFIG_FILE_NAME)).await?;

        let backend = config.storage.to_backend(&root_dir)?;
        let store: Arc<dyn NetworkStore> = Arc::from(create_storage(backend).await?);

        Ok(Self {
            store,
            policy: Arc::new(config.policy_matrix()),
            config,
            liaison_dir,
        })
    }

    /// Shared storage.
    pub fn store(&self) -> &dyn NetworkStore {
        self.store.as_ref()
    }

    /// Effective connection policy.
    pub fn policy(&self) -> &PolicyMatrix {
        &self.policy
    }

    /// Loaded configuration.
    pub fn config(&self) -> &LiaisonConfig {
        &self.config
    }

    /// Path to the `.liaison` directory.
    pub fn liaison_dir(&self) -> &Path {
        &self.liaison_dir
    }

    /// Network query service over this repository.
    pub fn network(&self) -> NetworkService {
        NetworkService::new(Arc::clone(&self.store), Arc::clone(&self.policy))
            .with_suggestion_limit(self.config.network.suggestion_limit)
    }

    /// Lifecycle manager over this repository.
    pub fn lifecycle(&self) -> ConnectionLifecycle {
        ConnectionLifecycle::new(Arc::clone(&self.store), Arc::clone(&self.policy))
    }

    /// Save storage state. Call after any mutating operation.
    ///
    /// # Errors
    ///
    /// Propagates storage write failures.
    pub async fn save(&self) -> Result<()> {
        self.store.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::domain::{Role, User, UserId};
    use crate::lifecycle::ConnectionRequest;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_initialized_directory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), false).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        assert!(app.liaison_dir().ends_with(".liaison"));
        assert_eq!(app.config().network.suggestion_limit, 8);
    }

    #[tokio::test]
    async fn test_app_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let err = App::from_directory(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("liaison init"));
    }

    #[tokio::test]
    async fn test_changes_persist_across_apps() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), false).await.unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();
        app.store().upsert_user(User::new("a", Role::User)).await.unwrap();
        app.store().upsert_user(User::new("b", Role::Company)).await.unwrap();
        let connection = app
            .lifecycle()
            .request(ConnectionRequest::new("a", "b"))
            .await
            .unwrap();
        app.save().await.unwrap();

        let reopened = App::from_directory(temp_dir.path()).await.unwrap();
        assert!(reopened
            .store()
            .get_connection(&connection.id)
            .await
            .unwrap()
            .is_some());
        let pending = reopened
            .store()
            .pending_connections_for(&UserId::new("b"))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
