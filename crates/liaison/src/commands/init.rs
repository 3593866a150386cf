//! Implementation of the `init` command.
//!
//! Creates the `.liaison/` directory with configuration and empty data files.

use crate::config::{
    CONFIG_FILE_NAME, CONNECTIONS_FILE_NAME, LIAISON_DIR_NAME, LiaisonConfig, USERS_FILE_NAME,
};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .liaison
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the liaison root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created liaison directory
    pub liaison_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created users file
    pub users_file: PathBuf,
    /// Path to the created connections file
    pub connections_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// Whether an existing configuration was overwritten
    pub reinitialized: bool,
}

/// Initialize a liaison repository in `base_dir`.
///
/// With `force`, an existing `.liaison/` gets a fresh `config.yaml`; data
/// files that already exist are left untouched.
///
/// # Errors
///
/// Returns an error if:
/// - `.liaison/` already exists and `force` is false
/// - File system operations fail
pub async fn init(base_dir: &Path, force: bool) -> Result<InitResult> {
    let liaison_dir = base_dir.join(LIAISON_DIR_NAME);
    let reinitialized = liaison_dir.exists();

    if reinitialized && !force {
        return Err(Error::Config(format!(
            "Liaison is already initialized in this directory. Found existing '{LIAISON_DIR_NAME}' (use --force to reset the configuration)"
        )));
    }

    fs::create_dir_all(&liaison_dir).await?;

    let config_file = liaison_dir.join(CONFIG_FILE_NAME);
    LiaisonConfig::default().save(&config_file).await?;

    let users_file = liaison_dir.join(USERS_FILE_NAME);
    let connections_file = liaison_dir.join(CONNECTIONS_FILE_NAME);
    for data_file in [&users_file, &connections_file] {
        if !data_file.exists() {
            fs::write(data_file, "").await?;
        }
    }

    let gitignore_file = liaison_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Temporary files left by interrupted saves
*.tmp
";
    fs::write(&gitignore_file, gitignore_content).await?;

    tracing::debug!(dir = %liaison_dir.display(), reinitialized, "Initialized liaison repository");

    Ok(InitResult {
        liaison_dir,
        config_file,
        users_file,
        connections_file,
        gitignore_file,
        reinitialized,
    })
}

/// Returns `true` if `base_dir` contains a `.liaison/` directory.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(LIAISON_DIR_NAME).exists()
}

/// Find the directory containing `.liaison/`, starting at `start_dir` and
/// walking up through its parents.
///
/// Returns `None` if none is found within [`MAX_TRAVERSAL_DEPTH`] levels.
pub fn find_liaison_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if is_initialized(&current) {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_directory_structure() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path(), false).await.unwrap();

        assert!(result.liaison_dir.exists());
        assert!(result.config_file.exists());
        assert!(result.users_file.exists());
        assert!(result.connections_file.exists());
        assert!(result.gitignore_file.exists());
        assert!(!result.reinitialized);

        let config = LiaisonConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config, LiaisonConfig::default());
    }

    #[tokio::test]
    async fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), false).await.unwrap();

        let err = init(temp_dir.path(), false).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("already initialized"));
    }

    #[tokio::test]
    async fn test_force_keeps_existing_data() {
        let temp_dir = TempDir::new().unwrap();
        let first = init(temp_dir.path(), false).await.unwrap();

        let user = "{\"id\":\"u1\",\"role\":\"user\"}\n";
        tokio::fs::write(&first.users_file, user).await.unwrap();
        tokio::fs::write(&first.config_file, "garbage: [").await.unwrap();

        let second = init(temp_dir.path(), true).await.unwrap();
        assert!(second.reinitialized);
        assert_eq!(
            tokio::fs::read_to_string(&second.users_file).await.unwrap(),
            user
        );
        assert!(LiaisonConfig::load(&second.config_file).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_root_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init(temp_dir.path(), false).await.unwrap();

        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_liaison_root(&nested), Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_root_none() {
        let temp_dir = TempDir::new().unwrap();
        // tempdirs live under /tmp, which has no .liaison
        assert!(find_liaison_root(temp_dir.path()).is_none());
    }
}
