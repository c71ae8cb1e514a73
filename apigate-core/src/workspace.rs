//! Install home and project locations.
//!
//! The install home holds the toolkit configuration (`conf/`) and is the
//! base for relative trust store paths. It comes from the `APIGATE_HOME`
//! environment variable, or the platform data directory when unset.
//! Projects live in the current working directory.

use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ImportError;

/// Environment variable overriding the install home.
pub const HOME_ENV: &str = "APIGATE_HOME";

/// Configuration file name inside `<home>/conf`.
pub const CONFIG_FILE_NAME: &str = "toolkit-config.toml";

/// Install home and working directory for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolkit {
    home: PathBuf,
    working_dir: PathBuf,
}

impl Toolkit {
    /// Create a toolkit rooted at explicit locations.
    pub fn new(home: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Locate the toolkit from the environment.
    pub fn from_env() -> Result<Self, ImportError> {
        let home = match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => ProjectDirs::from("io", "apigate", "apigate")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    ImportError::internal(format!(
                        "Unable to determine the install home; set {}.",
                        HOME_ENV
                    ))
                })?,
        };

        let working_dir = std::env::current_dir().map_err(|e| {
            tracing::error!("Failed to read the current directory: {}", e);
            ImportError::internal("Unable to determine the current directory.")
        })?;

        Ok(Self::new(home, working_dir))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory of the project named `project_name`.
    pub fn project_dir(&self, project_name: &str) -> PathBuf {
        self.working_dir.join(project_name)
    }

    /// Default location of the toolkit configuration file.
    pub fn default_config_path(&self) -> PathBuf {
        self.home.join("conf").join(CONFIG_FILE_NAME)
    }

    /// Make sure the install home layout exists.
    pub fn prepare(&self) -> Result<(), ImportError> {
        let conf = self.home.join("conf");
        fs::create_dir_all(&conf).map_err(|e| {
            tracing::error!("Failed to create {:?}: {}", conf, e);
            ImportError::internal("Error occurred while preparing the install home.")
        })?;
        tracing::debug!("Install home ready at {:?}", self.home);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let toolkit = Toolkit::new("/opt/apigate", "/work");
        assert_eq!(toolkit.project_dir("petstore"), PathBuf::from("/work/petstore"));
        assert_eq!(
            toolkit.default_config_path(),
            PathBuf::from("/opt/apigate/conf/toolkit-config.toml")
        );
    }

    #[test]
    fn test_prepare_creates_conf_dir() {
        let temp = TempDir::new().unwrap();
        let toolkit = Toolkit::new(temp.path().join("home"), temp.path());
        toolkit.prepare().unwrap();
        assert!(temp.path().join("home").join("conf").is_dir());
    }
}
