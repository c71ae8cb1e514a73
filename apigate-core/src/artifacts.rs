//! Persistence of fetched API definitions into a project.
//!
//! Definitions are written to `<project>/api_definitions/<name>_<version>.json`.
//! Everything is staged in a scratch directory inside the project first and
//! moved into place afterwards. On any failure the files already moved are
//! removed and the definitions they replaced are put back, leaving the
//! project as it was.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::publisher::ApiDefinition;

/// Directory inside a project that receives API definitions.
pub const DEFINITIONS_DIR: &str = "api_definitions";

const STAGING_DIR: &str = ".apigate-import";

const PREVIOUS_DIR: &str = "previous";

/// Error type for artifact persistence.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// I/O error writing a definition.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An API came back without a definition document.
    #[error("API {name} {version} has no definition")]
    MissingDefinition { name: String, version: String },

    /// Two APIs of one import map to the same file name.
    #[error("more than one API would be saved as {file_name}")]
    DuplicateFileName { file_name: String },
}

/// Write the definitions of `apis` into `project_dir`.
///
/// Returns the paths of the written files, in the order of `apis`. Files
/// from an earlier import that would be replaced are set aside first and put
/// back if the import fails.
pub fn save_definitions(
    project_dir: &Path,
    apis: &[ApiDefinition],
) -> Result<Vec<PathBuf>, ArtifactError> {
    let staging = project_dir.join(STAGING_DIR);
    let target_dir = project_dir.join(DEFINITIONS_DIR);

    let result = stage(&staging, apis).and_then(|staged| publish(&staged, &staging, &target_dir));

    if let Err(e) = fs::remove_dir_all(&staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staging directory {:?}: {}", staging, e);
        }
    }

    result
}

fn stage(staging: &Path, apis: &[ApiDefinition]) -> Result<Vec<(PathBuf, String)>, ArtifactError> {
    fs::create_dir_all(staging).map_err(|e| io_error(staging, e))?;

    let mut names = HashSet::with_capacity(apis.len());
    let mut staged = Vec::with_capacity(apis.len());
    for api in apis {
        let definition = api
            .api_definition
            .as_deref()
            .ok_or_else(|| ArtifactError::MissingDefinition {
                name: api.name.clone(),
                version: api.version.clone(),
            })?;

        let file_name = definition_file_name(api);
        if !names.insert(file_name.clone()) {
            return Err(ArtifactError::DuplicateFileName { file_name });
        }

        let path = staging.join(&file_name);
        fs::write(&path, pretty(definition)).map_err(|e| io_error(&path, e))?;
        staged.push((path, file_name));
    }
    Ok(staged)
}

/// Files moved into the target directory so far, and the earlier files they
/// replaced.
#[derive(Default)]
struct Published {
    moved: Vec<PathBuf>,
    replaced: Vec<(PathBuf, PathBuf)>,
}

impl Published {
    fn roll_back(&self, target_dir: &Path, created_dir: bool) {
        for path in &self.moved {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!("Failed to remove {:?} during rollback: {}", path, e);
            }
        }
        for (saved, original) in &self.replaced {
            if let Err(e) = fs::rename(saved, original) {
                tracing::warn!("Failed to restore {:?} during rollback: {}", original, e);
            }
        }
        if created_dir {
            if let Err(e) = fs::remove_dir_all(target_dir) {
                tracing::warn!("Failed to remove {:?} during rollback: {}", target_dir, e);
            }
        }
    }
}

fn publish(
    staged: &[(PathBuf, String)],
    staging: &Path,
    target_dir: &Path,
) -> Result<Vec<PathBuf>, ArtifactError> {
    let created_dir = !target_dir.exists();
    fs::create_dir_all(target_dir).map_err(|e| io_error(target_dir, e))?;

    let previous_dir = staging.join(PREVIOUS_DIR);
    let mut published = Published::default();

    for (path, file_name) in staged {
        let destination = target_dir.join(file_name);
        if let Err(e) = replace(path, &destination, &previous_dir, file_name, &mut published) {
            published.roll_back(target_dir, created_dir);
            return Err(e);
        }
    }
    Ok(published.moved)
}

fn replace(
    source: &Path,
    destination: &Path,
    previous_dir: &Path,
    file_name: &str,
    published: &mut Published,
) -> Result<(), ArtifactError> {
    if destination.is_file() {
        fs::create_dir_all(previous_dir).map_err(|e| io_error(previous_dir, e))?;
        let saved = previous_dir.join(file_name);
        fs::rename(destination, &saved).map_err(|e| io_error(destination, e))?;
        published.replaced.push((saved, destination.to_path_buf()));
    }

    fs::rename(source, destination).map_err(|e| io_error(destination, e))?;
    published.moved.push(destination.to_path_buf());
    Ok(())
}

/// File name for an API's definition, with unsafe characters replaced.
pub fn definition_file_name(api: &ApiDefinition) -> String {
    let sanitize = |value: &str| -> String {
        value
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' => c,
                _ => '_',
            })
            .collect::<String>()
            .trim_matches('.')
            .to_string()
    };
    format!("{}_{}.json", sanitize(&api.name), sanitize(&api.version))
}

/// Pretty-print JSON documents; anything else is written as-is.
fn pretty(definition: &str) -> String {
    serde_json::from_str::<serde_json::Value>(definition)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| definition.to_string())
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}
