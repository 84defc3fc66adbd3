//! Project identity from `package.json` and the git remote.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use repodocs_shared::{ProjectInfo, RepoDocsError, Result};

use crate::git::github_remote;

/// The subset of `package.json` that names a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    pub name: Option<String>,
    pub description: Option<String>,
    pub repository: Option<Repository>,
}

/// `repository` is either a bare URL or an object with a `url` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Detailed { url: Option<String> },
}

impl Repository {
    pub fn url(&self) -> Option<&str> {
        match self {
            Repository::Url(url) => Some(url),
            Repository::Detailed { url } => url.as_deref(),
        }
    }
}

/// Parse `<root>/package.json`. `Ok(None)` when the file does not exist.
pub fn read_package_json(root: &Path) -> Result<Option<PackageJson>> {
    let path = root.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| RepoDocsError::io(&path, e))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| RepoDocsError::parse(format!("{}: {e}", path.display())))
}

/// Build the project identity for the repository at `root`.
///
/// Starts from the directory name, applies `package.json` name, description
/// and repository URL, then lets a GitHub remote override the repository
/// name, URL and organization. Unreadable sources are logged and skipped.
pub fn project_info(root: &Path) -> ProjectInfo {
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let mut info = ProjectInfo::from_dir_name(&dir_name);

    match read_package_json(root) {
        Ok(Some(package)) => {
            if let Some(name) = package.name {
                info.project_name = name;
            }
            if let Some(description) = package.description {
                info.description = description;
            }
            if let Some(url) = package.repository.as_ref().and_then(Repository::url) {
                info.repo_url = url.to_string();
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "error reading package.json"),
    }

    match github_remote(root) {
        Ok(Some(remote)) => {
            info.repo_url = remote.url();
            info.repo_name = remote.repo;
            info.org_name = remote.org;
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "no git remote information"),
    }

    info
}
