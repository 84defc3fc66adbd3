//! Repository discovery: file lookup, directory walks, git and package metadata.
//!
//! Everything the section extractors know about a repository comes through
//! [`RepoScanner`]. Walks are sorted by file name so generated pages are
//! stable across runs, and configured directories (`node_modules`, `.git`,
//! build output, virtualenvs) are never descended into.

mod git;
mod project;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use repodocs_shared::{RepoDocsError, Result, ScanConfig};
use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

pub use git::{GithubRemote, github_remote, parse_github_url, recent_commits};
pub use project::{PackageJson, project_info, read_package_json};

/// Directory-name fragments that mark a test tree.
const TEST_MARKERS: &[&str] = &["test", "tests", "spec", "specs"];

/// Extensions listed under "Test Structure".
const TEST_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "cpp", "rs"];

/// Extensions copied into the site's `static/` directory.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

/// Extensions treated as prose documentation.
const DOC_EXTENSIONS: &[&str] = &["md", "rst"];

// ---------------------------------------------------------------------------
// RepoScanner
// ---------------------------------------------------------------------------

/// Read-only view of a repository on disk.
#[derive(Debug, Clone)]
pub struct RepoScanner {
    root: PathBuf,
    skip_dirs: HashSet<String>,
    excluded: Vec<PathBuf>,
}

impl RepoScanner {
    /// Open a scanner over `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>, config: &ScanConfig) -> Result<Self> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|e| RepoDocsError::io(root, e))?;

        if !root.is_dir() {
            return Err(RepoDocsError::validation(format!(
                "repository path {} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root,
            skip_dirs: config.skip_dirs.iter().cloned().collect(),
            excluded: Vec::new(),
        })
    }

    /// Never descend into `dir` (e.g. a site output directory that lives
    /// inside the repository). Paths that do not exist are ignored.
    pub fn exclude(mut self, dir: &Path) -> Self {
        if let Ok(dir) = std::fs::canonicalize(dir) {
            if dir != self.root {
                self.excluded.push(dir);
            }
        }
        self
    }

    /// Canonical repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final component of the root path (the default project name).
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    /// Absolute path for a root-relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a root-relative path exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Path relative to the root, always `/`-separated.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read a file as UTF-8.
    pub fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| RepoDocsError::io(path, e))
    }

    /// Read the first of `candidates` (root-relative) that exists.
    pub fn read_first(&self, candidates: &[&str]) -> Result<Option<String>> {
        for candidate in candidates {
            let path = self.path(candidate);
            if path.is_file() {
                return self.read(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Find a file by exact name anywhere in the tree, preferring the
    /// shallowest match.
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        self.walk(&self.root)
            .filter(|e| e.file_type().is_file() && e.file_name() == name)
            .min_by_key(|e| e.depth())
            .map(DirEntry::into_path)
    }

    /// All files with one of `extensions`, sorted by path.
    #[instrument(skip(self))]
    pub fn source_files(&self, extensions: &[&str]) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = self
            .walk(&self.root)
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
            .map(DirEntry::into_path)
            .collect();
        debug!(count = files.len(), "collected source files");
        files
    }

    /// `(directory, file name)` pairs for source files inside test trees,
    /// sorted. Directories are root-relative.
    pub fn test_files(&self) -> Vec<(String, String)> {
        let mut files: Vec<(String, String)> = self
            .walk(&self.root)
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), TEST_EXTENSIONS))
            .filter_map(|e| {
                let dir = self.relative(e.path().parent()?);
                let lowered = dir.to_lowercase();
                TEST_MARKERS
                    .iter()
                    .any(|m| lowered.contains(m))
                    .then(|| (dir, e.file_name().to_string_lossy().into_owned()))
            })
            .collect();
        files.sort();
        files
    }

    /// Prose documents (`.md`, `.rst`) under a root-relative directory.
    pub fn markdown_files(&self, relative_dir: &str) -> Vec<PathBuf> {
        let dir = self.path(relative_dir);
        if !dir.is_dir() {
            return Vec::new();
        }
        self.walk(&dir)
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), DOC_EXTENSIONS))
            .map(DirEntry::into_path)
            .collect()
    }

    /// Image files anywhere in the tree.
    pub fn image_files(&self) -> Vec<PathBuf> {
        self.walk(&self.root)
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), IMAGE_EXTENSIONS))
            .map(DirEntry::into_path)
            .collect()
    }

    /// Names of entries in a root-relative directory whose name starts with
    /// `prefix` (the `config/auth.*` style lookups).
    pub fn names_with_prefix(&self, relative_dir: &str, prefix: &str) -> Vec<String> {
        let dir = self.path(relative_dir);
        if !dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(prefix))
            .collect()
    }

    /// Indented listing of the repository: each directory as `name/`, its
    /// files first, then its subdirectories, four spaces per level.
    pub fn project_tree(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| !self.is_skipped(e))
            .filter_map(std::result::Result::ok)
            .map(|e| {
                let indent = " ".repeat(4 * e.depth());
                let name = if e.depth() == 0 {
                    self.dir_name()
                } else {
                    e.file_name().to_string_lossy().into_owned()
                };
                if e.file_type().is_dir() {
                    format!("{indent}{name}/")
                } else {
                    format!("{indent}{name}")
                }
            })
            .collect()
    }

    /// Sorted walk below `dir` that never enters skipped directories.
    fn walk<'a>(&'a self, dir: &Path) -> impl Iterator<Item = DirEntry> + 'a {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    None
                }
            })
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && (self
                .skip_dirs
                .contains(entry.file_name().to_string_lossy().as_ref())
                || self.excluded.iter().any(|dir| dir == entry.path()))
    }
}

/// Case-insensitive extension check.
fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
