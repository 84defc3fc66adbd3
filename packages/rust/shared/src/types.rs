//! Core domain types for generated documentation sites.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One generated docs page, written to `docs/<id>.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Docusaurus document id; also the file stem and the sidebar reference.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Label shown in the sidebar.
    pub sidebar_label: String,
    /// Route override (only the docs index uses one).
    pub slug: Option<String>,
    /// Markdown body, without frontmatter.
    pub body: String,
}

impl Document {
    /// Create a document whose sidebar label is its title.
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            sidebar_label: title.clone(),
            title,
            slug: None,
            body: body.into(),
        }
    }

    /// Set the route slug.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Replace the body, keeping the header fields.
    pub fn with_body(self, body: String) -> Self {
        Self { body, ..self }
    }
}

// ---------------------------------------------------------------------------
// ProjectInfo
// ---------------------------------------------------------------------------

/// Project identity merged from the directory name, `package.json` and git.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Display name (package name when available).
    pub project_name: String,
    /// Repository name (from the git remote when available).
    pub repo_name: String,
    /// One-line description.
    pub description: String,
    /// Browsable repository URL; empty when unknown.
    pub repo_url: String,
    /// GitHub organization; empty when unknown.
    pub org_name: String,
}

impl ProjectInfo {
    /// Defaults derived from the repository directory name alone.
    pub fn from_dir_name(name: &str) -> Self {
        Self {
            project_name: name.to_string(),
            repo_name: name.to_string(),
            description: format!("{name} Documentation"),
            repo_url: String::new(),
            org_name: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CommitSummary
// ---------------------------------------------------------------------------

/// A single line of recent git history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Commit date, `YYYY-MM-DD` in UTC.
    pub date: String,
    /// First line of the commit message.
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_label_defaults_to_title() {
        let doc = Document::new("guides", "Guides & Tutorials", "body");
        assert_eq!(doc.sidebar_label, "Guides & Tutorials");
        assert!(doc.slug.is_none());
    }

    #[test]
    fn document_builders() {
        let doc = Document::new("index", "Home", "old")
            .with_slug("/")
            .with_body("new".into());
        assert_eq!(doc.slug.as_deref(), Some("/"));
        assert_eq!(doc.body, "new");
        assert_eq!(doc.id, "index");
    }

    #[test]
    fn project_info_from_dir_name() {
        let info = ProjectInfo::from_dir_name("widgets");
        assert_eq!(info.project_name, "widgets");
        assert_eq!(info.description, "widgets Documentation");
        assert!(info.repo_url.is_empty());
    }

    #[test]
    fn commit_summary_serializes() {
        let c = CommitSummary {
            date: "2024-03-01".into(),
            summary: "Fix parser".into(),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"date\":\"2024-03-01\""));
    }
}
