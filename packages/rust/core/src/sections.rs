//! Per-section content extraction.
//!
//! Each of the ten documentation sections has an extractor that reads the
//! repository through [`RepoScanner`] and returns a Markdown body, or
//! nothing when the repository has no material for it. Extractors never
//! abort a run: errors become [`SectionOutcome::Failed`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use repodocs_discovery::{RepoScanner, recent_commits};
use repodocs_markdown::extract_section;
use repodocs_shared::{Document, Result};

// ---------------------------------------------------------------------------
// Section identifiers
// ---------------------------------------------------------------------------

/// The content sections of a generated site, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionId {
    Overview,
    Installation,
    Api,
    Guides,
    Contributing,
    Changelog,
    Deployment,
    Architecture,
    Testing,
    Security,
}

impl SectionId {
    /// Every section, in extraction order.
    pub const ALL: [SectionId; 10] = [
        Self::Overview,
        Self::Installation,
        Self::Api,
        Self::Guides,
        Self::Contributing,
        Self::Changelog,
        Self::Deployment,
        Self::Architecture,
        Self::Testing,
        Self::Security,
    ];

    /// Document id, file stem and sidebar reference.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Installation => "installation",
            Self::Api => "api",
            Self::Guides => "guides",
            Self::Contributing => "contributing",
            Self::Changelog => "changelog",
            Self::Deployment => "deployment",
            Self::Architecture => "architecture",
            Self::Testing => "testing",
            Self::Security => "security",
        }
    }

    /// Page title and sidebar label.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Installation => "Installation",
            Self::Api => "API",
            Self::Guides => "Guides & Tutorials",
            Self::Contributing => "Contributing",
            Self::Changelog => "Changelog",
            Self::Deployment => "Deployment",
            Self::Architecture => "Architecture",
            Self::Testing => "Testing",
            Self::Security => "Security",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// The section has content.
    Produced(Document),
    /// The repository has nothing for this section.
    Empty,
    /// The extractor hit an error; the section is skipped.
    Failed(String),
}

// ---------------------------------------------------------------------------
// File tables
// ---------------------------------------------------------------------------

const INSTALL_FILES: &[(&str, &[&str])] = &[
    ("Python", &["requirements.txt", "setup.py"]),
    ("Node.js", &["package.json"]),
    ("Java", &["pom.xml"]),
    ("Ruby", &["Gemfile"]),
    ("Rust", &["Cargo.toml"]),
];

const API_EXTENSIONS: &[&str] = &["py", "js", "java", "cpp", "h", "rs"];

const GUIDE_DIRS: &[&str] = &["docs", "doc", "guides", "tutorials"];

const DEPLOYMENT_FILES: &[(&str, &[&str])] = &[
    ("Docker", &["Dockerfile", "docker-compose.yml"]),
    ("Kubernetes", &[".kubernetes/", "k8s/"]),
    (
        "CI/CD",
        &[".github/workflows/", ".gitlab-ci.yml", "Jenkinsfile"],
    ),
    ("Scripts", &["deploy.sh", "deploy.py"]),
];

const ARCHITECTURE_DOCS: &[&str] = &["ARCHITECTURE.md", "docs/architecture.md", "docs/design.md"];

const TESTING_DOCS: &[&str] = &["TESTING.md", "docs/testing.md"];

const SECURITY_DOCS: &[&str] = &["SECURITY.md", ".github/SECURITY.md", "docs/security.md"];

const SECURITY_DEPENDENCY_FILES: &[&str] = &[
    "package-lock.json",
    "requirements.txt",
    "Gemfile.lock",
    "Cargo.lock",
];

const SECURITY_CI_FILES: &[&str] = &[
    ".github/workflows/codeql-analysis.yml",
    ".github/workflows/security.yml",
    ".snyk",
];

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+(\w+)").expect("valid regex"));

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"def\s+(\w+)\s*\(|fn\s+(\w+)\s*[<(]").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Runs the section extractors against one repository.
pub struct SectionExtractor<'a> {
    scanner: &'a RepoScanner,
    commit_limit: usize,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(scanner: &'a RepoScanner, commit_limit: usize) -> Self {
        Self {
            scanner,
            commit_limit,
        }
    }

    /// Extract one section.
    #[instrument(skip_all, fields(section = %id))]
    pub fn extract(&self, id: SectionId) -> SectionOutcome {
        let body = match id {
            SectionId::Overview => self.overview(),
            SectionId::Installation => self.installation(),
            SectionId::Api => self.api(),
            SectionId::Guides => self.guides(),
            SectionId::Contributing => self.contributing(),
            SectionId::Changelog => self.changelog(),
            SectionId::Deployment => self.deployment(),
            SectionId::Architecture => self.architecture(),
            SectionId::Testing => self.testing(),
            SectionId::Security => self.security(),
        };

        match body {
            Ok(Some(body)) => {
                debug!(len = body.len(), "section extracted");
                SectionOutcome::Produced(Document::new(id.as_str(), id.title(), body))
            }
            Ok(None) => SectionOutcome::Empty,
            Err(e) => {
                warn!(error = %e, "section extraction failed, skipping");
                SectionOutcome::Failed(e.to_string())
            }
        }
    }

    fn overview(&self) -> Result<Option<String>> {
        self.read_found("README.md")
    }

    fn installation(&self) -> Result<Option<String>> {
        let mut parts = Vec::new();

        if let Some(readme) = self.read_found("README.md")? {
            if let Some(section) = extract_section(&readme, "Installation", "Usage") {
                parts.push(section);
            }
        }

        for (lang, files) in INSTALL_FILES {
            for file in *files {
                let path = self.scanner.path(file);
                if path.is_file() {
                    let content = self.scanner.read(&path)?;
                    parts.push(format!("\n## {lang} Installation\n"));
                    parts.push(format!("```\n{content}\n```"));
                }
            }
        }

        Ok(non_empty(parts, "\n\n"))
    }

    fn api(&self) -> Result<Option<String>> {
        let mut lines = Vec::new();

        for path in self.scanner.source_files(API_EXTENSIONS) {
            let relative = self.scanner.relative(&path);
            let content = match self.scanner.read(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %relative, error = %e, "could not read source file");
                    continue;
                }
            };

            lines.push(format!("\n## {relative}\n"));

            let classes: Vec<&str> = CLASS_RE
                .captures_iter(&content)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .collect();
            if !classes.is_empty() {
                lines.push("\n### Classes\n".to_string());
                lines.extend(classes.iter().map(|name| format!("- `{name}`")));
            }

            let functions: Vec<&str> = FUNCTION_RE
                .captures_iter(&content)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str())
                .collect();
            if !functions.is_empty() {
                lines.push("\n### Functions\n".to_string());
                lines.extend(functions.iter().map(|name| format!("- `{name}()`")));
            }
        }

        Ok(non_empty(lines, "\n"))
    }

    fn guides(&self) -> Result<Option<String>> {
        let mut docs = Vec::new();
        for dir in GUIDE_DIRS {
            for path in self.scanner.markdown_files(dir) {
                match self.scanner.read(&path) {
                    Ok(content) => docs.push(content),
                    Err(e) => warn!(error = %e, "skipping unreadable guide"),
                }
            }
        }
        Ok(non_empty(docs, "\n\n---\n\n"))
    }

    fn contributing(&self) -> Result<Option<String>> {
        self.read_found("CONTRIBUTING.md")
    }

    fn changelog(&self) -> Result<Option<String>> {
        let mut parts = Vec::new();

        if let Some(changelog) = self.read_found("CHANGELOG.md")? {
            parts.push(changelog);
        }

        let commits = recent_commits(self.scanner.root(), self.commit_limit);
        if !commits.is_empty() {
            let entries: Vec<String> = commits
                .iter()
                .map(|c| format!("- {}: {}", c.date, c.summary))
                .collect();
            parts.push(format!("## Recent Changes\n\n{}", entries.join("\n")));
        }

        Ok(non_empty(parts, "\n\n"))
    }

    fn deployment(&self) -> Result<Option<String>> {
        let mut lines = Vec::new();

        for (category, files) in DEPLOYMENT_FILES {
            let found: Vec<&str> = files
                .iter()
                .copied()
                .filter(|f| self.scanner.exists(f))
                .collect();
            if found.is_empty() {
                continue;
            }

            lines.push(format!("\n## {category}\n"));
            lines.push(format!("Found configuration in: {}", found.join(", ")));

            for file in found {
                let path = self.scanner.path(file);
                if path.is_file() {
                    let content = self.scanner.read(&path)?;
                    lines.push(format!("\n### {file}\n```\n{content}\n```"));
                }
            }
        }

        Ok(non_empty(lines, "\n"))
    }

    fn architecture(&self) -> Result<Option<String>> {
        let mut lines = Vec::new();

        if let Some(doc) = self.scanner.read_first(ARCHITECTURE_DOCS)? {
            lines.push(doc);
        }

        lines.push("\n## Project Structure\n".to_string());
        lines.push("```".to_string());
        lines.extend(self.scanner.project_tree());
        lines.push("```".to_string());

        Ok(Some(lines.join("\n")))
    }

    fn testing(&self) -> Result<Option<String>> {
        let mut lines = Vec::new();

        if let Some(doc) = self.scanner.read_first(TESTING_DOCS)? {
            lines.push(doc);
        }

        let test_files = self.scanner.test_files();
        if !test_files.is_empty() {
            lines.push("\n## Test Structure\n".to_string());
            let mut current: Option<&str> = None;
            for (dir, file) in &test_files {
                if current != Some(dir.as_str()) {
                    current = Some(dir.as_str());
                    lines.push(format!("\n### {dir}/\n"));
                }
                lines.push(format!("- {file}"));
            }
        }

        Ok(non_empty(lines, "\n"))
    }

    fn security(&self) -> Result<Option<String>> {
        let mut lines = Vec::new();

        if let Some(doc) = self.scanner.read_first(SECURITY_DOCS)? {
            lines.push(doc);
        }

        let mut authentication = self.existing_names(&[".env.example"]);
        authentication.extend(self.scanner.names_with_prefix("config", "auth."));

        let categories = [
            ("Authentication", authentication),
            ("Dependencies", self.existing_names(SECURITY_DEPENDENCY_FILES)),
            ("CI Security", self.existing_names(SECURITY_CI_FILES)),
        ];

        for (category, found) in categories {
            if found.is_empty() {
                continue;
            }
            lines.push(format!("\n## {category}\n"));
            lines.push(format!(
                "Security configurations found in: {}",
                found.join(", ")
            ));
        }

        Ok(non_empty(lines, "\n"))
    }

    // -- helpers --

    /// Read the shallowest file with this name, if any.
    fn read_found(&self, name: &str) -> Result<Option<String>> {
        self.scanner
            .find_file(name)
            .map(|path| self.scanner.read(&path))
            .transpose()
    }

    /// File names (last path component) of the root-relative paths that exist.
    fn existing_names(&self, candidates: &[&str]) -> Vec<String> {
        candidates
            .iter()
            .filter(|c| self.scanner.path(c).is_file())
            .filter_map(|c| c.rsplit('/').next())
            .map(str::to_string)
            .collect()
    }
}

fn non_empty(parts: Vec<String>, separator: &str) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join(separator))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use repodocs_shared::ScanConfig;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn scanner(root: &Path) -> RepoScanner {
        RepoScanner::new(root, &ScanConfig::default()).unwrap()
    }

    fn produced(outcome: SectionOutcome) -> Document {
        match outcome {
            SectionOutcome::Produced(doc) => doc,
            other => panic!("expected produced section, got {other:?}"),
        }
    }

    #[test]
    fn section_ids_are_stable() {
        let ids: Vec<&str> = SectionId::ALL.iter().map(SectionId::as_str).collect();
        assert_eq!(
            ids,
            vec![
                "overview",
                "installation",
                "api",
                "guides",
                "contributing",
                "changelog",
                "deployment",
                "architecture",
                "testing",
                "security"
            ]
        );
        assert_eq!(SectionId::Guides.title(), "Guides & Tutorials");
    }

    #[test]
    fn empty_repository_only_produces_architecture() {
        let tmp = tempfile::tempdir().unwrap();
        let scanner = scanner(tmp.path());
        let extractor = SectionExtractor::new(&scanner, 20);

        for id in SectionId::ALL {
            let outcome = extractor.extract(id);
            if id == SectionId::Architecture {
                assert!(matches!(outcome, SectionOutcome::Produced(_)));
            } else {
                assert_eq!(outcome, SectionOutcome::Empty, "section {id}");
            }
        }
    }

    #[test]
    fn overview_uses_readme_with_section_id() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "README.md", "# Widgets\n\nHello.\n");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Overview));
        assert_eq!(doc.id, "overview");
        assert_eq!(doc.title, "Overview");
        assert_eq!(doc.body, "# Widgets\n\nHello.\n");
    }

    #[test]
    fn installation_combines_readme_and_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "README.md",
            "# Tool\n\n## Installation\n\npip install tool\n\n## Usage\n\nrun\n",
        );
        write(tmp.path(), "requirements.txt", "requests==2.0");
        write(tmp.path(), "Cargo.toml", "[package]\nname = \"tool\"");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Installation));
        assert!(doc.body.starts_with("## Installation\n\npip install tool"));
        assert!(!doc.body.contains("## Usage"));
        assert!(doc.body.contains("## Python Installation\n\n\n```\nrequests==2.0\n```"));
        assert!(doc.body.contains("## Rust Installation"));
        let python = doc.body.find("Python Installation").unwrap();
        let rust = doc.body.find("Rust Installation").unwrap();
        assert!(python < rust);
    }

    #[test]
    fn api_lists_classes_and_functions() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "pkg/app.py",
            "class App:\n    def run(self):\n        pass\n\ndef main():\n    pass\n",
        );
        write(tmp.path(), "src/lib.rs", "pub fn parse<T>(x: T) {}\nfn helper() {}\n");
        write(tmp.path(), "node_modules/dep/index.js", "function skipped() {}");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Api));
        assert_eq!(
            doc.body,
            "\n## pkg/app.py\n\n\n### Classes\n\n- `App`\n\n### Functions\n\n- `run()`\n- `main()`\n\n## src/lib.rs\n\n\n### Functions\n\n- `parse()`\n- `helper()`"
        );
        assert_eq!(doc.title, "API");
    }

    #[test]
    fn api_skips_undecodable_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blob.h"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
        write(tmp.path(), "ok.py", "def ok(): pass");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Api));
        assert!(!doc.body.contains("blob.h"));
        assert!(doc.body.contains("- `ok()`"));
    }

    #[test]
    fn guides_join_docs_with_rules() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/a.md", "First");
        write(tmp.path(), "guides/b.rst", "Second");
        write(tmp.path(), "docs/notes.txt", "ignored");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Guides));
        assert_eq!(doc.body, "First\n\n---\n\nSecond");
    }

    #[test]
    fn changelog_appends_recent_commits() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "CHANGELOG.md", "# Changelog");

        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = git2::Repository::init_opts(tmp.path(), &opts).unwrap();
        let sig = git2::Signature::new("Dev", "dev@example.com", &git2::Time::new(1_700_000_000, 0))
            .unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();

        let scanner = scanner(tmp.path());
        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Changelog));
        assert_eq!(
            doc.body,
            "# Changelog\n\n## Recent Changes\n\n- 2023-11-14: Initial commit"
        );
    }

    #[test]
    fn deployment_groups_by_category() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "Dockerfile", "FROM alpine");
        write(tmp.path(), ".github/workflows/ci.yml", "on: push");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Deployment));
        assert!(doc.body.contains("\n## Docker\n\nFound configuration in: Dockerfile"));
        assert!(doc.body.contains("### Dockerfile\n```\nFROM alpine\n```"));
        assert!(doc.body.contains("## CI/CD\n\nFound configuration in: .github/workflows/"));
        assert!(!doc.body.contains("Kubernetes"));
    }

    #[test]
    fn architecture_prefers_doc_then_tree() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/design.md", "Design notes");
        write(tmp.path(), "ARCHITECTURE.md", "Top level");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Architecture));
        assert!(doc.body.starts_with("Top level\n\n## Project Structure\n\n```\n"));
        assert!(!doc.body.contains("Design notes"));
        assert!(doc.body.contains("    ARCHITECTURE.md"));
        assert!(doc.body.ends_with("```"));
    }

    #[test]
    fn testing_groups_files_by_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "tests/test_a.py", "");
        write(tmp.path(), "tests/unit/test_b.ts", "");
        write(tmp.path(), "tests/data.csv", "");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Testing));
        assert_eq!(
            doc.body,
            "\n## Test Structure\n\n\n### tests/\n\n- test_a.py\n\n### tests/unit/\n\n- test_b.ts"
        );
    }

    #[test]
    fn security_lists_found_configurations() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "SECURITY.md", "Report issues privately.");
        write(tmp.path(), ".env.example", "KEY=");
        write(tmp.path(), "config/auth.json", "{}");
        write(tmp.path(), "Cargo.lock", "");
        let scanner = scanner(tmp.path());

        let doc = produced(SectionExtractor::new(&scanner, 20).extract(SectionId::Security));
        assert!(doc.body.starts_with("Report issues privately."));
        assert!(doc.body.contains(
            "## Authentication\n\nSecurity configurations found in: .env.example, auth.json"
        ));
        assert!(doc.body.contains("Security configurations found in: Cargo.lock"));
        assert!(!doc.body.contains("CI Security"));
    }
}
