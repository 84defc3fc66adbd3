//! Git metadata: recent history of the default branch and the GitHub remote.

use std::path::Path;
use std::sync::LazyLock;

use git2::{BranchType, Oid, Repository, Sort};
use regex::Regex;
use tracing::{debug, warn};

use repodocs_shared::{CommitSummary, RepoDocsError, Result};

static GITHUB_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com[:/]([^/]+)/([^/.]+)").expect("valid regex"));

/// Organization and repository parsed from a GitHub remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRemote {
    pub org: String,
    pub repo: String,
}

impl GithubRemote {
    /// Browsable `https://github.com/<org>/<repo>` URL.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.org, self.repo)
    }
}

/// Parse an HTTPS or SSH GitHub URL. A trailing `.git` is dropped.
pub fn parse_github_url(url: &str) -> Option<GithubRemote> {
    let caps = GITHUB_URL_RE.captures(url)?;
    Some(GithubRemote {
        org: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}

/// First GitHub remote of the repository at `root`, if any.
pub fn github_remote(root: &Path) -> Result<Option<GithubRemote>> {
    let repo = open(root)?;
    let remotes = repo.remotes().map_err(git_err)?;

    for name in remotes.iter().flatten() {
        let remote = match repo.find_remote(name) {
            Ok(remote) => remote,
            Err(e) => {
                debug!(remote = name, error = %e, "unreadable remote");
                continue;
            }
        };
        if let Some(parsed) = remote.url().and_then(parse_github_url) {
            return Ok(Some(parsed));
        }
    }

    Ok(None)
}

/// The last `limit` commits of the default branch, newest first.
///
/// Failures never abort a run: a missing repository or branch is logged
/// and yields an empty list.
pub fn recent_commits(root: &Path, limit: usize) -> Vec<CommitSummary> {
    match try_recent_commits(root, limit) {
        Ok(commits) => commits,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "could not read git history");
            Vec::new()
        }
    }
}

fn try_recent_commits(root: &Path, limit: usize) -> Result<Vec<CommitSummary>> {
    let repo = open(root)?;
    let tip = default_branch_tip(&repo)?;

    let mut walk = repo.revwalk().map_err(git_err)?;
    walk.push(tip).map_err(git_err)?;
    walk.set_sorting(Sort::TIME).map_err(git_err)?;

    let mut commits = Vec::new();
    for oid in walk.take(limit) {
        let commit = repo.find_commit(oid.map_err(git_err)?).map_err(git_err)?;
        let date = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        commits.push(CommitSummary {
            date,
            summary: commit.summary().unwrap_or_default().to_string(),
        });
    }

    debug!(count = commits.len(), "read recent commits");
    Ok(commits)
}

/// Resolve the default branch: the checked-out branch, then whatever
/// `origin/HEAD` points at, then `main`, then `master`.
fn default_branch_tip(repo: &Repository) -> Result<Oid> {
    if let Ok(head) = repo.head() {
        if head.is_branch() {
            if let Some(oid) = head.target() {
                return Ok(oid);
            }
        }
    }

    if let Ok(origin_head) = repo.find_reference("refs/remotes/origin/HEAD") {
        let target = origin_head
            .symbolic_target()
            .and_then(|name| repo.find_reference(name).ok())
            .and_then(|r| r.target());
        if let Some(oid) = target {
            return Ok(oid);
        }
    }

    for name in ["main", "master"] {
        if let Ok(branch) = repo.find_branch(name, BranchType::Local) {
            if let Some(oid) = branch.get().target() {
                return Ok(oid);
            }
        }
    }

    Err(RepoDocsError::Git("could not determine default branch".into()))
}

fn open(root: &Path) -> Result<Repository> {
    Repository::open(root).map_err(git_err)
}

fn git_err(e: git2::Error) -> RepoDocsError {
    RepoDocsError::Git(e.message().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{RepositoryInitOptions, Signature, Time};

    fn init(dir: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(dir, &opts).unwrap()
    }

    fn commit(repo: &Repository, secs: i64, message: &str) -> Oid {
        let sig = Signature::new("Dev", "dev@example.com", &Time::new(secs, 0)).unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn parse_https_and_ssh_urls() {
        let https = parse_github_url("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(https.org, "acme");
        assert_eq!(https.repo, "widgets");
        assert_eq!(https.url(), "https://github.com/acme/widgets");

        let ssh = parse_github_url("git@github.com:acme/widgets.git").unwrap();
        assert_eq!(ssh, https);

        assert!(parse_github_url("https://gitlab.com/acme/widgets").is_none());
    }

    #[test]
    fn recent_commits_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init(tmp.path());
        commit(&repo, 1_700_000_000, "Initial commit");
        commit(&repo, 1_700_100_000, "Add parser\n\nLonger body.");

        let commits = recent_commits(tmp.path(), 20);
        assert_eq!(
            commits,
            vec![
                CommitSummary {
                    date: "2023-11-16".into(),
                    summary: "Add parser".into()
                },
                CommitSummary {
                    date: "2023-11-14".into(),
                    summary: "Initial commit".into()
                },
            ]
        );
    }

    #[test]
    fn recent_commits_respects_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init(tmp.path());
        for i in 0..5 {
            commit(&repo, 1_700_000_000 + i * 60, &format!("commit {i}"));
        }
        let commits = recent_commits(tmp.path(), 3);
        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].summary, "commit 4");
    }

    #[test]
    fn detached_head_falls_back_to_main() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init(tmp.path());
        let first = commit(&repo, 1_700_000_000, "first");
        commit(&repo, 1_700_000_600, "second");
        repo.set_head_detached(first).unwrap();

        let commits = recent_commits(tmp.path(), 20);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].summary, "second");
    }

    #[test]
    fn no_repository_yields_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(recent_commits(tmp.path(), 20).is_empty());
    }

    #[test]
    fn unborn_branch_yields_empty() {
        let tmp = tempfile::tempdir().unwrap();
        init(tmp.path());
        assert!(recent_commits(tmp.path(), 20).is_empty());
    }

    #[test]
    fn github_remote_from_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init(tmp.path());
        repo.remote("origin", "git@github.com:acme/widgets.git")
            .unwrap();

        let remote = github_remote(tmp.path()).unwrap().unwrap();
        assert_eq!(remote.repo, "widgets");
    }

    #[test]
    fn github_remote_none_for_other_hosts() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = init(tmp.path());
        repo.remote("origin", "https://gitlab.com/acme/widgets.git")
            .unwrap();
        assert!(github_remote(tmp.path()).unwrap().is_none());
    }
}
