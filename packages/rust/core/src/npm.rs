//! npm tooling for the generated site: dependency install and dev server.

use std::path::Path;
use std::process::Stdio;

use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, instrument, warn};

use repodocs_shared::{RepoDocsError, Result};

use crate::site::write_file;

/// Packages a classic Docusaurus site needs.
const DOCUSAURUS_PACKAGES: &[&str] = &[
    "@docusaurus/core",
    "@docusaurus/preset-classic",
    "react",
    "react-dom",
];

fn npm_program() -> &'static str {
    if cfg!(windows) { "npm.cmd" } else { "npm" }
}

/// Install Docusaurus into `site_dir`.
///
/// Runs `npm init -y` when there is no `package.json`, installs the
/// Docusaurus packages, then sets the standard Docusaurus scripts.
#[instrument(skip_all, fields(dir = %site_dir.display()))]
pub async fn install(site_dir: &Path) -> Result<()> {
    if !site_dir.join("package.json").exists() {
        info!("initializing npm project");
        run_command(npm_program(), &["init", "-y"], site_dir).await?;
    }

    info!("installing Docusaurus dependencies");
    let mut args = vec!["install", "--save"];
    args.extend_from_slice(DOCUSAURUS_PACKAGES);
    run_command(npm_program(), &args, site_dir).await?;

    set_scripts(site_dir)
}

/// Start the Docusaurus development server. Returns when the server exits.
#[instrument(skip_all, fields(dir = %site_dir.display()))]
pub async fn start(site_dir: &Path) -> Result<()> {
    info!("starting Docusaurus development server");
    run_command(npm_program(), &["start"], site_dir).await
}

/// Replace the `scripts` block of `<site_dir>/package.json` with the
/// Docusaurus commands, keeping every other field.
pub fn set_scripts(site_dir: &Path) -> Result<()> {
    let path = site_dir.join("package.json");
    let content = std::fs::read_to_string(&path).map_err(|e| RepoDocsError::io(&path, e))?;

    let mut package: Map<String, Value> = serde_json::from_str(&content)
        .map_err(|e| RepoDocsError::parse(format!("{}: {e}", path.display())))?;

    package.insert(
        "scripts".into(),
        json!({
            "start": "docusaurus start",
            "build": "docusaurus build",
            "swizzle": "docusaurus swizzle",
            "deploy": "docusaurus deploy",
            "clear": "docusaurus clear",
            "serve": "docusaurus serve",
            "write-translations": "docusaurus write-translations",
            "write-heading-ids": "docusaurus write-heading-ids",
        }),
    );

    let json = serde_json::to_string_pretty(&package)
        .map_err(|e| RepoDocsError::parse(format!("package.json: {e}")))?;
    write_file(&path, &json)
}

/// Run a command in `cwd`, streaming stdout into the log line by line.
/// stderr is logged as errors when the command fails.
pub(crate) async fn run_command(program: &str, args: &[&str], cwd: &Path) -> Result<()> {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    info!(command = %command_line, "running command");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RepoDocsError::Command(format!("failed to run `{command_line}`: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RepoDocsError::Command("failed to capture stdout".into()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| RepoDocsError::Command("failed to capture stderr".into()))?;

    // stderr is drained on its own task while stdout streams.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Err(e) = stderr.read_to_string(&mut buf).await {
            debug!(error = %e, "could not read command stderr");
        }
        buf
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| RepoDocsError::Command(format!("reading output of `{command_line}`: {e}")))?
    {
        let line = line.trim();
        if !line.is_empty() {
            info!(target: "repodocs::npm", "{line}");
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| RepoDocsError::Command(format!("waiting for `{command_line}`: {e}")))?;
    let stderr_output = stderr_task.await.unwrap_or_default();

    if !status.success() {
        for line in stderr_output.lines().filter(|l| !l.trim().is_empty()) {
            error!(target: "repodocs::npm", "{}", line.trim());
        }
        return Err(RepoDocsError::Command(format!(
            "`{command_line}` failed with {status}"
        )));
    }

    if !stderr_output.trim().is_empty() {
        warn!(command = %command_line, "command wrote to stderr");
    }
    Ok(())
}
