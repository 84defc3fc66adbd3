//! Application configuration for repodocs.
//!
//! User config lives at `~/.repodocs/repodocs.toml`.
//! A per-run site file (`--config`, YAML or TOML) overrides the `[site]`
//! section, and CLI flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RepoDocsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "repodocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".repodocs";

// ---------------------------------------------------------------------------
// Config structs (matching repodocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Docusaurus site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// AI enhancement settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Repository scanning settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// `[site]` section. Also the shape of the per-run `--config` file, which is
/// why the camelCase Docusaurus key names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public URL of the deployed site.
    #[serde(default = "default_site_url")]
    pub url: String,

    /// Base path the site is served under.
    #[serde(default = "default_base_url", alias = "baseUrl")]
    pub base_url: String,

    /// GitHub organization, used when the git remote does not name one.
    #[serde(default = "default_organization", alias = "organizationName")]
    pub organization_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            base_url: default_base_url(),
            organization_name: default_organization(),
        }
    }
}

fn default_site_url() -> String {
    "https://your-docusaurus-site.example.com".into()
}
fn default_base_url() -> String {
    "/".into()
}
fn default_organization() -> String {
    "your-org".into()
}

/// `[ai]` section.
///
/// API keys are never stored here, only the names of the environment
/// variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Model used when `--use-ai` is given without a value.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,

    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,
    #[serde(default = "default_openrouter_key_env")]
    pub openrouter_api_key_env: String,

    /// Env var holding the Azure OpenAI resource endpoint.
    #[serde(default = "default_azure_endpoint_env")]
    pub azure_endpoint_env: String,
    #[serde(default = "default_azure_key_env")]
    pub azure_api_key_env: String,
    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,

    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reuse previous completions for unchanged prompts.
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            openai_base_url: default_openai_base_url(),
            openai_api_key_env: default_openai_key_env(),
            openrouter_base_url: default_openrouter_base_url(),
            openrouter_api_key_env: default_openrouter_key_env(),
            azure_endpoint_env: default_azure_endpoint_env(),
            azure_api_key_env: default_azure_key_env(),
            azure_api_version: default_azure_api_version(),
            ollama_base_url: default_ollama_base_url(),
            timeout_secs: default_timeout_secs(),
            cache: true,
        }
    }
}

fn default_model() -> String {
    "openai/gpt-4o".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_azure_endpoint_env() -> String {
    "AZURE_OPENAI_ENDPOINT".into()
}
fn default_azure_key_env() -> String {
    "AZURE_OPENAI_API_KEY".into()
}
fn default_azure_api_version() -> String {
    "2024-06-01".into()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names never descended into.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Number of commits listed under "Recent Changes".
    #[serde(default = "default_commit_limit")]
    pub commit_limit: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: default_skip_dirs(),
            commit_limit: default_commit_limit(),
        }
    }
}

fn default_skip_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "__pycache__",
        "build",
        "dist",
        "venv",
        "env",
        "target",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}
fn default_commit_limit() -> usize {
    20
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.repodocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RepoDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.repodocs/repodocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RepoDocsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RepoDocsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Load a per-run site config file. `.yaml`/`.yml` files are read as YAML,
/// anything else as TOML. An empty file yields the defaults.
pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RepoDocsError::io(path, e))?;

    if content.trim().is_empty() {
        return Ok(SiteConfig::default());
    }

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );

    let parsed = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|e| RepoDocsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RepoDocsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RepoDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RepoDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named environment variable.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(RepoDocsError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("node_modules"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.site.base_url, "/");
        assert_eq!(parsed.ai.openai_api_key_env, "OPENAI_API_KEY");
        assert_eq!(parsed.scan.commit_limit, 20);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[site]
url = "https://docs.example.org"

[ai]
cache = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.site.url, "https://docs.example.org");
        assert_eq!(config.site.organization_name, "your-org");
        assert!(!config.ai.cache);
        assert_eq!(config.ai.timeout_secs, 120);
    }

    #[test]
    fn site_config_from_yaml_with_docusaurus_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yaml");
        std::fs::write(
            &path,
            "url: https://example.dev\nbaseUrl: /docs/\norganizationName: acme\n",
        )
        .unwrap();

        let site = load_site_config(&path).unwrap();
        assert_eq!(site.url, "https://example.dev");
        assert_eq!(site.base_url, "/docs/");
        assert_eq!(site.organization_name, "acme");
    }

    #[test]
    fn site_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "base_url = \"/handbook/\"\n").unwrap();

        let site = load_site_config(&path).unwrap();
        assert_eq!(site.base_url, "/handbook/");
        assert_eq!(site.url, "https://your-docusaurus-site.example.com");
    }

    #[test]
    fn empty_site_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yml");
        std::fs::write(&path, "\n").unwrap();

        let site = load_site_config(&path).unwrap();
        assert_eq!(site.base_url, "/");
    }

    #[test]
    fn malformed_site_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "url: [unterminated\n").unwrap();

        let err = load_site_config(&path).unwrap_err();
        assert!(matches!(err, RepoDocsError::Config { .. }));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let result = resolve_api_key("REPODOCS_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
