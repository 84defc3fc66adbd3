//! AI text enhancement.
//!
//! Generated page bodies (and the homepage components) can be passed through
//! a chat-completion model for rewriting. Enhancement never fails a run: any
//! transport error, API error or empty answer is logged and the original
//! text is kept. Completions are cached on disk keyed by a hash of the model
//! and prompt, so regenerating an unchanged repository costs no requests.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use repodocs_shared::{AiConfig, RepoDocsError, Result, resolve_api_key};

use crate::site::write_file;

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Prompt used for targets without a dedicated one.
const DEFAULT_PROMPT: &str = "Enhance this documentation while maintaining accuracy: ";

/// Instruction prefix for an enhancement target (a section id, `index.js`
/// or `HomepageFeatures`).
pub fn prompt_for(target: &str) -> &'static str {
    match target {
        "overview" => {
            "Enhance this project overview to be more comprehensive and user-friendly while maintaining accuracy. Add clear sections for features, use cases, and key concepts if they're not already present: "
        }
        "installation" => {
            "Improve this installation guide by adding clear prerequisites, troubleshooting tips, and platform-specific instructions while maintaining accuracy: "
        }
        "api" => {
            "Enhance this API documentation by adding more detailed descriptions, usage examples, and parameter explanations while maintaining technical accuracy: "
        }
        "guides" => {
            "Improve these guides by adding more context, best practices, and common pitfalls while maintaining accuracy: "
        }
        "contributing" => {
            "Enhance these contributing guidelines by adding more specific examples, workflow descriptions, and best practices while maintaining accuracy: "
        }
        "changelog" => {
            "Improve this changelog by adding more context and grouping related changes while maintaining accuracy: "
        }
        "deployment" => {
            "Enhance this deployment documentation with more detailed steps, prerequisites, and troubleshooting while maintaining accuracy: "
        }
        "architecture" => {
            "Improve this architecture documentation by adding more context, design decisions, and component relationships while maintaining accuracy: "
        }
        "testing" => {
            "Enhance this testing documentation by adding more specific examples, test strategies, and coverage goals while maintaining accuracy: "
        }
        "security" => {
            "Improve this security documentation by adding more best practices, common vulnerabilities, and mitigation strategies while maintaining accuracy: "
        }
        "index.js" => {
            "Generate an engaging and informative homepage that clearly communicates the purpose of the documentation site and guides users to key sections: "
        }
        "HomepageFeatures" => {
            "Generate a set of appealing homepage feature blocks that highlight quick start instructions, main features, and repository links with inviting language: "
        }
        _ => DEFAULT_PROMPT,
    }
}

// ---------------------------------------------------------------------------
// Model ids
// ---------------------------------------------------------------------------

/// Completion backend named by the first segment of a model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    OpenRouter,
    Azure,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Azure => "azure",
            Self::Ollama => "ollama",
        }
    }
}

/// A `provider/model` id such as `openai/gpt-4o`, `azure/<deployment>`,
/// `ollama/llama3` or `openrouter/<vendor>/<model>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ModelSpec {
    type Err = RepoDocsError;

    fn from_str(s: &str) -> Result<Self> {
        let (provider, model) = s.trim().split_once('/').ok_or_else(|| {
            RepoDocsError::config(format!(
                "invalid model id '{s}': expected provider/model, e.g. openai/gpt-4o"
            ))
        })?;

        let provider = match provider.to_ascii_lowercase().as_str() {
            "openai" => Provider::OpenAi,
            "openrouter" => Provider::OpenRouter,
            "azure" => Provider::Azure,
            "ollama" => Provider::Ollama,
            other => {
                return Err(RepoDocsError::config(format!(
                    "unsupported model provider '{other}' (expected openai, openrouter, azure or ollama)"
                )));
            }
        };

        if model.is_empty() {
            return Err(RepoDocsError::config(format!(
                "invalid model id '{s}': model name is empty"
            )));
        }

        Ok(Self {
            provider,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider.as_str(), self.model)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// OpenAI-compatible `/chat/completions` response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Ollama `/api/chat` response.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: ChatMessage,
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Auth {
    /// `Authorization: Bearer <key>` (OpenAI, OpenRouter).
    Bearer(String),
    /// `api-key: <key>` (Azure OpenAI).
    ApiKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    /// OpenAI-compatible chat completions endpoint.
    Chat { url: String, auth: Auth },
    /// Ollama native chat endpoint.
    Ollama { url: String },
}

/// Resolve the endpoint and credentials for `spec`. `lookup` reads an
/// environment variable.
fn backend_for(
    spec: &ModelSpec,
    ai: &AiConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Backend> {
    let require = |var: &str, what: &str| {
        lookup(var).ok_or_else(|| {
            RepoDocsError::config(format!(
                "{what} not found. Set the {var} environment variable."
            ))
        })
    };

    let backend = match spec.provider {
        Provider::OpenAi => Backend::Chat {
            url: format!("{}/chat/completions", ai.openai_base_url.trim_end_matches('/')),
            auth: Auth::Bearer(require(&ai.openai_api_key_env, "API key")?),
        },
        Provider::OpenRouter => Backend::Chat {
            url: format!(
                "{}/chat/completions",
                ai.openrouter_base_url.trim_end_matches('/')
            ),
            auth: Auth::Bearer(require(&ai.openrouter_api_key_env, "API key")?),
        },
        Provider::Azure => {
            let endpoint = require(&ai.azure_endpoint_env, "Azure OpenAI endpoint")?;
            Backend::Chat {
                url: format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    spec.model,
                    ai.azure_api_version
                ),
                auth: Auth::ApiKey(require(&ai.azure_api_key_env, "API key")?),
            }
        }
        Provider::Ollama => Backend::Ollama {
            url: format!("{}/api/chat", ai.ollama_base_url.trim_end_matches('/')),
        },
    };

    Ok(backend)
}

// ---------------------------------------------------------------------------
// Completion cache
// ---------------------------------------------------------------------------

/// Completions keyed by [`cache_key`], persisted as a JSON object.
#[derive(Debug)]
struct CompletionCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl CompletionCache {
    /// Load the cache file; a missing or unreadable file starts empty.
    fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupt completion cache");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "loaded completion cache");
        Self { path, entries }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn insert(&mut self, key: String, text: String) {
        self.entries.insert(key, text);
        if let Err(e) = self.save() {
            warn!(error = %e, "could not persist completion cache");
        }
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| RepoDocsError::Enhancement(format!("cache serialization: {e}")))?;
        write_file(&self.path, &json)
    }
}

/// Cache key: SHA-256 over the model id and the full prompt.
fn cache_key(spec: &ModelSpec, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(spec.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Enhancer
// ---------------------------------------------------------------------------

/// Counters for one enhancement session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnhanceStats {
    /// Requests that returned usable text.
    pub completions: usize,
    /// Answers served from the cache.
    pub cache_hits: usize,
    /// Calls that fell back to the original text.
    pub fallbacks: usize,
}

/// Client for one completion model.
#[derive(Debug)]
pub struct Enhancer {
    client: reqwest::Client,
    spec: ModelSpec,
    backend: Backend,
    cache: Option<CompletionCache>,
    stats: EnhanceStats,
}

impl Enhancer {
    /// Build an enhancer for `model` (a `provider/model` id).
    ///
    /// Credentials are read from the environment variables named in `ai`.
    /// A malformed id, unknown provider or missing credential is a
    /// configuration error. `cache_path` is ignored when caching is off.
    pub fn from_config(model: &str, ai: &AiConfig, cache_path: Option<PathBuf>) -> Result<Self> {
        let spec: ModelSpec = model.parse()?;
        let backend = backend_for(&spec, ai, &|var| resolve_api_key(var).ok())?;
        let cache = if ai.cache {
            cache_path.map(CompletionCache::load)
        } else {
            None
        };
        Self::new(spec, backend, Duration::from_secs(ai.timeout_secs), cache)
    }

    fn new(
        spec: ModelSpec,
        backend: Backend,
        timeout: Duration,
        cache: Option<CompletionCache>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("repodocs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RepoDocsError::Enhancement(format!("client build: {e}")))?;

        info!(model = %spec, "AI enhancement enabled");

        Ok(Self {
            client,
            spec,
            backend,
            cache,
            stats: EnhanceStats::default(),
        })
    }

    pub fn stats(&self) -> EnhanceStats {
        self.stats
    }

    /// Rewrite `content` using the prompt for `target`.
    ///
    /// Returns the original content when the model fails or answers with
    /// nothing.
    #[instrument(skip_all, fields(section = target, model = %self.spec))]
    pub async fn enhance(&mut self, content: &str, target: &str) -> String {
        let prompt = format!("{}{content}", prompt_for(target));
        let key = cache_key(&self.spec, &prompt);

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!("completion cache hit");
            self.stats.cache_hits += 1;
            return hit.to_string();
        }

        match self.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(len = text.len(), "enhanced content");
                self.stats.completions += 1;
                if let Some(cache) = self.cache.as_mut() {
                    cache.insert(key, text.clone());
                }
                text
            }
            Ok(_) => {
                warn!("model returned empty content, using original");
                self.stats.fallbacks += 1;
                content.to_string()
            }
            Err(e) => {
                warn!(error = %e, "AI enhancement failed, using original");
                self.stats.fallbacks += 1;
                content.to_string()
            }
        }
    }

    /// Send a single-message chat request and return the answer text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage {
            role: "user".into(),
            content: Some(prompt.to_string()),
        }];

        match &self.backend {
            Backend::Chat { url, auth } => {
                let request = ChatRequest {
                    model: &self.spec.model,
                    messages,
                    stream: None,
                };
                let builder = match auth {
                    Auth::Bearer(key) => self.client.post(url).bearer_auth(key),
                    Auth::ApiKey(key) => self.client.post(url).header("api-key", key),
                };
                let response: ChatResponse = send_json(builder.json(&request), url).await?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| RepoDocsError::Enhancement("response has no choices".into()))
            }
            Backend::Ollama { url } => {
                let request = ChatRequest {
                    model: &self.spec.model,
                    messages,
                    stream: Some(false),
                };
                let response: OllamaResponse =
                    send_json(self.client.post(url).json(&request), url).await?;
                response
                    .message
                    .content
                    .ok_or_else(|| RepoDocsError::Enhancement("response has no content".into()))
            }
        }
    }
}

/// Send a request and decode a JSON body, mapping HTTP failures to errors.
async fn send_json<T: serde::de::DeserializeOwned>(
    builder: reqwest::RequestBuilder,
    url: &str,
) -> Result<T> {
    let response = builder
        .send()
        .await
        .map_err(|e| RepoDocsError::Enhancement(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(RepoDocsError::Enhancement(format!(
            "{url}: HTTP {status}: {snippet}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| RepoDocsError::Enhancement(format!("{url}: invalid response: {e}")))
}

/// Default cache location under a site output directory.
pub fn cache_path_for(output_dir: &Path) -> PathBuf {
    output_dir.join(".repodocs").join("enhance-cache.json")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec(s: &str) -> ModelSpec {
        s.parse().unwrap()
    }

    fn openai_enhancer(server: &MockServer, cache: Option<CompletionCache>) -> Enhancer {
        let backend = Backend::Chat {
            url: format!("{}/chat/completions", server.uri()),
            auth: Auth::Bearer("test-key".into()),
        };
        Enhancer::new(spec("openai/gpt-4o"), backend, Duration::from_secs(5), cache).unwrap()
    }

    fn chat_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        }))
    }

    #[test]
    fn parse_model_ids() {
        assert_eq!(
            spec("openai/gpt-4o"),
            ModelSpec {
                provider: Provider::OpenAi,
                model: "gpt-4o".into()
            }
        );
        let routed = spec("openrouter/meta-llama/llama-3-70b");
        assert_eq!(routed.provider, Provider::OpenRouter);
        assert_eq!(routed.model, "meta-llama/llama-3-70b");
        assert_eq!(spec("Ollama/llama3").provider, Provider::Ollama);
        assert_eq!(spec("azure/docs-gpt4").to_string(), "azure/docs-gpt4");
    }

    #[test]
    fn reject_bad_model_ids() {
        for bad in ["gpt-4o", "acme/model", "openai/", ""] {
            let err = bad.parse::<ModelSpec>().unwrap_err();
            assert!(matches!(err, RepoDocsError::Config { .. }), "{bad}");
        }
    }

    #[test]
    fn prompts_per_target() {
        assert!(prompt_for("overview").starts_with("Enhance this project overview"));
        assert!(prompt_for("HomepageFeatures").contains("feature blocks"));
        assert_eq!(prompt_for("something-else"), DEFAULT_PROMPT);
        assert!(prompt_for("api").ends_with(": "));
    }

    #[test]
    fn cache_key_depends_on_model_and_prompt() {
        let a = cache_key(&spec("openai/gpt-4o"), "hello");
        assert_eq!(a, cache_key(&spec("openai/gpt-4o"), "hello"));
        assert_ne!(a, cache_key(&spec("ollama/llama3"), "hello"));
        assert_ne!(a, cache_key(&spec("openai/gpt-4o"), "hello!"));
    }

    #[test]
    fn backend_urls_and_credentials() {
        let ai = AiConfig::default();
        let env = |var: &str| match var {
            "OPENAI_API_KEY" => Some("sk-1".to_string()),
            "AZURE_OPENAI_ENDPOINT" => Some("https://res.openai.azure.com/".to_string()),
            "AZURE_OPENAI_API_KEY" => Some("az-1".to_string()),
            _ => None,
        };

        assert_eq!(
            backend_for(&spec("openai/gpt-4o"), &ai, &env).unwrap(),
            Backend::Chat {
                url: "https://api.openai.com/v1/chat/completions".into(),
                auth: Auth::Bearer("sk-1".into()),
            }
        );
        assert_eq!(
            backend_for(&spec("azure/docs"), &ai, &env).unwrap(),
            Backend::Chat {
                url: "https://res.openai.azure.com/openai/deployments/docs/chat/completions?api-version=2024-06-01".into(),
                auth: Auth::ApiKey("az-1".into()),
            }
        );
        assert_eq!(
            backend_for(&spec("ollama/llama3"), &ai, &env).unwrap(),
            Backend::Ollama {
                url: "http://localhost:11434/api/chat".into()
            }
        );

        let err = backend_for(&spec("openrouter/x/y"), &ai, &env).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[tokio::test]
    async fn enhance_returns_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o" })))
            .respond_with(chat_reply("# Better overview"))
            .expect(1)
            .mount(&server)
            .await;

        let mut enhancer = openai_enhancer(&server, None);
        let out = enhancer.enhance("# Overview", "overview").await;
        assert_eq!(out, "# Better overview");
        assert_eq!(enhancer.stats().completions, 1);
    }

    #[tokio::test]
    async fn enhance_falls_back_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut enhancer = openai_enhancer(&server, None);
        assert_eq!(enhancer.enhance("original", "api").await, "original");
        assert_eq!(enhancer.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn enhance_falls_back_on_empty_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(chat_reply("   "))
            .mount(&server)
            .await;

        let mut enhancer = openai_enhancer(&server, None);
        assert_eq!(enhancer.enhance("original", "guides").await, "original");
    }

    #[tokio::test]
    async fn enhance_falls_back_on_missing_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let mut enhancer = openai_enhancer(&server, None);
        assert_eq!(enhancer.enhance("original", "testing").await, "original");
    }

    #[tokio::test]
    async fn ollama_from_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({ "model": "llama3", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "role": "assistant", "content": "rewritten" }
            })))
            .mount(&server)
            .await;

        let ai = AiConfig {
            ollama_base_url: server.uri(),
            ..AiConfig::default()
        };
        let mut enhancer = Enhancer::from_config("ollama/llama3", &ai, None).unwrap();
        assert_eq!(enhancer.enhance("text", "changelog").await, "rewritten");
    }

    #[tokio::test]
    async fn completions_are_cached_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_file = cache_path_for(tmp.path());

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(chat_reply("cached answer"))
            .expect(1)
            .mount(&server)
            .await;

        let mut enhancer = openai_enhancer(&server, Some(CompletionCache::load(cache_file.clone())));
        assert_eq!(enhancer.enhance("body", "overview").await, "cached answer");
        assert_eq!(enhancer.enhance("body", "overview").await, "cached answer");
        assert_eq!(enhancer.stats().cache_hits, 1);
        assert!(cache_file.exists());

        // A fresh enhancer against a server with no mocks still answers from disk.
        let empty = MockServer::start().await;
        let mut reloaded = openai_enhancer(&empty, Some(CompletionCache::load(cache_file)));
        assert_eq!(reloaded.enhance("body", "overview").await, "cached answer");
    }

    #[test]
    fn corrupt_cache_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("cache.json");
        std::fs::write(&file, "not json").unwrap();
        let cache = CompletionCache::load(file);
        assert!(cache.entries.is_empty());
    }
}
