//! End-to-end `generate` pipeline: repository → sections → site.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Datelike;
use tracing::{info, instrument, warn};
use url::Url;

use repodocs_discovery::{RepoScanner, project_info};
use repodocs_markdown::{first_paragraph, sanitize};
use repodocs_shared::{AiConfig, Document, RepoDocsError, Result, ScanConfig, SiteConfig};

use crate::enrichment::{EnhanceStats, Enhancer, cache_path_for};
use crate::npm;
use crate::sections::{SectionExtractor, SectionId, SectionOutcome};
use crate::site::{self, SiteWriter};

/// Configuration for the `generate` pipeline.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Repository to document.
    pub repo_path: PathBuf,
    /// Site output directory (created if missing).
    pub output_dir: PathBuf,
    /// Site URL, base path and organization.
    pub site: SiteConfig,
    /// Repository walk settings.
    pub scan: ScanConfig,
    /// Provider settings for AI enhancement.
    pub ai: AiConfig,
    /// `provider/model` id; enhancement is off when `None`.
    pub model: Option<String>,
    /// Run `npm install` in the output directory afterwards.
    pub install: bool,
    /// Run `npm start` in the output directory afterwards.
    pub start: bool,
}

impl GenerateConfig {
    /// Defaults for everything but the two paths.
    pub fn new(repo_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            output_dir: output_dir.into(),
            site: SiteConfig::default(),
            scan: ScanConfig::default(),
            ai: AiConfig::default(),
            model: None,
            install: false,
            start: false,
        }
    }
}

/// Result of the `generate` pipeline.
#[derive(Debug)]
pub struct GenerateResult {
    /// Canonical output directory.
    pub output_dir: PathBuf,
    /// Sections written to `docs/`, in extraction order.
    pub produced: Vec<SectionId>,
    /// Sections with no material in the repository.
    pub empty: Vec<SectionId>,
    /// Sections whose extractor failed, with the reason.
    pub failed: Vec<(SectionId, String)>,
    /// Static assets copied into `static/`.
    pub assets_copied: usize,
    /// AI enhancement counters, when enabled.
    pub enhancement: Option<EnhanceStats>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each section is processed.
    fn section(&self, id: SectionId, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section(&self, _id: SectionId, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Run the full `generate` pipeline.
///
/// 1. Validate the site settings and open the repository
/// 2. Extract each section; enhance, sanitize and write what is produced
/// 3. Write the docs index, sidebar, site config, theme and homepage
/// 4. Copy image assets
/// 5. Optionally `npm install` and `npm start`
#[instrument(skip_all, fields(repo = %config.repo_path.display(), output = %config.output_dir.display()))]
pub async fn generate(
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    // --- Phase 1: Setup ---
    progress.phase("Preparing output");
    let site_config = normalize_site(&config.site)?;

    let writer = SiteWriter::create(&config.output_dir)?;
    let scanner = RepoScanner::new(&config.repo_path, &config.scan)?.exclude(writer.root());

    let mut enhancer = config
        .model
        .as_deref()
        .map(|model| Enhancer::from_config(model, &config.ai, Some(cache_path_for(writer.root()))))
        .transpose()?;

    info!(
        repo = %scanner.root().display(),
        output = %writer.root().display(),
        ai = enhancer.is_some(),
        "starting generate pipeline"
    );

    // --- Phase 2: Sections ---
    progress.phase("Generating sections");
    let extractor = SectionExtractor::new(&scanner, config.scan.commit_limit);

    let mut documents: Vec<Document> = Vec::new();
    let mut produced = Vec::new();
    let mut empty = Vec::new();
    let mut failed = Vec::new();
    let total = SectionId::ALL.len();

    for (i, id) in SectionId::ALL.into_iter().enumerate() {
        progress.section(id, i + 1, total);

        match extractor.extract(id) {
            SectionOutcome::Produced(doc) => {
                let body = match enhancer.as_mut() {
                    Some(enhancer) => enhancer.enhance(&doc.body, id.as_str()).await,
                    None => doc.body.clone(),
                };
                let doc = doc.with_body(sanitize(&body));
                writer.write_document(&doc)?;
                produced.push(id);
                documents.push(doc);
            }
            SectionOutcome::Empty => empty.push(id),
            SectionOutcome::Failed(reason) => {
                warn!(section = %id, reason = %reason, "section skipped");
                failed.push((id, reason));
            }
        }
    }

    // --- Phase 3: Site files ---
    progress.phase("Writing site configuration");
    let info = project_info(scanner.root());

    let description = scanner
        .find_file("README.md")
        .and_then(|path| scanner.read(&path).ok())
        .and_then(|readme| first_paragraph(&readme))
        .unwrap_or_else(|| format!("{} documentation", scanner.dir_name()));

    let index = site::index_document(&scanner.dir_name(), &description, &produced);
    let body = sanitize(&index.body);
    let index = index.with_body(body);
    writer.write_document(&index)?;

    writer.write_sidebar(&documents)?;
    writer.write_config(&site::docusaurus_config_js(
        &info,
        &site_config,
        &produced,
        chrono::Utc::now().year(),
    ))?;
    writer.write_theme()?;

    progress.phase("Writing homepage");
    let mut index_js = site::homepage_index_js(&info);
    let mut features_js = site::homepage_features_js(&info);
    if let Some(enhancer) = enhancer.as_mut() {
        index_js = enhancer.enhance(&index_js, "index.js").await;
        features_js = enhancer.enhance(&features_js, "HomepageFeatures").await;
    }
    writer.write_homepage(&index_js, &features_js)?;

    // --- Phase 4: Assets ---
    progress.phase("Copying static assets");
    let assets_copied = writer.copy_assets(&scanner);

    let result = GenerateResult {
        output_dir: writer.root().to_path_buf(),
        produced,
        empty,
        failed,
        assets_copied,
        enhancement: enhancer.as_ref().map(Enhancer::stats),
        elapsed: start.elapsed(),
    };

    info!(
        produced = result.produced.len(),
        empty = result.empty.len(),
        failed = result.failed.len(),
        assets = result.assets_copied,
        elapsed_ms = result.elapsed.as_millis(),
        "generate pipeline complete"
    );

    // --- Phase 5: npm ---
    if config.install {
        progress.phase("Installing Docusaurus");
        npm::install(&result.output_dir).await?;
    }

    progress.done(&result);

    if config.start {
        npm::start(&result.output_dir).await?;
    }

    Ok(result)
}

/// Validate the site URL and make sure the base path starts and ends
/// with `/`.
fn normalize_site(site: &SiteConfig) -> Result<SiteConfig> {
    let url = Url::parse(&site.url)
        .map_err(|e| RepoDocsError::validation(format!("invalid site url '{}': {e}", site.url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RepoDocsError::validation(format!(
            "site url must be http or https, got '{}'",
            site.url
        )));
    }

    let trimmed = site.base_url.trim().trim_matches('/');
    let base_url = if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    };

    Ok(SiteConfig {
        url: site.url.trim_end_matches('/').to_string(),
        base_url,
        organization_name: site.organization_name.clone(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
