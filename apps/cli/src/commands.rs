//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use repodocs_core::pipeline::{GenerateConfig, GenerateResult, ProgressReporter, generate};
use repodocs_core::sections::SectionId;
use repodocs_markdown::sanitize;
use repodocs_shared::{AppConfig, init_config, load_config, load_site_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// repodocs: turn a repository into a Docusaurus documentation site.
#[derive(Parser)]
#[command(
    name = "repodocs",
    version,
    about = "Generate a Docusaurus documentation site from a local repository.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a documentation site for a repository.
    Generate {
        /// Path to the repository.
        repo_path: PathBuf,

        /// Output directory for the site.
        #[arg(short, long, default_value = "./docusaurus")]
        output: PathBuf,

        /// Site config file (YAML or TOML) with url, baseUrl and organizationName.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enhance pages with an AI model, e.g. openai/gpt-4o or ollama/llama3.
        /// Without a value the configured default model is used.
        #[arg(long, value_name = "MODEL")]
        use_ai: Option<Option<String>>,

        /// Install Docusaurus in the output directory.
        #[arg(long)]
        install: bool,

        /// Start the Docusaurus development server afterwards.
        #[arg(long)]
        start: bool,
    },

    /// Sanitize a Markdown file for MDX and print the result.
    Sanitize {
        /// File to read (stdin when omitted).
        file: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so `sanitize`
/// output stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "repodocs=info",
        1 => "repodocs=debug",
        _ => "repodocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            repo_path,
            output,
            config,
            use_ai,
            install,
            start,
        } => {
            let app = load_config()?;
            let generate_config =
                build_generate_config(app, repo_path, output, config.as_deref(), use_ai, install, start)?;
            cmd_generate(&generate_config).await
        }
        Command::Sanitize { file } => cmd_sanitize(file.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Merge the user config, the per-run site file and the flags.
fn build_generate_config(
    app: AppConfig,
    repo_path: PathBuf,
    output: PathBuf,
    site_file: Option<&Path>,
    use_ai: Option<Option<String>>,
    install: bool,
    start: bool,
) -> Result<GenerateConfig> {
    let site = match site_file {
        Some(path) => load_site_config(path)?,
        None => app.site,
    };

    let model = use_ai.map(|model| match model {
        Some(model) if !model.trim().is_empty() => model,
        _ => app.ai.default_model.clone(),
    });

    Ok(GenerateConfig {
        repo_path,
        output_dir: output,
        site,
        scan: app.scan,
        ai: app.ai,
        model,
        install,
        start,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config: &GenerateConfig) -> Result<()> {
    info!(
        repo = %config.repo_path.display(),
        output = %config.output_dir.display(),
        model = config.model.as_deref().unwrap_or("none"),
        "generating documentation site"
    );

    let reporter = CliProgress::new();
    let result = generate(config, &reporter)
        .await
        .wrap_err_with(|| format!("failed to generate docs for {}", config.repo_path.display()))?;

    let names = |ids: &[SectionId]| {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.iter().map(SectionId::as_str).collect::<Vec<_>>().join(", ")
        }
    };

    println!();
    println!("  Documentation site generated!");
    println!("  Path:     {}", result.output_dir.display());
    println!("  Pages:    {}", names(&result.produced));
    println!("  Empty:    {}", names(&result.empty));
    for (id, reason) in &result.failed {
        println!("  Failed:   {id} ({reason})");
    }
    println!("  Assets:   {}", result.assets_copied);
    if let Some(stats) = result.enhancement {
        println!(
            "  AI:       {} completions, {} cached, {} fallbacks",
            stats.completions, stats.cache_hits, stats.fallbacks
        );
    }
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    if !config.install {
        println!("  Next: cd {} && npm install && npm start", result.output_dir.display());
        println!();
    }

    Ok(())
}

fn cmd_sanitize(file: Option<&Path>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| eyre!("cannot read stdin: {e}"))?;
            buf
        }
    };

    print!("{}", sanitize(&input));
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section(&self, id: SectionId, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Generating [{current}/{total}] {}", id.title()));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["repodocs", "generate", "."]).unwrap();
        let Command::Generate {
            output,
            use_ai,
            install,
            start,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(output, PathBuf::from("./docusaurus"));
        assert!(use_ai.is_none());
        assert!(!install && !start);
    }

    #[test]
    fn use_ai_value_is_optional() {
        let bare = Cli::try_parse_from(["repodocs", "generate", ".", "--use-ai"]).unwrap();
        let Command::Generate { use_ai, .. } = bare.command else {
            panic!("expected generate");
        };
        assert_eq!(use_ai, Some(None));

        let named =
            Cli::try_parse_from(["repodocs", "-vv", "generate", ".", "--use-ai", "ollama/llama3"])
                .unwrap();
        assert_eq!(named.verbose, 2);
        let Command::Generate { use_ai, .. } = named.command else {
            panic!("expected generate");
        };
        assert_eq!(use_ai, Some(Some("ollama/llama3".to_string())));
    }

    #[test]
    fn bare_use_ai_falls_back_to_default_model() {
        let app = AppConfig::default();
        let default_model = app.ai.default_model.clone();
        let config = build_generate_config(
            app,
            PathBuf::from("."),
            PathBuf::from("out"),
            None,
            Some(None),
            false,
            false,
        )
        .unwrap();
        assert_eq!(config.model, Some(default_model));
    }

    #[test]
    fn site_file_overrides_user_config() {
        let tmp = tempfile::tempdir().unwrap();
        let site_file = tmp.path().join("site.yml");
        std::fs::write(
            &site_file,
            "url: https://docs.acme.dev\nbaseUrl: /tools/\norganizationName: acme\n",
        )
        .unwrap();

        let config = build_generate_config(
            AppConfig::default(),
            PathBuf::from("."),
            PathBuf::from("out"),
            Some(&site_file),
            None,
            true,
            false,
        )
        .unwrap();

        assert_eq!(config.site.url, "https://docs.acme.dev");
        assert_eq!(config.site.base_url, "/tools/");
        assert_eq!(config.site.organization_name, "acme");
        assert!(config.model.is_none());
        assert!(config.install);
    }
}
