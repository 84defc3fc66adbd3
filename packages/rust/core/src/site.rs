//! Docusaurus site emission.
//!
//! Writes the generated project layout:
//!
//! ```text
//! <output>/
//! ├── docusaurus.config.js
//! ├── sidebars.js
//! ├── docs/
//! │   ├── index.md
//! │   └── <section>.md
//! ├── src/
//! │   ├── css/custom.css
//! │   ├── pages/index.js
//! │   └── components/HomepageFeatures/{index.js, styles.module.css}
//! └── static/
//!     ├── img/{logo.svg, favicon.svg}
//!     └── <copied repository images>
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use repodocs_discovery::RepoScanner;
use repodocs_markdown::format_page;
use repodocs_shared::{Document, ProjectInfo, RepoDocsError, Result, SiteConfig};

use crate::sections::SectionId;

const CUSTOM_CSS: &str = r":root {
  --ifm-color-primary: #4183c4;
  --ifm-color-primary-dark: #3a75b0;
  --ifm-color-primary-darker: #336699;
  --ifm-color-primary-darkest: #2d5986;
  --ifm-color-primary-light: #5191d3;
  --ifm-color-primary-lighter: #639fdb;
  --ifm-color-primary-lightest: #75ade2;
  --ifm-code-font-size: 95%;
}
";

const LOGO_SVG: &str = r##"<svg width="200" height="200" viewBox="0 0 200 200" xmlns="http://www.w3.org/2000/svg">
  <rect width="200" height="200" fill="#4183c4"/>
  <text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" fill="white" font-family="Arial" font-size="40">DOCS</text>
</svg>
"##;

const FEATURES_CSS: &str = r".features {
  display: flex;
  align-items: center;
  padding: 2rem 0;
  width: 100%;
}
";

/// Sections pinned to the top of the sidebar, after the overview.
const PINNED_SECTIONS: &[&str] = &["installation", "architecture", "api"];

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes files into a site output directory.
#[derive(Debug, Clone)]
pub struct SiteWriter {
    root: PathBuf,
}

impl SiteWriter {
    /// Create the output directory tree and return a writer rooted there.
    pub fn create(output_dir: &Path) -> Result<Self> {
        let dirs = [
            output_dir.to_path_buf(),
            output_dir.join("docs"),
            output_dir.join("static").join("img"),
            output_dir.join("src").join("css"),
            output_dir.join("src").join("pages"),
            output_dir.join("src").join("components").join("HomepageFeatures"),
        ];
        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|e| RepoDocsError::io(dir, e))?;
        }

        let root =
            std::fs::canonicalize(output_dir).map_err(|e| RepoDocsError::io(output_dir, e))?;
        debug!(path = %root.display(), "output directory ready");
        Ok(Self { root })
    }

    /// Canonical output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `docs/<id>.md` with frontmatter.
    pub fn write_document(&self, doc: &Document) -> Result<PathBuf> {
        let path = self.root.join("docs").join(format!("{}.md", doc.id));
        write_file(&path, &format_page(doc)?)?;
        info!(id = %doc.id, "generated page");
        Ok(path)
    }

    pub fn write_sidebar(&self, docs: &[Document]) -> Result<()> {
        write_file(&self.root.join("sidebars.js"), &sidebar_js(docs))
    }

    pub fn write_config(&self, config_js: &str) -> Result<()> {
        write_file(&self.root.join("docusaurus.config.js"), config_js)
    }

    /// Custom CSS, logo and favicon.
    pub fn write_theme(&self) -> Result<()> {
        write_file(&self.root.join("src").join("css").join("custom.css"), CUSTOM_CSS)?;
        let img = self.root.join("static").join("img");
        write_file(&img.join("logo.svg"), LOGO_SVG)?;
        write_file(&img.join("favicon.svg"), LOGO_SVG)
    }

    /// `src/pages/index.js` and the `HomepageFeatures` component.
    pub fn write_homepage(&self, index_js: &str, features_js: &str) -> Result<()> {
        let src = self.root.join("src");
        write_file(&src.join("pages").join("index.js"), index_js)?;

        let features = src.join("components").join("HomepageFeatures");
        write_file(&features.join("index.js"), features_js)?;
        write_file(&features.join("styles.module.css"), FEATURES_CSS)?;

        info!("generated homepage");
        Ok(())
    }

    /// Copy every image in the repository flat into `static/`. Per-file
    /// failures are logged; returns the number of files copied.
    #[instrument(skip_all)]
    pub fn copy_assets(&self, scanner: &RepoScanner) -> usize {
        let static_dir = self.root.join("static");
        let mut copied = 0;

        for source in scanner.image_files() {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = static_dir.join(name);
            if source == target {
                continue;
            }
            match std::fs::copy(&source, &target) {
                Ok(_) => copied += 1,
                Err(e) => warn!(file = %source.display(), error = %e, "error copying asset"),
            }
        }

        debug!(copied, "copied static assets");
        copied
    }
}

/// Write a file through a temp file and rename, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RepoDocsError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| RepoDocsError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RepoDocsError::io(path, e))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Content builders
// ---------------------------------------------------------------------------

/// The docs entry page (`docs/index.md`, served at `/`).
pub fn index_document(project_name: &str, description: &str, produced: &[SectionId]) -> Document {
    let has = |id: SectionId| produced.contains(&id);
    let link = |id: SectionId, label: &str| format!("- [{label}]({}.md)", id.as_str());

    let getting_started: Vec<String> = [
        (SectionId::Overview, "Overview"),
        (SectionId::Installation, "Installation"),
        (SectionId::Api, "API Documentation"),
    ]
    .into_iter()
    .filter(|(id, _)| has(*id))
    .map(|(id, label)| link(id, label))
    .collect();

    let resources: Vec<String> = [
        (SectionId::Architecture, "Architecture"),
        (SectionId::Guides, "Guides & Tutorials"),
        (SectionId::Contributing, "Contributing"),
    ]
    .into_iter()
    .filter(|(id, _)| has(*id))
    .map(|(id, label)| link(id, label))
    .collect();

    let mut body = format!("# {} Documentation\n\n{description}\n", title_case(project_name));
    if !getting_started.is_empty() {
        body.push_str(&format!("\n## Getting Started\n\n{}\n", getting_started.join("\n")));
    }
    if !resources.is_empty() {
        body.push_str(&format!("\n## Additional Resources\n\n{}\n", resources.join("\n")));
    }

    Document::new("index", "Home", body).with_slug("/")
}

/// `sidebars.js`: Home, the overview, the pinned sections, then the rest
/// alphabetically. `docs` are the produced section documents.
pub fn sidebar_js(docs: &[Document]) -> String {
    let mut items: Vec<(&str, &str)> = vec![("index", "Home")];

    let find = |id: &str| docs.iter().find(|d| d.id == id);

    for id in std::iter::once("overview").chain(PINNED_SECTIONS.iter().copied()) {
        if let Some(doc) = find(id) {
            items.push((doc.id.as_str(), doc.sidebar_label.as_str()));
        }
    }

    let mut rest: Vec<&Document> = docs
        .iter()
        .filter(|d| d.id != "overview" && d.id != "index" && !PINNED_SECTIONS.contains(&d.id.as_str()))
        .collect();
    rest.sort_by(|a, b| a.id.cmp(&b.id));
    items.extend(rest.iter().map(|d| (d.id.as_str(), d.sidebar_label.as_str())));

    let entries: Vec<String> = items
        .iter()
        .map(|(id, label)| {
            format!(
                "    {{\n      type: 'doc',\n      id: {},\n      label: {},\n    }}",
                js_str(id),
                js_str(label)
            )
        })
        .collect();

    format!(
        "/** @type {{import('@docusaurus/plugin-content-docs').SidebarsConfig}} */\nmodule.exports = {{\n  docs: [\n{}\n  ],\n}};\n",
        entries.join(",\n")
    )
}

/// `docusaurus.config.js`. Navbar and footer links to the overview and API
/// pages appear only when those pages exist; GitHub links only when the
/// repository URL is known.
pub fn docusaurus_config_js(
    info: &ProjectInfo,
    site: &SiteConfig,
    produced: &[SectionId],
    year: i32,
) -> String {
    let title = js_str(&info.repo_name);
    let organization = if info.org_name.is_empty() {
        &site.organization_name
    } else {
        &info.org_name
    };
    let owner = if info.org_name.is_empty() {
        "Project Contributors"
    } else {
        info.org_name.as_str()
    };

    let doc_links: Vec<(&str, &str)> = [(SectionId::Overview, "Overview"), (SectionId::Api, "API")]
        .into_iter()
        .filter(|(id, _)| produced.contains(id))
        .map(|(id, label)| (id.as_str(), label))
        .collect();

    let mut navbar_items = vec![
        "        {\n          to: \"/\",\n          label: \"Documentation\",\n          position: \"left\",\n          activeBaseRegex: \"^/$|^/(?!.+)\",\n        },".to_string(),
    ];
    navbar_items.extend(doc_links.iter().map(|(id, label)| {
        format!(
            "        {{\n          to: \"/{id}\",\n          label: {},\n          position: \"left\",\n        }},",
            js_str(label)
        )
    }));

    let mut footer_links = Vec::new();
    if !doc_links.is_empty() {
        let items: Vec<String> = doc_links
            .iter()
            .map(|(id, label)| {
                format!(
                    "              {{\n                label: {},\n                to: \"/{id}\",\n              }},",
                    js_str(label)
                )
            })
            .collect();
        footer_links.push(format!(
            "          {{\n            title: \"Docs\",\n            items: [\n{}\n            ],\n          }},",
            items.join("\n")
        ));
    }

    if !info.repo_url.is_empty() {
        let href = js_str(&info.repo_url);
        navbar_items.push(format!(
            "        {{\n          href: {href},\n          label: \"GitHub\",\n          position: \"right\",\n        }},"
        ));
        footer_links.push(format!(
            "          {{\n            title: \"Community\",\n            items: [\n              {{\n                label: \"GitHub\",\n                href: {href},\n              }},\n            ],\n          }},"
        ));
    }

    format!(
        r#"/** @type {{import('@docusaurus/types').DocusaurusConfig}} */
module.exports = {{
  title: {title},
  tagline: {tagline},
  url: {url},
  baseUrl: {base_url},
  onBrokenLinks: "warn",
  onBrokenMarkdownLinks: "warn",
  favicon: "img/favicon.svg",
  organizationName: {organization},
  projectName: {title},
  presets: [
    [
      "@docusaurus/preset-classic",
      {{
        docs: {{
          sidebarPath: require.resolve("./sidebars.js"),
          routeBasePath: "/",
        }},
        theme: {{
          customCss: require.resolve("./src/css/custom.css"),
        }},
      }},
    ],
  ],
  themeConfig: {{
    navbar: {{
      title: {title},
      logo: {{
        alt: {logo_alt},
        src: "img/logo.svg",
      }},
      items: [
{navbar_items}
      ],
    }},
    footer: {{
      style: "dark",
      links: [
{footer_links}
      ],
      copyright: {copyright},
    }},
  }},
}};
"#,
        tagline = js_str(&info.description),
        url = js_str(&site.url),
        base_url = js_str(&site.base_url),
        organization = js_str(organization),
        logo_alt = js_str(&format!("{} Logo", info.repo_name)),
        navbar_items = navbar_items.join("\n"),
        footer_links = footer_links.join("\n"),
        copyright = js_str(&format!(
            "Copyright © {year} {owner}. Built with Docusaurus."
        )),
    )
}

/// `src/pages/index.js`.
pub fn homepage_index_js(info: &ProjectInfo) -> String {
    format!(
        r#"import React from 'react';
import Layout from '@theme/Layout';
import HomepageFeatures from '../components/HomepageFeatures';

export default function Home() {{
  return (
    <Layout
      title={{{title}}}
      description={{{description}}}>
      <main>
        <HomepageFeatures />
      </main>
    </Layout>
  );
}}
"#,
        title = js_str(&info.project_name),
        description = js_str(&info.description),
    )
}

/// `src/components/HomepageFeatures/index.js`.
pub fn homepage_features_js(info: &ProjectInfo) -> String {
    let quick_start = js_str(&format!(
        "Get started with {} quickly by following the documentation and guides.",
        info.project_name
    ));
    let repository = if info.repo_url.is_empty() {
        "<p>Browse the documentation for source and contribution details.</p>".to_string()
    } else {
        format!(
            "<p><a href={{{}}} target=\"_blank\" rel=\"noopener noreferrer\">GitHub Repository</a></p>",
            js_str(&info.repo_url)
        )
    };

    format!(
        r#"import React from 'react';
import styles from './styles.module.css';

export default function HomepageFeatures() {{
  return (
    <section className={{styles.features}}>
      <div className="container">
        <div className="row">
          <div className="col col--4">
            <h3>Quick Start</h3>
            <p>{{{quick_start}}}</p>
          </div>
          <div className="col col--4">
            <h3>Features</h3>
            <p>{{{description}}}</p>
          </div>
          <div className="col col--4">
            <h3>Repository</h3>
            {repository}
          </div>
        </div>
      </div>
    </section>
  );
}}
"#,
        description = js_str(&info.description),
    )
}

/// Quote a value as a JavaScript string literal.
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
