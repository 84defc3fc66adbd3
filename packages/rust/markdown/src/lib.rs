//! Markdown handling for generated Docusaurus pages.
//!
//! - [`sanitize`] makes arbitrary Markdown safe to embed in MDX
//! - [`format_page`] prepends the YAML frontmatter block
//! - [`extract_section`] and [`first_paragraph`] pull pieces out of a README

mod sanitize;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use repodocs_shared::{Document, RepoDocsError, Result};

pub use sanitize::{sanitize, try_sanitize};

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

/// Frontmatter fields, in the order they are written.
#[derive(Serialize)]
struct Frontmatter<'a> {
    id: &'a str,
    title: &'a str,
    sidebar_label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<&'a str>,
}

/// Render a document as a Markdown file: YAML frontmatter, a blank line,
/// then the body.
pub fn format_page(doc: &Document) -> Result<String> {
    let frontmatter = Frontmatter {
        id: &doc.id,
        title: &doc.title,
        sidebar_label: &doc.sidebar_label,
        slug: doc.slug.as_deref(),
    };

    let yaml = serde_yaml::to_string(&frontmatter)
        .map_err(|e| RepoDocsError::parse(format!("frontmatter for {}: {e}", doc.id)))?;

    Ok(format!("---\n{yaml}---\n\n{}", doc.body))
}

// ---------------------------------------------------------------------------
// README helpers
// ---------------------------------------------------------------------------

/// Extract the text from the first heading named `start` up to the next
/// heading named `end` (or the end of `content`), trimmed.
pub fn extract_section(content: &str, start: &str, end: &str) -> Option<String> {
    let start_re = heading_regex(start)?;
    let end_re = heading_regex(end)?;

    let begin = start_re.find(content)?;
    let stop = end_re
        .find(&content[begin.end()..])
        .map_or(content.len(), |m| begin.end() + m.start());

    let section = content[begin.start()..stop].trim();
    debug!(start, end, len = section.len(), "extracted README section");
    Some(section.to_string())
}

fn heading_regex(name: &str) -> Option<Regex> {
    Regex::new(&format!("#+ *{}", regex::escape(name))).ok()
}

/// The paragraph following a README's title block, used as the site
/// description.
pub fn first_paragraph(readme: &str) -> Option<String> {
    static PARAGRAPH_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)#.*?\n\n(.*?)\n\n").expect("valid regex"));

    let caps = PARAGRAPH_RE.captures(readme)?;
    let paragraph = caps[1].trim();
    (!paragraph.is_empty()).then(|| paragraph.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
