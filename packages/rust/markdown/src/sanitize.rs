//! Markdown-to-MDX sanitization.
//!
//! MDX treats `<...>` and `{...}` as live syntax, so prose pulled out of a
//! repository (`<3`, half-written tags, HTML comments, bare braces) breaks
//! the site build. The transform runs in three phases:
//!
//! 1. Shield: fenced blocks, then inline code spans, are swapped for
//!    placeholder tokens and recorded by index.
//! 2. Rewrite: each pass scans the whole shielded text independently.
//! 3. Unshield: tokens are replaced by the recorded spans, byte-for-byte.
//!
//! An unterminated fence never matches; the text after it stays subject to
//! the rewrite passes.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

use repodocs_shared::{RepoDocsError, Result};

/// Opens every placeholder token. Private-use code point, never produced by
/// a rewrite pass and excluded from inline span matching.
const TOKEN_OPEN: char = '\u{E000}';

/// Terminates every placeholder token so `…1` is never a prefix of `…12`.
const TOKEN_CLOSE: char = '\u{E001}';

/// Sanitize `body` for embedding in an MDX document.
///
/// Total: if the transform hits an internal invariant violation, the
/// failure is logged and `body` is returned unchanged.
pub fn sanitize(body: &str) -> String {
    match try_sanitize(body) {
        Ok(sanitized) => sanitized,
        Err(e) => {
            warn!(error = %e, "MDX sanitization failed, keeping original body");
            body.to_string()
        }
    }
}

/// Sanitize `body`, reporting internal failures instead of falling back.
pub fn try_sanitize(body: &str) -> Result<String> {
    if body.is_empty() {
        return Ok(String::new());
    }

    let (shield, shielded) = Shield::apply(body);

    let mut text = shielded;
    text = convert_comments(&text);
    text = escape_digit_tags(&text);
    text = escape_unclosed_tags(&text);
    text = space_self_closing_tags(&text);
    text = escape_braces(&text);

    shield.restore(&text)
}

// ---------------------------------------------------------------------------
// Phase 1 / 3: shielding code spans
// ---------------------------------------------------------------------------

/// Recorded code spans and the marker their tokens are built from.
struct Shield {
    marker: String,
    spans: Vec<String>,
}

impl Shield {
    /// Replace fenced blocks, then inline spans, with numbered tokens.
    fn apply(body: &str) -> (Self, String) {
        static FENCED_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
        // Single line, no backticks, and never across an existing token.
        static INLINE_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"`[^`\n\x{E000}]+`").expect("valid regex"));

        let mut shield = Self {
            marker: choose_marker(body),
            spans: Vec::new(),
        };

        let fenced = FENCED_RE.replace_all(body, |caps: &Captures| shield.push(&caps[0]));
        let inline = INLINE_RE.replace_all(&fenced, |caps: &Captures| shield.push(&caps[0]));
        let text = inline.into_owned();

        (shield, text)
    }

    fn push(&mut self, span: &str) -> String {
        let token = self.token(self.spans.len());
        self.spans.push(span.to_string());
        token
    }

    fn token(&self, index: usize) -> String {
        format!("{}{index}{TOKEN_CLOSE}", self.marker)
    }

    /// Swap every token back for its span. Fails if a token does not resolve
    /// or if a span's token went missing during the rewrite phase.
    fn restore(&self, text: &str) -> Result<String> {
        if self.spans.is_empty() {
            return Ok(text.to_string());
        }

        let pattern = format!("{}([0-9]+){TOKEN_CLOSE}", regex::escape(&self.marker));
        let token_re = Regex::new(&pattern)
            .map_err(|e| RepoDocsError::Transform(format!("placeholder pattern: {e}")))?;

        let mut restored_count = 0usize;
        let mut unresolved: Option<String> = None;

        let restored = token_re.replace_all(text, |caps: &Captures| {
            let span = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| self.spans.get(i));
            match span {
                Some(span) => {
                    restored_count += 1;
                    span.clone()
                }
                None => {
                    unresolved.get_or_insert_with(|| caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });

        if let Some(index) = unresolved {
            return Err(RepoDocsError::Transform(format!(
                "placeholder {index} has no recorded code span"
            )));
        }
        if restored_count != self.spans.len() {
            return Err(RepoDocsError::Transform(format!(
                "restored {restored_count} of {} code spans",
                self.spans.len()
            )));
        }

        Ok(restored.into_owned())
    }
}

/// Pick a token marker that does not already occur in `body`.
fn choose_marker(body: &str) -> String {
    let mut salt = 0u64;
    loop {
        let marker = format!("{TOKEN_OPEN}code{salt}:");
        if !body.contains(&marker) {
            return marker;
        }
        salt += 1;
    }
}

// ---------------------------------------------------------------------------
// Phase 2: structural rewrites
// ---------------------------------------------------------------------------

/// `<!-- note -->` becomes `{/* note */}`.
fn convert_comments(text: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--(.*?)-->").expect("valid regex"));

    COMMENT_RE.replace_all(text, "{/*${1}*/}").into_owned()
}

/// `<3` becomes `&lt;3`.
fn escape_digit_tags(text: &str) -> String {
    static DIGIT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<([0-9])").expect("valid regex"));

    DIGIT_RE.replace_all(text, "&lt;${1}").into_owned()
}

/// An opening tag with no `>` before the next `<`, the next blank line or
/// the end of text is neutralized as literal text. A tag may wrap across
/// single newlines but never across paragraphs.
fn escape_unclosed_tags(text: &str) -> String {
    static OPEN_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[A-Za-z][A-Za-z0-9_:.\-]*").expect("valid regex"));
    static BLANK_LINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("valid regex"));

    OPEN_TAG_RE
        .replace_all(text, |caps: &Captures| {
            let Some(tag) = caps.get(0) else {
                return String::new();
            };
            let rest = &text[tag.end()..];
            let paragraph = BLANK_LINE_RE
                .find(rest)
                .map_or(rest, |blank| &rest[..blank.start()]);
            let closed = paragraph
                .find(['<', '>'])
                .is_some_and(|i| paragraph.as_bytes()[i] == b'>');

            if closed {
                tag.as_str().to_string()
            } else {
                format!("&lt;{}", &tag.as_str()[1..])
            }
        })
        .into_owned()
}

/// `<br/>` becomes `<br />`.
fn space_self_closing_tags(text: &str) -> String {
    static SELF_CLOSING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_:\-]*)/>").expect("valid regex"));

    SELF_CLOSING_RE.replace_all(text, "<${1} />").into_owned()
}

/// Entity-escape braces that MDX would read as expressions.
///
/// A `{/* ... */}` comment block is kept whole, with every brace inside its
/// text escaped. Other `{/` and `{#` openers are kept, as is the `}` that
/// closes them. A brace preceded by an odd run of backslashes is already
/// escaped and left alone.
fn escape_braces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // One entry per open brace: true when it opened an intentional block.
    let mut openers: Vec<bool> = Vec::new();
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        let rest = &text[i..];
        match c {
            '{' | '}' if is_backslash_escaped(text, i) => out.push(c),
            '{' => {
                if let Some(inner) = comment_block(rest) {
                    out.push_str("{/*");
                    out.push_str(&inner.replace('{', "&#123;").replace('}', "&#125;"));
                    out.push_str("*/}");
                    i += inner.len() + "{/**/}".len();
                    continue;
                }

                let intentional = matches!(rest[1..].chars().next(), Some('/' | '#'));
                openers.push(intentional);
                if intentional {
                    out.push('{');
                } else {
                    out.push_str("&#123;");
                }
            }
            '}' => {
                if openers.pop() == Some(true) {
                    out.push('}');
                } else {
                    out.push_str("&#125;");
                }
            }
            _ => out.push(c),
        }
        i += c.len_utf8();
    }

    out
}

/// Inner text of a `{/* ... */}` block at the start of `rest`.
fn comment_block(rest: &str) -> Option<&str> {
    let body = rest.strip_prefix("{/*")?;
    body.find("*/}").map(|end| &body[..end])
}

/// Whether the byte at `index` follows an odd number of backslashes.
fn is_backslash_escaped(text: &str, index: usize) -> bool {
    let run = text.as_bytes()[..index]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
