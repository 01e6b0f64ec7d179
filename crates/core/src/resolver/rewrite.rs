//! Rewriting wiki-links, embeds and local markdown links into standard
//! markdown links that point at archive entries.

use std::path::Path;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

use super::{
    ResolvedReference, Resolver, candidate_file_name, display_name, lookup_key, split_alias,
};
use crate::exclusion;
use crate::markdown_ast::rewrite_text_spans;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"!\[\[(?P<embed>[^\]\n]+)\]\]",
        r"|\[\[(?P<wiki>[^\]\n]+)\]\]",
        // destinations may hold one level of balanced parentheses: `Untitled (1).md`
        r#"|(?P<bang>!?)\[(?P<text>[^\]\n]*)\]\((?P<target><[^>\n]+>|(?:[^()\n]|\([^()\n]*\))+?)(?P<title>\s+"[^"\n]*")?\)"#,
    ))
    .unwrap()
});

static URL_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

static SIZE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(x\d+)?$").unwrap());

/// A rewritten document body and every reference met along the way.
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    pub body: String,
    pub references: Vec<ResolvedReference>,
}

impl RewriteOutcome {
    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.references.iter().filter(|r| !r.found)
    }
}

impl Resolver {
    /// Rewrite every reference construct in `body` outside code spans.
    pub fn rewrite(&mut self, document_dir: &Path, body: &str) -> RewriteOutcome {
        let mut references = Vec::new();
        let body = rewrite_text_spans(body, |text| {
            LINK_RE
                .replace_all(text, |caps: &Captures<'_>| {
                    self.render(document_dir, caps, &mut references)
                })
                .into_owned()
        });
        RewriteOutcome { body, references }
    }

    fn render(
        &mut self,
        document_dir: &Path,
        caps: &Captures<'_>,
        references: &mut Vec<ResolvedReference>,
    ) -> String {
        if let Some(inner) = caps.name("embed") {
            self.render_wiki(document_dir, inner.as_str(), true, &caps[0], references)
        } else if let Some(inner) = caps.name("wiki") {
            self.render_wiki(document_dir, inner.as_str(), false, &caps[0], references)
        } else {
            self.render_markdown(document_dir, caps, references)
        }
    }

    fn render_wiki(
        &mut self,
        document_dir: &Path,
        inner: &str,
        embed: bool,
        whole: &str,
        references: &mut Vec<ResolvedReference>,
    ) -> String {
        let Some(key) = lookup_key(inner) else {
            return whole.to_string();
        };
        let alias = split_alias(inner)
            .1
            .map(str::trim)
            .filter(|alias| !alias.is_empty() && !(embed && SIZE_HINT_RE.is_match(alias)));

        let resolved = self.resolve(document_dir, inner);
        let target = self.link_target(document_dir, &resolved);
        let display = escape_link_text(&alias.map(str::to_string).unwrap_or_else(|| display_name(&key)));

        let media = match &resolved.target_path {
            Some(path) => exclusion::is_embeddable_media(path),
            None => exclusion::is_embeddable_media(Path::new(&candidate_file_name(&key))),
        };
        references.push(resolved);

        if embed && media {
            format!("![{display}]({target})")
        } else {
            format!("[{display}]({target})")
        }
    }

    fn render_markdown(
        &mut self,
        document_dir: &Path,
        caps: &Captures<'_>,
        references: &mut Vec<ResolvedReference>,
    ) -> String {
        let whole = &caps[0];
        let raw = caps["target"].trim();
        let raw = raw.strip_prefix('<').and_then(|t| t.strip_suffix('>')).unwrap_or(raw);

        if raw.is_empty() || raw.starts_with('#') || URL_SCHEME_RE.is_match(raw) {
            return whole.to_string();
        }

        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        let resolved = self.resolve(document_dir, &decoded);
        if resolved.original_text.is_empty() {
            return whole.to_string();
        }
        let target = self.link_target(document_dir, &resolved);
        references.push(resolved);

        let title = caps.name("title").map_or("", |m| m.as_str());
        format!("{}[{}]({target}{title})", &caps["bang"], &caps["text"])
    }
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}
