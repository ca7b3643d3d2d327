//! Keyword annotation
//!
//! Turns a plain-text description into HTML where every known keyword is a
//! link to its entry. The pipeline runs against one vocabulary snapshot:
//!
//! 1. Empty text short-circuits to an empty string.
//! 2. One leftmost, longest-keyword-first pass replaces each keyword
//!    occurrence with its token. Consumed text is never revisited, so a
//!    keyword inside a longer match is not linked on its own.
//! 3. The whole substituted text is HTML-escaped.
//! 4. Tokens are swapped for `<a>` elements.
//! 5. Newlines become `<br />` followed by the newline.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

use crate::link::LinkBuilder;
use crate::vocabulary::{Vocabulary, TOKEN_PREFIX};

/// Token length: prefix plus a 256-bit hash in hex
const TOKEN_LEN: usize = TOKEN_PREFIX.len() + 64;

/// Errors raised while annotating; all of them are configuration faults
#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Cannot build link for keyword '{keyword}': {reason}")]
    InvalidLink { keyword: String, reason: String },

    #[error("Keyword matcher unavailable for {keywords} keywords: {reason}")]
    MatcherUnavailable { keywords: usize, reason: String },
}

/// Annotate `text` against a vocabulary snapshot
pub fn annotate(
    text: &str,
    vocabulary: &Vocabulary,
    links: &dyn LinkBuilder,
) -> Result<String, AnnotateError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let substituted = substitute(text, vocabulary)?;
    let escaped = escape_html(&substituted);
    let linked = link_tokens(&escaped, vocabulary, links)?;

    Ok(linked.replace('\n', "<br />\n"))
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn substitute<'t>(text: &'t str, vocabulary: &Vocabulary) -> Result<Cow<'t, str>, AnnotateError> {
    let Some(matcher) = vocabulary.matcher()? else {
        return Ok(Cow::Borrowed(text));
    };

    Ok(matcher.replace_all(text, |caps: &regex::Captures| {
        let found = &caps[0];
        vocabulary.token(found).unwrap_or(found).to_string()
    }))
}

fn link_tokens(
    escaped: &str,
    vocabulary: &Vocabulary,
    links: &dyn LinkBuilder,
) -> Result<String, AnnotateError> {
    let mut out = String::with_capacity(escaped.len());
    let mut anchors: HashMap<&str, String> = HashMap::new();
    let mut rest = escaped;

    while let Some(pos) = rest.find(TOKEN_PREFIX) {
        let keyword = rest
            .get(pos..pos + TOKEN_LEN)
            .and_then(|token| vocabulary.keyword_for_token(token));

        match keyword {
            Some(keyword) => {
                out.push_str(&rest[..pos]);
                if !anchors.contains_key(keyword) {
                    let anchor = format!(
                        "<a href=\"{}\">{}</a>",
                        escape_html(&links.link_for(keyword)?),
                        escape_html(keyword)
                    );
                    anchors.insert(keyword, anchor);
                }
                out.push_str(&anchors[keyword]);
                rest = &rest[pos + TOKEN_LEN..];
            }
            None => {
                let skip = pos + TOKEN_PREFIX.len();
                out.push_str(&rest[..skip]);
                rest = &rest[skip..];
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
