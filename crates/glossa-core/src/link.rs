//! Link targets for annotated keywords
//!
//! Every linked keyword points at `{base_url}/keyword/{percent-encoded keyword}`.
//!
//! URL parsing resolves dot segments, so a keyword of `.` or `..` would link
//! to `/keyword/` or to the site root. Browsers resolve `%2E` the same way.
//! The glossary refuses to store such keywords.

use url::Url;

use crate::annotate::AnnotateError;

/// Builds the URL a keyword occurrence links to
pub trait LinkBuilder: Send + Sync {
    fn link_for(&self, keyword: &str) -> Result<String, AnnotateError>;
}

impl<F> LinkBuilder for F
where
    F: Fn(&str) -> Result<String, AnnotateError> + Send + Sync,
{
    fn link_for(&self, keyword: &str) -> Result<String, AnnotateError> {
        self(keyword)
    }
}

/// Links keywords to their entry page under a base URL
#[derive(Debug, Clone)]
pub struct KeywordLinks {
    base: Url,
}

impl KeywordLinks {
    /// Validate the base URL once, up front
    pub fn new(base_url: &str) -> Result<Self, AnnotateError> {
        let base = Url::parse(base_url).map_err(|e| AnnotateError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if base.cannot_be_a_base() {
            return Err(AnnotateError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        Ok(Self { base })
    }
}

impl LinkBuilder for KeywordLinks {
    fn link_for(&self, keyword: &str) -> Result<String, AnnotateError> {
        let raw = format!(
            "{}/keyword/{}",
            self.base.as_str().trim_end_matches('/'),
            urlencoding::encode(keyword)
        );

        Url::parse(&raw)
            .map(String::from)
            .map_err(|e| AnnotateError::InvalidLink {
                keyword: keyword.to_string(),
                reason: e.to_string(),
            })
    }
}
