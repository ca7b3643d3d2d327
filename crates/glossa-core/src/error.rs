//! Errors surfaced by the glossary service

use thiserror::Error;

use crate::annotate::AnnotateError;
use crate::cache::CacheError;
use crate::spam::SpamCheckError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Keyword must not be empty")]
    EmptyKeyword,

    /// `.` and `..` are path segments; no URL can point at them
    #[error("Keyword '{0}' cannot be linked")]
    UnlinkableKeyword(String),

    #[error("Submission rejected as spam")]
    Spam,

    #[error("No entry for keyword '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    SpamCheck(#[from] SpamCheckError),

    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

impl GlossaryError {
    /// Whether the caller sent something unacceptable, as opposed to a
    /// backend or configuration failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GlossaryError::EmptyKeyword
                | GlossaryError::UnlinkableKeyword(_)
                | GlossaryError::Spam
                | GlossaryError::NotFound(_)
        )
    }
}

pub type GlossaryResult<T> = Result<T, GlossaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections() {
        assert!(GlossaryError::EmptyKeyword.is_rejection());
        assert!(GlossaryError::Spam.is_rejection());
        assert!(GlossaryError::UnlinkableKeyword("..".into()).is_rejection());
        assert!(GlossaryError::NotFound("Rust".into()).is_rejection());
        assert!(!GlossaryError::Cache(CacheError::Uninitialized).is_rejection());
    }

    #[test]
    fn test_transparent_display() {
        let err = GlossaryError::from(CacheError::Uninitialized);
        assert_eq!(err.to_string(), CacheError::Uninitialized.to_string());

        let err = GlossaryError::NotFound("Go".into());
        assert!(err.to_string().contains("'Go'"));
    }
}
