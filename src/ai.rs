//! Optional AI remediation hook.
//!
//! Alt-text and metadata suggestions can come from an external provider.
//! The engine consumes the trait for manual fix items only and falls back
//! silently when the provider declines or fails; the core never owns the
//! generation itself.

/// What kind of suggestion is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    /// Alternative text for an image
    AltText,
    /// Document title
    Title,
    /// Document description / subject
    Description,
    /// Keyword list
    Keywords,
}

/// A provider of remediation suggestions.
pub trait RemediationProvider: Send + Sync {
    /// Suggest a value for `kind` given free-form context (page text,
    /// element labels). `None` means the provider declines; callers must
    /// treat that as "leave for manual review".
    fn suggest(&self, kind: SuggestionKind, context: &str) -> Option<String>;
}

/// Provider that never suggests anything. The default wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

impl RemediationProvider for NullProvider {
    fn suggest(&self, _kind: SuggestionKind, _context: &str) -> Option<String> {
        None
    }
}
