//! # Diagnostics
//!
//! Recoverable conditions hit during a conversion. None of them abort the
//! pipeline: the offending node is skipped, degraded to plain text, or the
//! image is omitted. Each distinct message is logged once per conversion.

use std::collections::HashSet;
use std::sync::Mutex;

use thiserror::Error;

/// A recoverable condition surfaced through the diagnostic log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("{kind} node is not supported without plugins.")]
    UnsupportedNodeKind { kind: String },

    #[error("{kind} node is not supported without plugins, falling back to text.")]
    FallbackDegraded { kind: String },

    #[error("Failed to load image: {url} {reason}")]
    ImageLoadFailure { url: String, reason: String },

    #[error("Not supported image: {url} {reason}")]
    ImageDecodeFailure { url: String, reason: String },

    #[error("No definition found for {kind} reference '{identifier}'")]
    UnresolvedReference { kind: String, identifier: String },
}

/// Warn-once collector scoped to one conversion session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    inner: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    seen: HashSet<String>,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Returns `true` if its message had not been seen
    /// before in this session (and was therefore logged).
    pub fn report(&self, diagnostic: Diagnostic) -> bool {
        let message = diagnostic.to_string();
        let mut recorded = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !recorded.seen.insert(message.clone()) {
            return false;
        }
        log::warn!("{}", message);
        recorded.entries.push(diagnostic);
        true
    }

    /// Distinct diagnostics in the order they were first reported.
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.inner.lock() {
            Ok(guard) => guard.entries.clone(),
            Err(poisoned) => poisoned.into_inner().entries.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_message_is_reported_once() {
        let diagnostics = Diagnostics::new();
        let d = Diagnostic::UnsupportedNodeKind {
            kind: "footnoteReference".to_string(),
        };
        assert!(diagnostics.report(d.clone()));
        assert!(!diagnostics.report(d));
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let first = Diagnostics::new();
        let second = Diagnostics::new();
        let d = Diagnostic::FallbackDegraded {
            kind: "html".to_string(),
        };
        assert!(first.report(d.clone()));
        assert!(second.report(d));
    }

    #[test]
    fn test_messages() {
        let d = Diagnostic::FallbackDegraded {
            kind: "code".to_string(),
        };
        assert_eq!(
            d.to_string(),
            "code node is not supported without plugins, falling back to text."
        );
    }
}
