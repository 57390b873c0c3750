//! Diagnostic collection.

use std::cell::RefCell;

use crate::{Diagnostic, Severity};

/// An ordered sink of diagnostics.
///
/// Collection happens through `&self` because diagnostics are emitted
/// from deep inside lookup and binding, where everything else is
/// borrowed immutably; the single-threaded core makes the `RefCell`
/// uncontended by construction.
#[derive(Default)]
pub struct Diagnostics {
    diags: RefCell<Vec<Diagnostic>>,
    error_limit: Option<usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop recording errors beyond `limit` (notes and warnings are
    /// unaffected). Zero means unlimited.
    pub fn with_error_limit(limit: usize) -> Self {
        Diagnostics {
            diags: RefCell::new(Vec::new()),
            error_limit: (limit > 0).then_some(limit),
        }
    }

    /// Record a diagnostic. Returns `false` if it was dropped due to
    /// the error limit.
    pub fn add(&self, diag: Diagnostic) -> bool {
        if diag.is_error() {
            if let Some(limit) = self.error_limit {
                if self.error_count() >= limit {
                    return false;
                }
            }
        }
        self.diags.borrow_mut().push(diag);
        true
    }

    pub fn len(&self) -> usize {
        self.diags.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.borrow().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diags.borrow().iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diags.borrow().iter().any(Diagnostic::is_error)
    }

    /// Snapshot of the collected diagnostics in emission order.
    pub fn collect(&self) -> Vec<Diagnostic> {
        self.diags.borrow().clone()
    }

    /// Snapshot sorted by buffer then offset then severity. Locations
    /// in different buffers keep their relative emission order only
    /// through the buffer-id tiebreak, which follows registration
    /// order.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut diags = self.collect();
        diags.sort_by_key(|d| {
            (
                d.range.start.buffer().raw(),
                d.range.start.offset(),
                std::cmp::Reverse(d.severity),
            )
        });
        diags
    }

    /// True if any diagnostic with the given code was recorded.
    pub fn contains(&self, code: crate::DiagCode) -> bool {
        self.diags.borrow().iter().any(|d| d.code == code)
    }

    /// Highest severity seen, if any diagnostics were recorded.
    pub fn max_severity(&self) -> Option<Severity> {
        self.diags.borrow().iter().map(|d| d.severity).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagCode;
    use alder_source::{BufferId, SourceLocation, SourceRange};

    fn at(offset: u32) -> SourceRange {
        SourceRange::point(SourceLocation::new(BufferId::NONE, offset))
    }

    #[test]
    fn collects_in_order() {
        let sink = Diagnostics::new();
        sink.add(Diagnostic::new(DiagCode::ExpectedStatement, at(10)));
        sink.add(Diagnostic::new(DiagCode::ExpectedExpression, at(5)));
        let all = sink.collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].code, DiagCode::ExpectedStatement);
    }

    #[test]
    fn sorted_by_position() {
        let sink = Diagnostics::new();
        sink.add(Diagnostic::new(DiagCode::ExpectedStatement, at(10)));
        sink.add(Diagnostic::new(DiagCode::ExpectedExpression, at(5)));
        let sorted = sink.sorted();
        assert_eq!(sorted[0].code, DiagCode::ExpectedExpression);
        assert_eq!(sorted[1].code, DiagCode::ExpectedStatement);
    }

    #[test]
    fn error_limit_drops_extra_errors() {
        let sink = Diagnostics::with_error_limit(1);
        assert!(sink.add(Diagnostic::new(DiagCode::ExpectedStatement, at(0))));
        assert!(!sink.add(Diagnostic::new(DiagCode::ExpectedExpression, at(1))));
        // Notes still get through.
        assert!(sink.add(Diagnostic::new(DiagCode::SkippedTokens, at(2))));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn severity_queries() {
        let sink = Diagnostics::new();
        assert_eq!(sink.max_severity(), None);
        sink.add(Diagnostic::new(DiagCode::SkippedTokens, at(0)));
        assert!(!sink.has_errors());
        sink.add(Diagnostic::new(DiagCode::DuplicateDefinition, at(1)));
        assert!(sink.has_errors());
        assert_eq!(sink.max_severity(), Some(Severity::Error));
        assert!(sink.contains(DiagCode::DuplicateDefinition));
    }
}
