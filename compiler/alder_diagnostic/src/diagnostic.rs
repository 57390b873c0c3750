//! The diagnostic value type.

use std::fmt;

use alder_source::{SourceLocation, SourceRange};

use crate::{DiagCode, Severity};

/// A single argument carried by a diagnostic, substituted into the
/// code's message template by the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagArg {
    Str(String),
    Int(i64),
    /// A preformatted constant (e.g. a four-state integer).
    Constant(String),
}

impl fmt::Display for DiagArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagArg::Str(s) | DiagArg::Constant(s) => f.write_str(s),
            DiagArg::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for DiagArg {
    fn from(s: &str) -> Self {
        DiagArg::Str(s.to_owned())
    }
}

impl From<String> for DiagArg {
    fn from(s: String) -> Self {
        DiagArg::Str(s)
    }
}

impl From<i64> for DiagArg {
    fn from(v: i64) -> Self {
        DiagArg::Int(v)
    }
}

impl From<i32> for DiagArg {
    fn from(v: i32) -> Self {
        DiagArg::Int(v.into())
    }
}

impl From<u32> for DiagArg {
    fn from(v: u32) -> Self {
        DiagArg::Int(v.into())
    }
}

/// A typed, location-tagged report.
///
/// Severity defaults to the code's own but can be overridden (e.g. by
/// command-line promotion of warnings); arguments are appended in
/// template order with [`Diagnostic::with_arg`].
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub severity: Severity,
    pub range: SourceRange,
    pub args: Vec<DiagArg>,
    /// Secondary locations ("declared here", "expanded from here").
    pub notes: Vec<(String, SourceRange)>,
}

impl Diagnostic {
    pub fn new(code: DiagCode, range: SourceRange) -> Self {
        Diagnostic {
            code,
            severity: code.severity(),
            range,
            args: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Convenience for a zero-length range at a location.
    pub fn at(code: DiagCode, loc: SourceLocation) -> Self {
        Self::new(code, SourceRange::point(loc))
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<DiagArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_note(mut self, message: impl Into<String>, range: SourceRange) -> Self {
        self.notes.push((message.into(), range));
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }

    /// Substitute arguments into the message template. Placeholders
    /// beyond the supplied arguments are left as `{}`.
    pub fn message(&self) -> String {
        let template = self.code.template();
        let mut out = String::with_capacity(template.len());
        let mut args = self.args.iter();
        let mut rest = template;
        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            match args.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_source::{BufferId, SourceLocation};

    fn range() -> SourceRange {
        SourceRange::point(SourceLocation::NONE)
    }

    #[test]
    fn message_substitution() {
        let d = Diagnostic::new(DiagCode::UndeclaredIdentifier, range()).with_arg("foo");
        assert_eq!(d.message(), "use of undeclared identifier 'foo'");
    }

    #[test]
    fn message_multiple_args() {
        let d = Diagnostic::new(DiagCode::ValueOutOfRange, range())
            .with_arg("5000000000")
            .with_arg(i32::MIN)
            .with_arg(i32::MAX);
        assert_eq!(
            d.message(),
            "value 5000000000 is out of range [-2147483648, 2147483647]"
        );
    }

    #[test]
    fn missing_args_leave_placeholders() {
        let d = Diagnostic::new(DiagCode::NotAMember, range()).with_arg("x");
        assert_eq!(d.message(), "'x' is not a member of '{}'");
    }

    #[test]
    fn severity_tracks_code() {
        let d = Diagnostic::at(
            DiagCode::SkippedTokens,
            SourceLocation::new(BufferId::NONE, 0),
        );
        assert_eq!(d.severity, Severity::Note);
        assert!(!d.is_error());
    }
}
