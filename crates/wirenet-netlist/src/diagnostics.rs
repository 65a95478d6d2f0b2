//! Recoverable problems found while netlisting.
//!
//! A netlisting pass never stops for these; each one is recorded here and
//! also written into the netlist as a comment at the place it was found.

use std::fmt::{self, Display};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    NamingConflict,
    UnconnectedPin,
    /// Instance pins and sub-circuit boundary pins disagree.
    PortMismatch,
    MissingTemplate,
    UnreadableView,
    IgnoredInstance,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::NamingConflict
            | DiagnosticKind::UnconnectedPin
            | DiagnosticKind::PortMismatch => Severity::Warning,
            DiagnosticKind::MissingTemplate | DiagnosticKind::UnreadableView => Severity::Error,
            DiagnosticKind::IgnoredInstance => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// The hierarchy level the problem was found on (`lib/cell/view`).
    pub scope: String,
    pub body: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, scope: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            scope: scope.into(),
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// The text written into the netlist comment line.
    pub fn comment_text(&self) -> String {
        format!("{}: {}", self.severity, self.body)
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if !self.scope.is_empty() {
            write!(f, "{} ", self.scope)?;
        }
        write!(f, "{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        let d = Diagnostic::new(DiagnosticKind::UnconnectedPin, "lib/top/schematic", "pin R1.a");
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_error());
        assert_eq!(d.to_string(), "warning: lib/top/schematic pin R1.a");
        assert_eq!(d.comment_text(), "warning: pin R1.a");

        let d = Diagnostic::new(DiagnosticKind::UnreadableView, "", "gone");
        assert!(d.is_error());
        assert_eq!(d.to_string(), "error: gone");
    }
}
