//! Diagnostics collected while building the SDK graph.
//!
//! Nothing in the pipeline aborts on a recoverable problem: every issue is pushed into a
//! [`Diagnostics`] sink and the pass continues with a safe fallback.

use serde::Serialize;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    UnionNull,
    UnionCircular,
    DiscriminatorNotConstant,
    DiscriminatorNotString,
    NoCorrespondingMethodParam,
    ConflictingMultipartModelUsage,
    ConflictAccessOverride,
    MultipleResponseTypes,
    InvalidEncodeForCollectionFormat,
    DuplicateClientName,
    ClientLocationConflict,
    ExampleLoading,
    DuplicateExampleFile,
    ExampleValueNoMapping,
}

impl DiagnosticCode {
    /// Returns the kebab-case code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnionNull => "union-null",
            DiagnosticCode::UnionCircular => "union-circular",
            DiagnosticCode::DiscriminatorNotConstant => "discriminator-not-constant",
            DiagnosticCode::DiscriminatorNotString => "discriminator-not-string",
            DiagnosticCode::NoCorrespondingMethodParam => "no-corresponding-method-param",
            DiagnosticCode::ConflictingMultipartModelUsage => "conflicting-multipart-model-usage",
            DiagnosticCode::ConflictAccessOverride => "conflict-access-override",
            DiagnosticCode::MultipleResponseTypes => "multiple-response-types",
            DiagnosticCode::InvalidEncodeForCollectionFormat => {
                "invalid-encode-for-collection-format"
            }
            DiagnosticCode::DuplicateClientName => "duplicate-client-name",
            DiagnosticCode::ClientLocationConflict => "client-location-conflict",
            DiagnosticCode::ExampleLoading => "example-loading",
            DiagnosticCode::DuplicateExampleFile => "duplicate-example-file",
            DiagnosticCode::ExampleValueNoMapping => "example-value-no-mapping",
        }
    }

    /// Default severity attached to this code.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::DiscriminatorNotConstant
            | DiagnosticCode::NoCorrespondingMethodParam
            | DiagnosticCode::ConflictingMultipartModelUsage
            | DiagnosticCode::DuplicateClientName
            | DiagnosticCode::DuplicateExampleFile => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Human-readable name of the offending node (e.g. "Pet.kind", "get.body")
    pub target: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} {} [{}]: {}", level, self.code, self.target, self.message)
    }
}

/// Ordered diagnostics sink.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a diagnostic with the code's default severity.
    pub fn report(
        &mut self,
        code: DiagnosticCode,
        target: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity: code.severity(),
            code,
            target: target.into(),
            message: message.into(),
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = diagnostic.code.as_str(),
            target = %diagnostic.target,
            "diagnostic reported"
        );
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for d in other.items {
            self.push(d);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if any error-level diagnostic was reported.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// All diagnostics carrying the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
