//! Errors and Diagnostics for the Probe Compiler
//!
//! Two channels leave the compiler:
//! - `BuildError`: the input catalogs are incoherent and nothing can be emitted.
//! - `Diagnostics`: one custom test is broken; its entry carries a throwing stub
//!   and the rest of the table is unaffected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_IDL_SYNTAX: &str = "P-ERR-IDL-SYNTAX";
pub const ERR_PARTIAL_BASE: &str = "P-ERR-PARTIAL";
pub const ERR_DUPLICATE: &str = "P-ERR-DUPLICATE";
pub const ERR_MIXIN: &str = "P-ERR-MIXIN";
pub const ERR_EXPOSED: &str = "P-ERR-EXPOSED";
pub const ERR_SCOPE: &str = "P-ERR-SCOPE";
pub const ERR_UNKNOWN_TYPE: &str = "P-ERR-TYPE";
pub const ERR_CSS_COLLISION: &str = "P-ERR-CSS";
pub const ERR_RESOURCE: &str = "P-ERR-RESOURCE";
pub const ERR_IMPORT_CYCLE: &str = "P-ERR-IMPORT-CYCLE";
pub const ERR_CATALOG: &str = "P-ERR-CATALOG";

pub const DIAG_INVALID_IMPORT: &str = "P-DIAG-IMPORT";
pub const DIAG_MALFORMED_TEST: &str = "P-DIAG-MALFORMED";

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("IDL syntax error in {fragment} at line {line}: {message}")]
    IdlSyntax {
        fragment: String,
        line: u32,
        message: String,
    },

    #[error("Original definition not found for partial {kind} {name}")]
    PartialWithoutBase { kind: String, name: String },

    #[error("Duplicate definition of {owner}.{member}")]
    DuplicateMember { owner: String, member: String },

    #[error("Duplicate definition of {name}")]
    DuplicateDefinition { name: String },

    #[error("Target {target} not found for interface mixin {mixin}")]
    MixinTargetNotFound { target: String, mixin: String },

    #[error("Interface mixin {mixin} not found for target {target}")]
    MixinNotFound { mixin: String, target: String },

    #[error("Exposed extended attribute not found on {kind} {name}")]
    ExposedNotFound { kind: String, name: String },

    #[error("{kind} {name} (line {line}) is missing the Exposed extended attribute")]
    MissingExposed { kind: String, name: String, line: u32 },

    #[error("Unexpected RHS \"{rhs}\" for Exposed extended attribute")]
    UnexpectedExposedRhs { rhs: String },

    #[error("{kind} {name} is exposed on {scope} but {scope} is not a valid scope")]
    InvalidScope {
        kind: String,
        name: String,
        scope: String,
    },

    #[error("Unknown type {name}")]
    UnknownType { name: String },

    #[error("Custom CSS property already known: {name}")]
    CssPropertyAlreadyKnown { name: String },

    #[error("Resource {resource} is not defined but referenced in {path}")]
    UndefinedResource { resource: String, path: String },

    #[error("Cyclic import of {path} (chain: {chain})")]
    CyclicImport { path: String, chain: String },

    #[error("Invalid custom test catalog at {path}: {message}")]
    InvalidCatalog { path: String, message: String },
}

impl BuildError {
    /// Stable code for the error class.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::IdlSyntax { .. } => ERR_IDL_SYNTAX,
            BuildError::PartialWithoutBase { .. } => ERR_PARTIAL_BASE,
            BuildError::DuplicateMember { .. } | BuildError::DuplicateDefinition { .. } => {
                ERR_DUPLICATE
            }
            BuildError::MixinTargetNotFound { .. } | BuildError::MixinNotFound { .. } => ERR_MIXIN,
            BuildError::ExposedNotFound { .. }
            | BuildError::MissingExposed { .. }
            | BuildError::UnexpectedExposedRhs { .. } => ERR_EXPOSED,
            BuildError::InvalidScope { .. } => ERR_SCOPE,
            BuildError::UnknownType { .. } => ERR_UNKNOWN_TYPE,
            BuildError::CssPropertyAlreadyKnown { .. } => ERR_CSS_COLLISION,
            BuildError::UndefinedResource { .. } => ERR_RESOURCE,
            BuildError::CyclicImport { .. } => ERR_IMPORT_CYCLE,
            BuildError::InvalidCatalog { .. } => ERR_CATALOG,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NON-FATAL DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    /// Dotted path of the test the diagnostic belongs to.
    pub path: String,
    pub message: String,
}

/// Collector threaded through the build. The caller decides how to surface it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. The same snippet is compiled once per member that
    /// shares it, so repeats of an identical entry are dropped.
    pub fn report(&mut self, code: &str, path: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            code: code.to_string(),
            path: path.to_string(),
            message: message.into(),
        };
        if self.entries.contains(&diagnostic) {
            return;
        }
        tracing::error!(code, path, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
