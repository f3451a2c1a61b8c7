// Purpose: Structured failure kinds for template loading, rendering and
// validation. Everything here is scoped to a single template or role and is
// recoverable; the batch resolver never aborts on these.

use thiserror::Error;

use super::template::SlotType;

// Raised while loading or verifying a template, before any role is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("stack {stack}: slot {slot} declared more than once")]
    DuplicateSlot { stack: String, slot: String },

    #[error("stack {stack}: default for slot {slot} does not match declared type {expected}")]
    BadDefault {
        stack: String,
        slot: String,
        expected: SlotType,
    },

    #[error("stack {stack}: instruction references undeclared slot {slot}")]
    UndeclaredSlot { stack: String, slot: String },

    #[error("stack {stack}: slot {slot} is declared {declared} but used as {referenced}")]
    SlotTypeConflict {
        stack: String,
        slot: String,
        declared: SlotType,
        referenced: SlotType,
    },

    #[error("duplicate template for stack {stack}")]
    DuplicateStack { stack: String },
}

// Raised by the validator over a fully rendered specification. Checks run in
// a fixed order and the first violation wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no base image instruction")]
    MissingBaseImage,

    #[error("base image instruction at position {position}, must be first")]
    BaseImageNotFirst { position: usize },

    #[error("more than one base image instruction")]
    DuplicateBaseImage,

    #[error("exposed port {port} is outside 1-65535")]
    PortOutOfRange { port: i64 },

    #[error("instruction at position {position} follows the entrypoint")]
    InstructionAfterEntrypoint { position: usize },

    #[error("copy source {path:?} is not relative to the build context")]
    AbsoluteCopySource { path: String },

    #[error("copy source {path:?} escapes the build context")]
    TraversalAttempt { path: String },

    #[error("package name {package:?} contains characters outside [A-Za-z0-9.+-]")]
    ForbiddenPackageName { package: String },
}

impl ValidationError {
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::MissingBaseImage
            | ValidationError::BaseImageNotFirst { .. }
            | ValidationError::DuplicateBaseImage => "base-image",
            ValidationError::PortOutOfRange { .. } => "port-range",
            ValidationError::InstructionAfterEntrypoint { .. } => "entrypoint-terminal",
            ValidationError::AbsoluteCopySource { .. } | ValidationError::TraversalAttempt { .. } => {
                "copy-context"
            }
            ValidationError::ForbiddenPackageName { .. } => "package-tokens",
        }
    }
}

// Per-role failure as reported by the resolver. The offending role is the
// key of the resolution map entry this sits in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no template for stack {stack}")]
    TemplateNotFound { stack: String },

    #[error("required slot {slot} has no value and no default")]
    MissingRequiredVariable { slot: String },

    #[error("slot {slot} expects a {expected} value, got {supplied}")]
    TypeMismatch {
        slot: String,
        expected: SlotType,
        supplied: &'static str,
    },

    #[error("variable {slot} is not declared by the template")]
    UnknownVariable { slot: String },

    #[error("value for slot {slot} rejected: {detail}")]
    UnsafeValue { slot: String, detail: String },

    #[error("validation failed ({}): {}", .0.rule(), .0)]
    Validation(#[from] ValidationError),
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::TemplateNotFound { .. } => "template-not-found",
            ResolveError::MissingRequiredVariable { .. } => "missing-required-variable",
            ResolveError::TypeMismatch { .. } => "type-mismatch",
            ResolveError::UnknownVariable { .. } => "unknown-variable",
            ResolveError::UnsafeValue { .. } => "unsafe-value",
            ResolveError::Validation(e) => e.rule(),
        }
    }
}
