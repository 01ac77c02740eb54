use crate::spec::diagnostics::SpecErrors;

/// Convenience result type used across docsynth.
pub type SynthResult<T> = Result<T, SynthError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Provider-side failures never appear here: the structured-output enforcer absorbs them into
/// fallback content and only records the degradation.
#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    /// User-fixable spec problems, collected rather than first-fail.
    #[error("spec validation failed:\n{0}")]
    SpecValidation(SpecErrors),

    /// The spec cannot satisfy its own constraints for this sample.
    #[error("layout constraint error: {0}")]
    LayoutConstraint(String),

    /// Timeout or connection failure talking to a content provider.
    #[error("provider transient error: {0}")]
    ProviderTransient(String),

    /// Structured output that does not conform to its schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A render backend painted outside its declared tolerance.
    #[error("renderer contract violation: {0}")]
    RendererContractViolation(String),

    /// I/O failure while writing a sample artifact or the manifest.
    #[error("manifest persistence error: {0}")]
    ManifestPersistence(String),

    /// Recorded samples would be replaced or mixed with samples made from different inputs.
    #[error("manifest conflict: {0}")]
    ManifestConflict(String),

    /// Cooperative cancellation observed between pipeline stages.
    #[error("cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SynthError {
    /// Build a [`SynthError::LayoutConstraint`] value.
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::LayoutConstraint(msg.into())
    }

    /// Build a [`SynthError::ProviderTransient`] value.
    pub fn provider_transient(msg: impl Into<String>) -> Self {
        Self::ProviderTransient(msg.into())
    }

    /// Build a [`SynthError::SchemaViolation`] value.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Build a [`SynthError::RendererContractViolation`] value.
    pub fn renderer_contract(msg: impl Into<String>) -> Self {
        Self::RendererContractViolation(msg.into())
    }

    /// Build a [`SynthError::ManifestPersistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::ManifestPersistence(msg.into())
    }

    /// Build a [`SynthError::ManifestConflict`] value.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ManifestConflict(msg.into())
    }

    /// Build a [`SynthError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Short, stable class name used in batch reports.
    pub fn class(&self) -> &'static str {
        match self {
            Self::SpecValidation(_) => "SpecValidationError",
            Self::LayoutConstraint(_) => "LayoutConstraintError",
            Self::ProviderTransient(_) => "ProviderTransientError",
            Self::SchemaViolation(_) => "SchemaViolationError",
            Self::RendererContractViolation(_) => "RendererContractViolationError",
            Self::ManifestPersistence(_) => "ManifestPersistenceError",
            Self::ManifestConflict(_) => "ManifestConflictError",
            Self::Cancelled => "Cancelled",
            Self::Serde(_) => "SerializationError",
            Self::Other(_) => "Error",
        }
    }
}

impl From<SpecErrors> for SynthError {
    fn from(errors: SpecErrors) -> Self {
        Self::SpecValidation(errors)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
