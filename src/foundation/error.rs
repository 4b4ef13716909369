/// Convenience result type used across chalkboard.
pub type ChalkboardResult<T> = Result<T, ChalkboardError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum ChalkboardError {
    /// Invalid user-provided diagram, sequence, or option data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while ordering, resolving, or scheduling movement batches.
    #[error("choreography error: {0}")]
    Choreography(String),

    /// Errors while rendering or encoding an export.
    #[error("export error: {0}")]
    Export(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The export was cancelled before it finished. Not a failure.
    #[error("export cancelled")]
    ExportCancelled,

    /// Another export is already running.
    #[error("an export is already in progress")]
    ExportBusy,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChalkboardError {
    /// Build a [`ChalkboardError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ChalkboardError::Choreography`] value.
    pub fn choreography(msg: impl Into<String>) -> Self {
        Self::Choreography(msg.into())
    }

    /// Build a [`ChalkboardError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`ChalkboardError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// True for the expected cancellation outcome; callers suppress error reporting for it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::ExportCancelled)
    }
}

impl From<serde_json::Error> for ChalkboardError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
