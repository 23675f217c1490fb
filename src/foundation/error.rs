/// Convenience result type used across thala.
pub type ThalaResult<T> = Result<T, ThalaError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant is fatal: a build or render either completes or fails as a whole.
#[derive(thiserror::Error, Debug)]
pub enum ThalaError {
    /// Wrong child count, unknown tag or missing required attribute.
    #[error("schema error: {0}")]
    Schema(String),

    /// A numeric attribute or derived value is outside its allowed range.
    #[error("parameter range error: {0}")]
    ParameterRange(String),

    /// Decoder, speech synthesis or subprocess failure.
    #[error("upstream service error: {0}")]
    UpstreamService(String),

    /// Malformed time, gain or numeric attribute, or malformed JSON input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Engine configuration cannot satisfy the scene.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ThalaError {
    /// Build a [`ThalaError::Schema`] value.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Build a [`ThalaError::ParameterRange`] value.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::ParameterRange(msg.into())
    }

    /// Build a [`ThalaError::UpstreamService`] value.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamService(msg.into())
    }

    /// Build a [`ThalaError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Build a [`ThalaError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
