use thiserror::Error;

/// Errors raised by core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The operating system random source could not produce an identifier.
    #[error("id generation failed: {0}")]
    IdGeneration(String),
}
