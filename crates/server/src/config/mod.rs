mod lifecycle;
mod logging;
mod server;
mod storage;

#[cfg(test)]
mod tests;

pub use lifecycle::*;
pub use logging::*;
pub use server::*;
pub use storage::*;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the Ephemera server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct EphemeraConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Expiry timings.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Where uploaded originals are kept.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EphemeraConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        self.lifecycle.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
