//! Asset identifier generation.
//!
//! Identifiers double as the unguessable part of a share link, so they come
//! from the operating system random source rather than a counter.

use rand_core::{OsRng, RngCore};

use crate::error::CoreError;
use crate::types::AssetId;

/// Number of random bytes in a generated identifier (hex encoded to twice as
/// many characters).
pub const ID_BYTES: usize = 16;

/// Source of fresh asset identifiers.
///
/// Injected into the lifecycle service so tests can force collisions or
/// deterministic IDs.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier.
    fn generate(&self) -> Result<AssetId, CoreError>;
}

/// [`IdGenerator`] producing 128 random bits from [`OsRng`], hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<AssetId, CoreError> {
        let mut bytes = [0u8; ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::IdGeneration(e.to_string()))?;
        Ok(AssetId::new(hex::encode(bytes)))
    }
}
