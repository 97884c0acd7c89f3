pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use error::AssetError;
pub use fs::FsAssetStore;
pub use memory::MemoryAssetStore;
pub use store::AssetStore;
