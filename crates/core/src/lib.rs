pub mod error;
pub mod id;
pub mod policy;
pub mod record;
pub mod types;
pub mod view;

pub use error::CoreError;
pub use id::{ID_BYTES, IdGenerator, RandomIdGenerator};
pub use policy::{LifecyclePolicy, LifecycleState};
pub use record::AssetRecord;
pub use types::{AssetId, AssetRef};
pub use view::ViewState;
