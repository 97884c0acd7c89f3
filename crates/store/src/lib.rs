pub mod error;
pub mod metrics;
pub mod service;
pub mod store;

pub use error::{ServiceError, StoreError};
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use service::LifecycleService;
pub use store::{EphemeralStore, FirstView, RemovalCause};
