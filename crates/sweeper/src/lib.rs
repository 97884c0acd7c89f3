//! Background sweep of unviewed assets.
//!
//! Assets that are viewed are deleted by their own countdown. Assets nobody
//! ever opens would live forever, so a [`SweepProcessor`] periodically scans
//! the store and removes those older than the unviewed grace period.

mod processor;

pub use processor::{SweepConfig, SweepProcessor, SweepProcessorBuilder, SweepReport};
