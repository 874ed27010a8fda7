pub mod metrics;
pub mod tracing;

pub use metrics::{CacheMetrics, MetricsSnapshot, TimingGuard};
pub use tracing::init_tracing;
