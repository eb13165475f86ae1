//! Background job scheduler and job implementations.

mod expiration_alerts;
mod pool_metrics;
mod scheduler;

pub use expiration_alerts::ExpirationAlertJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
