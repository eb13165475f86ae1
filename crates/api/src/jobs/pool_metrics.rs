//! Connection pool gauges.

use sqlx::PgPool;
use tracing::warn;

use super::scheduler::{Job, JobFrequency};

/// Publishes pool gauges every ten seconds and warns while the pool is exhausted.
pub struct PoolMetricsJob {
    pool: PgPool,
    max_connections: u32,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool, max_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
        }
    }
}

fn is_exhausted(size: u32, idle: usize, max_connections: u32) -> bool {
    max_connections > 0 && size >= max_connections && idle == 0
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics(&self.pool);

        let size = self.pool.size();
        let idle = self.pool.num_idle();
        if is_exhausted(size, idle, self.max_connections) {
            warn!(
                size,
                max = self.max_connections,
                "All database connections are busy"
            );
        }
        Ok(())
    }
}
