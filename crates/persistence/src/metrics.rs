//! Query timing and pool gauges for the SQLite store.

use metrics::{gauge, histogram};
use sqlx::SqlitePool;
use std::time::Instant;

/// Publishes pool occupancy. Called when `/metrics` is scraped.
pub fn record_pool_metrics(pool: &SqlitePool) {
    let open = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("sqlite_pool_connections", "state" => "in_use").set(open.saturating_sub(idle) as f64);
    gauge!("sqlite_pool_connections", "state" => "idle").set(idle as f64);
}

/// Times one named repository query into `database_query_duration_seconds`.
///
/// ```ignore
/// let timer = QueryTimer::new("find_task_by_id");
/// let result = sqlx::query_as::<_, TaskEntity>(sql).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn record(self) {
        histogram!("database_query_duration_seconds", "query" => self.query)
            .record(self.elapsed_secs());
    }
}
