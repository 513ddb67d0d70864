//! Database simulation metrics

use std::sync::Arc;

use super::metrics::{exponential_buckets, MetricsRegistry};
use crate::simulator::Instrumentation;

pub const DB_QUERY_DURATION: &str = "db_query_duration_seconds";
pub const DB_QUERIES_TOTAL: &str = "db_queries_total";
pub const DB_QUERY_ERRORS: &str = "db_query_errors_total";
pub const DB_INFLIGHT_QUERIES: &str = "db_inflight_queries";
pub const DB_ROWS_AFFECTED: &str = "db_rows_affected";
pub const DB_CONNECTION_POOL: &str = "db_connection_pool";

/// Default buckets of `db_query_duration_seconds`
pub const DB_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Records simulated database calls into a [`MetricsRegistry`]
#[derive(Clone)]
pub struct DbMetrics {
    registry: Arc<MetricsRegistry>,
}

impl DbMetrics {
    /// Describe the database families on `registry`.
    ///
    /// `duration_buckets` defaults to [`DB_DURATION_BUCKETS`].
    pub fn new(registry: Arc<MetricsRegistry>, duration_buckets: Option<&[f64]>) -> Self {
        registry.describe_histogram(
            DB_QUERY_DURATION,
            "Histogram of database query durations.",
            duration_buckets.unwrap_or(DB_DURATION_BUCKETS),
        );
        registry.describe_counter(DB_QUERIES_TOTAL, "Total number of database queries.");
        registry.describe_counter(DB_QUERY_ERRORS, "Total number of database query errors.");
        registry.describe_gauge(DB_INFLIGHT_QUERIES, "Current number of in-flight database queries.");
        registry.describe_histogram(
            DB_ROWS_AFFECTED,
            "Histogram of rows affected by database operations.",
            &exponential_buckets(1.0, 2.0, 12),
        );
        registry.describe_gauge(DB_CONNECTION_POOL, "Database connection pool statistics.");

        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Publish connection pool statistics.
    pub fn set_connection_pool(&self, open: i64, idle: i64, in_use: i64, max: i64) {
        for (state, value) in [("open", open), ("idle", idle), ("in_use", in_use), ("max", max)] {
            self.registry
                .gauge_set(DB_CONNECTION_POOL, &[("state", state)], value);
        }
    }
}

impl Instrumentation for DbMetrics {
    fn inc_inflight(&self, operation: &str, target: &str) {
        self.registry.gauge_add(
            DB_INFLIGHT_QUERIES,
            &[("operation", operation), ("table", target)],
            1,
        );
    }

    fn dec_inflight(&self, operation: &str, target: &str) {
        self.registry.gauge_add(
            DB_INFLIGHT_QUERIES,
            &[("operation", operation), ("table", target)],
            -1,
        );
    }

    fn record_query(&self, operation: &str, target: &str, status: &str, seconds: f64) {
        let labels = [("operation", operation), ("table", target), ("status", status)];
        self.registry.histogram_observe(DB_QUERY_DURATION, &labels, seconds);
        self.registry.counter_inc(DB_QUERIES_TOTAL, &labels, 1);
    }

    fn record_error(&self, operation: &str, target: &str, error_type: &str) {
        self.registry.counter_inc(
            DB_QUERY_ERRORS,
            &[("operation", operation), ("table", target), ("error_type", error_type)],
            1,
        );
    }

    fn record_rows_affected(&self, operation: &str, target: &str, rows: u32) {
        self.registry.histogram_observe(
            DB_ROWS_AFFECTED,
            &[("operation", operation), ("table", target)],
            f64::from(rows),
        );
    }
}
