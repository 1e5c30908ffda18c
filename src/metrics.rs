use metrics::{counter, describe_counter, describe_gauge, gauge};
use std::sync::Once;

static DESCRIBE: Once = Once::new();

/// Pool registry metrics, recorded through the `metrics` facade
///
/// Nothing is exported unless the application installs a recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryMetrics;

impl RegistryMetrics {
    pub fn new() -> Self {
        DESCRIBE.call_once(Self::describe_metrics);
        Self
    }

    fn describe_metrics() {
        describe_counter!(
            "redis_pools_created_total",
            "Total number of per-database Redis pools created"
        );
        describe_counter!(
            "redis_pool_creation_failures_total",
            "Total number of failed Redis pool creations"
        );
        describe_gauge!(
            "redis_pools_active",
            "Number of Redis pools held by the registry"
        );
        describe_counter!(
            "redis_connections_checked_out_total",
            "Total number of connections checked out of a Redis pool"
        );
        describe_counter!(
            "redis_connection_checkout_failures_total",
            "Total number of failed Redis connection checkouts"
        );
    }

    pub fn record_pool_created(&self, database: u32, pools: usize) {
        counter!("redis_pools_created_total", "database" => database.to_string()).increment(1);
        gauge!("redis_pools_active").set(pools as f64);
    }

    pub fn record_pool_creation_failure(&self, database: u32) {
        counter!(
            "redis_pool_creation_failures_total",
            "database" => database.to_string()
        )
        .increment(1);
    }

    pub fn record_checkout(&self, database: u32, success: bool) {
        if success {
            counter!(
                "redis_connections_checked_out_total",
                "database" => database.to_string()
            )
            .increment(1);
        } else {
            counter!(
                "redis_connection_checkout_failures_total",
                "database" => database.to_string()
            )
            .increment(1);
        }
    }
}
