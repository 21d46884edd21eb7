//! Operation-latency monitoring: records every apply through the
//! `metrics` crate and warns past the apply-latency budget, the way
//! the donor's `apply_operation` Tauri command does.

use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Target ceiling for a single `apply_local`/`apply_remote` call.
pub const LATENCY_BUDGET_MS: u64 = 150;

/// Installs the process-global Prometheus recorder so the `histogram!`
/// and `counter!` calls below actually go somewhere. A no-op (but not
/// an error) when `enabled` is false, matching the donor's
/// `MetricsConfig::enabled` gate.
///
/// Must be called at most once per process; the host binary does this
/// in `main` before any `SyncManager` command is handled.
pub fn install_recorder(enabled: bool) -> anyhow::Result<()> {
    if !enabled {
        tracing::info!("metrics collection disabled");
        return Ok(());
    }
    PrometheusBuilder::new().install()?;
    tracing::info!("prometheus metrics recorder installed");
    Ok(())
}

/// Stopwatch for a single apply call.
pub struct LatencyTracker {
    start: Instant,
}

impl LatencyTracker {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::start()
    }
}

/// Thin wrapper around the `metrics` crate's global recorder, scoped to
/// the handful of series this host actually emits.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerformanceMonitor;

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Records one apply's latency and warns if it exceeded
    /// [`LATENCY_BUDGET_MS`].
    pub fn record_operation_latency(&self, latency_ms: u64) {
        metrics::histogram!("syncweave_operation_latency_ms").record(latency_ms as f64);
        metrics::counter!("syncweave_operations_total").increment(1);
        if latency_ms > LATENCY_BUDGET_MS {
            tracing::warn!(
                latency_ms,
                budget_ms = LATENCY_BUDGET_MS,
                "operation apply exceeded latency budget"
            );
        }
    }

    pub fn record_conflict_resolved(&self) {
        metrics::counter!("syncweave_conflicts_resolved_total").increment(1);
    }

    pub fn record_duplicate_delivery(&self) {
        metrics::counter!("syncweave_duplicate_deliveries_total").increment(1);
    }
}
