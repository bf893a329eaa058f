//! Severity metrics hook
//!
//! The dispatcher reports every record above INFO to a [`MetricsHook`],
//! whether or not the record then passes the threshold. Three hooks ship
//! with the crate:
//!
//! - [`NoopMetrics`]: discards every increment (the default)
//! - [`SeverityCounters`]: in-process counters keyed by severity name
//! - [`PrometheusMetrics`]: an `IntCounterVec` labelled by severity

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use prometheus::{IntCounterVec, Opts, Registry};
use stagelog_core::{LogError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Namespace used by [`PrometheusMetrics::global`].
pub const DEFAULT_NAMESPACE: &str = "kingkong";

/// Label carrying the severity name.
pub const LEVEL_LABEL: &str = "level";

/// Receives one increment per record logged above INFO.
pub trait MetricsHook: Send + Sync {
    /// Count one record at `level` (upper-case severity name).
    fn increment(&self, level: &str);
}

/// Hook that discards every increment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsHook for NoopMetrics {
    fn increment(&self, _level: &str) {}
}

/// Lock-free in-process counters keyed by severity name.
#[derive(Debug, Default)]
pub struct SeverityCounters {
    counts: DashMap<String, AtomicU64>,
}

impl SeverityCounters {
    /// Create an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count recorded for `level`, 0 if never seen.
    pub fn get(&self, level: &str) -> u64 {
        self.counts
            .get(level)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over all levels.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        self.counts.clear();
    }
}

impl MetricsHook for SeverityCounters {
    fn increment(&self, level: &str) {
        if let Some(counter) = self.counts.get(level) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counts
            .entry(level.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }
}

/// Prometheus counter `<namespace>_log_exception{level="..."}`.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    counter: IntCounterVec,
}

static GLOBAL_METRICS: OnceCell<PrometheusMetrics> = OnceCell::new();

impl PrometheusMetrics {
    /// Build the counter under `namespace` and register it in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if the namespace is not a valid metric
    /// name or a collector with the same name is already registered.
    pub fn new(namespace: &str, registry: &Registry) -> Result<Self> {
        let metrics = Self::unregistered(namespace)?;
        registry
            .register(Box::new(metrics.counter.clone()))
            .map_err(|e| LogError::Config(format!("cannot register log metrics: {}", e)))?;
        Ok(metrics)
    }

    /// Counter registered under [`DEFAULT_NAMESPACE`] in the default registry.
    ///
    /// Registration happens once; later calls return the same instance. If a
    /// foreign collector already owns the name, counting continues into an
    /// unregistered collector.
    pub fn global() -> Result<&'static PrometheusMetrics> {
        GLOBAL_METRICS.get_or_try_init(|| {
            match PrometheusMetrics::new(DEFAULT_NAMESPACE, prometheus::default_registry()) {
                Ok(metrics) => Ok(metrics),
                Err(e) => {
                    warn!(error = %e, "log metrics not registered in default registry");
                    PrometheusMetrics::unregistered(DEFAULT_NAMESPACE)
                }
            }
        })
    }

    fn unregistered(namespace: &str) -> Result<Self> {
        let opts = Opts::new("log_exception", "Log records above INFO, by severity")
            .namespace(namespace);
        let counter = IntCounterVec::new(opts, &[LEVEL_LABEL]).map_err(|e| {
            LogError::Config(format!("invalid metric namespace '{}': {}", namespace, e))
        })?;
        Ok(PrometheusMetrics { counter })
    }

    /// Current value for `level`.
    pub fn get(&self, level: &str) -> u64 {
        self.counter.with_label_values(&[level]).get()
    }

    /// Underlying collector.
    pub fn counter(&self) -> &IntCounterVec {
        &self.counter
    }
}

impl MetricsHook for PrometheusMetrics {
    fn increment(&self, level: &str) {
        self.counter.with_label_values(&[level]).inc();
    }
}
