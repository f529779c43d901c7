//! Counters for access decisions and errors.
//!
//! The crate records through the `metrics` facade. A binary calls
//! [`init_metrics`] once to install a Prometheus recorder and register the
//! metric descriptions; the returned [`MetricsRegistry`] renders the
//! collected values in Prometheus text format.

use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

/// Counter of access decisions, labelled `action` and `outcome`.
pub const ACCESS_DECISIONS_TOTAL: &str = "vault_access_decisions_total";

/// Counter of crate-level errors, labelled `code`, `category` and `severity`.
pub const ERRORS_TOTAL: &str = "vault_errors_total";

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether a recorder is installed at all
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Labels added to every metric
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

/// Handle to the installed recorder, if any.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder behind it.
    pub fn disabled() -> Self {
        Self {
            prometheus_handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the process-wide Prometheus recorder.
///
/// # Errors
///
/// Returns an error if a global recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    let handle = builder.install_recorder()?;

    describe_metrics();
    tracing::debug!("Metrics recorder installed");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

/// Register descriptions for every metric the crate emits with the current
/// recorder.
pub fn describe_metrics() {
    describe_counter!(
        ACCESS_DECISIONS_TOTAL,
        Unit::Count,
        "Access decisions by action and outcome"
    );
    describe_counter!(
        ERRORS_TOTAL,
        Unit::Count,
        "Errors by code, category and severity"
    );
}
