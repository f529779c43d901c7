//! Telemetry: structured logging and the counters the crate emits.
//!
//! Metrics go through the `metrics` facade; nothing is recorded until the
//! embedding binary calls [`init_metrics`].
//!
//! # Example
//!
//! ```rust,no_run
//! use vault_core::telemetry::{init_logging, init_metrics, LoggingConfig, MetricsConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! let metrics = init_metrics(&MetricsConfig::default()).expect("Failed to install recorder");
//! println!("{}", metrics.render());
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{build_filter, init_logging, LogFormat, LoggingConfig};
pub use self::metrics::{
    describe_metrics, init_metrics, MetricsConfig, MetricsRegistry, ACCESS_DECISIONS_TOTAL,
    ERRORS_TOTAL,
};
