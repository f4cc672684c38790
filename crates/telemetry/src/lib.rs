//! Observability bootstrap shared by every service binary.
//!
//! A process calls [`init_observability`] once at startup and keeps the
//! returned [`ObservabilityHandle`] until it exits. The handle owns the
//! Prometheus recorder and is shut down explicitly by the entry point.

use std::str::FromStr;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Errors raised while installing logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    /// The log format name is unknown.
    #[error("invalid log format '{0}': expected 'text' or 'json'")]
    InvalidLogFormat(String),

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive, e.g. `info,checkout=debug`.
    pub log_filter: String,
    pub log_format: LogFormat,
    /// Whether to install the Prometheus recorder.
    pub install_metrics: bool,
}

impl ObservabilityConfig {
    /// Reads `RUST_LOG` and `LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let defaults = Self::default();
        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.log_format,
        };
        Ok(Self {
            log_filter: std::env::var("RUST_LOG").unwrap_or(defaults.log_filter),
            log_format,
            install_metrics: defaults.install_metrics,
        })
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
            install_metrics: true,
        }
    }
}

/// Owns the process-wide telemetry state.
#[derive(Debug)]
pub struct ObservabilityHandle {
    service_name: String,
    metrics: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Renders metrics for the `/metrics` endpoint, if a recorder is installed.
    pub fn metrics(&self) -> Option<PrometheusHandle> {
        self.metrics.clone()
    }

    /// Flushes pending metric state and logs the shutdown.
    pub fn shutdown(self) {
        if let Some(metrics) = &self.metrics {
            metrics.run_upkeep();
        }
        tracing::info!(service = %self.service_name, "observability shut down");
    }
}

/// Installs the global tracing subscriber and, if configured, the
/// Prometheus recorder with a `service` label on every metric.
///
/// Fails if either is already installed in this process.
pub fn init_observability(
    service_name: &str,
    config: &ObservabilityConfig,
) -> Result<ObservabilityHandle, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_filter)?;
    let fmt_layer = match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    let metrics = if config.install_metrics {
        let handle = PrometheusBuilder::new()
            .add_global_label("service", service_name)
            .install_recorder()?;
        Some(handle)
    } else {
        None
    };

    tracing::info!(
        service = service_name,
        log_format = ?config.log_format,
        metrics = config.install_metrics,
        "observability initialized"
    );

    Ok(ObservabilityHandle {
        service_name: service_name.to_string(),
        metrics,
    })
}

/// Describes the checkout metrics so the exporter emits help text for them.
pub fn describe_checkout_metrics() {
    metrics::describe_counter!("checkout_requests_total", "Checkout requests received");
    metrics::describe_counter!(
        "checkout_orders_total",
        "Orders produced, labelled by final status"
    );
    metrics::describe_histogram!(
        "checkout_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent on the request path of a checkout"
    );
    metrics::describe_histogram!(
        "checkout_step_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent in each request-path step"
    );
    metrics::describe_counter!(
        "checkout_step_failures_total",
        "Failed steps, labelled by step and reason"
    );
    metrics::describe_counter!(
        "checkout_background_tasks_total",
        "Detached tasks, labelled by task and outcome"
    );
    metrics::describe_gauge!(
        "checkout_background_tasks_pending",
        "Detached tasks still in flight when scraped"
    );
}
