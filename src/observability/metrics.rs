//! Metrics for the roster engine
//!
//! Names live in [`MetricName`] so call sites never spell metric strings by hand. Without an
//! installed recorder every helper is a no-op, which is what unit tests rely on.

use std::fmt;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{Result, RosterError};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Fetch cycle, labelled by dataset
    FetchSuccess,
    FetchError,
    FetchDuration,
    StaleResponsesDiscarded,

    // Row validation
    RowsRejected,

    // Aggregation and roster views
    AggregatedPlaces,
    FilteredVoters,

    // Map reconciliation
    MarkersAdded,
    MarkersRemoved,
    CoordinatesUnresolved,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchSuccess => "roster_fetch_success_total",
            MetricName::FetchError => "roster_fetch_error_total",
            MetricName::FetchDuration => "roster_fetch_duration_seconds",
            MetricName::StaleResponsesDiscarded => "roster_stale_responses_discarded_total",
            MetricName::RowsRejected => "roster_rows_rejected_total",
            MetricName::AggregatedPlaces => "roster_aggregated_places",
            MetricName::FilteredVoters => "roster_filtered_voters",
            MetricName::MarkersAdded => "roster_map_markers_added_total",
            MetricName::MarkersRemoved => "roster_map_markers_removed_total",
            MetricName::CoordinatesUnresolved => "roster_map_coordinates_unresolved_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            FetchSuccess,
            FetchError,
            FetchDuration,
            StaleResponsesDiscarded,
            RowsRejected,
            AggregatedPlaces,
            FilteredVoters,
            MarkersAdded,
            MarkersRemoved,
            CoordinatesUnresolved,
        ]
        .into_iter()
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is an error from the exporter.
pub fn init() -> Result<()> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| RosterError::Metrics(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far, if [`init`] ran.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn emit_counter(name: MetricName, value: u64) {
    if value > 0 {
        ::metrics::counter!(name.as_str()).increment(value);
    }
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

// ============================================================================
// Fetch Metrics
// ============================================================================

pub mod fetch {
    use super::MetricName;

    /// Record a successful fetch of `dataset` and how long it took
    pub fn success(dataset: &'static str, secs: f64) {
        ::metrics::counter!(MetricName::FetchSuccess.as_str(), "dataset" => dataset).increment(1);
        ::metrics::histogram!(MetricName::FetchDuration.as_str(), "dataset" => dataset).record(secs);
    }

    /// Record a failed fetch of `dataset`
    pub fn error(dataset: &'static str) {
        ::metrics::counter!(MetricName::FetchError.as_str(), "dataset" => dataset).increment(1);
    }

    /// Record a response that arrived after a newer snapshot was installed
    pub fn stale(dataset: &'static str) {
        ::metrics::counter!(MetricName::StaleResponsesDiscarded.as_str(), "dataset" => dataset)
            .increment(1);
    }
}
