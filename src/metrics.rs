#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<StewardMetrics> = Lazy::new(StewardMetrics::init);

/// Query counters reported through the global OpenTelemetry meter
#[cfg(feature = "metrics")]
pub struct StewardMetrics {
    pub queries_total: Counter<u64>,
    pub rows_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl StewardMetrics {
    pub fn init() -> Self {
        Self::with_meter(&global::meter("steward"))
    }

    pub fn with_meter(meter: &Meter) -> Self {
        let queries_total = meter.u64_counter("steward_queries_total")
            .with_description("Total queryset fetches executed").build();

        let rows_total = meter.u64_counter("steward_rows_total")
            .with_description("Rows returned by queryset fetches").build();

        let query_duration = meter.f64_histogram("steward_query_duration_seconds")
            .with_description("Duration of queryset fetches").build();

        Self {
            queries_total,
            rows_total,
            query_duration,
        }
    }

    pub fn record_fetch(&self, rows: usize, elapsed: std::time::Duration) {
        self.queries_total.add(1, &[]);
        self.rows_total.add(rows as u64, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn get_queryset_span(model: &str, manager: &str) -> Span {
        info_span!("steward.get_queryset", model = model, manager = manager)
    }

    pub fn execute_query_span(table: &str, operation: &'static str) -> Span {
        info_span!("steward.execute_query", db.sql.table = table, db.operation = operation)
    }

    /// Install a bare `tracing_subscriber` registry as the global subscriber
    ///
    /// Returns `false` if a global subscriber was already set.
    pub fn install_registry() -> bool {
        tracing::subscriber::set_global_default(tracing_subscriber::registry()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "metrics")]
    use super::*;

    #[cfg(feature = "metrics")]
    #[test]
    fn test_record_fetch_with_sdk_meter() {
        use opentelemetry::metrics::MeterProvider;
        use opentelemetry_sdk::metrics::SdkMeterProvider;

        let provider = SdkMeterProvider::builder().build();
        let metrics = StewardMetrics::with_meter(&provider.meter("steward"));
        metrics.record_fetch(3, std::time::Duration::from_millis(2));
        metrics.record_fetch(0, std::time::Duration::ZERO);
        assert!(provider.force_flush().is_ok());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_global_metrics_record() {
        METRICS.record_fetch(2, std::time::Duration::from_micros(50));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_spans_enter_without_subscriber() {
        let _ = super::tracing_helpers::install_registry();
        let _outer = super::tracing_helpers::get_queryset_span("User", "query").entered();
        let _inner = super::tracing_helpers::execute_query_span("users", "all").entered();
    }
}
