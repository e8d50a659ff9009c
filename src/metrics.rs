//! Migration metrics and tracing spans.
//!
//! With the `metrics` feature, counters and a duration histogram are recorded
//! through OpenTelemetry and exported into a private Prometheus registry; call
//! [`render`] to obtain the text exposition. With the `tracing` feature,
//! [`tracing_helpers`] provides the spans used around migration steps and
//! ledger statements.

#[cfg(feature = "metrics")]
pub use self::otel::{render, MigrationMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use crate::migration::RunResult;
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<MigrationMetrics> = Lazy::new(MigrationMetrics::init);

    pub struct MigrationMetrics {
        registry: Registry,
        // Keeps the reader alive; dropping the provider stops collection.
        _provider: Option<SdkMeterProvider>,
        pub applied_total: Counter<u64>,
        pub failed_total: Counter<u64>,
        pub reverted_total: Counter<u64>,
        pub ledger_write_failures: Counter<u64>,
        pub migration_duration: Histogram<f64>,
    }

    impl MigrationMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => Some(SdkMeterProvider::builder().with_reader(exporter).build()),
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics disabled: {e}");
                    None
                }
            };

            let meter: Meter = match &provider {
                Some(provider) => provider.meter("tideline"),
                None => opentelemetry::global::meter("tideline"),
            };

            let applied_total = meter
                .u64_counter("tideline_migrations_applied")
                .with_description("Migrations whose up() completed")
                .build();
            let failed_total = meter
                .u64_counter("tideline_migrations_failed")
                .with_description("Migrations recorded as FAILED")
                .build();
            let reverted_total = meter
                .u64_counter("tideline_migrations_reverted")
                .with_description("Migrations reverted and removed from the ledger")
                .build();
            let ledger_write_failures = meter
                .u64_counter("tideline_ledger_write_failures")
                .with_description("Ledger inserts or deletes that did not persist")
                .build();
            let migration_duration = meter
                .f64_histogram("tideline_migration_duration_seconds")
                .with_description("Wall time spent inside up()")
                .build();

            Self {
                registry,
                _provider: provider,
                applied_total,
                failed_total,
                reverted_total,
                ledger_write_failures,
                migration_duration,
            }
        }

        pub fn record_run(&self, result: &RunResult) {
            if result.is_completed() {
                self.applied_total.add(1, &[]);
            } else {
                self.failed_total.add(1, &[]);
            }
            self.migration_duration
                .record(Duration::from_millis(result.duration_ms()).as_secs_f64(), &[]);
        }

        pub fn record_revert(&self) {
            self.reverted_total.add(1, &[]);
        }

        pub fn record_ledger_write_failure(&self) {
            self.ledger_write_failures.add(1, &[]);
        }
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render() -> String {
        TextEncoder::new()
            .encode_to_string(&METRICS.registry.gather())
            .unwrap_or_else(|e| format!("# metrics encoding failed: {e}\n"))
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Span around one `up()`/`down()` invocation.
    pub fn migration_span(direction: &'static str, label: &str) -> Span {
        info_span!("tideline.migration", direction, migration = label)
    }

    /// Span around a single SQL statement.
    pub fn statement_span(statement: &str) -> Span {
        let verb = statement.split_whitespace().next().unwrap_or_default();
        info_span!("tideline.statement", verb)
    }

    pub fn connect_span() -> Span {
        info_span!("tideline.connect")
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::migration::{Identifier, RunResult};

    #[test]
    fn test_render_includes_recorded_counters() {
        let id = Identifier::parse("Migration1765073576565CreateUsersTable");
        METRICS.record_run(&RunResult::completed(id, 12));
        METRICS.record_revert();

        let text = render();
        assert!(text.contains("tideline_migrations_applied"), "exposition: {text}");
        assert!(text.contains("tideline_migrations_reverted"), "exposition: {text}");
    }
}
