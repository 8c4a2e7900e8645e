use kilog_models::KilogError;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};
use tracing::debug;

pub struct MetricsService {
    registry: Registry,
    users_created_total: Counter,
    workouts_created_total: Counter,
    webhook_events_total: CounterVec,
    api_errors_total: CounterVec,
}

fn internal(e: prometheus::Error) -> KilogError {
    KilogError::Internal {
        reason: e.to_string(),
    }
}

impl MetricsService {
    pub fn new() -> Result<Self, KilogError> {
        let registry = Registry::new();

        let users_created_total = Counter::new(
            "kilog_users_created_total",
            "Total number of users created from identity-provider events",
        )
        .map_err(internal)?;

        let workouts_created_total =
            Counter::new("kilog_workouts_created_total", "Total number of workouts logged")
                .map_err(internal)?;

        let webhook_events_total = CounterVec::new(
            Opts::new(
                "kilog_webhook_events_total",
                "Verified identity-provider webhook events by type",
            ),
            &["event_type"],
        )
        .map_err(internal)?;

        let api_errors_total = CounterVec::new(
            Opts::new("kilog_api_errors_total", "API error responses by status class"),
            &["status_class"],
        )
        .map_err(internal)?;

        registry
            .register(Box::new(users_created_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(workouts_created_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(webhook_events_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(api_errors_total.clone()))
            .map_err(internal)?;

        Ok(Self {
            registry,
            users_created_total,
            workouts_created_total,
            webhook_events_total,
            api_errors_total,
        })
    }

    pub fn record_user_created(&self) {
        self.users_created_total.inc();
    }

    pub fn record_workout_created(&self) {
        self.workouts_created_total.inc();
    }

    pub fn record_webhook_event(&self, event_type: &str) {
        self.webhook_events_total
            .with_label_values(&[event_type])
            .inc();
        debug!("Recorded webhook event: {}", event_type);
    }

    /// Count an error response under its class, e.g. `4xx`.
    pub fn record_api_error(&self, status: u16) {
        let class = format!("{}xx", status / 100);
        self.api_errors_total.with_label_values(&[&class]).inc();
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, KilogError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(internal)?;
        String::from_utf8(buffer).map_err(|e| KilogError::Internal {
            reason: e.to_string(),
        })
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_user_created();
        metrics.record_workout_created();
        metrics.record_workout_created();
        metrics.record_webhook_event("user.created");
        metrics.record_api_error(404);
        metrics.record_api_error(500);

        let text = metrics.render().unwrap();
        assert!(text.contains("kilog_users_created_total 1"));
        assert!(text.contains("kilog_workouts_created_total 2"));
        assert!(text.contains(r#"kilog_webhook_events_total{event_type="user.created"} 1"#));
        assert!(text.contains(r#"kilog_api_errors_total{status_class="4xx"} 1"#));
        assert!(text.contains(r#"kilog_api_errors_total{status_class="5xx"} 1"#));
    }

    #[test]
    fn independent_registries() {
        // Each service owns its registry, so tests can build as many as they like.
        let a = MetricsService::new().unwrap();
        let b = MetricsService::new().unwrap();
        a.record_user_created();
        assert!(b.render().unwrap().contains("kilog_users_created_total 0"));
    }
}
