use anyhow::Result;
use std::collections::HashMap;

/// Counter samples keyed by their full series name, labels included, e.g.
/// `kilog_webhook_events_total{event_type="user.created"}`.
#[derive(Debug, Default)]
pub struct Metrics {
    pub counters: HashMap<String, f64>,
}

impl Metrics {
    pub fn counter(&self, series: &str) -> f64 {
        self.counters.get(series).copied().unwrap_or(0.0)
    }
}

/// Parse Prometheus metrics text format
pub fn prom_parse(text: &str) -> Result<Metrics> {
    let mut metrics = Metrics::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.rsplit_once(' ') else {
            anyhow::bail!("malformed metric line: {}", line);
        };
        metrics.counters.insert(name.to_string(), value.trim().parse()?);
    }

    Ok(metrics)
}
