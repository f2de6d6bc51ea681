//! Prometheus metrics exposition
//!
//! - `gateway_logins_total` (counter): label `outcome`
//! - `gateway_login_duration_seconds` (histogram): label `outcome`
//! - `gateway_registrations_total` (counter): label `outcome`
//! - `gateway_refreshes_total` (counter): label `outcome`
//! - `gateway_gate_rejections_total` (counter): label `reason`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Login latency is dominated by bcrypt, so buckets span 1ms to 5s.
const LOGIN_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

fn builder() -> anyhow::Result<PrometheusBuilder> {
    Ok(PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("gateway_login_duration_seconds".to_string()),
        LOGIN_DURATION_BUCKETS,
    )?)
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.install_recorder()?)
}

/// Build a recorder handle without installing it globally.
pub fn detached_handle() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.build_recorder().handle())
}

pub fn record_login(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("gateway_logins_total", "outcome" => outcome).increment(1);
    metrics::histogram!("gateway_login_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

pub fn record_registration(outcome: &'static str) {
    metrics::counter!("gateway_registrations_total", "outcome" => outcome).increment(1);
}

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("gateway_refreshes_total", "outcome" => outcome).increment(1);
}

pub fn record_gate_rejection(reason: &'static str) {
    metrics::counter!("gateway_gate_rejections_total", "reason" => reason).increment(1);
}
