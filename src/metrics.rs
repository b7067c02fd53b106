//! In-process request and upload counters with a plain-text dump.
//!
//! Counters live behind one mutex; they are written on every request and
//! read only when `/metrics` is scraped. Nothing is persisted.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

#[derive(Default)]
struct RequestStat {
    count: u64,
    duration_sum: f64,
}

#[derive(Default)]
struct Counters {
    requests: HashMap<String, RequestStat>,
    uploads_ok: u64,
    uploads_err: u64,
}

#[derive(Clone, Default)]
pub struct RequestMetrics(Arc<Mutex<Counters>>);

impl RequestMetrics {
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let key = format!("{}_{}_{}", method, path, status);
        let mut counters = self.0.lock().expect("metrics lock poisoned");
        let stat = counters.requests.entry(key).or_default();
        stat.count += 1;
        stat.duration_sum += duration_secs;
    }

    pub fn record_upload(&self, success: bool) {
        let mut counters = self.0.lock().expect("metrics lock poisoned");
        if success {
            counters.uploads_ok += 1;
        } else {
            counters.uploads_err += 1;
        }
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let counters = self.0.lock().expect("metrics lock poisoned");

        let mut keys: Vec<&String> = counters.requests.keys().collect();
        keys.sort();

        let mut lines = Vec::new();
        lines.push("# HELP http_requests_total Total HTTP requests".to_string());
        lines.push("# TYPE http_requests_total counter".to_string());
        for key in &keys {
            let stat = &counters.requests[*key];
            let (label, status) = key.rsplit_once('_').unwrap_or((key.as_str(), "unknown"));
            lines.push(format!(
                "http_requests_total{{key=\"{}\",status=\"{}\"}} {}",
                label, status, stat.count
            ));
        }

        lines.push("# HELP http_request_duration_seconds Total request duration".to_string());
        lines.push("# TYPE http_request_duration_seconds counter".to_string());
        for key in &keys {
            let stat = &counters.requests[*key];
            lines.push(format!(
                "http_request_duration_seconds{{key=\"{}\"}} {:.6}",
                key, stat.duration_sum
            ));
        }

        lines.push("# HELP uploads_total Total uploads".to_string());
        lines.push("# TYPE uploads_total counter".to_string());
        lines.push(format!("uploads_total {}", counters.uploads_ok));

        lines.push("# HELP upload_errors_total Total upload errors".to_string());
        lines.push("# TYPE upload_errors_total counter".to_string());
        lines.push(format!("upload_errors_total {}", counters.uploads_err));

        let mut body = lines.join("\n");
        body.push('\n');
        body
    }
}

/// GET `/metrics` — plain-text counter dump.
pub async fn metrics_handler(State(metrics): State<RequestMetrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        metrics.render(),
    )
}

/// Axum middleware recording count and latency for every request.
pub async fn track_requests(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    metrics.record_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_request_and_upload_counters() {
        let metrics = RequestMetrics::default();
        metrics.record_request("GET", "/files", 200, 0.004);
        metrics.record_request("GET", "/files", 200, 0.006);
        metrics.record_upload(true);
        metrics.record_upload(false);

        let body = metrics.render();
        assert!(body.contains("http_requests_total{key=\"GET_/files\",status=\"200\"} 2"));
        assert!(body.contains("http_request_duration_seconds{key=\"GET_/files_200\"} 0.010000"));
        assert!(body.contains("uploads_total 1"));
        assert!(body.contains("upload_errors_total 1"));
    }
}
