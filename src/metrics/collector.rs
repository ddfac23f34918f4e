//! # Métricas del lado HTTP
//! src/metrics/collector.rs
//!
//! Acumula contadores y latencias de los requests atendidos. Las métricas
//! del subsistema de jobs (cola, workers, terminados) las reporta el
//! scheduler; el endpoint /api/metrics combina las dos fuentes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Ventana de latencias retenidas para percentiles
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Collector de métricas thread-safe
///
/// Clonar el collector comparte el estado: todas las copias acumulan
/// sobre los mismos contadores.
#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<RequestStats>>,
    started: Instant,
}

#[derive(Default)]
struct RequestStats {
    /// Requests atendidos desde el arranque
    total_requests: u64,

    /// Cuántas responses salieron con cada status code
    status_codes: HashMap<u16, u64>,

    /// Últimas latencias, en microsegundos
    latencies: VecDeque<u64>,

    /// Hits por path
    requests_per_path: HashMap<String, u64>,

    /// Conexiones abiertas en este momento
    active_connections: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RequestStats::default())),
            started: Instant::now(),
        }
    }

    /// Registra un request ya respondido
    ///
    /// `path` debe venir ya colapsado a plantilla de ruta cuando lleva un
    /// id embebido; el mapa por path no tiene eviction.
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut stats = self.state.lock().unwrap();

        stats.total_requests += 1;
        *stats.status_codes.entry(status_code).or_insert(0) += 1;
        *stats.requests_per_path.entry(path.to_string()).or_insert(0) += 1;

        // Ventana deslizante de muestras
        if stats.latencies.len() >= MAX_LATENCY_SAMPLES {
            stats.latencies.pop_front();
        }
        stats.latencies.push_back(latency.as_micros() as u64);
    }

    /// Marca el inicio de una conexión
    pub fn connection_opened(&self) {
        self.state.lock().unwrap().active_connections += 1;
    }

    /// Marca el fin de una conexión
    pub fn connection_closed(&self) {
        let mut stats = self.state.lock().unwrap();
        stats.active_connections = stats.active_connections.saturating_sub(1);
    }

    /// Conexiones abiertas ahora mismo
    pub fn active_connections(&self) -> u64 {
        self.state.lock().unwrap().active_connections
    }

    /// Requests atendidos desde el arranque
    pub fn total_requests(&self) -> u64 {
        self.state.lock().unwrap().total_requests
    }

    /// Arma el snapshot JSON que sirve /api/metrics
    pub fn metrics_json(&self) -> serde_json::Value {
        let stats = self.state.lock().unwrap();

        let mut sorted: Vec<u64> = stats.latencies.iter().copied().collect();
        sorted.sort_unstable();

        let status_codes: serde_json::Map<String, serde_json::Value> = stats
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), serde_json::json!(count)))
            .collect();

        // Top 10 de paths, empates resueltos alfabéticamente
        let mut paths: Vec<_> = stats.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths: Vec<serde_json::Value> = paths
            .iter()
            .take(10)
            .map(|(path, count)| serde_json::json!({"path": path, "count": count}))
            .collect();

        serde_json::json!({
            "server": {
                "uptime_seconds": self.started.elapsed().as_secs(),
                "active_connections": stats.active_connections,
            },
            "requests": {
                "total": stats.total_requests,
                "status_codes": status_codes,
                "top_paths": top_paths,
            },
            "latency_us": {
                "p50": percentile(&sorted, 50),
                "p95": percentile(&sorted, 95),
                "p99": percentile(&sorted, 99),
                "avg": average(&sorted),
                "samples": sorted.len(),
            },
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentil por índice directo sobre muestras ya ordenadas
fn percentile(sorted: &[u64], pct: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    sorted[sorted.len() * pct / 100]
}

fn average(samples: &[u64]) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    samples.iter().sum::<u64>() / samples.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request_counts() {
        let collector = MetricsCollector::new();

        collector.record_request("/api/num_jobs", 200, Duration::from_millis(10));
        collector.record_request("/api/num_jobs", 200, Duration::from_millis(20));
        collector.record_request("/api/get_results/{id}", 404, Duration::from_millis(5));

        assert_eq!(collector.total_requests(), 3);

        let metrics = collector.metrics_json();
        assert_eq!(metrics["requests"]["total"], 3);
        assert_eq!(metrics["requests"]["status_codes"]["200"], 2);
        assert_eq!(metrics["requests"]["status_codes"]["404"], 1);
    }

    #[test]
    fn test_percentiles_ordering() {
        let collector = MetricsCollector::new();

        for i in 1..=100 {
            collector.record_request("/api/num_jobs", 200, Duration::from_micros(i));
        }

        let metrics = collector.metrics_json();
        let p50 = metrics["latency_us"]["p50"].as_u64().unwrap();
        let p95 = metrics["latency_us"]["p95"].as_u64().unwrap();
        let p99 = metrics["latency_us"]["p99"].as_u64().unwrap();

        assert!(p50 > 0);
        assert!(p95 > p50);
        assert!(p99 > p95);
    }

    #[test]
    fn test_empty_collector_metrics() {
        let metrics = MetricsCollector::new().metrics_json();

        assert_eq!(metrics["requests"]["total"], 0);
        assert_eq!(metrics["latency_us"]["samples"], 0);
        assert_eq!(metrics["latency_us"]["p50"], 0);
        assert_eq!(metrics["latency_us"]["avg"], 0);
    }

    #[test]
    fn test_active_connections_tracking() {
        let collector = MetricsCollector::new();

        assert_eq!(collector.active_connections(), 0);

        collector.connection_opened();
        collector.connection_opened();
        assert_eq!(collector.active_connections(), 2);

        collector.connection_closed();
        assert_eq!(collector.active_connections(), 1);
    }

    #[test]
    fn test_active_connections_never_negative() {
        let collector = MetricsCollector::new();

        collector.connection_closed();
        collector.connection_closed();

        assert_eq!(collector.active_connections(), 0);
    }

    #[test]
    fn test_top_paths_ranked_by_count() {
        let collector = MetricsCollector::new();

        for _ in 0..3 {
            collector.record_request("/api/num_jobs", 200, Duration::from_millis(1));
        }
        collector.record_request("/api/get_results/{id}", 200, Duration::from_millis(1));

        let metrics = collector.metrics_json();
        let top = metrics["requests"]["top_paths"].as_array().unwrap();

        assert_eq!(top[0]["path"], "/api/num_jobs");
        assert_eq!(top[0]["count"], 3);
        assert_eq!(top[1]["path"], "/api/get_results/{id}");
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();

        for i in 0..(MAX_LATENCY_SAMPLES as u64 + 5000) {
            collector.record_request("/api/num_jobs", 200, Duration::from_micros(i));
        }

        let metrics = collector.metrics_json();
        assert_eq!(metrics["requests"]["total"], MAX_LATENCY_SAMPLES as u64 + 5000);
        assert_eq!(metrics["latency_us"]["samples"], MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn test_clones_share_state() {
        let collector = MetricsCollector::new();
        let clone = collector.clone();

        collector.record_request("/index", 200, Duration::from_millis(2));

        assert_eq!(clone.total_requests(), 1);
    }
}
