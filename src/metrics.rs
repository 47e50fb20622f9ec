//! Request and inference statistics for the classification server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is discarded
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector shared by all request handlers
pub struct InferenceMetrics {
    /// Total analyze requests received
    pub requests: AtomicU64,
    /// Requests answered with a recognized label
    pub recognized: AtomicU64,
    /// Requests answered with the rejection sentinel
    pub rejected: AtomicU64,
    /// Requests that failed (bad upload, decode or inference error)
    pub failed: AtomicU64,
    /// Predictions per label
    label_counts: RwLock<HashMap<String, u64>>,
    /// Inference times (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Top-1 confidence distribution buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl InferenceMetrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            recognized: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            label_counts: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record an incoming analyze request
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed classification
    pub fn record_prediction(&self, label: &str, confidence: f32, rejected: bool, elapsed: Duration) {
        if rejected {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        } else {
            self.recognized.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut counts) = self.label_counts.write() {
                *counts.entry(label.to_string()).or_insert(0) += 1;
            }
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(elapsed.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }

        let bucket = ((confidence.clamp(0.0, 1.0)) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Inference latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    pub fn label_counts(&self) -> HashMap<String, u64> {
        self.label_counts
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the request counters
    pub fn counters(&self) -> Counters {
        Counters {
            requests: self.requests.load(Ordering::Relaxed),
            recognized: self.recognized.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let counters = self.counters();
        let latency = self.latency_stats();

        info!(
            requests = counters.requests,
            recognized = counters.recognized,
            rejected = counters.rejected,
            failed = counters.failed,
            throughput = format!("{:.2} req/s", self.throughput()),
            "Inference summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Inference latency"
        );

        let mut labels: Vec<(String, u64)> = self.label_counts().into_iter().collect();
        labels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (label, count) in labels.iter().take(5) {
            info!(label = %label, count = count, "Most predicted");
        }

        let distribution = self.confidence_distribution();
        info!(buckets = ?distribution, "Top-1 confidence distribution (0.0-1.0 in tenths)");
    }
}

impl Default for InferenceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request counters at a point in time
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub requests: u64,
    pub recognized: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Inference time statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<InferenceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<InferenceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
