//! Prometheus-compatible metrics for the ingest server.
//!
//! Tracks processed decks by status, failures by error kind, histograms for
//! processing duration, input size and slide count, and an active-ingest
//! gauge. The `/metrics` endpoint renders these in Prometheus exposition
//! format.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pptx_ingest::ErrorKind;

/// Histogram buckets for processing duration (seconds).
const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Histogram buckets for upload sizes (bytes), topping out at the 100 MiB limit.
const BYTES_BUCKETS: &[f64] = &[
    1024.0,
    10_240.0,
    102_400.0,
    1_048_576.0,
    10_485_760.0,
    104_857_600.0,
];

const SLIDES_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0];

struct Histogram {
    buckets: &'static [f64],
    /// Cumulative count of observations <= each bucket boundary.
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Histogram {
    fn new(buckets: &'static [f64]) -> Self {
        Self {
            buckets,
            counts: vec![0; buckets.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        for (i, bound) in self.buckets.iter().enumerate() {
            if value <= *bound {
                self.counts[i] += 1;
            }
        }
        self.sum += value;
        self.count += 1;
    }

    fn render(&self, out: &mut String, name: &str, help: &str) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (bound, count) in self.buckets.iter().zip(&self.counts) {
            let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {count}");
        }
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {}", self.count);
        let _ = writeln!(out, "{name}_sum {}", self.sum);
        let _ = writeln!(out, "{name}_count {}", self.count);
    }
}

struct Histograms {
    duration: Histogram,
    input_bytes: Histogram,
    slides: Histogram,
}

/// Thread-safe metrics store shared by all request handlers.
pub struct MetricsStore {
    /// status ("success" | "failure") -> count.
    decks: Mutex<BTreeMap<&'static str, u64>>,
    /// error kind label -> count.
    errors: Mutex<BTreeMap<&'static str, u64>>,
    histograms: Mutex<Histograms>,
    active: AtomicI64,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsStore {
    pub fn new() -> Self {
        Self {
            decks: Mutex::new(BTreeMap::new()),
            errors: Mutex::new(BTreeMap::new()),
            histograms: Mutex::new(Histograms {
                duration: Histogram::new(DURATION_BUCKETS),
                input_bytes: Histogram::new(BYTES_BUCKETS),
                slides: Histogram::new(SLIDES_BUCKETS),
            }),
            active: AtomicI64::new(0),
        }
    }

    /// Call before an ingest starts.
    pub fn start_ingest(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// Call after an ingest finishes, whatever the outcome.
    pub fn end_ingest(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, duration_secs: f64, input_size: u64, slide_count: u32) {
        *locked(&self.decks).entry("success").or_insert(0) += 1;

        let mut h = locked(&self.histograms);
        h.duration.observe(duration_secs);
        h.input_bytes.observe(input_size as f64);
        h.slides.observe(f64::from(slide_count));
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        *locked(&self.decks).entry("failure").or_insert(0) += 1;
        *locked(&self.errors).entry(kind.label()).or_insert(0) += 1;
    }

    /// Render all metrics in Prometheus exposition text format.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "# HELP pptx_ingest_decks_total Total number of processed presentations"
        );
        let _ = writeln!(out, "# TYPE pptx_ingest_decks_total counter");
        for (status, count) in locked(&self.decks).iter() {
            let _ = writeln!(out, "pptx_ingest_decks_total{{status=\"{status}\"}} {count}");
        }

        let _ = writeln!(
            out,
            "# HELP pptx_ingest_errors_total Total number of failed ingests by error kind"
        );
        let _ = writeln!(out, "# TYPE pptx_ingest_errors_total counter");
        for (kind, count) in locked(&self.errors).iter() {
            let _ = writeln!(out, "pptx_ingest_errors_total{{kind=\"{kind}\"}} {count}");
        }

        {
            let h = locked(&self.histograms);
            h.duration.render(
                &mut out,
                "pptx_ingest_duration_seconds",
                "Duration of presentation processing in seconds",
            );
            h.input_bytes.render(
                &mut out,
                "pptx_ingest_input_bytes",
                "Size of uploaded presentations in bytes",
            );
            h.slides.render(
                &mut out,
                "pptx_ingest_slides",
                "Number of slides per processed presentation",
            );
        }

        let active = self.active.load(Ordering::Relaxed);
        let _ = writeln!(
            out,
            "# HELP pptx_ingest_active Number of presentations currently being processed"
        );
        let _ = writeln!(out, "# TYPE pptx_ingest_active gauge");
        let _ = writeln!(out, "pptx_ingest_active {active}");

        out
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}
