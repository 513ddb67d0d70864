//! Prometheus metrics implementation

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::RwLock;

/// Buckets used when a histogram is observed without being described.
pub const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Label pairs in the order they are exported
pub type Labels<'a> = &'a [(&'a str, &'a str)];

/// `count` buckets starting at `start`, each `factor` times the previous.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    std::iter::successors(Some(start), |b| Some(b * factor))
        .take(count)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone)]
struct Family {
    help: String,
    kind: MetricKind,
    buckets: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, labels: Labels<'_>) -> Self {
        Self {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Labeled counters, gauges and histograms with Prometheus text export.
///
/// Series are created on first use. Every family should be described up
/// front so the export carries `HELP` lines and histograms get their buckets.
pub struct MetricsRegistry {
    families: RwLock<BTreeMap<String, Family>>,
    counters: RwLock<BTreeMap<MetricKey, AtomicU64>>,
    gauges: RwLock<BTreeMap<MetricKey, AtomicI64>>,
    histograms: RwLock<BTreeMap<MetricKey, Histogram>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(BTreeMap::new()),
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn describe_counter(&self, name: &str, help: &str) {
        self.describe(name, help, MetricKind::Counter, Vec::new());
    }

    pub fn describe_gauge(&self, name: &str, help: &str) {
        self.describe(name, help, MetricKind::Gauge, Vec::new());
    }

    pub fn describe_histogram(&self, name: &str, help: &str, buckets: &[f64]) {
        self.describe(name, help, MetricKind::Histogram, buckets.to_vec());
    }

    fn describe(&self, name: &str, help: &str, kind: MetricKind, buckets: Vec<f64>) {
        self.families.write().insert(
            name.to_string(),
            Family {
                help: help.to_string(),
                kind,
                buckets,
            },
        );
    }

    /// Increment a counter
    pub fn counter_inc(&self, name: &str, labels: Labels<'_>, value: u64) {
        let key = MetricKey::new(name, labels);
        let counters = self.counters.read();
        if let Some(counter) = counters.get(&key) {
            counter.fetch_add(value, Ordering::Relaxed);
        } else {
            drop(counters);
            let mut counters = self.counters.write();
            counters
                .entry(key)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Set a gauge value
    pub fn gauge_set(&self, name: &str, labels: Labels<'_>, value: i64) {
        let key = MetricKey::new(name, labels);
        let mut gauges = self.gauges.write();
        gauges
            .entry(key)
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
    }

    /// Add `delta` (possibly negative) to a gauge
    pub fn gauge_add(&self, name: &str, labels: Labels<'_>, delta: i64) {
        let key = MetricKey::new(name, labels);
        let gauges = self.gauges.read();
        if let Some(gauge) = gauges.get(&key) {
            gauge.fetch_add(delta, Ordering::Relaxed);
        } else {
            drop(gauges);
            let mut gauges = self.gauges.write();
            gauges
                .entry(key)
                .or_insert_with(|| AtomicI64::new(0))
                .fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Record a histogram observation
    pub fn histogram_observe(&self, name: &str, labels: Labels<'_>, value: f64) {
        let key = MetricKey::new(name, labels);
        let histograms = self.histograms.read();
        if let Some(hist) = histograms.get(&key) {
            hist.observe(value);
        } else {
            drop(histograms);
            let buckets = self.buckets_for(name);
            let mut histograms = self.histograms.write();
            histograms
                .entry(key)
                .or_insert_with(|| Histogram::new(buckets))
                .observe(value);
        }
    }

    fn buckets_for(&self, name: &str) -> Vec<f64> {
        match self.families.read().get(name) {
            Some(family) if !family.buckets.is_empty() => family.buckets.clone(),
            _ => DEFAULT_BUCKETS.to_vec(),
        }
    }

    pub fn counter_value(&self, name: &str, labels: Labels<'_>) -> u64 {
        self.counters
            .read()
            .get(&MetricKey::new(name, labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn gauge_value(&self, name: &str, labels: Labels<'_>) -> i64 {
        self.gauges
            .read()
            .get(&MetricKey::new(name, labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn histogram_snapshot(&self, name: &str, labels: Labels<'_>) -> Option<HistogramSnapshot> {
        self.histograms
            .read()
            .get(&MetricKey::new(name, labels))
            .map(Histogram::snapshot)
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let families = self.families.read();
        let mut output = String::new();
        let header = |output: &mut String, name: &str, mut kind: MetricKind| {
            if let Some(family) = families.get(name) {
                let _ = writeln!(output, "# HELP {} {}", name, escape_help(&family.help));
                kind = family.kind;
            }
            let _ = writeln!(output, "# TYPE {} {}", name, kind.as_str());
        };

        let counters = self.counters.read();
        let mut last = None;
        for (key, counter) in counters.iter() {
            if last != Some(key.name.as_str()) {
                header(&mut output, &key.name, MetricKind::Counter);
            }
            let _ = writeln!(
                output,
                "{}{} {}",
                key.name,
                format_labels(&key.labels, None),
                counter.load(Ordering::Relaxed)
            );
            last = Some(key.name.as_str());
        }

        let gauges = self.gauges.read();
        let mut last = None;
        for (key, gauge) in gauges.iter() {
            if last != Some(key.name.as_str()) {
                header(&mut output, &key.name, MetricKind::Gauge);
            }
            let _ = writeln!(
                output,
                "{}{} {}",
                key.name,
                format_labels(&key.labels, None),
                gauge.load(Ordering::Relaxed)
            );
            last = Some(key.name.as_str());
        }

        let histograms = self.histograms.read();
        let mut last = None;
        for (key, hist) in histograms.iter() {
            if last != Some(key.name.as_str()) {
                header(&mut output, &key.name, MetricKind::Histogram);
            }
            let snapshot = hist.snapshot();
            let mut cumulative = 0;
            for (bound, count) in snapshot.buckets.iter().zip(&snapshot.counts) {
                cumulative += count;
                let le = bound.to_string();
                let _ = writeln!(
                    output,
                    "{}_bucket{} {}",
                    key.name,
                    format_labels(&key.labels, Some(&le)),
                    cumulative
                );
            }
            let _ = writeln!(
                output,
                "{}_bucket{} {}",
                key.name,
                format_labels(&key.labels, Some("+Inf")),
                snapshot.count
            );
            let labels = format_labels(&key.labels, None);
            let _ = writeln!(output, "{}_sum{} {}", key.name, labels, snapshot.sum);
            let _ = writeln!(output, "{}_count{} {}", key.name, labels, snapshot.count);
            last = Some(key.name.as_str());
        }

        output
    }

    /// Reset all metrics, keeping their descriptions
    pub fn reset(&self) {
        self.counters.write().clear();
        self.gauges.write().clear();
        self.histograms.write().clear();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_labels(labels: &[(String, String)], le: Option<&str>) -> String {
    if labels.is_empty() && le.is_none() {
        return String::new();
    }
    let mut out = String::from("{");
    let pairs = labels
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(le.map(|le| ("le", le)));
    for (i, (k, v)) in pairs.enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}=\"{}\"", k, escape_label_value(v));
    }
    out.push('}');
    out
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Fixed-bucket histogram
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(mut buckets: Vec<f64>) -> Self {
        buckets.retain(|b| b.is_finite());
        buckets.sort_by(f64::total_cmp);
        buckets.dedup();
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: f64) {
        if let Some(idx) = self.buckets.iter().position(|&bound| value <= bound) {
            self.counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        // The sum is stored as f64 bits.
        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            buckets: self.buckets.clone(),
            counts: self
                .counts
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            sum: f64::from_bits(self.sum.load(Ordering::Relaxed)),
            count: self.count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a [`Histogram`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    /// Upper bounds, ascending
    pub buckets: Vec<f64>,
    /// Observations per bucket (not cumulative)
    pub counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSnapshot {
    /// Observations at or below `bound`
    pub fn count_le(&self, bound: f64) -> u64 {
        self.buckets
            .iter()
            .zip(&self.counts)
            .take_while(|(b, _)| **b <= bound)
            .map(|(_, c)| c)
            .sum()
    }
}
