//! Rolling validation metrics
//!
//! Every validation call records one [`MetricPoint`] into a bounded ring;
//! [`ValidationMetrics`] is computed over whatever the ring holds.

use std::collections::VecDeque;
use std::time::Duration;

/// One validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricPoint {
    /// Whether the verdict was "valid"
    pub passed: bool,
    /// Wall-clock duration of the call
    pub latency: Duration,
    /// `Some(true)` on a cache hit, `Some(false)` on a miss, `None` with
    /// caching disabled
    pub cache_hit: Option<bool>,
}

/// Aggregates over the current window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationMetrics {
    /// Calls in the window
    pub total: usize,
    /// Calls that passed
    pub passed: usize,
    /// Calls that failed
    pub failed: usize,
    /// `passed / total` (0.0 for an empty window)
    pub success_rate: f64,
    /// Mean latency
    pub average_latency: Duration,
    /// Cache hits in the window
    pub cache_hits: usize,
    /// Cache misses in the window
    pub cache_misses: usize,
    /// `hits / (hits + misses)` (0.0 when no cached calls)
    pub cache_hit_rate: f64,
}

/// Bounded FIFO of metric points
#[derive(Debug)]
pub struct MetricsWindow {
    points: VecDeque<MetricPoint>,
    capacity: usize,
}

impl MetricsWindow {
    /// Create a window holding at most `capacity` points
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full
    pub fn record(&mut self, point: MetricPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Number of points held
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if no point has been recorded
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Compute aggregates
    pub fn summarize(&self) -> ValidationMetrics {
        let total = self.points.len();
        if total == 0 {
            return ValidationMetrics::default();
        }

        let passed = self.points.iter().filter(|p| p.passed).count();
        let latency_sum: Duration = self.points.iter().map(|p| p.latency).sum();
        let cache_hits = self
            .points
            .iter()
            .filter(|p| p.cache_hit == Some(true))
            .count();
        let cache_misses = self
            .points
            .iter()
            .filter(|p| p.cache_hit == Some(false))
            .count();
        let cached = cache_hits + cache_misses;

        ValidationMetrics {
            total,
            passed,
            failed: total - passed,
            success_rate: passed as f64 / total as f64,
            average_latency: latency_sum / total as u32,
            cache_hits,
            cache_misses,
            cache_hit_rate: if cached == 0 {
                0.0
            } else {
                cache_hits as f64 / cached as f64
            },
        }
    }
}
