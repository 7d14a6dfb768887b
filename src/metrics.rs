// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - How much did we look at, and what did we find
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters only. Batch analysis bumps these from every rayon
// worker at once, so nothing here takes a lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::models::{Domain, MessageReport};

/// The metrics snapshot - what gets serialized to JSON
#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub messages_analyzed: u64,
    pub messages_flagged: u64,
    pub transaction_hits: u64,
    pub restricted_hits: u64,
    pub geography_hits: u64,
    pub degraded_builds: u64,
    pub failed_builds: u64,
    pub uptime_seconds: u64,
    pub messages_per_minute: f64,
}

/// Thread-safe atomic metrics collector
pub struct EngineMetrics {
    messages_analyzed: AtomicU64,
    messages_flagged: AtomicU64,
    transaction_hits: AtomicU64,
    restricted_hits: AtomicU64,
    geography_hits: AtomicU64,
    degraded_builds: AtomicU64,
    failed_builds: AtomicU64,
    start_time: Instant,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            messages_analyzed: AtomicU64::new(0),
            messages_flagged: AtomicU64::new(0),
            transaction_hits: AtomicU64::new(0),
            restricted_hits: AtomicU64::new(0),
            geography_hits: AtomicU64::new(0),
            degraded_builds: AtomicU64::new(0),
            failed_builds: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_report(&self, report: &MessageReport) {
        self.messages_analyzed.fetch_add(1, Ordering::Relaxed);
        if report.is_flagged() {
            self.messages_flagged.fetch_add(1, Ordering::Relaxed);
        }
        self.record_hits(Domain::TransactionMethod, report.transactions.len());
        self.record_hits(Domain::Restricted, report.restricted.len());
        self.record_hits(Domain::Geography, report.locations.len());
    }

    pub fn record_hits(&self, domain: Domain, hits: usize) {
        let counter = match domain {
            Domain::TransactionMethod => &self.transaction_hits,
            Domain::Restricted => &self.restricted_hits,
            Domain::Geography => &self.geography_hits,
        };
        counter.fetch_add(hits as u64, Ordering::Relaxed);
    }

    /// A domain was built empty because no configuration was reachable.
    pub fn increment_degraded_builds(&self) {
        self.degraded_builds.fetch_add(1, Ordering::Relaxed);
    }

    /// A domain was built empty because fetching its configuration failed.
    pub fn increment_failed_builds(&self) {
        self.failed_builds.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all metrics (lock-free reads)
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let analyzed = self.messages_analyzed.load(Ordering::Relaxed);
        let messages_per_minute = if uptime > 0 {
            (analyzed as f64 / uptime as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            messages_analyzed: analyzed,
            messages_flagged: self.messages_flagged.load(Ordering::Relaxed),
            transaction_hits: self.transaction_hits.load(Ordering::Relaxed),
            restricted_hits: self.restricted_hits.load(Ordering::Relaxed),
            geography_hits: self.geography_hits.load(Ordering::Relaxed),
            degraded_builds: self.degraded_builds.load(Ordering::Relaxed),
            failed_builds: self.failed_builds.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            messages_per_minute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionHit;

    #[test]
    fn test_record_report_counts_flagged_messages() {
        let metrics = EngineMetrics::new();
        metrics.record_report(&MessageReport::new(None));

        let mut flagged = MessageReport::new(None);
        flagged.transactions.push(TransactionHit {
            keyword: "escrow".to_string(),
            position: 0,
            method_id: 1,
            method: "platform".to_string(),
        });
        metrics.record_report(&flagged);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_analyzed, 2);
        assert_eq!(snapshot.messages_flagged, 1);
        assert_eq!(snapshot.transaction_hits, 1);
        assert_eq!(snapshot.restricted_hits, 0);
    }

    #[test]
    fn test_build_counters() {
        let metrics = EngineMetrics::new();
        metrics.increment_degraded_builds();
        metrics.increment_failed_builds();
        metrics.increment_failed_builds();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.degraded_builds, 1);
        assert_eq!(snapshot.failed_builds, 2);
    }
}
