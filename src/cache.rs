// =============================================================================
// cache.rs — BUILD ONCE, SERVE UNTIL STALE
// =============================================================================
//
// Keyword tables change whenever an operator feels like it, but rebuilding an
// automaton for every message would be silly. Each domain gets one
// AutomatonCache: a finalized automaton plus the instant it was built.
//
// The policy per domain:
//
// 1. Entry younger than its TTL: hand out the cached automaton.
// 2. Entry missing or stale: fetch the keyword records and rebuild.
// 3. With source verification on, a stale entry whose freshly fetched records
//    are field-for-field identical to the ones it was built from is kept and
//    merely re-stamped. Same keywords, same automaton.
//
// Rebuilds are serialized per cache. Callers that pile up behind a rebuild
// re-check freshness once they get the build lock and reuse the winner's
// automaton instead of building their own copy.
// =============================================================================

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::automaton::{Automaton, AutomatonBuilder};

/// Staleness and build settings for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// Keep the current automaton when an expired entry's source is unchanged.
    pub verify_source: bool,
    pub case_sensitive: bool,
}

impl CachePolicy {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            verify_source: false,
            case_sensitive: false,
        }
    }
}

struct CacheEntry<M> {
    automaton: Arc<Automaton<M>>,
    built_at: Instant,
    built_at_utc: DateTime<Utc>,
    /// Records the automaton was built from, kept only when verifying.
    source: Option<Vec<(String, M)>>,
}

impl<M> CacheEntry<M> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.built_at.elapsed() < ttl
    }
}

#[derive(Default)]
struct CacheStats {
    hits: AtomicU64,
    rebuilds: AtomicU64,
    reuses: AtomicU64,
}

/// A per-domain holder for the current automaton.
pub struct AutomatonCache<M> {
    name: String,
    policy: CachePolicy,
    entry: RwLock<Option<CacheEntry<M>>>,
    build_lock: Mutex<()>,
    stats: CacheStats,
}

impl<M: Clone + PartialEq> AutomatonCache<M> {
    pub fn new(name: impl Into<String>, policy: CachePolicy) -> Self {
        let name = name.into();
        info!(
            cache = %name,
            ttl_secs = policy.ttl.as_secs(),
            verify_source = policy.verify_source,
            case_sensitive = policy.case_sensitive,
            "Automaton cache initialized"
        );
        Self {
            name,
            policy,
            entry: RwLock::new(None),
            build_lock: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    /// The cached automaton if it is still fresh, otherwise one built from
    /// whatever `fetch` returns now.
    pub fn get_or_build<F>(&self, fetch: F) -> Arc<Automaton<M>>
    where
        F: FnOnce() -> Vec<(String, M)>,
    {
        if let Some(automaton) = self.fresh() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return automaton;
        }

        let _building = self.build_lock.lock();

        // Another caller may have rebuilt while we waited for the lock.
        if let Some(automaton) = self.fresh() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return automaton;
        }

        let records = fetch();

        if self.policy.verify_source {
            let mut entry = self.entry.write();
            if let Some(current) = entry.as_mut() {
                if current.source.as_ref() == Some(&records) {
                    current.built_at = Instant::now();
                    current.built_at_utc = Utc::now();
                    self.stats.reuses.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        cache = %self.name,
                        keywords = records.len(),
                        "Keyword source unchanged — keeping current automaton"
                    );
                    return Arc::clone(&current.automaton);
                }
            }
        }

        let started = Instant::now();
        let (automaton, source) = if self.policy.verify_source {
            let automaton = compile(records.iter().cloned(), self.policy.case_sensitive);
            (automaton, Some(records))
        } else {
            (compile(records, self.policy.case_sensitive), None)
        };
        let automaton = Arc::new(automaton);

        info!(
            cache = %self.name,
            keywords = automaton.keyword_count(),
            nodes = automaton.node_count(),
            build_micros = started.elapsed().as_micros() as u64,
            "Automaton rebuilt"
        );

        *self.entry.write() = Some(CacheEntry {
            automaton: Arc::clone(&automaton),
            built_at: Instant::now(),
            built_at_utc: Utc::now(),
            source,
        });
        self.stats.rebuilds.fetch_add(1, Ordering::Relaxed);

        automaton
    }

    /// The current automaton, fresh or not, without building anything.
    pub fn peek(&self) -> Option<Arc<Automaton<M>>> {
        self.entry
            .read()
            .as_ref()
            .map(|entry| Arc::clone(&entry.automaton))
    }

    /// Forget the current entry; the next `get_or_build` rebuilds.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
        debug!(cache = %self.name, "Automaton cache invalidated");
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let entry = self.entry.read();
        CacheSnapshot {
            name: self.name.clone(),
            ttl_secs: self.policy.ttl.as_secs(),
            keywords: entry.as_ref().map(|e| e.automaton.keyword_count()),
            built_at: entry.as_ref().map(|e| e.built_at_utc),
            age_secs: entry.as_ref().map(|e| e.built_at.elapsed().as_secs()),
            hits: self.stats.hits.load(Ordering::Relaxed),
            rebuilds: self.stats.rebuilds.load(Ordering::Relaxed),
            reuses: self.stats.reuses.load(Ordering::Relaxed),
        }
    }

    fn fresh(&self) -> Option<Arc<Automaton<M>>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.is_fresh(self.policy.ttl))
            .map(|entry| Arc::clone(&entry.automaton))
    }
}

fn compile<M, I>(records: I, case_sensitive: bool) -> Automaton<M>
where
    I: IntoIterator<Item = (String, M)>,
{
    let mut builder = AutomatonBuilder::with_case_sensitivity(case_sensitive);
    for (keyword, metadata) in records {
        builder.insert(&keyword, metadata);
    }
    builder.build()
}

/// Serializable view of a cache for logs and the stats dump.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub name: String,
    pub ttl_secs: u64,
    pub keywords: Option<usize>,
    pub built_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub hits: u64,
    pub rebuilds: u64,
    pub reuses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn records(words: &[&str]) -> Vec<(String, u32)> {
        words.iter().map(|w| (w.to_string(), 0)).collect()
    }

    fn keywords_found(automaton: &Automaton<u32>, text: &str) -> Vec<String> {
        automaton
            .search_unique(text)
            .iter()
            .map(|m| m.keyword.to_string())
            .collect()
    }

    #[test]
    fn test_first_call_builds() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::from_secs(3600)));
        assert!(cache.peek().is_none());
        let automaton = cache.get_or_build(|| records(&["cash"]));
        assert_eq!(automaton.keyword_count(), 1);
        assert_eq!(cache.snapshot().rebuilds, 1);
    }

    #[test]
    fn test_fresh_entry_ignores_changed_source() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::from_secs(3600)));
        cache.get_or_build(|| records(&["cash"]));

        let automaton = cache.get_or_build(|| records(&["escrow"]));
        assert_eq!(keywords_found(&automaton, "cash or escrow"), vec!["cash"]);
        assert_eq!(cache.snapshot().hits, 1);
    }

    #[test]
    fn test_expired_entry_picks_up_new_source() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::ZERO));
        cache.get_or_build(|| records(&["cash"]));

        let automaton = cache.get_or_build(|| records(&["escrow"]));
        assert_eq!(keywords_found(&automaton, "cash or escrow"), vec!["escrow"]);
        assert_eq!(cache.snapshot().rebuilds, 2);
    }

    #[test]
    fn test_short_ttl_expires() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::from_millis(20)));
        cache.get_or_build(|| records(&["cash"]));
        std::thread::sleep(Duration::from_millis(40));
        let automaton = cache.get_or_build(|| records(&["escrow"]));
        assert_eq!(keywords_found(&automaton, "escrow"), vec!["escrow"]);
    }

    #[test]
    fn test_verified_source_reuses_automaton_when_unchanged() {
        let policy = CachePolicy {
            ttl: Duration::ZERO,
            verify_source: true,
            case_sensitive: false,
        };
        let cache = AutomatonCache::new("test", policy);

        let first = cache.get_or_build(|| records(&["cash", "escrow"]));
        let second = cache.get_or_build(|| records(&["cash", "escrow"]));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.snapshot().reuses, 1);

        let third = cache.get_or_build(|| records(&["cash"]));
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.keyword_count(), 1);
        assert_eq!(cache.snapshot().rebuilds, 2);
    }

    #[test]
    fn test_verification_compares_metadata_too() {
        let policy = CachePolicy {
            ttl: Duration::ZERO,
            verify_source: true,
            case_sensitive: false,
        };
        let cache = AutomatonCache::new("test", policy);

        let first = cache.get_or_build(|| vec![("cash".to_string(), 1u32)]);
        let second = cache.get_or_build(|| vec![("cash".to_string(), 2u32)]);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::from_secs(3600)));
        cache.get_or_build(|| records(&["cash"]));
        cache.invalidate();
        assert!(cache.peek().is_none());
        let automaton = cache.get_or_build(|| records(&["escrow"]));
        assert_eq!(keywords_found(&automaton, "escrow"), vec!["escrow"]);
    }

    #[test]
    fn test_case_sensitivity_comes_from_policy() {
        let policy = CachePolicy {
            ttl: Duration::from_secs(60),
            verify_source: false,
            case_sensitive: true,
        };
        let cache = AutomatonCache::new("test", policy);
        let automaton = cache.get_or_build(|| records(&["USDT"]));
        assert!(automaton.is_case_sensitive());
        assert!(keywords_found(&automaton, "usdt").is_empty());
    }

    #[test]
    fn test_concurrent_callers_build_once() {
        let cache = AutomatonCache::new("test", CachePolicy::with_ttl(Duration::from_secs(3600)));
        let fetches = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let automaton = cache.get_or_build(|| {
                        fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(10));
                        records(&["cash"])
                    });
                    assert_eq!(automaton.keyword_count(), 1);
                });
            }
        });

        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(cache.snapshot().rebuilds, 1);
    }
}
