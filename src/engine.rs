// =============================================================================
// engine.rs — THE KEYWORD ENGINE
// =============================================================================
//
// Glue between the keyword store, the three per-domain caches and the result
// consumers. Hosts construct one KeywordEngine and share it; every method is
// &self.
//
// The engine never fails a caller. No store, a store without context, a
// table that refuses to load: all of them end up as an empty automaton, a
// log line, and a message with no matches.
// =============================================================================

use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::automaton::Automaton;
use crate::builders::{self, KeywordRecord};
use crate::cache::{AutomatonCache, CacheSnapshot};
use crate::config::Config;
use crate::consumers;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::models::{ChatMessage, Domain, GeoHit, KeywordMeta, MessageReport, RestrictedHit, TransactionHit};
use crate::store::KeywordStore;

pub type KeywordAutomaton = Automaton<KeywordMeta>;

pub struct KeywordEngine {
    store: Option<Arc<dyn KeywordStore>>,
    transactions: AutomatonCache<KeywordMeta>,
    restricted: AutomatonCache<KeywordMeta>,
    geography: AutomatonCache<KeywordMeta>,
    metrics: Arc<EngineMetrics>,
}

impl KeywordEngine {
    pub fn new(config: &Config, store: Arc<dyn KeywordStore>) -> Self {
        Self::with_store(config, Some(store))
    }

    /// An engine with no keyword source at all. Every domain builds empty.
    pub fn detached(config: &Config) -> Self {
        Self::with_store(config, None)
    }

    fn with_store(config: &Config, store: Option<Arc<dyn KeywordStore>>) -> Self {
        Self {
            store,
            transactions: AutomatonCache::new(
                Domain::TransactionMethod.to_string(),
                config.policy(Domain::TransactionMethod),
            ),
            restricted: AutomatonCache::new(Domain::Restricted.to_string(), config.policy(Domain::Restricted)),
            geography: AutomatonCache::new(Domain::Geography.to_string(), config.policy(Domain::Geography)),
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// The current automaton for a domain, rebuilt first if stale.
    pub fn automaton(&self, domain: Domain) -> Arc<KeywordAutomaton> {
        self.cache(domain).get_or_build(|| self.load(domain))
    }

    pub fn transaction_hits(&self, text: &str) -> Vec<TransactionHit> {
        let automaton = self.automaton(Domain::TransactionMethod);
        consumers::transaction_hits(&automaton.search(text))
    }

    pub fn restricted_hits(&self, text: &str) -> Vec<RestrictedHit> {
        let automaton = self.automaton(Domain::Restricted);
        consumers::restricted_hits(&automaton.search(text))
    }

    pub fn geo_hits(&self, text: &str) -> Vec<GeoHit> {
        let automaton = self.automaton(Domain::Geography);
        consumers::geo_hits(&automaton.search(text))
    }

    /// Run all three domains over one message.
    pub fn analyze(&self, message: &ChatMessage) -> MessageReport {
        let transactions = self.automaton(Domain::TransactionMethod);
        let restricted = self.automaton(Domain::Restricted);
        let geography = self.automaton(Domain::Geography);
        self.report(&transactions, &restricted, &geography, message)
    }

    /// Analyze many messages in parallel. Each domain's automaton is resolved
    /// once for the whole batch, so a rebuild never happens mid-batch.
    pub fn analyze_batch(&self, messages: &[ChatMessage]) -> Vec<MessageReport> {
        let transactions = self.automaton(Domain::TransactionMethod);
        let restricted = self.automaton(Domain::Restricted);
        let geography = self.automaton(Domain::Geography);

        messages
            .par_iter()
            .map(|message| self.report(&transactions, &restricted, &geography, message))
            .collect()
    }

    /// Drop a domain's cached automaton so the next call rebuilds it.
    pub fn invalidate(&self, domain: Domain) {
        self.cache(domain).invalidate();
    }

    pub fn cache_snapshots(&self) -> Vec<CacheSnapshot> {
        Domain::ALL.iter().map(|&domain| self.cache(domain).snapshot()).collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn cache(&self, domain: Domain) -> &AutomatonCache<KeywordMeta> {
        match domain {
            Domain::TransactionMethod => &self.transactions,
            Domain::Restricted => &self.restricted,
            Domain::Geography => &self.geography,
        }
    }

    fn report(
        &self,
        transactions: &KeywordAutomaton,
        restricted: &KeywordAutomaton,
        geography: &KeywordAutomaton,
        message: &ChatMessage,
    ) -> MessageReport {
        let mut report = MessageReport::new(message.id.clone());
        report.transactions = consumers::transaction_hits(&transactions.search(&message.text));
        report.restricted = consumers::restricted_hits(&restricted.search(&message.text));
        report.locations = consumers::geo_hits(&geography.search(&message.text));

        debug!(
            message_id = message.id.as_deref().unwrap_or("-"),
            transactions = report.transactions.len(),
            restricted = report.restricted.len(),
            locations = report.locations.len(),
            "Message analyzed"
        );

        self.metrics.record_report(&report);
        report
    }

    /// Fetch a domain's keyword records, degrading to none on any failure.
    fn load(&self, domain: Domain) -> Vec<KeywordRecord> {
        let Some(store) = self.store.as_deref() else {
            warn!(domain = %domain, "No keyword store attached — building an empty automaton");
            self.metrics.increment_degraded_builds();
            return Vec::new();
        };

        match builders::fetch(domain, store) {
            Ok(records) => {
                info!(domain = %domain, keywords = records.len(), "Keyword records fetched");
                records
            }
            Err(e) if e.is_unavailable() => {
                warn!(domain = %domain, error = %e, "Keyword configuration unavailable — building an empty automaton");
                self.metrics.increment_degraded_builds();
                Vec::new()
            }
            Err(e) => {
                error!(domain = %domain, error = %e, "Failed to fetch keyword records — building an empty automaton");
                self.metrics.increment_failed_builds();
                Vec::new()
            }
        }
    }
}
