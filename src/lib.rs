// =============================================================================
// chat_keyword_engine
// =============================================================================
//
// Multi-pattern keyword matching for chat moderation. Keyword tables for
// three domains are compiled into Aho-Corasick automatons, cached per domain
// with a TTL, and run over every message in a single pass each.
//
//   store      where keyword rows come from
//   builders   rows -> (keyword, metadata) per domain
//   automaton  the matcher itself
//   cache      get-or-rebuild per domain
//   consumers  raw matches -> dedup'd / counted / hierarchy-filled records
//   engine     all of the above behind one &self API
// =============================================================================

pub mod automaton;
pub mod builders;
pub mod cache;
pub mod config;
pub mod consumers;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod store;

pub use automaton::{Automaton, AutomatonBuilder, Match};
pub use cache::{AutomatonCache, CachePolicy, CacheSnapshot};
pub use config::Config;
pub use engine::KeywordEngine;
pub use models::{ChatMessage, Domain, GeoHit, KeywordMeta, MessageReport, RestrictedHit, TransactionHit};
pub use store::{JsonDirStore, KeywordStore, MemoryStore, SourceError};
