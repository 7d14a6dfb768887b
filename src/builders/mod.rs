// =============================================================================
// builders/mod.rs — ONE ENGINE, THREE VOCABULARIES
// =============================================================================
//
// Each builder turns raw configuration rows into (keyword, metadata) pairs
// ready for an AutomatonBuilder. They share a contract and nothing else:
//
//   transaction  one phrase row       -> one keyword
//   restricted   category/drug/term   -> one keyword, joined across 3 tables
//   geography    one place row        -> name + aliases + short name, with
//                                        ancestors resolved up front
//
// Disabled rows never make it into an automaton, and neither do rows whose
// parent configuration is disabled.
// =============================================================================

pub mod geography;
pub mod restricted;
pub mod transaction;

use crate::models::{Domain, KeywordMeta};
use crate::store::{KeywordStore, SourceError};

/// Keyword text paired with the metadata an automaton carries for it.
pub type KeywordRecord = (String, KeywordMeta);

/// Fetch the current keyword records for a domain.
pub fn fetch(domain: Domain, store: &dyn KeywordStore) -> Result<Vec<KeywordRecord>, SourceError> {
    match domain {
        Domain::TransactionMethod => transaction::fetch(store),
        Domain::Restricted => restricted::fetch(store),
        Domain::Geography => geography::fetch(store),
    }
}
