// =============================================================================
// builders/transaction.rs — HOW THE MONEY MOVES
// =============================================================================
//
// Phrases like "face to face", "escrow" or "USDT only" that tell us how a
// deal is meant to be paid or delivered. One row, one keyword. The metadata
// is the method the phrase belongs to.
// =============================================================================

use crate::builders::KeywordRecord;
use crate::models::{KeywordMeta, TransactionKeywordRow, TransactionMeta};
use crate::store::{KeywordStore, SourceError};

pub fn fetch(store: &dyn KeywordStore) -> Result<Vec<KeywordRecord>, SourceError> {
    Ok(records(&store.transaction_keywords()?))
}

/// Active phrases of enabled methods.
pub fn records(rows: &[TransactionKeywordRow]) -> Vec<KeywordRecord> {
    rows.iter()
        .filter(|row| row.active && row.method_enabled)
        .filter_map(|row| {
            let keyword = row.keyword.trim();
            if keyword.is_empty() {
                return None;
            }
            Some((
                keyword.to_string(),
                KeywordMeta::TransactionMethod(TransactionMeta {
                    method_id: row.method_id,
                    method: row.method.clone(),
                }),
            ))
        })
        .collect()
}
