// =============================================================================
// builders/geography.rs — PLACES, ALIASES AND WHO THEY BELONG TO
// =============================================================================
//
// A place can be mentioned by its full name, any alias, or its short name,
// so one row becomes up to that many keywords, all carrying the same
// metadata. The metadata also names the place's parent and the province
// and city above it, found by walking the parent chain over every row, so a
// match on a district already knows where it sits without another lookup.
// =============================================================================

use std::collections::{HashMap, HashSet};

use crate::builders::KeywordRecord;
use crate::models::{AreaLevel, AreaRow, GeoMeta, KeywordMeta};
use crate::store::{KeywordStore, SourceError};

pub fn fetch(store: &dyn KeywordStore) -> Result<Vec<KeywordRecord>, SourceError> {
    Ok(records(&store.areas()?))
}

pub fn records(rows: &[AreaRow]) -> Vec<KeywordRecord> {
    // Names resolve across every row. A place becomes keywords only when it
    // and every one of its ancestors are active.
    let by_id: HashMap<i64, &AreaRow> = rows.iter().map(|row| (row.id, row)).collect();

    let mut records = Vec::new();
    for row in rows.iter().filter(|row| row.active) {
        let ancestors = ancestors_of(row, &by_id);
        if ancestors.iter().any(|ancestor| !ancestor.active) {
            continue;
        }

        let meta = GeoMeta {
            area_id: row.id,
            name: row.name.clone(),
            level: row.level,
            parent_name: ancestors.first().map(|p| p.name.clone()),
            province: name_at(&ancestors, AreaLevel::Province),
            city: name_at(&ancestors, AreaLevel::City),
            lng: row.lng,
            lat: row.lat,
        };

        for variant in variants(row) {
            records.push((variant.to_string(), KeywordMeta::Geo(meta.clone())));
        }
    }
    records
}

/// Parent first, then upwards. Stops at a missing parent or the first id
/// already on the path.
fn ancestors_of<'a>(row: &AreaRow, by_id: &HashMap<i64, &'a AreaRow>) -> Vec<&'a AreaRow> {
    let mut visited: HashSet<i64> = HashSet::from([row.id]);
    let mut ancestors = Vec::new();
    let mut next = row.parent_id;

    while let Some(parent_id) = next {
        if !visited.insert(parent_id) {
            break;
        }
        let Some(&parent) = by_id.get(&parent_id) else {
            break;
        };
        ancestors.push(parent);
        next = parent.parent_id;
    }
    ancestors
}

fn name_at(ancestors: &[&AreaRow], level: AreaLevel) -> Option<String> {
    ancestors
        .iter()
        .find(|ancestor| ancestor.level == level)
        .map(|ancestor| ancestor.name.clone())
}

/// Name, aliases and short name, trimmed, without blanks or repeats.
fn variants(row: &AreaRow) -> Vec<&str> {
    let candidates = std::iter::once(row.name.as_str())
        .chain(row.aliases.iter().map(String::as_str))
        .chain(row.short_name.as_deref());

    let mut out: Vec<&str> = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
