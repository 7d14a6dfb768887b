// =============================================================================
// consumers.rs — FROM RAW MATCHES TO RECORDS
// =============================================================================
//
// The automaton reports every occurrence of every keyword, duplicates and
// all. Persistence wants something tidier:
//
//   transaction methods  one record per phrase (first occurrence)
//   restricted terms     one record per term and drug, with how often the
//                        term occurred
//   places               one record per name and place, spread across the
//                        province / city / district columns
// =============================================================================

use std::collections::{HashMap, HashSet};

use crate::automaton::Match;
use crate::models::{AreaLevel, GeoHit, GeoMeta, KeywordMeta, RestrictedHit, TransactionHit};

/// A keyword with the number of times it occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordCount<'a, M> {
    pub keyword: &'a str,
    /// Distinct positions the keyword was found at.
    pub count: usize,
    /// Every distinct metadata attached to the keyword, in first-seen order.
    pub metadata: Vec<&'a M>,
}

/// First match per distinct keyword, in scan order.
pub fn dedup_by_keyword<'a, M>(matches: &[Match<'a, M>]) -> Vec<Match<'a, M>> {
    let mut seen: HashSet<&str> = HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert(m.keyword))
        .copied()
        .collect()
}

/// Occurrences per distinct keyword, ordered by first occurrence.
///
/// A keyword inserted several times reports one match per entry at every
/// occurrence; those collapse into one counted occurrence here, with each
/// distinct metadata kept.
pub fn count_by_keyword<'a, M: PartialEq>(matches: &[Match<'a, M>]) -> Vec<KeywordCount<'a, M>> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut occurrences: HashSet<(&str, usize)> = HashSet::new();
    let mut counts: Vec<KeywordCount<'a, M>> = Vec::new();

    for m in matches {
        let slot = match slots.get(m.keyword).copied() {
            Some(slot) => slot,
            None => {
                slots.insert(m.keyword, counts.len());
                counts.push(KeywordCount {
                    keyword: m.keyword,
                    count: 0,
                    metadata: Vec::new(),
                });
                counts.len() - 1
            }
        };

        let entry = &mut counts[slot];
        if occurrences.insert((m.keyword, m.position)) {
            entry.count += 1;
        }
        if !entry.metadata.contains(&m.metadata) {
            entry.metadata.push(m.metadata);
        }
    }
    counts
}

pub fn transaction_hits(matches: &[Match<'_, KeywordMeta>]) -> Vec<TransactionHit> {
    dedup_by_keyword(matches)
        .into_iter()
        .filter_map(|m| match m.metadata {
            KeywordMeta::TransactionMethod(meta) => Some(TransactionHit {
                keyword: m.keyword.to_string(),
                position: m.position,
                method_id: meta.method_id,
                method: meta.method.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// One hit per term and drug. A term shared by two drugs reports both, each
/// with the term's occurrence count.
pub fn restricted_hits(matches: &[Match<'_, KeywordMeta>]) -> Vec<RestrictedHit> {
    count_by_keyword(matches)
        .into_iter()
        .flat_map(|c| {
            let (keyword, count) = (c.keyword, c.count);
            c.metadata.into_iter().filter_map(move |metadata| match metadata {
                KeywordMeta::Restricted(meta) => Some(RestrictedHit {
                    keyword: keyword.to_string(),
                    count,
                    drug_id: meta.drug_id,
                    drug_name: meta.drug_name.clone(),
                    category_id: meta.category_id,
                    category_name: meta.category_name.clone(),
                    weight: meta.weight,
                }),
                _ => None,
            })
        })
        .collect()
}

/// One hit per place name. Variants of one place that differ only in case
/// match the same span in a case-insensitive automaton; only the first of
/// them is kept.
pub fn geo_hits(matches: &[Match<'_, KeywordMeta>]) -> Vec<GeoHit> {
    let mut spans: HashSet<(i64, usize, usize)> = HashSet::new();
    dedup_by_keyword(matches)
        .into_iter()
        .filter_map(|m| match m.metadata {
            KeywordMeta::Geo(meta) if spans.insert((meta.area_id, m.position, m.end)) => {
                let (province, city, district) = place_columns(meta);
                Some(GeoHit {
                    keyword: m.keyword.to_string(),
                    position: m.position,
                    area_id: meta.area_id,
                    level: meta.level,
                    province,
                    city,
                    district,
                    lng: meta.lng,
                    lat: meta.lat,
                })
            }
            _ => None,
        })
        .collect()
}

/// (province, city, district) for a place. The matched level gets the
/// place's own name, the levels above it the ancestors found at those
/// levels, left empty when the hierarchy skips one.
fn place_columns(meta: &GeoMeta) -> (String, String, String) {
    let name = meta.name.clone();
    let province = meta.province.clone().unwrap_or_default();
    let city = meta.city.clone().unwrap_or_default();

    match meta.level {
        AreaLevel::Province => (name, String::new(), String::new()),
        AreaLevel::City => (province, name, String::new()),
        AreaLevel::District => (province, city, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{Automaton, AutomatonBuilder};
    use crate::models::{RestrictedMeta, TransactionMeta};

    fn geo(id: i64, name: &str, level: AreaLevel, city: Option<&str>, province: Option<&str>) -> KeywordMeta {
        KeywordMeta::Geo(GeoMeta {
            area_id: id,
            name: name.to_string(),
            level,
            parent_name: city.or(province).map(str::to_string),
            province: province.map(str::to_string),
            city: city.map(str::to_string),
            lng: None,
            lat: None,
        })
    }

    fn restricted(drug_id: i64, weight: u32) -> KeywordMeta {
        KeywordMeta::Restricted(RestrictedMeta {
            drug_id,
            drug_name: format!("drug-{drug_id}"),
            category_id: 1,
            category_name: "stimulants".to_string(),
            weight,
        })
    }

    #[test]
    fn test_count_by_keyword_tallies_every_occurrence() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("x", ());
        let automaton = builder.build();

        let counts = count_by_keyword(&automaton.search("xxx"));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].keyword, "x");
        assert_eq!(counts[0].count, 3);
    }

    #[test]
    fn test_count_by_keyword_orders_by_first_occurrence() {
        let automaton: Automaton<()> = ["b", "a"].iter().map(|k| (k.to_string(), ())).collect();
        let counts = count_by_keyword(&automaton.search("abba"));
        let summary: Vec<(&str, usize)> = counts.iter().map(|c| (c.keyword, c.count)).collect();
        assert_eq!(summary, vec![("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_dedup_by_keyword_keeps_first() {
        let automaton: Automaton<()> = ["ab", "b"].iter().map(|k| (k.to_string(), ())).collect();
        let unique = dedup_by_keyword(&automaton.search("abab"));
        let summary: Vec<(&str, usize)> = unique.iter().map(|m| (m.keyword, m.position)).collect();
        assert_eq!(summary, vec![("ab", 0), ("b", 1)]);
    }

    #[test]
    fn test_transaction_hits_are_unique() {
        let mut builder = AutomatonBuilder::new();
        builder.insert(
            "escrow",
            KeywordMeta::TransactionMethod(TransactionMeta {
                method_id: 7,
                method: "platform".to_string(),
            }),
        );
        let automaton = builder.build();

        let hits = transaction_hits(&automaton.search("escrow? yes escrow"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].method, "platform");
        assert_eq!(hits[0].position, 0);
    }

    #[test]
    fn test_restricted_hits_carry_counts_and_weights() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("ice", restricted(1, 5));
        builder.insert("candy", restricted(2, 1));
        let automaton = builder.build();

        let hits = restricted_hits(&automaton.search("ice, ice and candy"));
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].keyword.as_str(), hits[0].count, hits[0].weight), ("ice", 2, 5));
        assert_eq!((hits[1].keyword.as_str(), hits[1].count), ("candy", 1));
    }

    #[test]
    fn test_geo_hit_for_city_fills_province_from_parent() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("Shandong", geo(1, "Shandong", AreaLevel::Province, None, None));
        builder.insert("Qingdao", geo(2, "Qingdao", AreaLevel::City, None, Some("Shandong")));
        let automaton = builder.build();

        let hits = geo_hits(&automaton.search("meet me in Qingdao"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].province, "Shandong");
        assert_eq!(hits[0].city, "Qingdao");
        assert_eq!(hits[0].district, "");
        assert_eq!(hits[0].level, AreaLevel::City);
    }

    #[test]
    fn test_geo_hit_for_district_fills_all_columns() {
        let mut builder = AutomatonBuilder::new();
        builder.insert(
            "Laoshan",
            geo(3, "Laoshan", AreaLevel::District, Some("Qingdao"), Some("Shandong")),
        );
        let automaton = builder.build();

        let hits = geo_hits(&automaton.search("laoshan"));
        assert_eq!(
            (hits[0].province.as_str(), hits[0].city.as_str(), hits[0].district.as_str()),
            ("Shandong", "Qingdao", "Laoshan")
        );
    }

    #[test]
    fn test_geo_hit_for_province_leaves_lower_columns_empty() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("Shandong", geo(1, "Shandong", AreaLevel::Province, None, None));
        let automaton = builder.build();

        let hits = geo_hits(&automaton.search("Shandong"));
        assert_eq!(hits[0].province, "Shandong");
        assert!(hits[0].city.is_empty());
        assert!(hits[0].district.is_empty());
    }

    #[test]
    fn test_duplicate_entries_count_one_occurrence_each() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("x", 1);
        builder.insert("x", 1);
        builder.insert("x", 2);
        let automaton = builder.build();

        let counts = count_by_keyword(&automaton.search("x x"));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].metadata, vec![&1, &2]);
    }

    #[test]
    fn test_term_shared_by_two_drugs_reports_both() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("candy", restricted(1, 5));
        builder.insert("candy", restricted(2, 3));
        let automaton = builder.build();

        let hits = restricted_hits(&automaton.search("want candy? candy!"));
        let summary: Vec<(&str, usize, i64)> = hits
            .iter()
            .map(|h| (h.keyword.as_str(), h.count, h.drug_id))
            .collect();
        assert_eq!(summary, vec![("candy", 2, 1), ("candy", 2, 2)]);
    }

    #[test]
    fn test_geo_hit_for_district_under_a_province_leaves_city_empty() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("Xiantao", geo(2, "Xiantao", AreaLevel::District, None, Some("Hubei")));
        let automaton = builder.build();

        let hits = geo_hits(&automaton.search("in Xiantao"));
        assert_eq!(
            (hits[0].province.as_str(), hits[0].city.as_str(), hits[0].district.as_str()),
            ("Hubei", "", "Xiantao")
        );
    }

    #[test]
    fn test_case_variants_of_one_place_give_one_hit() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("Qingdao", geo(2, "Qingdao", AreaLevel::City, None, Some("Shandong")));
        builder.insert("QINGDAO", geo(2, "Qingdao", AreaLevel::City, None, Some("Shandong")));
        builder.insert("Tsingtao", geo(2, "Qingdao", AreaLevel::City, None, Some("Shandong")));
        let automaton = builder.build();

        let hits = geo_hits(&automaton.search("qingdao, formerly tsingtao"));
        let keywords: Vec<&str> = hits.iter().map(|h| h.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["Qingdao", "Tsingtao"]);
    }

    #[test]
    fn test_consumers_ignore_other_domains() {
        let mut builder = AutomatonBuilder::new();
        builder.insert("ice", restricted(1, 5));
        let automaton = builder.build();
        let matches = automaton.search("ice");
        assert!(transaction_hits(&matches).is_empty());
        assert!(geo_hits(&matches).is_empty());
        assert_eq!(restricted_hits(&matches).len(), 1);
    }
}
