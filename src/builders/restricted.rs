// =============================================================================
// builders/restricted.rs — THE RESTRICTED VOCABULARY
// =============================================================================
//
// Three levels of configuration: category -> drug -> slang term. A term is
// live only when all three levels are active. The join happens here, once
// per rebuild, so a match already knows its drug, category and weight.
// =============================================================================

use std::collections::HashMap;

use crate::builders::KeywordRecord;
use crate::models::{DrugCategoryRow, DrugKeywordRow, DrugRow, KeywordMeta, RestrictedMeta};
use crate::store::{KeywordStore, SourceError};

pub fn fetch(store: &dyn KeywordStore) -> Result<Vec<KeywordRecord>, SourceError> {
    let categories = store.drug_categories()?;
    let drugs = store.drugs()?;
    let keywords = store.drug_keywords()?;
    Ok(records(&categories, &drugs, &keywords))
}

pub fn records(
    categories: &[DrugCategoryRow],
    drugs: &[DrugRow],
    keywords: &[DrugKeywordRow],
) -> Vec<KeywordRecord> {
    let live_categories: HashMap<i64, &DrugCategoryRow> = categories
        .iter()
        .filter(|c| c.active)
        .map(|c| (c.id, c))
        .collect();

    let live_drugs: HashMap<i64, (&DrugRow, &DrugCategoryRow)> = drugs
        .iter()
        .filter(|d| d.active)
        .filter_map(|d| live_categories.get(&d.category_id).map(|c| (d.id, (d, *c))))
        .collect();

    keywords
        .iter()
        .filter(|k| k.active)
        .filter_map(|k| {
            let (drug, category) = live_drugs.get(&k.drug_id)?;
            let keyword = k.keyword.trim();
            if keyword.is_empty() {
                return None;
            }
            Some((
                keyword.to_string(),
                KeywordMeta::Restricted(RestrictedMeta {
                    drug_id: drug.id,
                    drug_name: drug.name.clone(),
                    category_id: category.id,
                    category_name: category.name.clone(),
                    weight: k.weight,
                }),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, active: bool) -> DrugCategoryRow {
        DrugCategoryRow {
            id,
            name: format!("category-{id}"),
            active,
        }
    }

    fn drug(id: i64, category_id: i64, active: bool) -> DrugRow {
        DrugRow {
            id,
            category_id,
            name: format!("drug-{id}"),
            active,
        }
    }

    fn term(id: i64, drug_id: i64, keyword: &str, active: bool) -> DrugKeywordRow {
        DrugKeywordRow {
            id,
            drug_id,
            keyword: keyword.to_string(),
            weight: 2,
            active,
        }
    }

    #[test]
    fn test_all_three_levels_must_be_active() {
        let categories = vec![category(1, true), category(2, false)];
        let drugs = vec![drug(10, 1, true), drug(11, 1, false), drug(12, 2, true), drug(13, 99, true)];
        let keywords = vec![
            term(100, 10, "ice", true),
            term(101, 10, "glass", false),
            term(102, 11, "dead drug", true),
            term(103, 12, "dead category", true),
            term(104, 13, "orphan", true),
        ];

        let records = records(&categories, &drugs, &keywords);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "ice");
        match &records[0].1 {
            KeywordMeta::Restricted(meta) => {
                assert_eq!(meta.drug_id, 10);
                assert_eq!(meta.drug_name, "drug-10");
                assert_eq!(meta.category_id, 1);
                assert_eq!(meta.category_name, "category-1");
                assert_eq!(meta.weight, 2);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_same_term_for_two_drugs_yields_two_records() {
        let categories = vec![category(1, true)];
        let drugs = vec![drug(10, 1, true), drug(11, 1, true)];
        let keywords = vec![term(100, 10, "candy", true), term(101, 11, "candy", true)];
        assert_eq!(records(&categories, &drugs, &keywords).len(), 2);
    }
}
