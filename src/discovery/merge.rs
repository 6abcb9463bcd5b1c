//! Dedupe/merge across discovery strategies (spec §4.C, P1).

use std::collections::HashMap;

use crate::types::ModelRef;

#[derive(Debug, Clone, Default)]
pub struct DiscoveryMetrics {
    pub per_strategy_counts: HashMap<String, usize>,
    pub total_raw: usize,
    pub total_unique: usize,
    pub deduplication_rate: f64,
    pub seen_by_multiple_strategies: usize,
}

/// Merge raw per-strategy results into a deduplicated map, keeping the
/// highest-confidence sighting per id and unioning `discovery_method`.
pub fn merge(strategy_results: Vec<(String, Vec<ModelRef>)>) -> (Vec<ModelRef>, DiscoveryMetrics) {
    let mut merged: HashMap<String, ModelRef> = HashMap::new();
    let mut per_strategy_counts = HashMap::new();
    let mut total_raw = 0usize;

    for (strategy, refs) in strategy_results {
        per_strategy_counts.insert(strategy.clone(), refs.len());
        total_raw += refs.len();

        for candidate in refs {
            merged
                .entry(candidate.id.clone())
                .and_modify(|existing| {
                    if candidate.confidence_score > existing.confidence_score {
                        let mut methods = existing.discovery_method.clone();
                        for m in &candidate.discovery_method {
                            if !methods.contains(m) {
                                methods.push(m.clone());
                            }
                        }
                        let attrs = std::mem::take(&mut existing.attributes);
                        *existing = candidate.clone();
                        existing.discovery_method = methods;
                        for (k, v) in attrs {
                            existing.attributes.entry(k).or_insert(v);
                        }
                    } else {
                        for m in &candidate.discovery_method {
                            if !existing.discovery_method.contains(m) {
                                existing.discovery_method.push(m.clone());
                            }
                        }
                        for (k, v) in candidate.attributes.clone() {
                            existing.attributes.entry(k).or_insert(v);
                        }
                    }
                    existing.discovery_count += 1;
                })
                .or_insert(candidate);
        }
    }

    let total_unique = merged.len();
    let deduplication_rate = if total_raw == 0 {
        0.0
    } else {
        (total_raw as f64 - total_unique as f64) / total_raw as f64
    };
    let seen_by_multiple_strategies = merged
        .values()
        .filter(|m| m.discovery_method.len() > 1)
        .count();

    let metrics = DiscoveryMetrics {
        per_strategy_counts,
        total_raw,
        total_unique,
        deduplication_rate,
        seen_by_multiple_strategies,
    };

    (merged.into_values().collect(), metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_duplicate_ids_keeping_highest_confidence() {
        let primary = vec![ModelRef::new("org/m", "primary", 1.0)];
        let quant = vec![ModelRef::new("org/m", "quantization_tags", 0.8)];

        let (merged, metrics) = merge(vec![
            ("primary".into(), primary),
            ("quantization_tags".into(), quant),
        ]);

        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert_eq!(m.confidence_score, 1.0);
        assert_eq!(m.discovery_method.len(), 2);
        assert_eq!(m.discovery_count, 2);
        assert_eq!(metrics.total_raw, 2);
        assert_eq!(metrics.total_unique, 1);
        assert_eq!(metrics.seen_by_multiple_strategies, 1);
    }

    #[test]
    fn disjoint_strategies_produce_no_dedup() {
        let a = vec![ModelRef::new("org/a", "primary", 1.0)];
        let b = vec![ModelRef::new("org/b", "organization_crawl", 0.9)];
        let (merged, metrics) = merge(vec![("primary".into(), a), ("organization_crawl".into(), b)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(metrics.deduplication_rate, 0.0);
    }

    // P1: |dedupe(union strategy_results)| <= sum |strategy_result_i|
    proptest::proptest! {
        #[test]
        fn p1_discovery_monotonicity(
            ids_a in proptest::collection::vec("[a-z]{3,6}", 0..10),
            ids_b in proptest::collection::vec("[a-z]{3,6}", 0..10),
        ) {
            let a: Vec<ModelRef> = ids_a.iter().map(|s| ModelRef::new(format!("org/{s}"), "a", 0.5)).collect();
            let b: Vec<ModelRef> = ids_b.iter().map(|s| ModelRef::new(format!("org/{s}"), "b", 0.5)).collect();
            let sum_raw = a.len() + b.len();
            let (merged, _) = merge(vec![("a".into(), a), ("b".into(), b)]);
            proptest::prop_assert!(merged.len() <= sum_raw);
        }
    }
}
