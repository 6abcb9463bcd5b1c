//! G3: source-weighted merge/dedup, grounded in `DataMerger` in
//! `original_source/scripts/data_merger.py`.

use std::collections::{HashMap, HashSet};

use crate::types::ModelRef;

pub const WEIGHT_TOP: f64 = 1.0;
pub const WEIGHT_RECENT: f64 = 0.8;
pub const WEIGHT_MERGED: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionSourceTag {
    Recent,
    Top,
    Merged,
}

impl RetentionSourceTag {
    fn weight(self) -> f64 {
        match self {
            RetentionSourceTag::Top => WEIGHT_TOP,
            RetentionSourceTag::Recent => WEIGHT_RECENT,
            RetentionSourceTag::Merged => WEIGHT_MERGED,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RetentionSourceTag::Recent => "recent",
            RetentionSourceTag::Top => "top",
            RetentionSourceTag::Merged => "merged",
        }
    }
}

/// Priority score for a single tagged model (spec §4.G3).
pub fn priority_score(source: RetentionSourceTag, downloads: u64, confidence: f64, rank: Option<u32>) -> f64 {
    let download_bonus = (((downloads + 1) as f64).log10() / 10.0).min(0.2);
    let mut score = source.weight() + download_bonus + (confidence - 0.5) * 0.1;
    if let Some(rank) = rank
        && rank <= 10
    {
        score += (11 - rank) as f64 * 0.01;
    }
    score
}

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub models: Vec<ModelRef>,
    pub total_models: usize,
    pub recent_models_count: usize,
    pub top_models_count: usize,
    pub duplicates_removed: usize,
    pub data_integrity_score: f64,
}

/// Normalize, prioritize, deduplicate, and sort `recent`/`top` into a
/// single merged list (spec §4.G3).
pub fn merge(recent: Vec<ModelRef>, top: Vec<ModelRef>) -> MergeResult {
    let recent_models_count = recent.len();
    let top_models_count = top.len();

    let mut by_id: HashMap<String, (ModelRef, RetentionSourceTag, f64)> = HashMap::new();
    let mut total_raw = 0usize;

    for model in recent {
        total_raw += 1;
        tag_and_insert(&mut by_id, model, RetentionSourceTag::Recent);
    }
    for model in top {
        total_raw += 1;
        tag_and_insert(&mut by_id, model, RetentionSourceTag::Top);
    }

    let mut models: Vec<ModelRef> = by_id.into_values().map(|(model, _, _)| model).collect();
    models.sort_by(|a, b| {
        b.attributes
            .get("priority_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            .total_cmp(&a.attributes.get("priority_score").and_then(|v| v.as_f64()).unwrap_or(0.0))
    });

    let total_models = models.len();
    let duplicates_removed = total_raw - total_models;
    let data_integrity_score = integrity_score(&models);

    MergeResult {
        models,
        total_models,
        recent_models_count,
        top_models_count,
        duplicates_removed,
        data_integrity_score,
    }
}

fn tag_and_insert(
    by_id: &mut HashMap<String, (ModelRef, RetentionSourceTag, f64)>,
    mut model: ModelRef,
    tag: RetentionSourceTag,
) {
    let downloads = model.downloads();
    let rank = model
        .attributes
        .get("rank")
        .and_then(|v| v.as_u64())
        .map(|r| r as u32);
    let score = priority_score(tag, downloads, model.confidence_score, rank);
    model
        .attributes
        .insert("priority_score".to_string(), score.into());
    model
        .attributes
        .insert("source".to_string(), tag.label().into());

    match by_id.get_mut(&model.id) {
        None => {
            by_id.insert(model.id.clone(), (model, tag, score));
        }
        Some((existing, existing_tag, existing_score)) => {
            let existing_downloads = existing.downloads();
            let merged_downloads = existing_downloads.max(downloads);
            existing
                .attributes
                .insert("downloads".to_string(), merged_downloads.into());

            if let (Some(a), Some(b)) = (existing.created_at(), model.created_at()) {
                let min = a.min(b);
                existing
                    .attributes
                    .insert("created_at".to_string(), min.to_rfc3339().into());
            } else if let Some(b) = model.created_at() {
                existing.attributes.insert("created_at".to_string(), b.to_rfc3339().into());
            }

            let mut tags: HashSet<String> = existing
                .attributes
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            if let Some(incoming_tags) = model
                .attributes
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect::<Vec<_>>())
            {
                tags.extend(incoming_tags);
            }
            existing
                .attributes
                .insert("tags".to_string(), serde_json::json!(tags.into_iter().collect::<Vec<_>>()));

            if *existing_tag != tag {
                *existing_tag = RetentionSourceTag::Merged;
                existing
                    .attributes
                    .insert("source".to_string(), RetentionSourceTag::Merged.label().into());
            }

            if score > *existing_score {
                *existing_score = score;
                existing.confidence_score = existing.confidence_score.max(model.confidence_score);
            }
            existing.attributes.insert("priority_score".to_string(), (*existing_score).into());

            for method in &model.discovery_method {
                if !existing.discovery_method.contains(method) {
                    existing.discovery_method.push(method.clone());
                }
            }
            existing.discovery_count += 1;
        }
    }
}

fn integrity_score(models: &[ModelRef]) -> f64 {
    if models.is_empty() {
        return 1.0;
    }
    let passed = models
        .iter()
        .filter(|m| {
            !m.id.trim().is_empty()
                && m.attributes
                    .get("priority_score")
                    .and_then(|v| v.as_f64())
                    .is_some_and(|p| (0.0..=2.0).contains(&p))
                && m.downloads() < u64::MAX
        })
        .count();
    passed as f64 / models.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_weighs_higher_than_recent() {
        assert!(priority_score(RetentionSourceTag::Top, 0, 1.0, None) > priority_score(RetentionSourceTag::Recent, 0, 1.0, None));
    }

    #[test]
    fn download_bonus_caps_at_point_two() {
        let score = priority_score(RetentionSourceTag::Top, 1_000_000_000, 1.0, None);
        assert!(score <= WEIGHT_TOP + 0.2 + 0.05 + 0.0001);
    }

    #[test]
    fn rank_bonus_applies_only_in_top_ten() {
        let with_rank = priority_score(RetentionSourceTag::Top, 0, 1.0, Some(1));
        let without_rank = priority_score(RetentionSourceTag::Top, 0, 1.0, None);
        assert!(with_rank > without_rank);

        let rank_11 = priority_score(RetentionSourceTag::Top, 0, 1.0, Some(11));
        assert_eq!(rank_11, without_rank);
    }

    #[test]
    fn merge_dedupes_keeping_highest_priority_and_unions_tags() {
        let mut recent = ModelRef::new("org/m", "date_filtered", 0.9);
        recent
            .attributes
            .insert("downloads".to_string(), 10u64.into());
        recent
            .attributes
            .insert("tags".to_string(), serde_json::json!(["chat"]));

        let mut top = ModelRef::new("org/m", "top_models", 1.0);
        top.attributes.insert("downloads".to_string(), 500u64.into());
        top.attributes.insert("rank".to_string(), 3u64.into());
        top.attributes
            .insert("tags".to_string(), serde_json::json!(["instruct"]));

        let result = merge(vec![recent], vec![top]);
        assert_eq!(result.total_models, 1);
        assert_eq!(result.duplicates_removed, 1);

        let merged = &result.models[0];
        assert_eq!(merged.downloads(), 500);
        assert_eq!(merged.attributes.get("source").and_then(|v| v.as_str()), Some("merged"));
        let tags: HashSet<String> = merged
            .attributes
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap();
        assert!(tags.contains("chat"));
        assert!(tags.contains("instruct"));
    }

    #[test]
    fn disjoint_sources_produce_no_dedup() {
        let recent = vec![ModelRef::new("org/a", "date_filtered", 0.9)];
        let top = vec![ModelRef::new("org/b", "top_models", 1.0)];
        let result = merge(recent, top);
        assert_eq!(result.total_models, 2);
        assert_eq!(result.duplicates_removed, 0);
    }
}
