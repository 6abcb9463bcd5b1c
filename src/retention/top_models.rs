//! G2: top-K maintenance, grounded in `TopModelsManager` in
//! `original_source/scripts/top_models_manager.py`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{Fetcher, Outcome};
use crate::hub::client::HubClient;
use crate::hub::types::ListModelsQuery;
use crate::types::{ModelRef, TopRanking};

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingChangeSummary {
    pub moved_up: usize,
    pub moved_down: usize,
    pub no_change: usize,
    pub new_entries: usize,
    pub dropped_out: usize,
    pub stability_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct TopModelsResult {
    pub models: Vec<ModelRef>,
    pub rankings: Vec<TopRanking>,
    pub changes: RankingChangeSummary,
    pub api_calls: u32,
    pub elapsed: Duration,
    pub success: bool,
}

/// Fetch up to `2K` GGUF-tagged models sorted by downloads, keep the top
/// `k`, and diff the result against `previous` to compute rank-change and
/// days-in-top (spec §4.G2).
pub async fn update(
    hub: &dyn HubClient,
    fetcher: &Fetcher,
    k: u32,
    previous: &[TopRanking],
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> TopModelsResult {
    let started = Instant::now();

    let Some(permit) = fetcher.acquire(cancel).await else {
        return TopModelsResult {
            models: Vec::new(),
            rankings: Vec::new(),
            changes: RankingChangeSummary::default(),
            api_calls: 0,
            elapsed: started.elapsed(),
            success: false,
        };
    };
    let query = ListModelsQuery {
        sort: Some("downloads".to_string()),
        direction: Some(-1),
        limit: Some(k.saturating_mul(2)),
        ..ListModelsQuery::gguf_tagged()
    };
    let result = hub.list_models(query).await;
    permit.report(Outcome::from_result(&result)).await;

    let mut summaries = match result {
        Ok(summaries) => summaries,
        Err(error) => {
            tracing::warn!(%error, "top-models update query failed");
            return TopModelsResult {
                models: Vec::new(),
                rankings: Vec::new(),
                changes: RankingChangeSummary::default(),
                api_calls: 1,
                elapsed: started.elapsed(),
                success: false,
            };
        }
    };

    summaries.sort_by(|a, b| b.downloads.cmp(&a.downloads));
    summaries.truncate(k as usize);

    let previous_by_id: HashMap<&str, &TopRanking> =
        previous.iter().map(|r| (r.model_id.as_str(), r)).collect();

    let mut models = Vec::with_capacity(summaries.len());
    let mut rankings = Vec::with_capacity(summaries.len());
    let mut moved_up = 0;
    let mut moved_down = 0;
    let mut no_change = 0;
    let mut new_entries = 0;

    for (index, summary) in summaries.into_iter().enumerate() {
        let rank = (index + 1) as u32;
        let prior = previous_by_id.get(summary.id.as_str());

        let (previous_rank, rank_change, days_in_top, first_top_date) = match prior {
            Some(prior) => {
                let rank_change = prior.rank as i32 - rank as i32;
                match rank_change.cmp(&0) {
                    std::cmp::Ordering::Greater => moved_up += 1,
                    std::cmp::Ordering::Less => moved_down += 1,
                    std::cmp::Ordering::Equal => no_change += 1,
                }
                (Some(prior.rank), rank_change, prior.days_in_top + 1, prior.first_top_date)
            }
            None => {
                new_entries += 1;
                (None, 0, 1, now)
            }
        };

        rankings.push(TopRanking {
            model_id: summary.id.clone(),
            rank,
            download_count: summary.downloads,
            previous_rank,
            rank_change,
            days_in_top,
            first_top_date,
        });

        let mut model_ref = ModelRef::new(summary.id, "top_models", 1.0);
        model_ref
            .attributes
            .insert("downloads".to_string(), summary.downloads.into());
        model_ref.attributes.insert("rank".to_string(), rank.into());
        models.push(model_ref);
    }

    let dropped_out = previous
        .iter()
        .filter(|p| !rankings.iter().any(|r| r.model_id == p.model_id))
        .count();

    let stability_ratio = if rankings.is_empty() {
        0.0
    } else {
        no_change as f64 / rankings.len() as f64
    };

    TopModelsResult {
        models,
        rankings,
        changes: RankingChangeSummary {
            moved_up,
            moved_down,
            no_change,
            new_entries,
            dropped_out,
            stability_ratio,
        },
        api_calls: 1,
        elapsed: started.elapsed(),
        success: true,
    }
}

/// Trim ranking-history entries older than `ranking_history_days`.
pub fn trim_history(history: &mut Vec<(DateTime<Utc>, Vec<TopRanking>)>, now: DateTime<Utc>, ranking_history_days: u32) {
    let cutoff = now - chrono::Duration::days(ranking_history_days as i64);
    history.retain(|(timestamp, _)| *timestamp >= cutoff);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::hub::types::{ModelSummary, PathInfo};
    use async_trait::async_trait;

    struct FakeHub {
        summaries: Vec<ModelSummary>,
    }

    #[async_trait]
    impl HubClient for FakeHub {
        async fn list_models(&self, _query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError> {
            Ok(self.summaries.clone())
        }
        async fn model_info(&self, _id: &str) -> Result<ModelSummary, SyncError> {
            unimplemented!()
        }
        async fn list_repo_files(&self, _id: &str) -> Result<Vec<String>, SyncError> {
            unimplemented!()
        }
        async fn get_paths_info(&self, _id: &str, _paths: &[String]) -> Result<Vec<PathInfo>, SyncError> {
            unimplemented!()
        }
        async fn count_gguf_models(&self) -> Result<u64, SyncError> {
            unimplemented!()
        }
    }

    fn summary(id: &str, downloads: u64) -> ModelSummary {
        ModelSummary {
            id: id.to_string(),
            downloads,
            likes: 0,
            tags: vec![],
            author: None,
            created_at: None,
            last_modified: None,
            siblings: vec![],
        }
    }

    #[tokio::test]
    async fn ranks_by_downloads_descending_and_detects_moves() {
        let now = Utc::now();
        let hub = FakeHub {
            summaries: vec![summary("org/a", 100), summary("org/b", 50)],
        };
        let fetcher = Fetcher::new(4, 1000);
        let cancel = CancellationToken::new();

        let previous = vec![TopRanking {
            model_id: "org/b".into(),
            rank: 1,
            download_count: 40,
            previous_rank: None,
            rank_change: 0,
            days_in_top: 3,
            first_top_date: now - chrono::Duration::days(3),
        }];

        let result = update(&hub, &fetcher, 2, &previous, now, &cancel).await;
        assert!(result.success);
        assert_eq!(result.rankings[0].model_id, "org/a");
        assert_eq!(result.rankings[0].rank, 1);
        assert_eq!(result.changes.new_entries, 1);

        let b = result.rankings.iter().find(|r| r.model_id == "org/b").unwrap();
        assert_eq!(b.rank, 2);
        assert_eq!(b.rank_change, -1);
        assert_eq!(b.days_in_top, 4);
    }

    #[test]
    fn trim_history_drops_entries_older_than_window() {
        let now = Utc::now();
        let mut history = vec![
            (now - chrono::Duration::days(100), vec![]),
            (now - chrono::Duration::days(1), vec![]),
        ];
        trim_history(&mut history, now, 90);
        assert_eq!(history.len(), 1);
    }
}
