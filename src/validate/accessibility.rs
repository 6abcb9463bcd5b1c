//! File accessibility cache (spec §4.E), grounded in
//! `FileAccessibilityVerifier` in
//! `original_source/scripts/validation_system.py`. Module-owned cache per
//! the redesign note in spec §9 ("module-level caches belong to the
//! component that owns the concern") — a private semaphore bounds
//! concurrent HEAD requests independently of the shared fetcher's bound.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::{Mutex, Semaphore};

const CACHE_TTL: Duration = Duration::from_secs(3600);
const HEAD_CONCURRENCY: usize = 10;
const HEAD_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AccessibilityCache {
    client: Client,
    semaphore: Semaphore,
    cache: Mutex<HashMap<String, (bool, Instant)>>,
}

impl AccessibilityCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            semaphore: Semaphore::new(HEAD_CONCURRENCY),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// HEAD `url` with redirects followed and a 30s timeout; `2xx`/`3xx`
    /// counts as accessible. Cached for 3600s.
    pub async fn is_accessible(&self, url: &str) -> bool {
        if let Some((accessible, checked_at)) = self.cache.lock().await.get(url).copied()
            && checked_at.elapsed() < CACHE_TTL
        {
            return accessible;
        }

        let _permit = self.semaphore.acquire().await.expect("semaphore not closed");
        let accessible = tokio::time::timeout(HEAD_TIMEOUT, self.client.head(url).send())
            .await
            .ok()
            .and_then(|r| r.ok())
            .map(|response| {
                let status = response.status().as_u16();
                (200..400).contains(&status)
            })
            .unwrap_or(false);

        self.cache
            .lock()
            .await
            .insert(url.to_string(), (accessible, Instant::now()));
        accessible
    }

    /// Check every file URL in `urls`, bounded by the private semaphore,
    /// returning the count that were accessible.
    pub async fn check_all(self: &Arc<Self>, urls: Vec<String>) -> (usize, usize) {
        let mut join_set = tokio::task::JoinSet::new();
        let total = urls.len();
        for url in urls {
            let cache = self.clone();
            join_set.spawn(async move { cache.is_accessible(&url).await });
        }
        let mut accessible = 0;
        while let Some(joined) = join_set.join_next().await {
            if matches!(joined, Ok(true)) {
                accessible += 1;
            }
        }
        (accessible, total)
    }
}
