//! Pluggable hub client (spec §6). `HttpHubClient` is the real
//! `reqwest`-backed implementation; tests substitute a fake or a
//! `wiremock` server behind the same trait object.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::SyncError;
use crate::hub::types::{ListModelsQuery, ModelSummary, PathInfo};

#[async_trait]
pub trait HubClient: Send + Sync {
    async fn list_models(&self, query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError>;
    async fn model_info(&self, id: &str) -> Result<ModelSummary, SyncError>;
    async fn list_repo_files(&self, id: &str) -> Result<Vec<String>, SyncError>;
    async fn get_paths_info(&self, id: &str, paths: &[String]) -> Result<Vec<PathInfo>, SyncError>;
    /// Total count of hub-reported gguf-tagged models (spec §4.F).
    async fn count_gguf_models(&self) -> Result<u64, SyncError>;
}

pub struct HttpHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpHubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .expect("failed to build hub HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SyncError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SyncError::Authentication(format!("hub returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(500).collect();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: truncated,
            });
        }

        response.json::<T>().await.map_err(SyncError::from)
    }
}

#[async_trait]
impl HubClient for HttpHubClient {
    async fn list_models(&self, query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError> {
        let url = format!("{}/api/models", self.base_url);
        let mut builder = self.client.get(url);
        if let Some(filter) = &query.filter {
            builder = builder.query(&[("filter", filter.as_str())]);
        }
        if let Some(search) = &query.search {
            builder = builder.query(&[("search", search.as_str())]);
        }
        if let Some(author) = &query.author {
            builder = builder.query(&[("author", author.as_str())]);
        }
        if let Some(sort) = &query.sort {
            builder = builder.query(&[("sort", sort.as_str())]);
        }
        if let Some(direction) = query.direction {
            builder = builder.query(&[("direction", direction)]);
        }
        if let Some(limit) = query.limit {
            builder = builder.query(&[("limit", limit)]);
        }
        self.send_json(builder).await
    }

    async fn model_info(&self, id: &str) -> Result<ModelSummary, SyncError> {
        let url = format!("{}/api/models/{id}", self.base_url);
        self.send_json(self.client.get(url)).await
    }

    async fn list_repo_files(&self, id: &str) -> Result<Vec<String>, SyncError> {
        let summary = self.model_info(id).await?;
        Ok(summary.siblings.into_iter().map(|s| s.rfilename).collect())
    }

    async fn get_paths_info(&self, id: &str, paths: &[String]) -> Result<Vec<PathInfo>, SyncError> {
        let url = format!("{}/api/models/{id}/paths-info", self.base_url);
        let builder = self
            .client
            .post(url)
            .json(&serde_json::json!({"paths": paths}));
        self.send_json(builder).await
    }

    async fn count_gguf_models(&self) -> Result<u64, SyncError> {
        let url = format!("{}/api/models-count", self.base_url);
        let builder = self.client.get(url).query(&[("filter", "gguf")]);
        #[derive(serde::Deserialize)]
        struct Count {
            count: u64,
        }
        let count: Count = self.send_json(builder).await?;
        Ok(count.count)
    }
}
