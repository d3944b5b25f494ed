use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::{IndexTarget, RetrieveError, Retriever, ScoredNode};

pub const DEFAULT_BASE_URL: &str = "https://api.cloud.llamaindex.ai";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the `LlamaCloud` API.
#[derive(Debug, Clone)]
pub struct LlamaCloudConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl LlamaCloudConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for LlamaCloudConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    project_name: String,
    index_name: String,
}

impl PipelineKey {
    fn for_target(target: &IndexTarget) -> Self {
        Self {
            project_name: target.project_name.clone(),
            index_name: target.index_name.clone(),
        }
    }
}

/// Pipeline ids resolved so far. Concurrent first lookups of the same index
/// share one request; a failed lookup leaves the slot empty for the next call.
#[derive(Default)]
struct PipelineCache {
    entries: RwLock<HashMap<PipelineKey, Arc<OnceCell<String>>>>,
}

impl PipelineCache {
    async fn slot(&self, key: &PipelineKey) -> Arc<OnceCell<String>> {
        let existing = {
            let map = self.entries.read().await;
            map.get(key).cloned()
        };
        if let Some(slot) = existing {
            return slot;
        }

        let mut map = self.entries.write().await;
        map.entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct PipelineSummary {
    id: String,
}

#[derive(Debug, Serialize)]
struct RetrieveBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dense_similarity_top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_nodes: Vec<RetrievalNode>,
}

#[derive(Debug, Deserialize)]
struct RetrievalNode {
    node: TextNode,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(default, rename = "id_")]
    id: Option<String>,
    #[serde(default)]
    text: String,
}

impl From<RetrievalNode> for ScoredNode {
    fn from(value: RetrievalNode) -> Self {
        Self {
            id: value.node.id,
            text: value.node.text,
            score: value.score,
        }
    }
}

/// [`Retriever`] over `LlamaCloud` managed pipelines.
pub struct LlamaCloudRetriever {
    http: reqwest::Client,
    base_url: String,
    pipelines: PipelineCache,
}

impl LlamaCloudRetriever {
    /// Builds the HTTP client. No request is sent until the first retrieval.
    ///
    /// # Errors
    /// Returns [`RetrieveError::Client`] if the TLS backend cannot initialize.
    pub fn new(config: &LlamaCloudConfig) -> Result<Self, RetrieveError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RetrieveError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pipelines: PipelineCache::default(),
        })
    }

    async fn pipeline_id(&self, target: &IndexTarget) -> Result<String, RetrieveError> {
        let key = PipelineKey::for_target(target);
        let slot = self.pipelines.slot(&key).await;
        let id = slot
            .get_or_try_init(|| self.resolve_pipeline(target))
            .await?;
        Ok(id.clone())
    }

    async fn resolve_pipeline(&self, target: &IndexTarget) -> Result<String, RetrieveError> {
        let url = format!("{}/api/v1/pipelines", self.base_url);
        debug!(
            index = %target.index_name,
            project = %target.project_name,
            "resolving pipeline id"
        );
        let request = self
            .http
            .get(&url)
            .bearer_auth(target.api_key.expose())
            .query(&[
                ("project_name", target.project_name.as_str()),
                ("pipeline_name", target.index_name.as_str()),
            ]);
        let pipelines: Vec<PipelineSummary> = send_json(request, &url).await?;

        let Some(pipeline) = pipelines.into_iter().next() else {
            return Err(RetrieveError::IndexNotFound {
                index_name: target.index_name.clone(),
                project_name: target.project_name.clone(),
            });
        };
        info!(
            index = %target.index_name,
            pipeline_id = %pipeline.id,
            "resolved pipeline"
        );
        Ok(pipeline.id)
    }
}

#[async_trait]
impl Retriever for LlamaCloudRetriever {
    async fn retrieve(
        &self,
        target: &IndexTarget,
        query: &str,
        top_k: Option<NonZeroU32>,
    ) -> Result<Vec<ScoredNode>, RetrieveError> {
        let pipeline_id = self.pipeline_id(target).await?;
        let url = format!("{}/api/v1/pipelines/{pipeline_id}/retrieve", self.base_url);
        let body = RetrieveBody {
            query,
            dense_similarity_top_k: top_k.map(NonZeroU32::get),
        };
        let request = self
            .http
            .post(&url)
            .bearer_auth(target.api_key.expose())
            .json(&body);
        let response: RetrieveResponse = send_json(request, &url).await?;

        debug!(
            index = %target.index_name,
            nodes = response.retrieval_nodes.len(),
            "retrieved nodes"
        );
        Ok(response
            .retrieval_nodes
            .into_iter()
            .map(ScoredNode::from)
            .collect())
    }
}

async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, RetrieveError> {
    let response = request.send().await.map_err(http_error(url))?;
    let status = response.status();
    let body = response.text().await.map_err(http_error(url))?;
    if !status.is_success() {
        return Err(RetrieveError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| RetrieveError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

fn http_error(url: &str) -> impl FnOnce(reqwest::Error) -> RetrieveError {
    move |source| RetrieveError::Http {
        url: url.to_string(),
        source,
    }
}
