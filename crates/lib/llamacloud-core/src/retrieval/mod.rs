//! Retrieval engine seam.
//!
//! The router only sees [`Retriever`]; [`LlamaCloudRetriever`] is the
//! production implementation backed by the `LlamaCloud` REST API.

use std::fmt;
use std::num::NonZeroU32;

use async_trait::async_trait;
use thiserror::Error;

mod llamacloud;

pub use llamacloud::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, LlamaCloudConfig, LlamaCloudRetriever};

/// Pre-issued `LlamaCloud` credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Address of one remote index plus the credential used to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    pub index_name: String,
    pub project_name: String,
    pub api_key: ApiKey,
}

/// A retrieved chunk. `text` is the LLM-facing content, without metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub id: Option<String>,
    pub text: String,
    pub score: Option<f64>,
}

impl ScoredNode {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            score: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("index {index_name:?} not found in project {project_name:?}")]
    IndexNotFound {
        index_name: String,
        project_name: String,
    },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Query capability of a remote knowledge index.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns nodes best match first. `top_k = None` uses the engine default.
    async fn retrieve(
        &self,
        target: &IndexTarget,
        query: &str,
        top_k: Option<NonZeroU32>,
    ) -> Result<Vec<ScoredNode>, RetrieveError>;
}
