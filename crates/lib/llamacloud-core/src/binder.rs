//! Binds each published tool to its remote index.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::retrieval::{ApiKey, IndexTarget, RetrieveError, Retriever, ScoredNode};
use crate::tools::ToolRegistry;

pub const DEFAULT_PROJECT_NAME: &str = "Default";
pub const API_KEY_SETTING: &str = "LLAMA_CLOUD_API_KEY";

/// Project and credential shared by every bound index.
#[derive(Debug, Clone)]
pub struct CloudSettings {
    pub project_name: String,
    pub api_key: Option<ApiKey>,
}

impl CloudSettings {
    /// Blank values count as unset.
    #[must_use]
    pub fn new(project_name: Option<String>, api_key: Option<String>) -> Self {
        let project_name = project_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .map(ApiKey::new);
        Self {
            project_name,
            api_key,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("{setting} is not set")]
    ConfigMissing { setting: &'static str },
}

impl BindError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigMissing { .. } => "CONFIG_MISSING",
        }
    }
}

/// A tool bound to one remote index. Built once at startup, never mutated.
pub struct IndexHandle {
    tool_name: String,
    description: String,
    target: IndexTarget,
    similarity_top_k: Option<NonZeroU32>,
    retriever: Arc<dyn Retriever>,
}

impl IndexHandle {
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.target.index_name
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.target.project_name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn similarity_top_k(&self) -> Option<NonZeroU32> {
        self.similarity_top_k
    }

    /// Queries the bound index with this handle's result-count override.
    ///
    /// # Errors
    /// Propagates the retriever's error unchanged.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredNode>, RetrieveError> {
        self.retriever
            .retrieve(&self.target, query, self.similarity_top_k)
            .await
    }
}

impl fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("tool_name", &self.tool_name)
            .field("target", &self.target)
            .field("similarity_top_k", &self.similarity_top_k)
            .finish_non_exhaustive()
    }
}

/// `tool_name -> IndexHandle`, iterated in definition order.
#[derive(Debug, Default)]
pub struct BoundIndexes {
    handles: Vec<IndexHandle>,
    by_tool: HashMap<String, usize>,
}

impl BoundIndexes {
    #[must_use]
    pub fn get(&self, tool_name: &str) -> Option<&IndexHandle> {
        self.by_tool
            .get(tool_name)
            .map(|&position| &self.handles[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexHandle> {
        self.handles.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Creates one [`IndexHandle`] per registered tool.
pub struct IndexBinder {
    settings: CloudSettings,
    retriever: Arc<dyn Retriever>,
}

impl IndexBinder {
    #[must_use]
    pub fn new(settings: CloudSettings, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            settings,
            retriever,
        }
    }

    /// Binds every tool eagerly. Nothing is sent over the network.
    ///
    /// # Errors
    /// Returns [`BindError::ConfigMissing`] when no credential is configured,
    /// before any handle is created.
    pub fn bind(&self, registry: &ToolRegistry) -> Result<BoundIndexes, BindError> {
        let api_key = self
            .settings
            .api_key
            .clone()
            .ok_or(BindError::ConfigMissing {
                setting: API_KEY_SETTING,
            })?;

        let mut bound = BoundIndexes {
            handles: Vec::with_capacity(registry.len()),
            by_tool: HashMap::with_capacity(registry.len()),
        };
        for definition in registry.definitions() {
            let handle = IndexHandle {
                tool_name: definition.tool_name.clone(),
                description: definition.description.clone(),
                target: IndexTarget {
                    index_name: definition.index_name.clone(),
                    project_name: self.settings.project_name.clone(),
                    api_key: api_key.clone(),
                },
                similarity_top_k: definition.similarity_top_k,
                retriever: self.retriever.clone(),
            };
            info!(
                tool = %handle.tool_name,
                index = %handle.target.index_name,
                description = %handle.description,
                "bound tool"
            );
            bound
                .by_tool
                .insert(handle.tool_name.clone(), bound.handles.len());
            bound.handles.push(handle);
        }
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ToolDefinition;

    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl Retriever for Unreachable {
        async fn retrieve(
            &self,
            _target: &IndexTarget,
            _query: &str,
            _top_k: Option<NonZeroU32>,
        ) -> Result<Vec<ScoredNode>, RetrieveError> {
            panic!("binding must not contact the retrieval engine")
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![
            ToolDefinition::new("Docs", "handbook", NonZeroU32::new(3)),
            ToolDefinition::new("Wiki", "engineering wiki", None),
        ])
        .expect("names are distinct")
    }

    #[test]
    fn missing_credential_fails_fast() {
        let binder = IndexBinder::new(CloudSettings::new(None, None), Arc::new(Unreachable));
        let err = binder.bind(&registry()).unwrap_err();
        assert_eq!(
            err,
            BindError::ConfigMissing {
                setting: "LLAMA_CLOUD_API_KEY"
            }
        );
        assert_eq!(err.code(), "CONFIG_MISSING");
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let settings = CloudSettings::new(Some("Team".to_string()), Some("  ".to_string()));
        assert!(settings.api_key.is_none());
        assert_eq!(settings.project_name, "Team");
    }

    #[test]
    fn project_name_defaults() {
        let settings = CloudSettings::new(Some(String::new()), Some("llx".to_string()));
        assert_eq!(settings.project_name, DEFAULT_PROJECT_NAME);
    }

    #[test]
    fn binds_one_handle_per_definition_in_order() {
        let settings = CloudSettings::new(None, Some("llx-key".to_string()));
        let binder = IndexBinder::new(settings, Arc::new(Unreachable));
        let bound = binder.bind(&registry()).expect("credential present");

        let tools: Vec<_> = bound.iter().map(IndexHandle::tool_name).collect();
        assert_eq!(tools, ["get_information_docs", "get_information_wiki"]);

        let docs = bound.get("get_information_docs").expect("docs bound");
        assert_eq!(docs.index_name(), "Docs");
        assert_eq!(docs.project_name(), "Default");
        assert_eq!(docs.similarity_top_k(), NonZeroU32::new(3));
        assert!(bound.get("get_information_docs_2").is_none());
        assert!(!format!("{docs:?}").contains("llx-key"));
    }
}
