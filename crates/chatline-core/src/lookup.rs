//! Direct lookups against the assistant backend, outside any conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::WeatherReport;

/// An entry of the backend's knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    /// Only present on search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKnowledgeInput {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait LookupApi: Send + Sync {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReport>;

    /// Knowledge entries most similar to `query`, best first.
    async fn search_knowledge(&self, query: &str) -> Result<Vec<KnowledgeItem>>;

    async fn add_knowledge(&self, input: AddKnowledgeInput) -> Result<KnowledgeItem>;
}
