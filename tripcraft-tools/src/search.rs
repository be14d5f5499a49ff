//! Tavily web search

use crate::http_error;
use crate::registry::{parse_arguments, Tool};
use crate::table::Table;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use tripcraft_error::{Error, Result};
use tripcraft_llm::ToolDefinition;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

const LEADING_COLUMNS: [&str; 3] = ["title", "url", "content"];
const DROPPED_COLUMNS: [&str; 2] = ["score", "raw_content"];

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Option<Vec<serde_json::Map<String, serde_json::Value>>>,
}

/// Pipe table of Tavily results without the score columns
pub fn results_table(results: &[serde_json::Map<String, serde_json::Value>]) -> Table {
    let extra: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .filter(|k| !LEADING_COLUMNS.contains(k) && !DROPPED_COLUMNS.contains(k))
        .collect();

    let columns: Vec<&str> = LEADING_COLUMNS.iter().copied().chain(extra).collect();
    let mut table = Table::new(columns.iter().copied());

    for result in results {
        table.push_row(columns.iter().map(|c| match result.get(*c) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }));
    }
    table
}

/// Client for the Tavily search API
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl TavilyClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            url: TAVILY_SEARCH_URL.to_string(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
        };

        let response: SearchResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error("search::tavily", e))?
            .json()
            .await
            .map_err(|e| http_error("search::tavily", e))?;

        response.results.ok_or_else(|| {
            Error::parse_failed("search response has no 'results' field").with_operation("search::tavily")
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// The `search_tavily` tool
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: TavilyClient,
}

impl WebSearch {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "search_tavily",
            "Searches the web and returns the results as a Markdown table",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Query to search on the web" }
            },
            "required": ["query"]
        }))
    }

    async fn invoke(&self, arguments: &str) -> Result<String> {
        let args: SearchArgs = parse_arguments("search_tavily", arguments)?;
        let results = self.client.search(&args.query).await?;
        info!(query = %args.query, results = results.len(), "web search finished");
        Ok(results_table(&results).to_pipe())
    }
}
