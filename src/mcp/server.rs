//! Dashboard search MCP server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::PathBuf;

use dashsearch::{CollectionSelector, Config, SearchEngine, SearchError};

/// Parameters for dashboard_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Collection to search: a workbook name or "All"
    #[schemars(description = "Workbook name, or \"All\" for every workbook")]
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Natural language search query (e.g., "profit margin by segment")
    #[schemars(description = "Natural language search query")]
    pub query: String,
    /// Maximum number of results to return (default: 5)
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default)]
    pub k: Option<usize>,
}

fn default_collection() -> String {
    "All".to_string()
}

/// Parameters for dashboard_build tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BuildParams {
    /// Collection to rebuild: a workbook name or "All"
    #[schemars(description = "Workbook name, or \"All\" to rebuild the aggregate index")]
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Parameters for dashboard_get tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetParams {
    #[schemars(description = "Workbook the dashboard belongs to")]
    pub collection: String,
    #[schemars(description = "Dashboard id")]
    pub id: String,
}

/// Dashboard search MCP service
#[derive(Clone)]
pub struct DashboardService {
    root: PathBuf,
    config: Config,
    tool_router: ToolRouter<Self>,
}

impl DashboardService {
    pub fn new(root: PathBuf, config: Config) -> Self {
        Self {
            root,
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn get_engine(&self) -> Result<SearchEngine, McpError> {
        SearchEngine::open(&self.root, &self.config).map_err(to_mcp)
    }
}

fn parse_selector(name: &str) -> Result<CollectionSelector, McpError> {
    name.parse()
        .map_err(|e: dashsearch::core::selector::InvalidCollectionName| {
            McpError::invalid_params(e.to_string(), None)
        })
}

const MAX_K: usize = 100;

fn capped_k(requested: Option<usize>, default_k: usize) -> usize {
    requested.unwrap_or(default_k).min(MAX_K)
}

fn to_mcp(err: SearchError) -> McpError {
    let data = Some(serde_json::json!({ "code": err.code() }));
    match err {
        SearchError::InvalidArgument(_) | SearchError::InvalidName(_) => {
            McpError::invalid_params(err.to_string(), data)
        }
        SearchError::NotFound { .. } => McpError::resource_not_found(err.to_string(), data),
        _ => McpError::internal_error(err.to_string(), data),
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        McpError::internal_error(format!("JSON serialization failed: {}", e), None)
    })?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

#[tool_router]
impl DashboardService {
    /// Search dashboards using semantic similarity
    #[tool(description = "Search dashboards by meaning. Returns the closest dashboards (name, description, tags, KPIs) with their distance; smaller is closer.")]
    async fn dashboard_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let selector = parse_selector(&params.0.collection)?;
        // Cap k at 100; zero is rejected by the engine
        let k = capped_k(params.0.k, self.config.default_k);

        let engine = self.get_engine()?;
        let outcome = engine
            .search(&selector, &params.0.query, k)
            .map_err(to_mcp)?;

        json_result(&outcome)
    }

    /// List collections available for search
    #[tool(description = "List dashboard collections (workbooks plus \"All\") with record counts and index state.")]
    async fn dashboard_collections(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let collections: Vec<_> = engine
            .collections()
            .map_err(to_mcp)?
            .into_iter()
            .filter(|c| !c.orphaned)
            .collect();
        json_result(&collections)
    }

    /// Rebuild a collection index
    #[tool(description = "Rebuild the search index of one workbook, or of \"All\" from every workbook's current metadata.")]
    async fn dashboard_build(
        &self,
        params: Parameters<BuildParams>,
    ) -> Result<CallToolResult, McpError> {
        let selector = parse_selector(&params.0.collection)?;
        let mut engine = self.get_engine()?;
        let report = engine.rebuild(&selector, None).map_err(to_mcp)?;
        json_result(&report)
    }

    /// Get one dashboard record
    #[tool(description = "Get the full metadata of one dashboard by workbook and id.")]
    async fn dashboard_get(
        &self,
        params: Parameters<GetParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        match engine
            .get_record(&params.0.collection, &params.0.id)
            .map_err(to_mcp)?
        {
            Some(record) => json_result(&record),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                "Dashboard not found: {}/{}",
                params.0.collection, params.0.id
            ))])),
        }
    }

    /// Index status summary
    #[tool(description = "Get index status: embedder, metric, and per-collection record/index counts including stale and orphaned indexes.")]
    async fn dashboard_status(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let collections = engine.collections().map_err(to_mcp)?;
        let stale: Vec<&str> = collections
            .iter()
            .filter(|c| c.stale)
            .map(|c| c.collection.as_str())
            .collect();
        let orphaned: Vec<&str> = collections
            .iter()
            .filter(|c| c.orphaned)
            .map(|c| c.collection.as_str())
            .collect();

        json_result(&serde_json::json!({
            "embedder": engine.embedder().name(),
            "metric": self.config.metric.as_str(),
            "stale": stale,
            "orphaned": orphaned,
            "collections": collections,
        }))
    }
}

#[tool_handler]
impl ServerHandler for DashboardService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Dashboard search MCP server. Semantic search over dashboard metadata, per workbook or across all workbooks.".to_string()
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(root: PathBuf, config: Config) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = DashboardService::new(root, config);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_capped_k() {
        assert_eq!(capped_k(None, 5), 5);
        assert_eq!(capped_k(Some(7), 5), 7);
        assert_eq!(capped_k(Some(1000), 5), MAX_K);
        assert_eq!(capped_k(Some(0), 5), 0);
    }

    #[test]
    fn test_zero_k_is_invalid_params() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = SearchEngine::open(dir.path(), &Config::default()).unwrap();
        let err = engine
            .search(&CollectionSelector::All, "revenue", capped_k(Some(0), 5))
            .map_err(to_mcp)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_get_outside_metadata_dir_is_invalid_params() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = SearchEngine::open(dir.path(), &Config::default()).unwrap();
        let err = engine
            .get_record("../secret", "x")
            .map_err(to_mcp)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
