use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::{Result, ToolError};

const DEFAULT_MAX_RESULTS: usize = 5;

/// `search_services` (§4.6): fuzzy top-N catalog lookup. Read-only.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("search_services requires a \"query\" string".into()))?;
    let max_results = args
        .get("max_results")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_MAX_RESULTS);

    let services = salon_db::services::list_active(&ctx.pool).await?;
    let matches = salon_resolve::search(query, &services, max_results);

    Ok(json!({ "results": matches }))
}
