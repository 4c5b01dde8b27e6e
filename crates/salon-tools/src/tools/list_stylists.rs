use std::str::FromStr;

use serde_json::{json, Value};

use salon_core::domain::ServiceCategory;

use crate::context::ToolContext;
use crate::error::{Result, ToolError};

/// `list_stylists` (§4.6): active stylists able to perform a category,
/// served from the stylist-context cache. Read-only.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let category_str = args
        .get("category")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("list_stylists requires a \"category\" string".into()))?;
    let category = ServiceCategory::from_str(category_str)
        .map_err(|_| ToolError::InvalidArgs(format!("unknown category: {category_str}")))?;

    let stylists = ctx.stylist_cache.get_or_refresh(&ctx.pool, category).await?;

    Ok(json!({ "stylists": stylists }))
}
