use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::{Result, ToolError};

/// `query_info` (§4.6): hours, FAQs, policies, and location, all stored as
/// policy rows. `key = "faq"` returns the whole FAQ corpus; any other key
/// looks up a single policy entry. Read-only.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let key = args
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("query_info requires a \"key\" string".into()))?;

    if key == "faq" || key == "faqs" {
        let faqs = salon_db::policies::list_faqs(&ctx.pool).await?;
        return Ok(json!({ "faqs": faqs }));
    }

    if key == "business_hours" || key == "hours" {
        let hours = salon_db::business_hours::list_all(&ctx.pool).await?;
        return Ok(json!({ "business_hours": hours }));
    }

    match salon_db::policies::get(&ctx.pool, key).await? {
        Some(policy) => Ok(json!({ "key": policy.key, "value": policy.value })),
        None => Ok(json!({ "key": key, "value": null })),
    }
}
