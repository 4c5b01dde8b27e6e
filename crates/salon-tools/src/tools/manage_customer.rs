use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::error::{Result, ToolError};

/// `manage_customer` (§4.6): upsert-by-phone. Mutating, but safe for the
/// non-booking handler's LLM to call unprompted — it only ever touches the
/// customer record for the conversation's own phone number.
pub async fn run(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let phone = args
        .get("phone")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("manage_customer requires a \"phone\" string".into()))?;
    let first_name = args
        .get("first_name")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("manage_customer requires a \"first_name\" string".into()))?;
    let last_name = args.get("last_name").and_then(Value::as_str);

    let customer = salon_db::customers::upsert_by_phone(&ctx.pool, phone, first_name, last_name).await?;

    Ok(json!({ "customer": customer }))
}
