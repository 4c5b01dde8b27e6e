//! The Tool Executor (§4.6): one entry point, `execute`, that canonicalizes
//! the tool name, dispatches to the matching implementation, and logs the
//! call's name and argument *keys* — never values, since arguments routinely
//! carry customer names and phone numbers.

use chrono::Utc;
use serde_json::{json, Value};

use salon_core::types::StylistId;

use crate::context::ToolContext;
use crate::error::{Result, ToolError};
use crate::registry::{self, BOOK, CHECK_AVAILABILITY, ESCALATE_TO_HUMAN, FIND_NEXT_AVAILABLE, LIST_STYLISTS, MANAGE_CUSTOMER, QUERY_INFO, SEARCH_SERVICES};
use crate::tools;

fn arg_keys(args: &Value) -> Vec<&str> {
    args.as_object()
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

pub async fn execute(ctx: &ToolContext, name: &str, args: &Value) -> Result<Value> {
    let canonical = registry::canonicalize(name);
    tracing::info!(tool = canonical, arg_keys = ?arg_keys(args), "executing tool");

    let outcome = dispatch(ctx, canonical, args).await;

    match &outcome {
        Ok(_) => tracing::info!(tool = canonical, success = true, "tool call succeeded"),
        Err(e) => tracing::warn!(tool = canonical, success = false, error = %e, "tool call failed"),
    }
    outcome
}

async fn dispatch(ctx: &ToolContext, canonical: &str, args: &Value) -> Result<Value> {
    match canonical {
        SEARCH_SERVICES => tools::search_services::run(ctx, args).await,
        LIST_STYLISTS => tools::list_stylists::run(ctx, args).await,
        QUERY_INFO => tools::query_info::run(ctx, args).await,
        CHECK_AVAILABILITY => check_availability(ctx, args).await,
        FIND_NEXT_AVAILABLE => find_next_available(ctx, args).await,
        BOOK => tools::book::run(ctx, args).await,
        MANAGE_CUSTOMER => tools::manage_customer::run(ctx, args).await,
        ESCALATE_TO_HUMAN => tools::escalate::run(ctx, args).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

async fn resolve_stylist(ctx: &ToolContext, args: &Value) -> Result<(StylistId, String)> {
    let stylist_id_str = args
        .get("stylist_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("requires a \"stylist_id\" string".into()))?;
    let stylist_id = StylistId::from(stylist_id_str);
    let stylist = salon_db::stylists::get_by_id(&ctx.pool, &stylist_id)
        .await?
        .ok_or_else(|| ToolError::InvalidArgs(format!("unknown stylist_id: {stylist_id_str}")))?;
    Ok((stylist_id, stylist.calendar_id))
}

async fn check_availability(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let (stylist_id, calendar_id) = resolve_stylist(ctx, args).await?;
    let date_str = args
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs("check_availability requires a \"date\" string (YYYY-MM-DD)".into()))?;
    let date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ToolError::InvalidArgs(format!("bad date: {date_str}")))?;
    let duration_minutes = args
        .get("duration_minutes")
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidArgs("check_availability requires a \"duration_minutes\" integer".into()))?
        as i32;

    let slots = tools::availability::slots_for_day(
        ctx.calendar.as_ref(),
        &calendar_id,
        &stylist_id,
        ctx.validator.business_hours(),
        ctx.validator.timezone(),
        date,
        duration_minutes,
        Utc::now(),
    )
    .await?;

    Ok(json!({ "slots": slots.iter().map(|s| s.to_rfc3339()).collect::<Vec<_>>() }))
}

async fn find_next_available(ctx: &ToolContext, args: &Value) -> Result<Value> {
    let (stylist_id, calendar_id) = resolve_stylist(ctx, args).await?;
    let duration_minutes = args
        .get("duration_minutes")
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolError::InvalidArgs("find_next_available requires a \"duration_minutes\" integer".into()))?
        as i32;
    let max_days = args.get("max_days").and_then(Value::as_i64);
    let max_results = args
        .get("max_results")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(5);

    let now = Utc::now();
    let from_date = now.with_timezone(&ctx.validator.timezone()).date_naive();

    let slots = tools::availability::find_next_available(
        ctx.calendar.as_ref(),
        &calendar_id,
        &stylist_id,
        ctx.validator.business_hours(),
        ctx.validator.timezone(),
        from_date,
        duration_minutes,
        now,
        max_days,
        max_results,
    )
    .await?;

    Ok(json!({ "slots": slots.iter().map(|s| s.to_rfc3339()).collect::<Vec<_>>() }))
}
