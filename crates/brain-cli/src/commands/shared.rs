use std::str::FromStr;

use anyhow::Context;
use brain_core::events::ChangeEvent;
use brain_core::entities::Entity;
use chrono::NaiveDate;
use serde_json::{Value, json};

/// Parse a value with `FromStr`, naming the argument on failure.
pub fn parse_enum<T>(value: &str, field: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|error| anyhow::anyhow!("invalid --{field} '{value}': {error}"))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str, field: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid --{field} '{value}' (expected YYYY-MM-DD)"))
}

/// Optional variant of [`parse_date`].
pub fn parse_optional_date(value: Option<&str>, field: &str) -> anyhow::Result<Option<NaiveDate>> {
    value.map(|v| parse_date(v, field)).transpose()
}

/// Split `key=value`.
pub fn parse_assignment(value: &str) -> anyhow::Result<(String, String)> {
    let (key, val) = value
        .split_once('=')
        .with_context(|| format!("invalid assignment '{value}' (expected key=value)"))?;
    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "invalid assignment '{value}': empty key");
    Ok((key.to_string(), val.trim().to_string()))
}

/// Response printed after a mutation.
pub fn mutation_response(entity: &Entity, event: Option<&ChangeEvent>) -> Value {
    json!({
        "id": entity.id,
        "version": entity.version,
        "changed": event.is_some(),
        "event": event,
    })
}
