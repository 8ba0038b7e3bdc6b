//! Literal rendering for the Meilisearch filter grammar.
//!
//! Every caller-provided value that ends up in a filter expression goes
//! through one of these functions.

use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat};
use serde_json::Number;

/// Render a string as a double-quoted literal.
///
/// Meilisearch's filter parser lets a backslash consume the following
/// character and only unescapes `\"`. Values that cannot survive that rule
/// (a backslash right before a quote, or an odd run of trailing backslashes)
/// are rejected instead of being silently altered.
pub fn render_string(field: &str, value: &str) -> Result<String> {
    let escaped = value.replace('"', "\\\"");

    if !parses_as_single_literal(&escaped) {
        return Err(AppError::InvalidFilter {
            field: field.to_string(),
            message: format!(
                "string value {:?} cannot be quoted unambiguously (backslash before a quote or at the end)",
                value
            ),
        });
    }

    Ok(format!("\"{}\"", escaped))
}

/// Render a number in canonical form
pub fn render_number(value: &Number) -> String {
    value.to_string()
}

/// Render a boolean literal
pub fn render_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Convert a UNIX timestamp in seconds to an RFC 3339 UTC string.
///
/// Returns `None` when the number is outside chrono's representable range.
pub fn epoch_seconds_to_rfc3339(value: &Number) -> Option<String> {
    let datetime = if let Some(secs) = value.as_i64() {
        DateTime::from_timestamp(secs, 0)?
    } else {
        let secs = value.as_f64()?;
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
        if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))?
    };

    Some(datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Walks the quoted body the way the backend parser does and checks that no
/// unescaped quote terminates it early and no trailing backslash swallows the
/// closing quote.
fn parses_as_single_literal(body: &str) -> bool {
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return false,
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}
