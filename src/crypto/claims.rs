//! Registered-claim handling and token time utilities.

use crate::error::{JwtError, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const MINUTE: f64 = 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

/// Parse a relative time span such as `"2h"`, `"30 minutes"` or `"-5s"` into seconds.
pub fn parse_time_span(span: &str) -> Result<i64> {
    let invalid = || JwtError::Input(format!("invalid time span '{span}'"));
    let trimmed = span.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(invalid)?;
    let (number, unit) = rest.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let unit_seconds = match unit.trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return Err(invalid()),
    };
    let seconds = (sign * value * unit_seconds).round();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if !seconds.is_finite() || seconds >= i64::MAX as f64 || seconds < i64::MIN as f64 {
        return Err(JwtError::Input(format!("time span '{span}' is out of range")));
    }
    Ok(seconds as i64)
}

pub(crate) fn out_of_range(name: &str) -> JwtError {
    JwtError::Input(format!("'{name}' is out of range"))
}

/// Resolve a time claim to POSIX seconds
///
/// Numbers are truncated to whole seconds; strings are spans relative to `now`.
fn time_claim(name: &str, value: &Value, now: i64) -> Result<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .map(f64::floor)
                    .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| out_of_range(name)),
        Value::String(span) => now
            .checked_add(parse_time_span(span)?)
            .ok_or_else(|| out_of_range(name)),
        _ => Err(JwtError::Input(format!(
            "'{name}' must be a number of seconds or a time span"
        ))),
    }
}

/// Normalize the registered claims of a payload before signing
///
/// `exp`, `nbf` and `iat` become integer seconds, `iss`/`sub`/`jti` must be
/// strings and `aud` a string or an array of strings. Other claims are kept
/// as they are.
pub fn normalize_claims(payload: &Map<String, Value>, now: i64) -> Result<Map<String, Value>> {
    let mut claims = payload.clone();
    for name in ["exp", "nbf", "iat"] {
        if let Some(value) = payload.get(name) {
            claims.insert(name.to_string(), Value::from(time_claim(name, value, now)?));
        }
    }
    for name in ["iss", "sub", "jti"] {
        match payload.get(name) {
            None | Some(Value::String(_)) => {}
            Some(_) => return Err(JwtError::Input(format!("'{name}' must be a string"))),
        }
    }
    match payload.get("aud") {
        None | Some(Value::String(_)) => {}
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
        Some(_) => {
            return Err(JwtError::Input(
                "'aud' must be a string or an array of strings".to_string(),
            ));
        }
    }
    Ok(claims)
}

/// Whether an `exp` timestamp (POSIX seconds) has passed
///
/// # Example
/// ```rust
/// use jwt_keytool::is_token_expired;
///
/// let now = chrono::Utc::now().timestamp();
/// assert!(is_token_expired(now - 1));
/// assert!(!is_token_expired(now + 3600));
/// ```
pub fn is_token_expired(exp: i64) -> bool {
    now() > exp
}

/// Render POSIX seconds as `YYYY-MM-DD HH:MM:SS UTC` for display.
pub fn format_timestamp(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Invalid timestamp".to_string(),
    }
}

pub(crate) fn claim_i64(claims: &Map<String, Value>, name: &str) -> Result<Option<i64>> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.floor() as i64))
            .map(Some)
            .ok_or_else(|| JwtError::Claim(format!("'{name}' must be a number"))),
    }
}
