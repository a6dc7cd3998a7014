//! Raw seed values and exact SQL literal formatting.
//!
//! Seed rows arrive as JSON arrays; each scalar binds to a column and is
//! coerced through the column's on-disk data-type string into a
//! [`SeedValue`]. Formatting is invariant: the same value always renders
//! the same bytes, on every platform.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::EngineError;

/// A raw value destined for a seed script literal.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Decimal kept as its invariant source text (no float round-trip).
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SeedValue {
    /// Renders the exact SQL literal for this value.
    ///
    /// Strings are always Unicode-prefixed with doubled quotes, booleans
    /// normalize to `1`/`0`, binary renders `0x` + uppercase hex and is
    /// never truncated.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_owned(),
            Self::Bool(true) => "1".to_owned(),
            Self::Bool(false) => "0".to_owned(),
            Self::Int(n) => n.to_string(),
            Self::Decimal(s) => s.clone(),
            Self::Text(s) => format!("N'{}'", s.replace('\'', "''")),
            Self::Bytes(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                for b in bytes {
                    out.push_str(&format!("{b:02X}"));
                }
                out
            }
            Self::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }

    /// Returns `true` for [`SeedValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Coerces one JSON scalar into a [`SeedValue`] using the column's on-disk
/// SQL type string.
pub fn from_json(value: &serde_json::Value, data_type: &str) -> Result<SeedValue, EngineError> {
    use serde_json::Value;

    if value.is_null() {
        return Ok(SeedValue::Null);
    }

    let token = data_type
        .split('(')
        .next()
        .unwrap_or(data_type)
        .trim()
        .to_ascii_lowercase();

    match token.as_str() {
        "bit" => match value {
            Value::Bool(b) => Ok(SeedValue::Bool(*b)),
            Value::Number(n) => Ok(SeedValue::Bool(n.as_i64() == Some(1))),
            other => Err(coercion_error(other, data_type)),
        },
        "int" | "bigint" | "smallint" | "tinyint" => match value {
            Value::Number(n) => n
                .as_i64()
                .map(SeedValue::Int)
                .ok_or_else(|| coercion_error(value, data_type)),
            other => Err(coercion_error(other, data_type)),
        },
        "decimal" | "numeric" | "money" | "float" | "real" => match value {
            Value::Number(n) => Ok(SeedValue::Decimal(n.to_string())),
            other => Err(coercion_error(other, data_type)),
        },
        "binary" | "varbinary" | "image" => match value {
            Value::String(s) => {
                let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
                decode_hex(hex).map(SeedValue::Bytes).ok_or_else(|| {
                    EngineError::model_invariant(format!(
                        "seed value {s:?} is not valid hex for {data_type}"
                    ))
                })
            }
            other => Err(coercion_error(other, data_type)),
        },
        "date" => match value {
            Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(SeedValue::Date)
                .map_err(|_| coercion_error(value, data_type)),
            other => Err(coercion_error(other, data_type)),
        },
        "datetime" | "datetime2" | "smalldatetime" => match value {
            Value::String(s) => parse_datetime(s)
                .map(SeedValue::DateTime)
                .ok_or_else(|| coercion_error(value, data_type)),
            other => Err(coercion_error(other, data_type)),
        },
        _ => match value {
            Value::String(s) => Ok(SeedValue::Text(s.clone())),
            Value::Number(n) => Ok(n
                .as_i64()
                .map(SeedValue::Int)
                .unwrap_or_else(|| SeedValue::Decimal(n.to_string()))),
            Value::Bool(b) => Ok(SeedValue::Bool(*b)),
            other => Err(coercion_error(other, data_type)),
        },
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

fn coercion_error(value: &serde_json::Value, data_type: &str) -> EngineError {
    EngineError::model_invariant(format!(
        "seed value {value} is not representable as {data_type}"
    ))
}
