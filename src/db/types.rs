//! SQL Server type mappings.
//!
//! This module converts TDS column values into JSON values and derives the
//! record keys for a result set.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies a column value into a logical category
//! 2. `column_to_json` performs the actual value extraction
//!
//! SQL NULL always becomes `JsonValue::Null`, whatever the declared type.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use tiberius::numeric::Numeric;
use tiberius::{ColumnData, FromSql, Row};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for SQL Server column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Uuid,
    Temporal,
}

/// Classify a TDS value into a logical category.
pub fn categorize(data: &ColumnData<'_>) -> TypeCategory {
    match data {
        ColumnData::U8(_) | ColumnData::I16(_) | ColumnData::I32(_) | ColumnData::I64(_) => {
            TypeCategory::Integer
        }
        ColumnData::F32(_) | ColumnData::F64(_) => TypeCategory::Float,
        ColumnData::Numeric(_) => TypeCategory::Decimal,
        ColumnData::Bit(_) => TypeCategory::Boolean,
        ColumnData::String(_) | ColumnData::Xml(_) => TypeCategory::Text,
        ColumnData::Binary(_) => TypeCategory::Binary,
        ColumnData::Guid(_) => TypeCategory::Uuid,
        ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::Time(_)
        | ColumnData::Date(_)
        | ColumnData::DateTime2(_)
        | ColumnData::DateTimeOffset(_) => TypeCategory::Temporal,
    }
}

// =============================================================================
// Value Conversion
// =============================================================================

/// Convert a single TDS value into JSON.
///
/// Numbers stay numbers, DECIMAL/NUMERIC keep their exact digits and scale,
/// binary data is base64 encoded and temporal values use ISO-8601.
pub fn column_to_json(data: &ColumnData<'static>) -> JsonValue {
    match categorize(data) {
        TypeCategory::Integer => integer_to_json(data),
        TypeCategory::Float => float_to_json(data),
        TypeCategory::Boolean => match data {
            ColumnData::Bit(Some(b)) => JsonValue::Bool(*b),
            _ => JsonValue::Null,
        },
        TypeCategory::Decimal => match data {
            ColumnData::Numeric(Some(n)) => numeric_to_json(*n),
            _ => JsonValue::Null,
        },
        TypeCategory::Text => match data {
            ColumnData::String(Some(s)) => JsonValue::String(s.to_string()),
            ColumnData::Xml(Some(xml)) => {
                JsonValue::String(xml.clone().into_owned().into_string())
            }
            _ => JsonValue::Null,
        },
        TypeCategory::Binary => match data {
            ColumnData::Binary(Some(bytes)) => JsonValue::String(STANDARD.encode(bytes)),
            _ => JsonValue::Null,
        },
        TypeCategory::Uuid => match data {
            ColumnData::Guid(Some(guid)) => JsonValue::String(guid.to_string()),
            _ => JsonValue::Null,
        },
        TypeCategory::Temporal => temporal_to_json(data),
    }
}

fn integer_to_json(data: &ColumnData<'static>) -> JsonValue {
    match data {
        ColumnData::U8(Some(v)) => JsonValue::from(*v),
        ColumnData::I16(Some(v)) => JsonValue::from(*v),
        ColumnData::I32(Some(v)) => JsonValue::from(*v),
        ColumnData::I64(Some(v)) => JsonValue::from(*v),
        _ => JsonValue::Null,
    }
}

fn float_to_json(data: &ColumnData<'static>) -> JsonValue {
    let value = match data {
        // Widening an f32 directly would surface its binary error (0.1 -> 0.10000000149011612)
        ColumnData::F32(Some(v)) => v.to_string().parse::<f64>().unwrap_or(f64::from(*v)),
        ColumnData::F64(Some(v)) => *v,
        _ => return JsonValue::Null,
    };
    // JSON has no representation for NaN or infinity
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Exact decimal text for a NUMERIC, e.g. `12.50`, `-0.05` or `42`.
pub fn numeric_text(n: Numeric) -> String {
    let scale = n.scale() as u32;
    let magnitude = n.value().unsigned_abs();
    let sign = if n.value() < 0 { "-" } else { "" };
    if scale == 0 {
        return format!("{}{}", sign, magnitude);
    }
    let divisor = 10u128.pow(scale);
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / divisor,
        magnitude % divisor,
        width = scale as usize
    )
}

// Requires serde_json's `arbitrary_precision` so the digits are kept verbatim
fn numeric_to_json(n: Numeric) -> JsonValue {
    let text = numeric_text(n);
    match text.parse::<serde_json::Number>() {
        Ok(number) => JsonValue::Number(number),
        Err(_) => JsonValue::String(text),
    }
}

fn temporal_to_json(data: &ColumnData<'static>) -> JsonValue {
    let text = match data {
        ColumnData::Date(_) => NaiveDate::from_sql(data)
            .ok()
            .flatten()
            .map(|d| d.format("%Y-%m-%d").to_string()),
        ColumnData::Time(_) => NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(|t| t.format("%H:%M:%S%.f").to_string()),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)
            .ok()
            .flatten()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        _ => NaiveDateTime::from_sql(data)
            .ok()
            .flatten()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
    };
    text.map(JsonValue::String).unwrap_or(JsonValue::Null)
}

/// Convert a row into JSON values, in column order.
pub fn row_values(row: Row) -> Vec<JsonValue> {
    row.into_iter().map(|data| column_to_json(&data)).collect()
}

// =============================================================================
// Column Naming
// =============================================================================

/// Derive unique record keys from the driver-reported column names.
///
/// An unnamed column becomes `Column1`, `Column2`, ... and a repeated name `x`
/// becomes `x1`, `x2`, ..., skipping candidates that are already taken.
pub fn unique_column_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = names.into_iter().collect();
    let mut taken: HashSet<String> = names
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| n.to_lowercase())
        .collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(names.len());

    for name in names {
        let lower = name.to_lowercase();
        if !name.is_empty() && seen.insert(lower) {
            result.push(name.to_string());
            continue;
        }

        let base = if name.is_empty() { "Column" } else { name };
        let mut suffix = 1;
        let candidate = loop {
            let candidate = format!("{}{}", base, suffix);
            if !taken.contains(&candidate.to_lowercase()) {
                break candidate;
            }
            suffix += 1;
        };
        taken.insert(candidate.to_lowercase());
        seen.insert(candidate.to_lowercase());
        result.push(candidate);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_null_of_every_category_is_json_null() {
        let nulls = [
            ColumnData::I32(None),
            ColumnData::F64(None),
            ColumnData::Bit(None),
            ColumnData::String(None),
            ColumnData::Binary(None),
            ColumnData::Guid(None),
            ColumnData::Numeric(None),
            ColumnData::DateTime2(None),
        ];
        for data in &nulls {
            assert_eq!(column_to_json(data), JsonValue::Null, "{:?}", data);
        }
    }

    #[test]
    fn test_integers() {
        assert_eq!(column_to_json(&ColumnData::U8(Some(7))), JsonValue::from(7));
        assert_eq!(column_to_json(&ColumnData::I16(Some(-3))), JsonValue::from(-3));
        assert_eq!(column_to_json(&ColumnData::I32(Some(1))), JsonValue::from(1));
        assert_eq!(
            column_to_json(&ColumnData::I64(Some(9_007_199_254_740_993))),
            JsonValue::from(9_007_199_254_740_993_i64)
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(column_to_json(&ColumnData::F64(Some(1.5))), JsonValue::from(1.5));
        assert_eq!(column_to_json(&ColumnData::F32(Some(0.25))), JsonValue::from(0.25));
        assert_eq!(column_to_json(&ColumnData::F64(Some(f64::NAN))), JsonValue::Null);
    }

    #[test]
    fn test_real_keeps_shortest_form() {
        let value = column_to_json(&ColumnData::F32(Some(0.1)));
        assert_eq!(value, JsonValue::from(0.1));
        assert_eq!(value.to_string(), "0.1");
        assert_eq!(column_to_json(&ColumnData::F32(Some(-2.7))).to_string(), "-2.7");
    }

    #[test]
    fn test_numeric_is_exact_number() {
        let value = column_to_json(&ColumnData::Numeric(Some(Numeric::new_with_scale(1250, 2))));
        assert!(value.is_number());
        assert_eq!(value.to_string(), "12.50");
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(numeric_text(Numeric::new_with_scale(1250, 2)), "12.50");
        assert_eq!(numeric_text(Numeric::new_with_scale(-1250, 2)), "-12.50");
        assert_eq!(numeric_text(Numeric::new_with_scale(-5, 2)), "-0.05");
        assert_eq!(numeric_text(Numeric::new_with_scale(42, 0)), "42");
        assert_eq!(numeric_text(Numeric::new_with_scale(7, 3)), "0.007");
        assert_eq!(
            numeric_text(Numeric::new_with_scale(12345678901234567890123456789, 10)),
            "1234567890123456789.0123456789"
        );
    }

    #[test]
    fn test_numeric_in_pretty_output() {
        let record = serde_json::json!({
            "d": column_to_json(&ColumnData::Numeric(Some(Numeric::new_with_scale(1250, 2))))
        });
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"d":12.50}"#
        );
    }

    #[test]
    fn test_bit_and_text() {
        assert_eq!(column_to_json(&ColumnData::Bit(Some(true))), JsonValue::Bool(true));
        assert_eq!(
            column_to_json(&ColumnData::String(Some(Cow::from("héllo")))),
            JsonValue::String("héllo".to_string())
        );
    }

    #[test]
    fn test_empty_string_is_not_null() {
        assert_eq!(
            column_to_json(&ColumnData::String(Some(Cow::from("")))),
            JsonValue::String(String::new())
        );
    }

    #[test]
    fn test_binary_is_base64() {
        let data = ColumnData::Binary(Some(Cow::from(vec![0xde, 0xad, 0xbe, 0xef])));
        assert_eq!(column_to_json(&data), JsonValue::String("3q2+7w==".to_string()));
    }

    #[test]
    fn test_categories() {
        assert_eq!(categorize(&ColumnData::I64(None)), TypeCategory::Integer);
        assert_eq!(categorize(&ColumnData::Numeric(None)), TypeCategory::Decimal);
        assert_eq!(categorize(&ColumnData::Date(None)), TypeCategory::Temporal);
        assert_eq!(categorize(&ColumnData::Guid(None)), TypeCategory::Uuid);
    }

    #[test]
    fn test_unique_names_passthrough() {
        assert_eq!(unique_column_names(["id", "name"]), vec!["id", "name"]);
    }

    #[test]
    fn test_unique_names_unnamed_columns() {
        assert_eq!(
            unique_column_names(["", "x", ""]),
            vec!["Column1", "x", "Column2"]
        );
    }

    #[test]
    fn test_unique_names_duplicates() {
        assert_eq!(unique_column_names(["x", "x", "x"]), vec!["x", "x1", "x2"]);
    }

    #[test]
    fn test_unique_names_skips_taken_candidates() {
        assert_eq!(unique_column_names(["x", "x1", "x"]), vec!["x", "x1", "x2"]);
        assert_eq!(
            unique_column_names(["Column1", ""]),
            vec!["Column1", "Column2"]
        );
    }

    #[test]
    fn test_unique_names_case_insensitive() {
        assert_eq!(unique_column_names(["Id", "ID"]), vec!["Id", "ID1"]);
    }
}
