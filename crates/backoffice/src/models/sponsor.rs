//! Sponsor tier normalization.
//!
//! Tiers are edited by hand in the database, so numeric fields show up as
//! strings, floats or integers. The public endpoint always answers integers.

use serde_json::{Map, Value};

/// Fields of a sponsor tier that the public site expects as integers.
const INTEGER_FIELDS: [&str; 3] = ["amount_cfa", "amount_usd", "availability"];

/// Coerce the numeric fields of a tier document to integers.
///
/// Fractional values are truncated toward zero. Values that cannot be read as
/// a number are left untouched.
#[must_use]
pub fn normalize_tier(mut tier: Value) -> Value {
    if let Value::Object(fields) = &mut tier {
        for name in INTEGER_FIELDS {
            normalize_field(fields, name);
        }
    }
    tier
}

fn normalize_field(fields: &mut Map<String, Value>, name: &str) {
    let Some(value) = fields.get_mut(name) else {
        return;
    };
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(truncate))
        }
        _ => None,
    };
    if let Some(number) = number {
        *value = Value::from(number);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_mixed_representations() {
        let tier = normalize_tier(json!({
            "title": "Gold",
            "amount_cfa": "1500000",
            "amount_usd": "2500.75",
            "availability": 3.0,
        }));
        assert_eq!(
            tier,
            json!({
                "title": "Gold",
                "amount_cfa": 1_500_000,
                "amount_usd": 2500,
                "availability": 3,
            })
        );
    }

    #[test]
    fn test_unparseable_left_alone() {
        let tier = normalize_tier(json!({"amount_usd": "on request", "availability": null}));
        assert_eq!(tier, json!({"amount_usd": "on request", "availability": null}));
    }
}
