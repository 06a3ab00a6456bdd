//! Conversions between DynamoDB attribute values and JSON.
//!
//! The table stores numbers as exact decimal text; these helpers render floats
//! into that form before writes and decode whole attribute trees back to JSON
//! with float leaves before responses are serialized.

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;
use std::collections::HashMap;

/// Render a float as the decimal text stored in a number attribute.
///
/// `Display` for f64 emits the shortest digit string that parses back to the
/// same float, so the table never sees binary artifacts like
/// `49.990000000000002`.
pub fn to_decimal_string(value: f64) -> String {
    value.to_string()
}

/// Decode a full table record into a JSON object.
pub fn attrs_to_json(attrs: &HashMap<String, AttributeValue>) -> Value {
    Value::Object(
        attrs
            .iter()
            .map(|(key, attr)| (key.clone(), attr_to_json(attr)))
            .collect(),
    )
}

/// Decode a single attribute value, recursing through maps and lists so that
/// every number leaf becomes a float regardless of nesting depth.
pub fn attr_to_json(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => number_to_json(number),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attr_to_json).collect()),
        AttributeValue::M(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, attr)| (key.clone(), attr_to_json(attr)))
                .collect(),
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(items) => {
            Value::Array(items.iter().map(|number| number_to_json(number)).collect())
        }
        _ => Value::Null,
    }
}

fn number_to_json(number: &str) -> Value {
    number
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decimal_text_round_trips_to_the_same_float() {
        for value in [0.0, 0.1, 49.99, 123456.789, -2.5, 1e-9] {
            let decoded = attr_to_json(&AttributeValue::N(to_decimal_string(value)));
            assert_eq!(decoded.as_f64(), Some(value));
        }
    }

    #[test]
    fn decimal_text_has_no_binary_artifacts() {
        assert_eq!(to_decimal_string(49.99), "49.99");
        assert_eq!(to_decimal_string(0.1), "0.1");
    }

    #[test]
    fn nested_trees_convert_every_number_leaf() {
        let attr = AttributeValue::M(HashMap::from([
            (
                "tags".to_string(),
                AttributeValue::L(vec![
                    AttributeValue::N("1.5".into()),
                    AttributeValue::S("red".into()),
                    AttributeValue::M(HashMap::from([(
                        "depth".to_string(),
                        AttributeValue::L(vec![AttributeValue::N("2.25".into())]),
                    )])),
                ]),
            ),
            ("active".to_string(), AttributeValue::Bool(true)),
            ("gone".to_string(), AttributeValue::Null(true)),
        ]));

        assert_eq!(
            attr_to_json(&attr),
            json!({
                "tags": [1.5, "red", { "depth": [2.25] }],
                "active": true,
                "gone": null,
            })
        );
    }

    #[test]
    fn non_decimal_leaves_are_unchanged() {
        let attrs = HashMap::from([
            ("name".to_string(), AttributeValue::S("chair".into())),
            ("price".to_string(), AttributeValue::N("49.99".into())),
        ]);
        assert_eq!(
            attrs_to_json(&attrs),
            json!({ "name": "chair", "price": 49.99 })
        );
    }

    #[test]
    fn number_sets_become_float_arrays() {
        let attr = AttributeValue::Ns(vec!["1".into(), "2.5".into()]);
        assert_eq!(attr_to_json(&attr), json!([1.0, 2.5]));
    }
}
