use serde_json::Value;

use crate::core::domain::TestCase;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Malformed test case JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Test cases must be a JSON array")]
    NotAnArray,
    #[error("Test case {index} is not an object")]
    NotAnObject { index: usize },
    #[error("Test case {index} is missing required field: {field}")]
    MissingField { index: usize, field: String },
}

pub fn test_cases_from_str(text: &str) -> Result<Vec<TestCase>, ConversionError> {
    let value: Value = serde_json::from_str(text)?;
    test_cases_from_json(&value)
}

/// Reads generated test cases, tolerating non-string `input`/`expected` values.
///
/// Strings are taken verbatim. Any other value is rendered as compact JSON, so
/// `42` becomes `"42"` and `[1, 2]` becomes `"[1,2]"`.
pub fn test_cases_from_json(value: &Value) -> Result<Vec<TestCase>, ConversionError> {
    let Value::Array(entries) = value else {
        return Err(ConversionError::NotAnArray);
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let Value::Object(fields) = entry else {
                return Err(ConversionError::NotAnObject { index });
            };
            let field = |name: &str| {
                fields
                    .get(name)
                    .map(render)
                    .ok_or_else(|| ConversionError::MissingField {
                        index,
                        field: name.to_string(),
                    })
            };
            Ok(TestCase {
                input: field("input")?,
                expected: field("expected")?,
            })
        })
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_fields_are_verbatim() {
        let cases = test_cases_from_str(r#"[{"input": "21", "expected": "42"}]"#).unwrap();
        assert_eq!(cases, vec![TestCase::new("21", "42")]);
    }

    #[test]
    fn test_other_values_are_rendered() {
        let cases = test_cases_from_json(&json!([
            {"input": [1, 2, 3], "expected": 6},
            {"input": {"a": true}, "expected": "ok", "explanation": "ignored"},
        ]))
        .unwrap();

        assert_eq!(cases[0], TestCase::new("[1,2,3]", "6"));
        assert_eq!(cases[1], TestCase::new(r#"{"a":true}"#, "ok"));
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            test_cases_from_json(&json!({"input": "1"})),
            Err(ConversionError::NotAnArray)
        ));
        assert!(matches!(
            test_cases_from_json(&json!(["1"])),
            Err(ConversionError::NotAnObject { index: 0 })
        ));
        match test_cases_from_json(&json!([{"input": "1", "expected": "1"}, {"input": "2"}])) {
            Err(ConversionError::MissingField { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "expected");
            }
            other => panic!("expected a missing field error, got {other:?}"),
        }
        assert!(matches!(
            test_cases_from_str("[{"),
            Err(ConversionError::Json(_))
        ));
    }
}
