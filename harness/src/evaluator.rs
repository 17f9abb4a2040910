//! Extracting and checking the result record a scenario script prints
//!
//! Every generated script ends by printing one line of the form
//! `Test Results: {...}` with all the metrics it recorded. The evaluator
//! pulls that JSON object out of the client output and compares it against
//! the values the harness expects.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{error, info};

/// Marker printed by the `testResults()` helper right before the JSON record
pub const RESULT_MARKER: &str = "Test Results: ";

/// Absolute tolerance used whenever either side of a comparison is a float
pub const FLOAT_TOLERANCE: f64 = 0.01;

/// Named metrics reported by a scenario script
pub type ResultMap = Map<String, Value>;

/// Turn a `json!({...})` literal into an expectation map.
///
/// Anything other than an object yields an empty map.
pub fn expect(value: Value) -> ResultMap {
    match value {
        Value::Object(map) => map,
        _ => ResultMap::new(),
    }
}

/// One expected value the client output did not confirm
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub key: String,
    pub expected: Value,
    /// `None` when the key was missing from the result record
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "'{}': expected {} but got {}",
                self.key, self.expected, actual
            ),
            None => write!(
                f,
                "'{}': expected {} but it was not reported",
                self.key, self.expected
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("scenario '{scenario}': no '{marker}' line in client output:\n{output}", marker = RESULT_MARKER)]
    MissingResults { scenario: String, output: String },

    #[error("scenario '{scenario}': {count} '{marker}' lines in client output, expected one:\n{output}", marker = RESULT_MARKER)]
    DuplicateResults {
        scenario: String,
        count: usize,
        output: String,
    },

    #[error("scenario '{scenario}': result record is not a JSON object ({reason}):\n{output}")]
    MalformedResults {
        scenario: String,
        reason: String,
        output: String,
    },

    #[error("scenario '{scenario}' failed {} check(s)", .mismatches.len())]
    Mismatches {
        scenario: String,
        mismatches: Vec<Mismatch>,
    },
}

/// Compare an expected value with the one the client reported.
///
/// Floats (on either side) are equal within [`FLOAT_TOLERANCE`], arrays are
/// equal element by element, everything else must match exactly.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) if e.is_f64() || a.is_f64() => {
            match (e.as_f64(), a.as_f64()) {
                (Some(e), Some(a)) => (e - a).abs() < FLOAT_TOLERANCE,
                _ => false,
            }
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| values_equal(e, a))
        }
        _ => expected == actual,
    }
}

/// Parses and checks scenario result records
pub struct OutcomeEvaluator {
    results_regex: Regex,
    verbose: bool,
}

impl OutcomeEvaluator {
    pub fn new(verbose: bool) -> Result<Self, regex::Error> {
        let pattern = format!(r"(?m){}(.*)$", regex::escape(RESULT_MARKER));
        Ok(Self {
            results_regex: Regex::new(&pattern)?,
            verbose,
        })
    }

    /// Pull the single result record out of the client output
    pub fn extract(&self, scenario: &str, output: &str) -> Result<ResultMap, EvaluationError> {
        let records: Vec<&str> = self
            .results_regex
            .captures_iter(output)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .collect();

        let record = match records.as_slice() {
            [] => {
                return Err(EvaluationError::MissingResults {
                    scenario: scenario.to_string(),
                    output: output.to_string(),
                })
            }
            [record] => *record,
            _ => {
                return Err(EvaluationError::DuplicateResults {
                    scenario: scenario.to_string(),
                    count: records.len(),
                    output: output.to_string(),
                })
            }
        };

        match serde_json::from_str::<Value>(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(EvaluationError::MalformedResults {
                scenario: scenario.to_string(),
                reason: format!("got {}", json_kind(&other)),
                output: output.to_string(),
            }),
            Err(e) => Err(EvaluationError::MalformedResults {
                scenario: scenario.to_string(),
                reason: e.to_string(),
                output: output.to_string(),
            }),
        }
    }

    /// Check every expected key against the actual record.
    ///
    /// All mismatches are collected and logged before failing.
    pub fn compare(
        &self,
        scenario: &str,
        actual: &ResultMap,
        expected: &ResultMap,
    ) -> Result<(), EvaluationError> {
        let mut mismatches = Vec::new();

        for (key, expected_value) in expected {
            match actual.get(key) {
                Some(actual_value) if values_equal(expected_value, actual_value) => {
                    if self.verbose {
                        info!("✓ [{}] '{}' = {}", scenario, key, actual_value);
                    }
                }
                actual_value => mismatches.push(Mismatch {
                    key: key.clone(),
                    expected: expected_value.clone(),
                    actual: actual_value.cloned(),
                }),
            }
        }

        if mismatches.is_empty() {
            return Ok(());
        }
        for mismatch in &mismatches {
            error!("✗ [{}] {}", scenario, mismatch);
        }
        Err(EvaluationError::Mismatches {
            scenario: scenario.to_string(),
            mismatches,
        })
    }

    /// Extract the result record from `output` and check it against
    /// `expected`. On success the whole record is returned so callers can
    /// pick up values that were not part of the expectations.
    pub fn evaluate(
        &self,
        scenario: &str,
        output: &str,
        expected: &ResultMap,
    ) -> Result<ResultMap, EvaluationError> {
        let actual = self.extract(scenario, output)?;
        self.compare(scenario, &actual, expected)?;
        info!("✅ Scenario '{}': {} check(s) passed", scenario, expected.len());
        Ok(actual)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_tolerance() {
        assert!(values_equal(&json!(1.0), &json!(1.009)));
        assert!(!values_equal(&json!(1.0), &json!(1.02)));
        assert!(values_equal(&json!(40.0), &json!(40)));
        assert!(values_equal(&json!(7), &json!(7.004)));
    }

    #[test]
    fn test_exact_comparison() {
        assert!(values_equal(&json!(3), &json!(3)));
        assert!(!values_equal(&json!(3), &json!(4)));
        assert!(values_equal(&json!(true), &json!(true)));
        assert!(!values_equal(&json!(true), &json!("true")));
        assert!(!values_equal(&json!(1), &json!(true)));
    }

    #[test]
    fn test_array_comparison() {
        assert!(values_equal(&json!([1, 2, 3]), &json!([1, 2, 3])));
        assert!(!values_equal(&json!([1, 2, 3]), &json!([1, 2])));
        assert!(values_equal(&json!([1.0, 2.5]), &json!([1.001, 2.5])));
        assert!(!values_equal(&json!([1, 2, 3]), &json!([1, 3, 2])));
    }

    #[test]
    fn test_extract_record() {
        let evaluator = OutcomeEvaluator::new(false).unwrap();
        let output = "unlocking accounts\n'a' = 1\nTest Results: {\"a\": 1, \"b\": [true]}\ntrue\n";
        let record = evaluator.extract("fund", output).unwrap();
        assert_eq!(record.get("a"), Some(&json!(1)));
        assert_eq!(record.get("b"), Some(&json!([true])));
    }

    #[test]
    fn test_extract_missing_marker() {
        let evaluator = OutcomeEvaluator::new(false).unwrap();
        let err = evaluator.extract("fund", "nothing here").unwrap_err();
        assert!(matches!(err, EvaluationError::MissingResults { .. }));
        assert!(err.to_string().contains("nothing here"));
    }

    #[test]
    fn test_extract_duplicate_marker() {
        let evaluator = OutcomeEvaluator::new(false).unwrap();
        let output = "Test Results: {}\nTest Results: {}\n";
        let err = evaluator.extract("fund", output).unwrap_err();
        assert!(matches!(err, EvaluationError::DuplicateResults { count: 2, .. }));
    }

    #[test]
    fn test_extract_malformed_json() {
        let evaluator = OutcomeEvaluator::new(false).unwrap();
        let err = evaluator
            .extract("fund", "Test Results: {\"a\": \n")
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MalformedResults { .. }));

        let err = evaluator.extract("fund", "Test Results: [1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_all_mismatches_collected() {
        let evaluator = OutcomeEvaluator::new(true).unwrap();
        let output = r#"Test Results: {"funded": false, "supply": 40, "share": 1.5, "extra": "x"}"#;
        let expected = expect(json!({
            "funded": true,
            "supply": 40,
            "share": 1.0,
            "balances": [1, 2],
        }));

        let err = evaluator.evaluate("fund", output, &expected).unwrap_err();
        let EvaluationError::Mismatches { mismatches, .. } = err else {
            panic!("expected mismatches, got {err:?}");
        };
        let keys: Vec<&str> = mismatches.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["balances", "funded", "share"]);
        assert_eq!(mismatches[0].actual, None);
        assert!(mismatches[0].to_string().contains("not reported"));
    }

    #[test]
    fn test_evaluate_returns_full_record() {
        let evaluator = OutcomeEvaluator::new(false).unwrap();
        let output = r#"Test Results: {"dao_address": "0xdao", "proposal_deposit": 22}"#;
        let expected = expect(json!({ "proposal_deposit": 22 }));

        let actual = evaluator.evaluate("deploy", output, &expected).unwrap();
        assert_eq!(actual.get("dao_address"), Some(&json!("0xdao")));
    }
}
