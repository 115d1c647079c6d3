//! Tool argument validation against a JSON-Schema-shaped contract.
//!
//! Tools declare the subset of JSON Schema this module understands: the
//! `object`/`array`/`string`/`number`/`integer`/`boolean` type names,
//! `required`, `enum`, `minimum`/`maximum` and `pattern`. Unknown schema
//! keywords and undeclared argument keys are ignored, and every violation is
//! collected rather than stopping at the first.
//!
//! When coercion is enabled, string arguments are nudged toward the declared
//! scalar type before the checks run. A failed parse leaves the original
//! string in place so the type check reports it.

use regex::Regex;
use serde_json::{Map, Value};

/// Outcome of validating one set of tool arguments.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Violations as `"<field>: <reason>"` strings, in check order.
    pub errors: Vec<String>,
    /// The arguments after coercion, valid or not.
    pub args: Map<String, Value>,
}

impl ValidationReport {
    /// Whether the arguments passed every check.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates `args` against a tool schema.
///
/// The schema may be a full tool schema carrying an `inputSchema` key or a
/// bare schema object. Anything else validates trivially and passes the
/// arguments through untouched.
///
/// Check order: missing `required` fields first, then type, `enum`,
/// `minimum`/`maximum` and `pattern` for each declared property that is
/// present.
#[must_use]
pub fn validate_arguments(
    args: &Map<String, Value>,
    schema: &Value,
    coerce: bool,
) -> ValidationReport {
    let Some(schema) = effective_schema(schema) else {
        return ValidationReport {
            errors: Vec::new(),
            args: args.clone(),
        };
    };

    let properties = schema.get("properties").and_then(Value::as_object);

    let mut out = args.clone();
    if coerce {
        if let Some(props) = properties {
            for (name, prop) in props {
                let declared = prop.get("type").and_then(Value::as_str);
                let coerced = out.get(name).map(|raw| coerce_value(raw, declared));
                if let Some(value) = coerced {
                    out.insert(name.clone(), value);
                }
            }
        }
    }

    let mut errors = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !out.contains_key(field) {
                errors.push(format!("{field}: required field is missing"));
            }
        }
    }

    if let Some(props) = properties {
        for (name, prop) in props {
            if let Some(value) = out.get(name) {
                check_property(name, value, prop, &mut errors);
            }
        }
    }

    ValidationReport { errors, args: out }
}

/// Resolves the schema object the checks run against.
///
/// A full tool schema nests the contract under `inputSchema`; a bare schema
/// is the contract itself. Returns `None` when neither shape applies.
fn effective_schema(schema: &Value) -> Option<&Map<String, Value>> {
    let obj = schema.as_object()?;
    match obj.get("inputSchema") {
        Some(inner) => inner.as_object(),
        None => Some(obj),
    }
}

/// Converts a string value toward the declared scalar type.
///
/// Only string inputs are touched. Unparseable strings come back unchanged.
fn coerce_value(raw: &Value, declared: Option<&str>) -> Value {
    let Value::String(text) = raw else {
        return raw.clone();
    };

    match declared {
        Some("integer") => text
            .parse::<i64>()
            .map_or_else(|_| raw.clone(), Value::from),
        Some("number") => text
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map_or_else(|| raw.clone(), Value::from),
        Some("boolean") => match text.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => raw.clone(),
        },
        _ => raw.clone(),
    }
}

fn check_property(name: &str, value: &Value, prop: &Value, errors: &mut Vec<String>) {
    let Some(prop) = prop.as_object() else {
        return;
    };

    if let Some(expected) = prop.get("type").and_then(Value::as_str) {
        if !type_matches(value, expected) {
            errors.push(format!(
                "{name}: expected {expected}, got {}",
                type_name(value)
            ));
        }
    }

    if let Some(allowed) = prop.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            errors.push(format!("{name}: value is not one of the allowed options"));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(minimum) = prop.get("minimum").and_then(Value::as_f64) {
            if number < minimum {
                errors.push(format!("{name}: value {number} is below minimum {minimum}"));
            }
        }
        if let Some(maximum) = prop.get("maximum").and_then(Value::as_f64) {
            if number > maximum {
                errors.push(format!("{name}: value {number} is above maximum {maximum}"));
            }
        }
    }

    if let (Some(pattern), Some(text)) = (
        prop.get("pattern").and_then(Value::as_str),
        value.as_str(),
    ) {
        // Search semantics: the pattern may match anywhere in the string.
        // Schemas with an invalid pattern skip the check rather than failing
        // the caller's arguments.
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(text) {
                errors.push(format!("{name}: value does not match pattern {pattern}"));
            }
        }
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unknown type names are not enforced.
        _ => true,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn no_schema_passes_everything_through() {
        let input = args(json!({ "anything": [1, 2, 3] }));
        let report = validate_arguments(&input, &Value::Null, true);
        assert!(report.is_valid());
        assert_eq!(report.args, input);
    }

    #[test]
    fn accepts_full_and_bare_schemas() {
        let bare = json!({
            "type": "object",
            "properties": { "n": { "type": "integer" } },
            "required": ["n"]
        });
        let full = json!({ "inputSchema": bare.clone() });

        let input = args(json!({}));
        assert!(!validate_arguments(&input, &bare, false).is_valid());
        assert!(!validate_arguments(&input, &full, false).is_valid());
    }

    #[test]
    fn required_field_message_is_stable() {
        let schema = json!({ "required": ["path"] });
        let report = validate_arguments(&args(json!({})), &schema, false);
        assert_eq!(report.errors, vec!["path: required field is missing"]);
    }

    #[test]
    fn required_errors_come_before_type_errors() {
        let schema = json!({
            "properties": { "count": { "type": "integer" } },
            "required": ["path"]
        });
        let report = validate_arguments(&args(json!({ "count": "x" })), &schema, false);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("path:"));
        assert!(report.errors[1].starts_with("count:"));
    }

    #[test]
    fn coerces_strings_to_declared_scalars() {
        let schema = json!({
            "properties": {
                "count": { "type": "integer" },
                "ratio": { "type": "number" },
                "active": { "type": "boolean" }
            }
        });
        let report = validate_arguments(
            &args(json!({ "count": "42", "ratio": "0.5", "active": "YES" })),
            &schema,
            true,
        );

        assert!(report.is_valid());
        assert_eq!(report.args["count"], json!(42));
        assert_eq!(report.args["ratio"], json!(0.5));
        assert_eq!(report.args["active"], json!(true));
    }

    #[test]
    fn boolean_words_map_both_ways() {
        let schema = json!({ "properties": { "flag": { "type": "boolean" } } });
        for (word, expected) in [
            ("true", true),
            ("1", true),
            ("yes", true),
            ("on", true),
            ("false", false),
            ("0", false),
            ("no", false),
            ("OFF", false),
        ] {
            let report = validate_arguments(&args(json!({ "flag": word })), &schema, true);
            assert!(report.is_valid(), "word {word:?} should coerce");
            assert_eq!(report.args["flag"], json!(expected), "word {word:?}");
        }
    }

    #[test]
    fn failed_coercion_leaves_string_for_type_check() {
        let schema = json!({ "properties": { "count": { "type": "integer" } } });
        let report = validate_arguments(&args(json!({ "count": "many" })), &schema, true);

        assert!(!report.is_valid());
        assert_eq!(report.args["count"], json!("many"));
        assert_eq!(report.errors, vec!["count: expected integer, got string"]);
    }

    #[test]
    fn coercion_off_leaves_strings_alone() {
        let schema = json!({ "properties": { "count": { "type": "integer" } } });
        let report = validate_arguments(&args(json!({ "count": "42" })), &schema, false);

        assert!(!report.is_valid());
        assert_eq!(report.args["count"], json!("42"));
    }

    #[test]
    fn non_string_values_are_never_coerced() {
        let schema = json!({ "properties": { "flag": { "type": "boolean" } } });
        let report = validate_arguments(&args(json!({ "flag": 1 })), &schema, true);

        assert!(!report.is_valid());
        assert_eq!(report.args["flag"], json!(1));
    }

    #[test]
    fn enum_membership_checked() {
        let schema = json!({
            "properties": { "mode": { "type": "string", "enum": ["fast", "safe"] } }
        });

        assert!(validate_arguments(&args(json!({ "mode": "fast" })), &schema, false).is_valid());

        let report = validate_arguments(&args(json!({ "mode": "slow" })), &schema, false);
        assert_eq!(
            report.errors,
            vec!["mode: value is not one of the allowed options"]
        );
    }

    #[test]
    fn numeric_bounds_checked() {
        let schema = json!({
            "properties": { "count": { "type": "integer", "minimum": 1, "maximum": 10 } }
        });

        assert!(validate_arguments(&args(json!({ "count": 5 })), &schema, false).is_valid());
        assert!(!validate_arguments(&args(json!({ "count": 0 })), &schema, false).is_valid());
        assert!(!validate_arguments(&args(json!({ "count": 11 })), &schema, false).is_valid());
    }

    #[test]
    fn pattern_uses_search_not_full_match() {
        let schema = json!({
            "properties": { "name": { "type": "string", "pattern": "b.d" } }
        });

        // "b.d" occurs inside the value; a full match would reject this.
        assert!(validate_arguments(&args(json!({ "name": "abode bud" })), &schema, false)
            .errors
            .is_empty());
        assert!(!validate_arguments(&args(json!({ "name": "nothing" })), &schema, false).is_valid());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let schema = json!({
            "properties": { "known": { "type": "string" } }
        });
        let report = validate_arguments(
            &args(json!({ "known": "yes", "extra": 99 })),
            &schema,
            false,
        );
        assert!(report.is_valid());
        assert_eq!(report.args["extra"], json!(99));
    }

    #[test]
    fn all_violations_are_collected() {
        let schema = json!({
            "properties": {
                "mode": { "type": "string", "enum": ["a", "b"] },
                "count": { "type": "integer", "minimum": 1 }
            },
            "required": ["mode", "count", "path"]
        });
        let report = validate_arguments(&args(json!({ "mode": "z", "count": 0 })), &schema, false);
        // Missing path, bad enum, below minimum.
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn integer_type_rejects_floats_and_booleans() {
        let schema = json!({ "properties": { "n": { "type": "integer" } } });
        assert!(!validate_arguments(&args(json!({ "n": 2.5 })), &schema, false).is_valid());
        assert!(!validate_arguments(&args(json!({ "n": true })), &schema, false).is_valid());
        assert!(validate_arguments(&args(json!({ "n": 2 })), &schema, false).is_valid());
    }

    #[test]
    fn number_type_accepts_integers() {
        let schema = json!({ "properties": { "n": { "type": "number" } } });
        assert!(validate_arguments(&args(json!({ "n": 2 })), &schema, false).is_valid());
        assert!(validate_arguments(&args(json!({ "n": 2.5 })), &schema, false).is_valid());
    }
}
