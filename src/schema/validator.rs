//! JSON-Schema-style validator
//!
//! Used for the request envelope and for every endpoint's params. The
//! validator is a pure function over `(data, schema)`: it never mutates
//! either side and returns the same violations for the same input.
//!
//! Keywords are evaluated per node in this order: `type`, `required`,
//! `properties`, `additionalProperties`, scalar bounds, `items`, `enum`,
//! `allOf`, `anyOf`, `oneOf`. Unknown keywords are ignored.

use serde_json::{Map, Value};

use super::types::{found_type_name, JsonType, Violation};

/// Validates `data` against `schema`. An empty result means valid.
pub fn validate(data: &Value, schema: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    validate_node(data, schema, "", &mut violations);
    violations
}

/// Whether `data` satisfies `schema`
pub fn is_valid(data: &Value, schema: &Value) -> bool {
    validate(data, schema).is_empty()
}

fn validate_node(data: &Value, schema: &Value, path: &str, out: &mut Vec<Violation>) {
    let Some(schema) = schema.as_object() else {
        // `true`, `{}` and anything non-object accept every value
        return;
    };

    check_type(data, schema, path, out);

    if let Value::Object(object) = data {
        check_required(object, schema, path, out);
        check_properties(object, schema, path, out);
        check_additional_properties(object, schema, path, out);
    }

    match data {
        Value::String(s) => check_string_bounds(s, schema, path, out),
        Value::Number(_) => check_number_bounds(data, schema, path, out),
        Value::Array(items) => {
            check_array_bounds(items, schema, path, out);
            check_items(items, schema, path, out);
        }
        _ => {}
    }

    check_enum(data, schema, path, out);
    check_all_of(data, schema, path, out);
    check_any_of(data, schema, path, out);
    check_one_of(data, schema, path, out);
}

fn check_type(data: &Value, schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let declared: Vec<JsonType> = match schema.get("type") {
        Some(Value::String(name)) => JsonType::parse(name).into_iter().collect(),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .filter_map(JsonType::parse)
            .collect(),
        _ => return,
    };

    if declared.is_empty() || declared.iter().any(|t| t.matches(data)) {
        return;
    }

    let expected: Vec<&str> = declared.iter().map(|t| t.expected_phrase()).collect();
    out.push(Violation::new(
        path,
        format!(
            "{} value found, but {} is required",
            found_type_name(data),
            join_alternatives(&expected)
        ),
    ));
}

fn check_required(
    object: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let Some(Value::Array(required)) = schema.get("required") else {
        return;
    };
    for name in required.iter().filter_map(Value::as_str) {
        if !object.contains_key(name) {
            out.push(Violation::new(
                child_path(path, name),
                format!("The property {} is required", name),
            ));
        }
    }
}

fn check_properties(
    object: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let Some(Value::Object(properties)) = schema.get("properties") else {
        return;
    };
    for (name, property_schema) in properties {
        if let Some(value) = object.get(name) {
            validate_node(value, property_schema, &child_path(path, name), out);
        }
    }
}

fn check_additional_properties(
    object: &Map<String, Value>,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let Some(additional) = schema.get("additionalProperties") else {
        return;
    };
    let declared = schema.get("properties").and_then(Value::as_object);
    let extra = object
        .iter()
        .filter(|(name, _)| declared.map_or(true, |d| !d.contains_key(*name)));

    for (name, value) in extra {
        match additional {
            Value::Bool(false) => out.push(Violation::new(
                path,
                format!(
                    "The property {} is not defined and the definition does not allow additional properties",
                    name
                ),
            )),
            Value::Object(_) => validate_node(value, additional, &child_path(path, name), out),
            _ => {}
        }
    }
}

fn check_string_bounds(
    s: &str,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let length = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if length < min {
            out.push(Violation::new(
                path,
                format!("Must be at least {} characters long", min),
            ));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if length > max {
            out.push(Violation::new(
                path,
                format!("Must be at most {} characters long", max),
            ));
        }
    }
}

fn check_number_bounds(
    data: &Value,
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let Some(value) = data.as_f64() else {
        return;
    };
    if let Some(min) = schema.get("minimum").filter(|v| v.is_number()) {
        if min.as_f64().is_some_and(|m| value < m) {
            out.push(Violation::new(
                path,
                format!("Must have a minimum value of {}", min),
            ));
        }
    }
    if let Some(max) = schema.get("maximum").filter(|v| v.is_number()) {
        if max.as_f64().is_some_and(|m| value > m) {
            out.push(Violation::new(
                path,
                format!("Must have a maximum value of {}", max),
            ));
        }
    }
}

fn check_array_bounds(
    items: &[Value],
    schema: &Map<String, Value>,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let count = items.len() as u64;
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if count < min {
            out.push(Violation::new(
                path,
                format!("There must be a minimum of {} items in the array", min),
            ));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if count > max {
            out.push(Violation::new(
                path,
                format!("There must be a maximum of {} items in the array", max),
            ));
        }
    }
}

fn check_items(items: &[Value], schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    match schema.get("items") {
        Some(Value::Array(positional)) => {
            for (index, (item, item_schema)) in items.iter().zip(positional).enumerate() {
                validate_node(item, item_schema, &index_path(path, index), out);
            }
        }
        Some(item_schema) => {
            for (index, item) in items.iter().enumerate() {
                validate_node(item, item_schema, &index_path(path, index), out);
            }
        }
        None => {}
    }
}

fn check_enum(data: &Value, schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let Some(Value::Array(allowed)) = schema.get("enum") else {
        return;
    };
    if !allowed.contains(data) {
        let listing = Value::Array(allowed.clone()).to_string();
        out.push(Violation::new(
            path,
            format!("Does not have a value in the enumeration {}", listing),
        ));
    }
}

fn check_all_of(data: &Value, schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let Some(Value::Array(branches)) = schema.get("allOf") else {
        return;
    };
    for branch in branches {
        validate_node(data, branch, path, out);
    }
}

fn check_any_of(data: &Value, schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let Some(Value::Array(branches)) = schema.get("anyOf") else {
        return;
    };

    let mut collected = Vec::new();
    for branch in branches {
        let mut branch_violations = Vec::new();
        validate_node(data, branch, path, &mut branch_violations);
        if branch_violations.is_empty() {
            return;
        }
        collected.extend(branch_violations);
    }

    out.extend(collected);
    out.push(Violation::new(path, "Failed to match at least one schema"));
}

fn check_one_of(data: &Value, schema: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
    let Some(Value::Array(branches)) = schema.get("oneOf") else {
        return;
    };

    let mut matched = 0;
    let mut collected = Vec::new();
    for branch in branches {
        let mut branch_violations = Vec::new();
        validate_node(data, branch, path, &mut branch_violations);
        if branch_violations.is_empty() {
            matched += 1;
        } else {
            collected.extend(branch_violations);
        }
    }

    if matched != 1 {
        out.extend(collected);
        out.push(Violation::new(path, "Failed to match exactly one schema"));
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// `a`, `a or b`, `a, b or c`
fn join_alternatives(parts: &[&str]) -> String {
    match parts {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} or {}", head.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::join_violations;
    use serde_json::json;

    fn messages(data: Value, schema: Value) -> String {
        join_violations(&validate(&data, &schema))
    }

    fn login_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "login": {"type": "string"},
                "password": {"type": "string"}
            },
            "required": ["login", "password"]
        })
    }

    #[test]
    fn test_valid_document_has_no_violations() {
        assert!(is_valid(
            &json!({"login": "test", "password": "qwerty"}),
            &login_schema()
        ));
    }

    #[test]
    fn test_property_type_mismatch() {
        assert_eq!(
            messages(json!({"login": 1, "password": 1}), login_schema()),
            "[login] Integer value found, but a string is required; \
             [password] Integer value found, but a string is required"
        );
    }

    #[test]
    fn test_missing_required_properties() {
        assert_eq!(
            messages(json!({}), login_schema()),
            "[login] The property login is required; [password] The property password is required"
        );
    }

    #[test]
    fn test_properties_report_in_schema_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "price": {"type": "integer"},
                "author_name": {"type": "string"},
                "author_id": {"type": "integer"}
            }
        });
        let data = json!({"author_id": "y", "price": "x", "name": 1, "author_name": 2});

        assert_eq!(
            messages(data, schema),
            "[name] Integer value found, but a string is required; \
             [price] String value found, but an integer is required; \
             [author_name] Integer value found, but a string is required; \
             [author_id] String value found, but an integer is required"
        );
    }

    #[test]
    fn test_additional_properties_report_in_data_order() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": false
        });
        let data = json!({"zeta": 1, "name": "ok", "alpha": 2});

        assert_eq!(
            messages(data, schema),
            "The property zeta is not defined and the definition does not allow additional properties; \
             The property alpha is not defined and the definition does not allow additional properties"
        );
    }

    #[test]
    fn test_root_type_mismatch_has_no_path() {
        assert_eq!(
            messages(json!(null), login_schema()),
            "NULL value found, but an object is required"
        );
    }

    #[test]
    fn test_union_type_message() {
        let schema = json!({"type": ["string", "array"]});
        assert!(is_valid(&json!("x"), &schema));
        assert!(is_valid(&json!(["x"]), &schema));
        assert_eq!(
            messages(json!(2.5), schema),
            "Double value found, but a string or an array is required"
        );
        assert_eq!(
            messages(json!(true), json!({"type": ["string", "array", "null"]})),
            "Boolean value found, but a string, an array or a null is required"
        );
    }

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "book": {
                    "type": "object",
                    "properties": {"tags": {"type": "array", "items": {"type": "string"}}}
                }
            }
        });
        assert_eq!(
            messages(json!({"book": {"tags": ["a", 3]}}), schema),
            "[book.tags[1]] Integer value found, but a string is required"
        );
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "type": "object",
            "properties": {"route": {"type": "string"}},
            "additionalProperties": false
        });
        assert_eq!(
            messages(json!({"route": "a", "extra": 1}), schema),
            "The property extra is not defined and the definition does not allow additional properties"
        );
    }

    #[test]
    fn test_any_of_lists_branch_failures() {
        let schema = json!({
            "type": "object",
            "anyOf": [{"required": ["book_name"]}, {"required": ["author_name"]}]
        });
        assert!(is_valid(&json!({"author_name": "x"}), &schema));
        assert_eq!(
            messages(json!({}), schema),
            "[book_name] The property book_name is required; \
             [author_name] The property author_name is required; \
             Failed to match at least one schema"
        );
    }

    #[test]
    fn test_one_of_rejects_multiple_matches() {
        let schema = json!({
            "type": "object",
            "oneOf": [{"required": ["author_name"]}, {"required": ["author_id"]}]
        });
        assert!(is_valid(&json!({"author_id": 1}), &schema));
        assert_eq!(
            messages(json!({"author_id": 1, "author_name": "x"}), schema.clone()),
            "Failed to match exactly one schema"
        );
        assert_eq!(
            messages(json!({}), schema),
            "[author_name] The property author_name is required; \
             [author_id] The property author_id is required; \
             Failed to match exactly one schema"
        );
    }

    #[test]
    fn test_all_of_collects_every_branch() {
        let schema = json!({"allOf": [{"type": "string"}, {"minLength": 3}]});
        assert_eq!(messages(json!("ab"), schema), "Must be at least 3 characters long");
    }

    #[test]
    fn test_scalar_bounds_and_enum() {
        assert_eq!(
            messages(json!(""), json!({"type": "string", "minLength": 1})),
            "Must be at least 1 characters long"
        );
        assert_eq!(
            messages(json!(11), json!({"maximum": 10})),
            "Must have a maximum value of 10"
        );
        assert_eq!(
            messages(json!(-1), json!({"minimum": 0})),
            "Must have a minimum value of 0"
        );
        assert_eq!(
            messages(json!([1, 2, 3]), json!({"maxItems": 2})),
            "There must be a maximum of 2 items in the array"
        );
        assert_eq!(
            messages(json!("c"), json!({"enum": ["a", "b"]})),
            "Does not have a value in the enumeration [\"a\",\"b\"]"
        );
    }

    #[test]
    fn test_validation_is_repeatable() {
        let data = json!({"login": 1});
        let first = validate(&data, &login_schema());
        let second = validate(&data, &login_schema());
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_keywords_are_ignored() {
        assert!(is_valid(&json!("x"), &json!({"format": "email", "title": "t"})));
    }
}
