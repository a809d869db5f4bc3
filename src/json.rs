//! Purpose: JSON body decode adapter with structural size enforcement.
//! Exports: crate-internal `decode_json`.
//! Role: Parser boundary that centralizes serde_json usage for the json route.
//! Invariants: Size violations aggregate; a parse failure is an infrastructure error.
//! Invariants: Array elements attribute violations to the nearest enclosing object key.

use serde_json::Value;

use crate::decode::DecodeOutcome;
use crate::error::{Error, ErrorKind};
use crate::limits::{ResolvedLimits, Violation, check_field_size, check_json_size};

/// Decode a fully buffered JSON body against the operation's limits.
///
/// The enclosing field name travels through the walk as an explicit
/// parameter, so array indices report against the key that contains them.
pub(crate) fn decode_json(body: &[u8], limits: &ResolvedLimits) -> Result<DecodeOutcome, Error> {
    let mut violations = Vec::new();
    if let Some(violation) = check_json_size(body.len(), limits.max_json_size) {
        violations.push(violation);
    }

    let tree: Value = serde_json::from_slice(body).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("failed to parse json body")
            .with_source(err)
    })?;

    if let Some(limit) = limits.max_field_size {
        walk(&tree, None, limit, &mut violations);
    }

    if violations.is_empty() {
        Ok(DecodeOutcome::Success(tree))
    } else {
        Ok(DecodeOutcome::Failure(violations))
    }
}

fn walk(value: &Value, enclosing: Option<&str>, limit: u64, violations: &mut Vec<Violation>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, Some(key), limit, violations);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, enclosing, limit, violations);
            }
        }
        Value::String(text) => {
            let field = enclosing.unwrap_or("(root)");
            if let Some(violation) = check_field_size(field, text.len(), Some(limit)) {
                violations.push(violation);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::decode_json;
    use crate::decode::DecodeOutcome;
    use crate::error::ErrorKind;
    use crate::limits::{ResolvedLimits, ViolationKind};
    use serde_json::json;

    fn limits() -> ResolvedLimits {
        ResolvedLimits::default()
    }

    #[test]
    fn body_under_limits_decodes_to_its_tree() {
        let body = br#"{"user":{"name":"ada"},"tags":["a","b"]}"#;
        let outcome = decode_json(
            body,
            &ResolvedLimits {
                max_json_size: Some(1024),
                max_field_size: Some(64),
                ..limits()
            },
        )
        .expect("decode");
        assert_eq!(
            outcome,
            DecodeOutcome::Success(json!({"user": {"name": "ada"}, "tags": ["a", "b"]}))
        );
    }

    #[test]
    fn oversized_string_field_fails_with_one_violation() {
        let body = format!(r#"{{"bio":"{}"}}"#, "x".repeat(50));
        let outcome = decode_json(
            body.as_bytes(),
            &ResolvedLimits {
                max_json_size: Some(1024),
                max_field_size: Some(10),
                ..limits()
            },
        )
        .expect("decode");
        let DecodeOutcome::Failure(violations) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::FieldSizeExceeded);
        assert!(violations[0].message.contains("bio"));
    }

    #[test]
    fn array_strings_attribute_to_the_enclosing_key() {
        let body = br#"{"tags":["short",["nested-and-too-long"]]}"#;
        let outcome = decode_json(
            body,
            &ResolvedLimits {
                max_field_size: Some(8),
                ..limits()
            },
        )
        .expect("decode");
        let DecodeOutcome::Failure(violations) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("tags"));
    }

    #[test]
    fn size_and_field_violations_aggregate() {
        let body = format!(r#"{{"bio":"{}"}}"#, "x".repeat(50));
        let outcome = decode_json(
            body.as_bytes(),
            &ResolvedLimits {
                max_json_size: Some(10),
                max_field_size: Some(10),
                ..limits()
            },
        )
        .expect("decode");
        let DecodeOutcome::Failure(violations) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, ViolationKind::JsonSizeExceeded);
        assert_eq!(violations[1].kind, ViolationKind::FieldSizeExceeded);
    }

    #[test]
    fn malformed_json_is_an_infrastructure_error() {
        let err = decode_json(br#"{"a":}"#, &limits()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn no_limits_means_unbounded() {
        let body = format!(r#"{{"bio":"{}"}}"#, "x".repeat(5000));
        let outcome = decode_json(body.as_bytes(), &limits()).expect("decode");
        assert!(matches!(outcome, DecodeOutcome::Success(_)));
    }
}
