//! Built-in form field validators.
//!
//! Mirrors the authored `validators` block of a `formField`: `required`,
//! `minLength`, `maxLength`, `email`. Length and format checks skip empty
//! values so an optional field left blank stays valid.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use waymark_core::ControlRef;
use waymark_core::definition::Validators;
use waymark_core::error::{FailureKind, ValidationFailure};

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

fn email_pattern() -> Option<&'static Regex> {
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn is_email(candidate: &str) -> bool {
    match email_pattern() {
        Some(re) => re.is_match(candidate),
        None => candidate.contains('@'),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Number(n) => Some(n.to_string().len()),
        _ => None,
    }
}

/// Every rule in `validators` that `value` breaks.
pub fn check(validators: &Validators, value: Option<&Value>) -> Vec<FailureKind> {
    let mut failures = Vec::new();
    if is_blank(value) {
        if validators.required {
            failures.push(FailureKind::Required);
        }
        return failures;
    }
    let Some(value) = value else {
        return failures;
    };

    if let Some(len) = length_of(value) {
        if let Some(min) = validators.min_length {
            if len < min {
                failures.push(FailureKind::MinLength(min));
            }
        }
        if let Some(max) = validators.max_length {
            if len > max {
                failures.push(FailureKind::MaxLength(max));
            }
        }
    }

    if validators.email {
        let valid = value.as_str().map(is_email).unwrap_or(false);
        if !valid {
            failures.push(FailureKind::Email);
        }
    }

    failures
}

/// Validate a bound control against its (already resolved) value.
///
/// Hidden and disabled controls never fail.
pub fn check_control(control: &ControlRef, value: Option<&Value>) -> Vec<ValidationFailure> {
    if control.hidden || control.disabled {
        return Vec::new();
    }
    check(&control.validators, value)
        .into_iter()
        .map(|kind| ValidationFailure {
            control: control.id.clone(),
            kind,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waymark_core::definition::FormFieldType;

    fn rules(required: bool, min: Option<usize>, max: Option<usize>, email: bool) -> Validators {
        Validators {
            required,
            min_length: min,
            max_length: max,
            email,
        }
    }

    #[test]
    fn test_required() {
        let required = rules(true, None, None, false);
        assert_eq!(check(&required, None), vec![FailureKind::Required]);
        assert_eq!(check(&required, Some(&json!("  "))), vec![FailureKind::Required]);
        assert_eq!(check(&required, Some(&json!([]))), vec![FailureKind::Required]);
        assert!(check(&required, Some(&json!(false))).is_empty());
        assert!(check(&required, Some(&json!(0))).is_empty());
    }

    #[test]
    fn test_lengths_skip_blank_optional_values() {
        let bounded = rules(false, Some(2), Some(4), false);
        assert!(check(&bounded, None).is_empty());
        assert_eq!(check(&bounded, Some(&json!("a"))), vec![FailureKind::MinLength(2)]);
        assert_eq!(check(&bounded, Some(&json!("abcde"))), vec![FailureKind::MaxLength(4)]);
        assert!(check(&bounded, Some(&json!("abc"))).is_empty());
        assert_eq!(check(&bounded, Some(&json!(12345))), vec![FailureKind::MaxLength(4)]);
    }

    #[test]
    fn test_email() {
        let email = rules(false, None, None, true);
        assert!(check(&email, Some(&json!("ada@example.com"))).is_empty());
        assert_eq!(check(&email, Some(&json!("ada@example"))), vec![FailureKind::Email]);
        assert_eq!(check(&email, Some(&json!(42))), vec![FailureKind::Email]);
    }

    #[test]
    fn test_hidden_controls_pass() {
        let mut control = ControlRef {
            id: "email".into(),
            field: "email".into(),
            form_field_type: FormFieldType::Email,
            validators: rules(true, None, None, true),
            disabled: false,
            hidden: false,
        };
        assert_eq!(check_control(&control, None).len(), 1);
        assert_eq!(check_control(&control, None)[0].control, "email");

        control.hidden = true;
        assert!(check_control(&control, None).is_empty());
    }
}
