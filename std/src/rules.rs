//! Rule Evaluator.
//!
//! Resolves a dynamic `routeNext` against the external data model. Groups are
//! tried in authored order and the first satisfied one wins; a `default` group
//! (always last) matches unconditionally. Evaluation is pure and is never
//! cached, since the data may change between visits.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use waymark_core::data::{DataModel, resolve_field};
use waymark_core::error::NoMatchingRuleError;
use waymark_core::rule::{Combinator, Operator, Rule, RuleGroup, RuleNode};

/// Pick the target route id for `groups`.
pub fn evaluate<'g>(
    groups: &'g [RuleGroup],
    data: &dyn DataModel,
    array_indexes: &BTreeMap<String, usize>,
) -> Result<&'g str, NoMatchingRuleError> {
    for (idx, group) in groups.iter().enumerate() {
        if group_matches(group, data, array_indexes) {
            tracing::debug!(group = idx, target = %group.route_next, "Rule group matched");
            return Ok(group.route_next.as_str());
        }
    }
    Err(NoMatchingRuleError {
        groups: groups.len(),
    })
}

pub fn group_matches(
    group: &RuleGroup,
    data: &dyn DataModel,
    array_indexes: &BTreeMap<String, usize>,
) -> bool {
    group.default || combine(group.combinator, &group.rules, data, array_indexes)
}

/// An empty condition list never matches; only `default` groups are unconditional.
fn combine(
    combinator: Combinator,
    nodes: &[RuleNode],
    data: &dyn DataModel,
    array_indexes: &BTreeMap<String, usize>,
) -> bool {
    if nodes.is_empty() {
        return false;
    }
    let mut results = nodes.iter().map(|node| match node {
        RuleNode::Rule(rule) => rule_matches(rule, data, array_indexes),
        RuleNode::Group { combinator, rules } => combine(*combinator, rules, data, array_indexes),
    });
    match combinator {
        Combinator::And => results.all(|r| r),
        Combinator::Or => results.any(|r| r),
    }
}

pub fn rule_matches(
    rule: &Rule,
    data: &dyn DataModel,
    array_indexes: &BTreeMap<String, usize>,
) -> bool {
    let field = resolve_field(&rule.field, array_indexes);
    let actual = data.get(&field).unwrap_or(&Value::Null);
    let expected = rule.value.as_ref().unwrap_or(&Value::Null);

    match rule.operator {
        Operator::Exists => !actual.is_null(),
        Operator::Empty => is_empty(actual),
        Operator::NotEmpty => !is_empty(actual),
        Operator::Eq => loose_eq(actual, expected),
        Operator::Ne => !loose_eq(actual, expected),
        Operator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(actual, expected) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => expected
            .as_array()
            .map(|options| options.iter().any(|o| loose_eq(actual, o)))
            .unwrap_or(false),
        Operator::NotIn => expected
            .as_array()
            .map(|options| !options.iter().any(|o| loose_eq(actual, o)))
            .unwrap_or(false),
        Operator::Contains => match (actual, expected) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.iter().any(|i| loose_eq(i, needle)),
            _ => false,
        },
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Equality that treats `1` and `1.0` alike.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Numbers compare numerically, strings lexically; anything else is incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waymark_core::data::JsonDataModel;

    fn groups(value: Value) -> Vec<RuleGroup> {
        serde_json::from_value(value).unwrap()
    }

    fn no_indexes() -> BTreeMap<String, usize> {
        BTreeMap::new()
    }

    #[test]
    fn test_first_matching_group_wins() {
        let rules = groups(json!([
            { "rules": [{ "field": "income", "operator": "gte", "value": 5000 }], "routeNext": "high" },
            { "rules": [{ "field": "income", "operator": "gte", "value": 1000 }], "routeNext": "mid" },
            { "default": true, "routeNext": "low" }
        ]));

        let high = JsonDataModel::new(json!({ "income": 9000 }));
        let mid = JsonDataModel::new(json!({ "income": 1000.0 }));
        let low = JsonDataModel::new(json!({}));

        assert_eq!(evaluate(&rules, &high, &no_indexes()), Ok("high"));
        assert_eq!(evaluate(&rules, &mid, &no_indexes()), Ok("mid"));
        assert_eq!(evaluate(&rules, &low, &no_indexes()), Ok("low"));
    }

    #[test]
    fn test_no_match_without_default_is_an_error() {
        let rules = groups(json!([
            { "rules": [{ "field": "employed", "operator": "eq", "value": true }], "routeNext": "employer" },
            { "rules": [], "routeNext": "never" }
        ]));
        let data = JsonDataModel::new(json!({ "employed": false }));

        assert_eq!(
            evaluate(&rules, &data, &no_indexes()),
            Err(NoMatchingRuleError { groups: 2 })
        );
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let rules = groups(json!([
            { "combinator": "or", "rules": [
                { "field": "state", "operator": "in", "value": ["CA", "OR"] },
                { "field": "tags", "operator": "contains", "value": "west" }
            ], "routeNext": "west" },
            { "default": true, "routeNext": "east" }
        ]));
        let data = JsonDataModel::new(json!({ "state": "NY", "tags": ["coastal", "west"] }));

        let first = evaluate(&rules, &data, &no_indexes());
        let second = evaluate(&rules, &data, &no_indexes());
        assert_eq!(first, Ok("west"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_groups() {
        let rules = groups(json!([
            { "rules": [
                { "field": "age", "operator": "gte", "value": 18 },
                { "combinator": "or", "rules": [
                    { "field": "student", "operator": "eq", "value": true },
                    { "field": "employer", "operator": "notEmpty" }
                ]}
            ], "routeNext": "eligible" },
            { "default": true, "routeNext": "ineligible" }
        ]));

        let student = JsonDataModel::new(json!({ "age": 19, "student": true }));
        let employed = JsonDataModel::new(json!({ "age": 40, "employer": "ACME" }));
        let neither = JsonDataModel::new(json!({ "age": 40, "employer": "  " }));
        let minor = JsonDataModel::new(json!({ "age": 12, "student": true }));

        assert_eq!(evaluate(&rules, &student, &no_indexes()), Ok("eligible"));
        assert_eq!(evaluate(&rules, &employed, &no_indexes()), Ok("eligible"));
        assert_eq!(evaluate(&rules, &neither, &no_indexes()), Ok("ineligible"));
        assert_eq!(evaluate(&rules, &minor, &no_indexes()), Ok("ineligible"));
    }

    #[test]
    fn test_rules_follow_array_index() {
        let rules = groups(json!([
            { "rules": [{ "field": "people[].role", "operator": "eq", "value": "owner" }], "routeNext": "owner" },
            { "default": true, "routeNext": "member" }
        ]));
        let data = JsonDataModel::new(json!({
            "people": [{ "role": "member" }, { "role": "owner" }]
        }));

        let mut indexes = BTreeMap::new();
        assert_eq!(evaluate(&rules, &data, &indexes), Ok("member"));
        indexes.insert("people".to_string(), 1);
        assert_eq!(evaluate(&rules, &data, &indexes), Ok("owner"));
    }

    #[test]
    fn test_mismatched_types_never_compare() {
        let rule = Rule {
            field: "amount".into(),
            operator: Operator::Gt,
            value: Some(json!(10)),
        };
        let data = JsonDataModel::new(json!({ "amount": "100" }));
        assert!(!rule_matches(&rule, &data, &no_indexes()));

        let not_in = Rule {
            field: "amount".into(),
            operator: Operator::NotIn,
            value: Some(json!("not-a-list")),
        };
        assert!(!rule_matches(&not_in, &data, &no_indexes()));
    }

    #[test]
    fn test_exists_and_empty() {
        let data = JsonDataModel::new(json!({ "a": 0, "b": null, "c": [], "d": false }));
        let check = |field: &str, operator| {
            rule_matches(
                &Rule {
                    field: field.into(),
                    operator,
                    value: None,
                },
                &data,
                &no_indexes(),
            )
        };

        assert!(check("a", Operator::Exists));
        assert!(!check("b", Operator::Exists));
        assert!(!check("missing", Operator::Exists));
        assert!(check("c", Operator::Empty));
        assert!(check("d", Operator::NotEmpty));
        assert!(check("missing", Operator::Empty));
    }
}
