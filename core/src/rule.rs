//! Branch rule vocabulary.
//!
//! A dynamic `routeNext` is an ordered list of [`RuleGroup`]s. Each group pairs
//! a condition tree with the route it selects. Evaluation lives in
//! `waymark-std`; this module only defines the authored shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the children of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// Comparison applied between a data-model field and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    Exists,
    Empty,
    NotEmpty,
}

impl Operator {
    /// Operators that never look at the rule's literal value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Exists | Operator::Empty | Operator::NotEmpty)
    }
}

/// A single comparison against the external data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Node of a condition tree: a leaf rule or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Rule(Rule),
    Group {
        #[serde(default)]
        combinator: Combinator,
        rules: Vec<RuleNode>,
    },
}

/// One branch of a dynamic route.
///
/// A group marked `default` matches unconditionally and must be the last group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
    pub route_next: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_group_parses_nested_groups() {
        let group: RuleGroup = serde_json::from_value(json!({
            "combinator": "or",
            "rules": [
                { "field": "employed", "operator": "eq", "value": true },
                { "combinator": "and", "rules": [
                    { "field": "income", "operator": "gte", "value": 1000 },
                    { "field": "employer", "operator": "notEmpty" }
                ]}
            ],
            "routeNext": "employment"
        }))
        .unwrap();

        assert_eq!(group.combinator, Combinator::Or);
        assert_eq!(group.rules.len(), 2);
        assert!(matches!(group.rules[1], RuleNode::Group { ref rules, .. } if rules.len() == 2));
        assert!(!group.default);
    }

    #[test]
    fn test_default_group_needs_no_rules() {
        let group: RuleGroup =
            serde_json::from_value(json!({ "default": true, "routeNext": "fallback" })).unwrap();
        assert!(group.default);
        assert!(group.rules.is_empty());
    }
}
