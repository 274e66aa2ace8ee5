//! Node metadata condition evaluators
//!
//! Share decides whether to show some form fields and actions by testing a
//! condition string against the JSON metadata the repository returns for a
//! node. Every evaluator follows the same steps: parse the document, look
//! up one field, apply a [`MatchRule`]. The steps are implemented once in
//! [`ConditionEvaluator`]; variants differ only in field name and rule.
//!
//! Evaluation fails closed. A document that does not parse, lacks the
//! field, or has the field in the wrong shape logs a warning and yields
//! `false`.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::result::ShareResult;

/// Field holding the applied aspects
pub const ASPECTS_FIELD: &str = "aspects";

/// Field holding the node type
pub const TYPE_FIELD: &str = "type";

// =============================================================================
// MATCH RULES
// =============================================================================

/// How a condition is tested against a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// The field is an array of strings containing the condition
    ArrayContains,
    /// The field is a scalar equal to the condition
    ScalarEquals,
    /// The field is a number satisfying `<op><number>`
    NumericCompare,
}

impl MatchRule {
    /// Apply the rule. `Err` carries the diagnostic for the warning log.
    fn apply(self, condition: &str, value: &Value) -> Result<bool, String> {
        match self {
            Self::ArrayContains => array_contains(condition, value),
            Self::ScalarEquals => scalar_equals(condition, value),
            Self::NumericCompare => numeric_compare(condition, value),
        }
    }
}

fn array_contains(condition: &str, value: &Value) -> Result<bool, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("expected an array, found {}", kind_of(value)))?;
    for (i, item) in items.iter().enumerate() {
        let entry = item
            .as_str()
            .ok_or_else(|| format!("element {i} is {}, not a string", kind_of(item)))?;
        if entry == condition {
            return Ok(true);
        }
    }
    Ok(false)
}

fn scalar_equals(condition: &str, value: &Value) -> Result<bool, String> {
    match value {
        Value::String(s) => Ok(s == condition),
        Value::Number(n) => Ok(match (parse_finite(condition), n.as_f64()) {
            (Some(expected), Some(actual)) => actual == expected,
            _ => n.to_string() == condition,
        }),
        Value::Bool(b) => Ok(b.to_string() == condition),
        other => Err(format!("expected a scalar, found {}", kind_of(other))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn parse_comparison(condition: &str) -> Result<(Comparison, f64), String> {
    let condition = condition.trim();
    // two-character operators first
    let (op, rest) = [
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ]
    .into_iter()
    .find_map(|(token, op)| condition.strip_prefix(token).map(|rest| (op, rest)))
    .unwrap_or((Comparison::Eq, condition));

    let operand = parse_finite(rest)
        .ok_or_else(|| format!("malformed numeric condition {condition:?}"))?;
    Ok((op, operand))
}

/// Parse a finite number; `nan` and `inf` are rejected
fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn numeric_compare(condition: &str, value: &Value) -> Result<bool, String> {
    let (op, operand) = parse_comparison(condition)?;
    let actual = value
        .as_f64()
        .ok_or_else(|| format!("expected a number, found {}", kind_of(value)))?;
    Ok(match op {
        Comparison::Eq => actual == operand,
        Comparison::Ne => actual != operand,
        Comparison::Lt => actual < operand,
        Comparison::Le => actual <= operand,
        Comparison::Gt => actual > operand,
        Comparison::Ge => actual >= operand,
    })
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// NODE REFERENCES
// =============================================================================

/// Repository node reference, e.g. `workspace://SpacesStore/5d7b...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Store protocol (`workspace`, `archive`, ...)
    pub protocol: String,
    /// Store identifier (`SpacesStore`, ...)
    pub store: String,
    /// Node id
    pub id: String,
}

fn node_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*)://([^/\s]+)/([^/\s]+)$")
            .expect("node ref pattern is valid")
    })
}

impl NodeRef {
    /// Parse `protocol://store/id`; `None` when the string is not a node
    /// reference
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = node_ref_pattern().captures(raw.trim())?;
        Some(Self {
            protocol: caps[1].to_string(),
            store: caps[2].to_string(),
            id: caps[3].to_string(),
        })
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.protocol, self.store, self.id)
    }
}

/// Supplier of node metadata JSON, typically the repository's metadata
/// service
pub trait MetadataSource {
    /// Fetch the raw JSON metadata for a node
    fn node_metadata(&self, node: &NodeRef) -> ShareResult<String>;
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Evaluates conditions against one field of a metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEvaluator {
    field: String,
    rule: MatchRule,
}

impl ConditionEvaluator {
    /// Create an evaluator for `field` using `rule`
    #[must_use]
    pub fn new(field: impl Into<String>, rule: MatchRule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }

    /// True when the node has the aspect named by the condition
    #[must_use]
    pub fn aspect() -> Self {
        Self::new(ASPECTS_FIELD, MatchRule::ArrayContains)
    }

    /// True when the node type equals the condition
    #[must_use]
    pub fn node_type() -> Self {
        Self::new(TYPE_FIELD, MatchRule::ScalarEquals)
    }

    /// The inspected field
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The match rule
    #[must_use]
    pub const fn rule(&self) -> MatchRule {
        self.rule
    }

    /// Evaluate `condition` against a raw JSON response
    #[must_use]
    pub fn evaluate(&self, condition: &str, json: &str) -> bool {
        match serde_json::from_str::<Value>(json) {
            Ok(document) => self.evaluate_value(condition, &document),
            Err(err) => {
                warn!(field = %self.field, error = %err, "metadata response is not valid JSON");
                false
            }
        }
    }

    /// Evaluate `condition` against an already parsed document
    #[must_use]
    pub fn evaluate_value(&self, condition: &str, document: &Value) -> bool {
        let Some(object) = document.as_object() else {
            warn!(field = %self.field, "metadata response is {}, not an object", kind_of(document));
            return false;
        };
        let Some(value) = object.get(&self.field) else {
            warn!(field = %self.field, "field missing from metadata response");
            return false;
        };
        self.rule.apply(condition, value).unwrap_or_else(|reason| {
            warn!(field = %self.field, %condition, %reason, "unable to evaluate condition");
            false
        })
    }

    /// Evaluate against the metadata of `object` when it is a node
    /// reference; anything else does not apply
    pub fn applies(&self, source: &dyn MetadataSource, object: &str, condition: &str) -> bool {
        let Some(node) = NodeRef::parse(object) else {
            return false;
        };
        match source.node_metadata(&node) {
            Ok(json) => self.evaluate(condition, &json),
            Err(err) => {
                warn!(%node, error = %err, "failed to retrieve node metadata");
                false
            }
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Named evaluators keyed by metadata field
#[derive(Debug, Clone, Default)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<String, ConditionEvaluator>,
}

impl EvaluatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the aspect and node type evaluators
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ConditionEvaluator::aspect());
        registry.register(ConditionEvaluator::node_type());
        registry
    }

    /// Register an evaluator under its field name, replacing any previous one
    pub fn register(&mut self, evaluator: ConditionEvaluator) {
        let _ = self.evaluators.insert(evaluator.field.clone(), evaluator);
    }

    /// Look up the evaluator for a field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ConditionEvaluator> {
        self.evaluators.get(field)
    }

    /// Registered field names
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.evaluators.keys().map(String::as_str).collect()
    }

    /// Evaluate with the evaluator registered for `field`
    #[must_use]
    pub fn evaluate(&self, field: &str, condition: &str, json: &str) -> bool {
        match self.get(field) {
            Some(evaluator) => evaluator.evaluate(condition, json),
            None => {
                warn!(%field, "no evaluator registered");
                false
            }
        }
    }
}
