//! Expression compilation and in-process evaluation
//!
//! The same condition trees are rendered into the store's expression syntax
//! for the remote backend and evaluated directly for the local backend.

use super::types::{Comparator, Condition, KeyCondition, QuerySpec, SortCondition};
use crate::types::{Item, JsonValue};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Compilation
// ============================================================================

/// A query rendered into native expression strings with placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    /// Key condition expression
    pub key_condition: String,
    /// Filter expression
    pub filter: Option<String>,
    /// Projection expression
    pub projection: Option<String>,
    /// `#nN` placeholder to attribute name
    pub names: BTreeMap<String, String>,
    /// `:vN` placeholder to plain JSON value
    pub values: BTreeMap<String, JsonValue>,
}

/// Allocates placeholders, reusing the same `#nN` for a repeated attribute name
#[derive(Debug, Default)]
struct ExpressionBuilder {
    names: BTreeMap<String, String>,
    name_lookup: HashMap<String, String>,
    values: BTreeMap<String, JsonValue>,
}

impl ExpressionBuilder {
    fn name(&mut self, field: &str) -> String {
        if let Some(placeholder) = self.name_lookup.get(field) {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names.insert(placeholder.clone(), field.to_string());
        self.name_lookup
            .insert(field.to_string(), placeholder.clone());
        placeholder
    }

    fn value(&mut self, value: &JsonValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    fn key_condition(&mut self, key: &KeyCondition) -> String {
        let partition = format!(
            "{} = {}",
            self.name(&key.partition_field),
            self.value(&key.partition_value)
        );

        let Some(sort) = &key.sort else {
            return partition;
        };

        let name = self.name(&sort.field);
        let sort_expr = match &sort.condition {
            SortCondition::Compare { op, value } => {
                format!("{name} {} {}", op.symbol(), self.value(value))
            }
            SortCondition::Between { low, high } => {
                let low = self.value(low);
                let high = self.value(high);
                format!("{name} BETWEEN {low} AND {high}")
            }
            SortCondition::BeginsWith(prefix) => {
                let prefix = self.value(&JsonValue::String(prefix.clone()));
                format!("begins_with({name}, {prefix})")
            }
        };

        format!("{partition} AND {sort_expr}")
    }

    fn condition(&mut self, condition: &Condition) -> Option<String> {
        match condition {
            Condition::Compare { field, op, value } => {
                let name = self.name(field);
                Some(format!("{name} {} {}", op.symbol(), self.value(value)))
            }
            Condition::Between { field, low, high } => {
                let name = self.name(field);
                let low = self.value(low);
                let high = self.value(high);
                Some(format!("{name} BETWEEN {low} AND {high}"))
            }
            Condition::BeginsWith { field, prefix } => {
                let name = self.name(field);
                let prefix = self.value(&JsonValue::String(prefix.clone()));
                Some(format!("begins_with({name}, {prefix})"))
            }
            Condition::Contains { field, value } => {
                let name = self.name(field);
                Some(format!("contains({name}, {})", self.value(value)))
            }
            Condition::Exists(field) => Some(format!("attribute_exists({})", self.name(field))),
            Condition::NotExists(field) => {
                Some(format!("attribute_not_exists({})", self.name(field)))
            }
            Condition::And(parts) => self.group(parts, "AND"),
            Condition::Or(parts) => self.group(parts, "OR"),
            Condition::Not(inner) => self.condition(inner).map(|expr| format!("NOT ({expr})")),
        }
    }

    fn group(&mut self, parts: &[Condition], joiner: &str) -> Option<String> {
        let rendered: Vec<String> = parts.iter().filter_map(|c| self.condition(c)).collect();
        match rendered.len() {
            0 => None,
            1 => rendered.into_iter().next(),
            _ => Some(
                rendered
                    .iter()
                    .map(|expr| format!("({expr})"))
                    .collect::<Vec<_>>()
                    .join(format!(" {joiner} ").as_str()),
            ),
        }
    }

    fn projection(&mut self, fields: &[String]) -> String {
        fields
            .iter()
            .map(|field| self.name(field))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render a query spec into native expression strings
pub fn compile(spec: &QuerySpec) -> CompiledExpression {
    let mut builder = ExpressionBuilder::default();
    let key_condition = builder.key_condition(spec.key_condition());
    let filter = spec.filter().and_then(|f| builder.condition(f));
    let projection = spec.projection().map(|p| builder.projection(p));

    CompiledExpression {
        key_condition,
        filter,
        projection,
        names: builder.names,
        values: builder.values,
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Structural equality, treating numerically equal numbers as equal
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Order two values; only numbers with numbers and strings with strings are ordered
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_with(op: Comparator, actual: &JsonValue, expected: &JsonValue) -> bool {
    match op {
        Comparator::Eq => values_equal(actual, expected),
        Comparator::Ne => !values_equal(actual, expected),
        Comparator::Lt => compare_values(actual, expected) == Some(Ordering::Less),
        Comparator::Le => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparator::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
        Comparator::Ge => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn between(actual: &JsonValue, low: &JsonValue, high: &JsonValue) -> bool {
    compare_with(Comparator::Ge, actual, low) && compare_with(Comparator::Le, actual, high)
}

fn begins_with(actual: &JsonValue, prefix: &str) -> bool {
    actual.as_str().is_some_and(|s| s.starts_with(prefix))
}

/// Check an item against a key condition
pub fn matches_key(key: &KeyCondition, item: &Item) -> bool {
    let partition_matches = item
        .get(&key.partition_field)
        .is_some_and(|v| values_equal(v, &key.partition_value));
    if !partition_matches {
        return false;
    }

    let Some(sort) = &key.sort else {
        return true;
    };
    let Some(actual) = item.get(&sort.field) else {
        return false;
    };

    match &sort.condition {
        SortCondition::Compare { op, value } => compare_with(*op, actual, value),
        SortCondition::Between { low, high } => between(actual, low, high),
        SortCondition::BeginsWith(prefix) => begins_with(actual, prefix),
    }
}

/// Check an item against a filter condition.
///
/// Comparisons against a missing attribute are false. Vacuous groups match everything.
pub fn matches_condition(condition: &Condition, item: &Item) -> bool {
    if condition.is_vacuous() {
        return true;
    }

    match condition {
        Condition::Compare { field, op, value } => item
            .get(field)
            .is_some_and(|actual| compare_with(*op, actual, value)),
        Condition::Between { field, low, high } => item
            .get(field)
            .is_some_and(|actual| between(actual, low, high)),
        Condition::BeginsWith { field, prefix } => item
            .get(field)
            .is_some_and(|actual| begins_with(actual, prefix)),
        Condition::Contains { field, value } => match item.get(field) {
            Some(JsonValue::String(haystack)) => value
                .as_str()
                .is_some_and(|needle| haystack.contains(needle)),
            Some(JsonValue::Array(elements)) => {
                elements.iter().any(|element| values_equal(element, value))
            }
            _ => false,
        },
        Condition::Exists(field) => item.contains_key(field),
        Condition::NotExists(field) => !item.contains_key(field),
        Condition::And(parts) => parts
            .iter()
            .filter(|c| !c.is_vacuous())
            .all(|c| matches_condition(c, item)),
        Condition::Or(parts) => parts
            .iter()
            .filter(|c| !c.is_vacuous())
            .any(|c| matches_condition(c, item)),
        Condition::Not(inner) => !matches_condition(inner, item),
    }
}

/// Keep only the named top-level attributes of an item
pub fn project(item: &Item, fields: &[String]) -> Item {
    fields
        .iter()
        .filter_map(|field| item.get(field).map(|v| (field.clone(), v.clone())))
        .collect()
}
