//! Query types
//!
//! Defines the query description and the key/filter condition trees.

use crate::types::JsonValue;

// ============================================================================
// Comparators
// ============================================================================

/// Comparison operator used by key and filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparator {
    /// Native expression symbol for this operator
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }
}

// ============================================================================
// Key Condition
// ============================================================================

/// Condition on the sort key of a key condition
#[derive(Debug, Clone, PartialEq)]
pub enum SortCondition {
    /// Sort key compared against a value (`<>` is not allowed on keys)
    Compare {
        /// Operator
        op: Comparator,
        /// Right-hand value
        value: JsonValue,
    },
    /// Sort key within an inclusive range
    Between {
        /// Lower bound (inclusive)
        low: JsonValue,
        /// Upper bound (inclusive)
        high: JsonValue,
    },
    /// Sort key starts with a prefix
    BeginsWith(String),
}

/// Sort key field together with its condition
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyCondition {
    /// Sort key attribute name
    pub field: String,
    /// Condition applied to the sort key
    pub condition: SortCondition,
}

/// Key condition: partition key equality plus an optional sort key refinement
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    /// Partition key attribute name
    pub partition_field: String,
    /// Partition key value
    pub partition_value: JsonValue,
    /// Optional sort key condition
    pub sort: Option<SortKeyCondition>,
}

impl KeyCondition {
    /// Match every item whose partition key equals `value`
    pub fn partition(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            partition_field: field.into(),
            partition_value: value.into(),
            sort: None,
        }
    }

    fn with_sort(mut self, field: impl Into<String>, condition: SortCondition) -> Self {
        self.sort = Some(SortKeyCondition {
            field: field.into(),
            condition,
        });
        self
    }

    fn with_sort_compare(
        self,
        field: impl Into<String>,
        op: Comparator,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.with_sort(
            field,
            SortCondition::Compare {
                op,
                value: value.into(),
            },
        )
    }

    /// Sort key equals `value`
    #[must_use]
    pub fn sort_eq(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with_sort_compare(field, Comparator::Eq, value)
    }

    /// Sort key less than `value`
    #[must_use]
    pub fn sort_lt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with_sort_compare(field, Comparator::Lt, value)
    }

    /// Sort key less than or equal to `value`
    #[must_use]
    pub fn sort_le(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with_sort_compare(field, Comparator::Le, value)
    }

    /// Sort key greater than `value`
    #[must_use]
    pub fn sort_gt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with_sort_compare(field, Comparator::Gt, value)
    }

    /// Sort key greater than or equal to `value`
    #[must_use]
    pub fn sort_ge(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.with_sort_compare(field, Comparator::Ge, value)
    }

    /// Sort key within `[low, high]`
    #[must_use]
    pub fn sort_between(
        self,
        field: impl Into<String>,
        low: impl Into<JsonValue>,
        high: impl Into<JsonValue>,
    ) -> Self {
        self.with_sort(
            field,
            SortCondition::Between {
                low: low.into(),
                high: high.into(),
            },
        )
    }

    /// Sort key starts with `prefix`
    #[must_use]
    pub fn sort_begins_with(self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.with_sort(field, SortCondition::BeginsWith(prefix.into()))
    }
}

// ============================================================================
// Filter Condition
// ============================================================================

/// Filter condition evaluated after the key condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Attribute compared against a value
    Compare {
        /// Attribute name
        field: String,
        /// Operator
        op: Comparator,
        /// Right-hand value
        value: JsonValue,
    },
    /// Attribute within an inclusive range
    Between {
        /// Attribute name
        field: String,
        /// Lower bound (inclusive)
        low: JsonValue,
        /// Upper bound (inclusive)
        high: JsonValue,
    },
    /// String attribute starts with a prefix
    BeginsWith {
        /// Attribute name
        field: String,
        /// Prefix
        prefix: String,
    },
    /// String attribute contains a substring, or list attribute contains an element
    Contains {
        /// Attribute name
        field: String,
        /// Needle
        value: JsonValue,
    },
    /// Attribute is present
    Exists(String),
    /// Attribute is absent
    NotExists(String),
    /// All conditions hold
    And(Vec<Condition>),
    /// At least one condition holds
    Or(Vec<Condition>),
    /// Condition does not hold
    Not(Box<Condition>),
}

impl Condition {
    fn compare(field: impl Into<String>, op: Comparator, value: impl Into<JsonValue>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Eq, value)
    }

    /// `field <> value`
    pub fn ne(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Ne, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Lt, value)
    }

    /// `field <= value`
    pub fn le(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Le, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Gt, value)
    }

    /// `field >= value`
    pub fn ge(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::compare(field, Comparator::Ge, value)
    }

    /// `field BETWEEN low AND high`
    pub fn between(
        field: impl Into<String>,
        low: impl Into<JsonValue>,
        high: impl Into<JsonValue>,
    ) -> Self {
        Self::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// `begins_with(field, prefix)`
    pub fn begins_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::BeginsWith {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// `contains(field, value)`
    pub fn contains(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `attribute_exists(field)`
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists(field.into())
    }

    /// `attribute_not_exists(field)`
    pub fn not_exists(field: impl Into<String>) -> Self {
        Self::NotExists(field.into())
    }

    /// Combine with another condition using `AND`, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            this => Self::And(vec![this, other]),
        }
    }

    /// Combine with another condition using `OR`, flattening nested disjunctions
    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            this => Self::Or(vec![this, other]),
        }
    }

    /// Negate this condition
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// True when the condition constrains nothing (empty groups, possibly nested)
    pub fn is_vacuous(&self) -> bool {
        match self {
            Self::And(parts) | Self::Or(parts) => parts.iter().all(Condition::is_vacuous),
            Self::Not(inner) => inner.is_vacuous(),
            _ => false,
        }
    }
}

// ============================================================================
// Query Spec
// ============================================================================

/// Immutable description of one logical query
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    table: String,
    index: Option<String>,
    key_condition: KeyCondition,
    filter: Option<Condition>,
    projection: Option<Vec<String>>,
}

impl QuerySpec {
    /// Create a query against `table` with the given key condition
    pub fn new(table: impl Into<String>, key_condition: KeyCondition) -> Self {
        Self {
            table: table.into(),
            index: None,
            key_condition,
            filter: None,
            projection: None,
        }
    }

    /// Query a secondary index instead of the base table
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Apply a filter after the key condition
    #[must_use]
    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Return only the named attributes
    #[must_use]
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Logical table identifier
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Secondary index, if any
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Key condition
    pub fn key_condition(&self) -> &KeyCondition {
        &self.key_condition
    }

    /// Filter condition, ignoring vacuous ones
    pub fn filter(&self) -> Option<&Condition> {
        self.filter.as_ref().filter(|c| !c.is_vacuous())
    }

    /// Projected attribute names
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref().filter(|p| !p.is_empty())
    }
}
