//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar value as stored in the index or a materialized row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Orders values the way the index does: by discriminant first (so mixed
/// types never panic), then by value. Used to build [`crate::sort::SortSpec`]
/// comparators; the executor itself never compares `Value`s directly.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) => 2,
            Value::Double(_) => 3,
            Value::String(_) => 4,
            Value::Binary(_) => 5,
        }
    }
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// One unshaped record as returned by a fetch: the index key plus the stored
/// field set for the row it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub index_key: Vec<Value>,
    pub fields: BTreeMap<String, Value>,
}

impl Entry {
    pub fn new(index_key: Vec<Value>, fields: BTreeMap<String, Value>) -> Entry {
        Entry { index_key, fields }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A projected row, ready for the downstream sink. Opaque beyond field
/// lookup and the index key carried along for sorted-mode comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index_key: Vec<Value>,
    pub fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Three-valued logic result of evaluating a residual predicate against an
/// entry. Only `True` survives; `False` and `Unknown` both drop the row
/// (§4.1 edge cases, §8 boundary behaviors).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tri {
    True,
    False,
    Unknown,
}

impl Tri {
    pub fn passes(self) -> bool {
        matches!(self, Tri::True)
    }
}

/// Evaluates the residual predicate and projection against each fetched
/// entry. An external collaborator for expression semantics: this crate only
/// consumes the trait, it never compiles or interprets expressions itself.
pub trait RowShaper: Send + Sync {
    /// Applies the residual predicate and the projection. `None` means the
    /// row was filtered out (predicate evaluated to `False` or `Unknown`).
    fn shape(&self, entry: &Entry) -> Option<Row>;
}

/// A `RowShaper` built from a residual predicate closure and a projection
/// closure, for callers who don't need a dedicated type.
pub struct ClosureRowShaper<P, J>
where
    P: Fn(&Entry) -> Tri + Send + Sync,
    J: Fn(&Entry) -> Row + Send + Sync,
{
    predicate: P,
    project: J,
}

impl<P, J> ClosureRowShaper<P, J>
where
    P: Fn(&Entry) -> Tri + Send + Sync,
    J: Fn(&Entry) -> Row + Send + Sync,
{
    pub fn new(predicate: P, project: J) -> ClosureRowShaper<P, J> {
        ClosureRowShaper { predicate, project }
    }
}

impl<P, J> RowShaper for ClosureRowShaper<P, J>
where
    P: Fn(&Entry) -> Tri + Send + Sync,
    J: Fn(&Entry) -> Row + Send + Sync,
{
    fn shape(&self, entry: &Entry) -> Option<Row> {
        if (self.predicate)(entry).passes() {
            Some((self.project)(entry))
        } else {
            None
        }
    }
}

/// A `RowShaper` that accepts every entry and projects it verbatim. Useful
/// for tests and for scans with no residual predicate.
pub struct PassThroughShaper;

impl RowShaper for PassThroughShaper {
    fn shape(&self, entry: &Entry) -> Option<Row> {
        Some(Row {
            index_key: entry.index_key.clone(),
            fields: entry.fields.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: i64) -> Entry {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), Value::Integer(key));
        Entry::new(vec![Value::Integer(key)], fields)
    }

    #[test]
    fn unknown_and_false_both_drop_the_row() {
        let shaper = ClosureRowShaper::new(
            |e: &Entry| {
                if matches!(e.field("key"), Some(Value::Integer(k)) if *k % 2 == 0) {
                    Tri::Unknown
                } else {
                    Tri::False
                }
            },
            |e: &Entry| Row {
                index_key: e.index_key.clone(),
                fields: e.fields.clone(),
            },
        );
        assert!(shaper.shape(&entry(2)).is_none());
        assert!(shaper.shape(&entry(3)).is_none());
    }

    #[test]
    fn pass_through_keeps_everything() {
        let shaper = PassThroughShaper;
        assert!(shaper.shape(&entry(1)).is_some());
    }

    #[test]
    fn compare_values_orders_by_discriminant_across_types() {
        assert_eq!(
            compare_values(&Value::Integer(1), &Value::String("a".into())),
            Ordering::Less
        );
    }
}
