//! Query descriptions for document collections.
//!
//! A [`QuerySpec`] names a collection, a set of equality filters, and at most
//! one "in" filter. Stores cap the number of values an "in" filter may
//! carry and test it against a single field, so [`QuerySpec::chunks`] splits
//! a large or multi-field filter into several queries that share every
//! other condition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// A membership filter: `field`, or any of `alternate_fields`, must equal
/// one of `values`.
///
/// A path that crosses an array tests every element, so
/// `relationshipDetails.clientId` matches when any relationship carries an
/// accepted client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InFilter {
    /// Document field to test.
    pub field: String,
    /// Further fields that satisfy the filter just as well.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_fields: Vec<String>,
    /// Accepted values.
    pub values: Vec<Value>,
}

impl InFilter {
    /// Every tested field, `field` first.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.field.as_str()).chain(self.alternate_fields.iter().map(String::as_str))
    }

    fn accepts(&self, document: &Value) -> bool {
        self.fields().any(|field| {
            lookup_all(document, field).into_iter().any(|actual| match actual {
                Value::Array(items) => items.iter().any(|item| self.values.contains(item)),
                other => self.values.contains(other),
            })
        })
    }
}

/// A declarative query against one collection.
///
/// # Example
///
/// ```
/// use payroll_engine::sync::QuerySpec;
///
/// let query = QuerySpec::new("checks")
///     .where_eq("companyId", "co_1")
///     .where_in("clientId", (0..25).map(|i| format!("cl_{}", i)));
/// let chunks = query.chunks(10);
/// assert_eq!(chunks.len(), 3);
/// assert!(chunks.iter().all(|c| c.equals == query.equals));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Collection name.
    pub collection: String,
    /// Equality filters keyed by field.
    #[serde(default)]
    pub equals: BTreeMap<String, Value>,
    /// Optional membership filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<InFilter>,
}

impl QuerySpec {
    /// Creates an unfiltered query over `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            equals: BTreeMap::new(),
            one_of: None,
        }
    }

    /// Adds an equality filter, replacing any previous one on `field`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    /// Sets the membership filter. A query carries at most one; a second
    /// call replaces the first.
    pub fn where_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(InFilter {
            field: field.into(),
            alternate_fields: Vec::new(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Sets a membership filter that any of `fields` may satisfy. Replaces
    /// any previous membership filter.
    pub fn where_in_any<F, I, V>(mut self, fields: F, values: I) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut fields = fields.into_iter().map(Into::into);
        self.one_of = Some(InFilter {
            field: fields.next().unwrap_or_default(),
            alternate_fields: fields.collect(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Rejects queries a store could not run.
    pub fn validate(&self) -> EngineResult<()> {
        if self.collection.trim().is_empty() {
            return Err(EngineError::InvalidQuery {
                message: "collection name is empty".to_string(),
            });
        }
        let Some(filter) = &self.one_of else {
            return Ok(());
        };
        let mut seen: Vec<&str> = Vec::new();
        for field in filter.fields() {
            if field.trim().is_empty() {
                return Err(EngineError::InvalidQuery {
                    message: "membership filter has no field".to_string(),
                });
            }
            if self.equals.contains_key(field) {
                return Err(EngineError::InvalidQuery {
                    message: format!(
                        "field '{}' has both an equality and a membership filter",
                        field
                    ),
                });
            }
            if seen.contains(&field) {
                return Err(EngineError::InvalidQuery {
                    message: format!("membership filter names '{}' twice", field),
                });
            }
            seen.push(field);
        }
        Ok(())
    }

    /// Returns true when the membership filter is present but empty, so the
    /// query can match nothing.
    pub fn is_empty_membership(&self) -> bool {
        self.one_of.as_ref().is_some_and(|f| f.values.is_empty())
    }

    /// Splits the query so no chunk's membership filter holds more than
    /// `chunk_size` values or tests more than one field.
    ///
    /// Duplicate values are dropped first, keeping first occurrences. Each
    /// field gets its own run of chunks, in field order. A query without a
    /// membership filter yields itself; an empty membership filter yields no
    /// chunks. A `chunk_size` of zero is treated as one.
    pub fn chunks(&self, chunk_size: usize) -> Vec<QuerySpec> {
        let Some(filter) = &self.one_of else {
            return vec![self.clone()];
        };

        let mut distinct: Vec<&Value> = Vec::with_capacity(filter.values.len());
        for value in &filter.values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }

        let distinct = &distinct;
        filter
            .fields()
            .flat_map(move |field| {
                distinct.chunks(chunk_size.max(1)).map(move |values| QuerySpec {
                    collection: self.collection.clone(),
                    equals: self.equals.clone(),
                    one_of: Some(InFilter {
                        field: field.to_string(),
                        alternate_fields: Vec::new(),
                        values: values.iter().map(|v| (*v).clone()).collect(),
                    }),
                })
            })
            .collect()
    }

    /// Evaluates the query against a serialized document.
    ///
    /// Field names may use dots to reach nested objects.
    pub fn matches(&self, document: &Value) -> bool {
        let equal = self
            .equals
            .iter()
            .all(|(field, expected)| lookup(document, field) == Some(expected));
        let member = self
            .one_of
            .as_ref()
            .is_none_or(|filter| filter.accepts(document));
        equal && member
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

/// Like [`lookup`], but an array met along the path fans out to its
/// elements.
fn lookup_all<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    path.split('.').fold(vec![document], |current, segment| {
        current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.get(segment))
                    .collect::<Vec<_>>(),
                other => other.get(segment).into_iter().collect::<Vec<_>>(),
            })
            .collect()
    })
}
