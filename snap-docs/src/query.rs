use std::cmp::Ordering as CmpOrdering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Document, DocumentId};

/// Predicate over document fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals the value; for array fields, any element equals it
    Equal(String, Value),
    /// Case-insensitive substring match on a string field
    Search(String, String),
}

impl Filter {
    pub fn equal<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Self::Equal(field.into(), value.into())
    }

    pub fn search<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        Self::Search(field.into(), term.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Equal(field, expected) => match doc.field(field) {
                Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
                Some(actual) => actual == expected,
                None => expected.is_null(),
            },
            Filter::Search(field, term) => {
                let needle = term.to_lowercase();
                match doc.field(field) {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    Some(Value::Array(items)) => items.iter().any(|item| {
                        item.as_str()
                            .map(|s| s.to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    }),
                    _ => false,
                }
            }
        }
    }
}

/// What a listing is ordered by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKey {
    CreatedAt,
    UpdatedAt,
    Field(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering of a listing. Ties are broken by document id so the order is total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub key: OrderKey,
    pub direction: Direction,
}

impl Default for Ordering {
    /// Most recently modified first
    fn default() -> Self {
        Self::desc(OrderKey::UpdatedAt)
    }
}

impl Ordering {
    pub fn asc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Desc,
        }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> CmpOrdering {
        let by_key = match &self.key {
            OrderKey::CreatedAt => a.created_at.cmp(&b.created_at),
            OrderKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            OrderKey::Field(name) => compare_values(a.field(name), b.field(name)),
        };
        let total = by_key.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            Direction::Asc => total,
            Direction::Desc => total.reverse(),
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Continuation token: the id of the last item of the previous page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub DocumentId);

impl Cursor {
    pub fn after(id: DocumentId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> &DocumentId {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A list request against one collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order: Ordering,
    pub limit: Option<usize>,
    pub cursor: Option<Cursor>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: Ordering) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn doc(id: &str, minutes: i64, fields: Value) -> Document {
        let at = Utc::now() + Duration::minutes(minutes);
        Document {
            id: DocumentId::from(id),
            collection: "posts".to_string(),
            created_at: at,
            updated_at: at,
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn equal_matches_scalars_and_array_members() {
        let d = doc("a", 0, json!({"creator": "u1", "likes": ["u2", "u3"]}));
        assert!(Filter::equal("creator", "u1").matches(&d));
        assert!(!Filter::equal("creator", "u2").matches(&d));
        assert!(Filter::equal("likes", "u3").matches(&d));
        assert!(Filter::equal("missing", Value::Null).matches(&d));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let d = doc("a", 0, json!({"caption": "Sunset over Lisbon"}));
        assert!(Filter::search("caption", "lisbon").matches(&d));
        assert!(!Filter::search("caption", "porto").matches(&d));
        assert!(!Filter::search("location", "lisbon").matches(&d));
    }

    #[test]
    fn default_ordering_is_most_recent_first() {
        let older = doc("a", 0, json!({}));
        let newer = doc("b", 5, json!({}));
        let mut docs = vec![older.clone(), newer.clone()];
        docs.sort_by(|a, b| Ordering::default().compare(a, b));
        assert_eq!(docs[0].id, newer.id);
    }

    #[test]
    fn ties_are_broken_by_id() {
        let mut a = doc("a", 0, json!({}));
        let mut b = doc("b", 0, json!({}));
        b.updated_at = a.updated_at;
        a.created_at = b.created_at;

        let asc = Ordering::asc(OrderKey::UpdatedAt);
        assert_eq!(asc.compare(&a, &b), CmpOrdering::Less);
        assert_eq!(Ordering::default().compare(&a, &b), CmpOrdering::Greater);
    }

    #[test]
    fn field_ordering_handles_mixed_types() {
        let n = doc("n", 0, json!({"rank": 2}));
        let s = doc("s", 0, json!({"rank": "x"}));
        let missing = doc("m", 0, json!({}));
        let order = Ordering::asc(OrderKey::Field("rank".to_string()));

        let mut docs = vec![s.clone(), n.clone(), missing.clone()];
        docs.sort_by(|a, b| order.compare(a, b));
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["m", "n", "s"]);
    }
}
