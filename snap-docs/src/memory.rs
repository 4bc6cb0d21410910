use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use crate::{Document, DocumentId, DocumentStore, Fields, ListQuery, StoreError, StoreResult};

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocOp {
    Create,
    Update,
    Delete,
    Get,
    List,
}

#[derive(Default)]
struct Collections {
    docs: HashMap<String, HashMap<DocumentId, Document>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Collections {
    /// Strictly increasing timestamp so modification order is always observable
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }
}

/// In-process document store with fault injection for tests
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Collections>,
    faults: Mutex<HashMap<DocOp, u32>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with a backend error
    pub fn fail_next(&self, op: DocOp) {
        self.fail_times(op, 1);
    }

    /// Make the next `times` calls of `op` fail with a backend error
    pub fn fail_times(&self, op: DocOp, times: u32) {
        *self.faults.lock().entry(op).or_insert(0) += times;
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .docs
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Read a document without going through the async contract
    pub fn snapshot(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.inner
            .read()
            .docs
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
    }

    fn take_fault(&self, op: DocOp) -> StoreResult<()> {
        let mut faults = self.faults.lock();
        match faults.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::backend(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("injected {op:?} failure"),
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        self.take_fault(DocOp::Create)?;
        if collection.is_empty() {
            return Err(StoreError::invalid("collection name is empty"));
        }

        let mut inner = self.inner.write();
        let now = inner.stamp();
        let doc = Document {
            id: DocumentId::new(),
            collection: collection.to_string(),
            created_at: now,
            updated_at: now,
            fields,
        };
        inner
            .docs
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> StoreResult<Document> {
        self.take_fault(DocOp::Update)?;

        let mut inner = self.inner.write();
        let now = inner.stamp();
        let doc = inner
            .docs
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id.as_str()))?;

        for (key, value) in fields {
            doc.fields.insert(key, value);
        }
        doc.updated_at = now;
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> StoreResult<()> {
        self.take_fault(DocOp::Delete)?;
        if let Some(c) = self.inner.write().docs.get_mut(collection) {
            c.remove(id);
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Document> {
        self.take_fault(DocOp::Get)?;
        self.snapshot(collection, id)
            .ok_or_else(|| StoreError::not_found(collection, id.as_str()))
    }

    async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Document>> {
        self.take_fault(DocOp::List)?;

        let inner = self.inner.read();
        let mut docs: Vec<Document> = inner
            .docs
            .get(collection)
            .map(|c| c.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| query.order.compare(a, b));

        let start = match &query.cursor {
            None => 0,
            Some(cursor) => {
                let exists = inner
                    .docs
                    .get(collection)
                    .map(|c| c.contains_key(cursor.id()))
                    .unwrap_or(false);
                if !exists {
                    return Err(StoreError::InvalidCursor {
                        collection: collection.to_string(),
                        cursor: cursor.to_string(),
                    });
                }
                // A cursor filtered out of the result set still has a position
                // in the total order; resume after where it would sort.
                docs.iter()
                    .position(|d| d.id == *cursor.id())
                    .map(|p| p + 1)
                    .unwrap_or_else(|| {
                        let anchor = &inner.docs[collection][cursor.id()];
                        docs.partition_point(|d| {
                            query.order.compare(d, anchor) != std::cmp::Ordering::Greater
                        })
                    })
            }
        };

        let end = match query.limit {
            Some(limit) => start.saturating_add(limit).min(docs.len()),
            None => docs.len(),
        };
        Ok(docs[start.min(end)..end].to_vec())
    }
}
