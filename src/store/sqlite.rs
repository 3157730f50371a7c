use super::{CollectionPath, DocPath, Document, DocumentStore, StoreError, StoreResult};
use crate::db;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

/// Document store over a single SQLite table. Collection order is rowid
/// order, which upserts preserve.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn meta_get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |r| r.get(0))
            .optional()?)
    }

    pub fn meta_set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO meta(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    fn read_body(&self, collection: &str, id: &str) -> StoreResult<Option<Map<String, Value>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(text) => Ok(Some(parse_body(&text)?)),
            None => Ok(None),
        }
    }

    fn write_body(&self, collection: &str, id: &str, body: &Map<String, Value>) -> StoreResult<()> {
        let text = serde_json::to_string(body)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents(collection, id, body, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            (collection, id, &text, &now, &now),
        )?;
        Ok(())
    }
}

fn parse_body(text: &str) -> StoreResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

impl DocumentStore for SqliteStore {
    fn get_all(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([collection.key()], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, body)| {
                Ok(Document {
                    id,
                    data: parse_body(&body)?,
                })
            })
            .collect()
    }

    fn get(&self, doc: &DocPath) -> StoreResult<Option<Document>> {
        Ok(self
            .read_body(&doc.collection().key(), doc.id())?
            .map(|data| Document {
                id: doc.id().to_string(),
                data,
            }))
    }

    fn add(&self, collection: &CollectionPath, data: Map<String, Value>) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.write_body(&collection.key(), &id, &data)?;
        Ok(id)
    }

    fn set(&self, doc: &DocPath, data: Map<String, Value>) -> StoreResult<()> {
        self.write_body(&doc.collection().key(), doc.id(), &data)
    }

    fn update(&self, doc: &DocPath, patch: Map<String, Value>) -> StoreResult<()> {
        let key = doc.collection().key();
        let tx = self.conn.unchecked_transaction()?;
        let Some(mut body) = self.read_body(&key, doc.id())? else {
            return Err(StoreError::NotFound(doc.to_string()));
        };
        body.extend(patch);
        self.write_body(&key, doc.id(), &body)?;
        tx.commit()?;
        Ok(())
    }

    fn merge(&self, doc: &DocPath, patch: Map<String, Value>) -> StoreResult<()> {
        let key = doc.collection().key();
        let tx = self.conn.unchecked_transaction()?;
        let mut body = self.read_body(&key, doc.id())?.unwrap_or_default();
        body.extend(patch);
        self.write_body(&key, doc.id(), &body)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, doc: &DocPath) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            (doc.collection().key(), doc.id()),
        )?;
        Ok(())
    }

    fn delete_all(&self, collection: &CollectionPath) -> StoreResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM documents WHERE collection = ?",
            [collection.key()],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    fn students() -> CollectionPath {
        CollectionPath::new(["grades", "prim1", "students"]).expect("path")
    }

    #[test]
    fn add_then_get_all_keeps_insertion_order() {
        let store = SqliteStore::in_memory().expect("store");
        let a = store.add(&students(), body(json!({ "name": "B" }))).expect("add");
        let b = store.add(&students(), body(json!({ "name": "A" }))).expect("add");

        // Overwriting the first document must not move it to the end.
        store
            .set(&students().doc(&a).expect("doc"), body(json!({ "name": "B2" })))
            .expect("set");

        let all = store.get_all(&students()).expect("all");
        let ids: Vec<&str> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str()]);
        assert_eq!(all[0].data.get("name"), Some(&json!("B2")));
    }

    #[test]
    fn update_requires_existing_document_and_merges_shallowly() {
        let store = SqliteStore::in_memory().expect("store");
        let missing = students().doc("nope").expect("doc");
        let e = store.update(&missing, body(json!({ "name": "x" })));
        assert!(matches!(e, Err(StoreError::NotFound(_))));

        let id = store
            .add(
                &students(),
                body(json!({ "name": "A", "payments": { "august": true } })),
            )
            .expect("add");
        let doc = students().doc(&id).expect("doc");
        store
            .update(&doc, body(json!({ "name": "Z" })))
            .expect("update");
        let got = store.get(&doc).expect("get").expect("exists");
        assert_eq!(got.data.get("name"), Some(&json!("Z")));
        assert_eq!(
            got.data.get("payments"),
            Some(&json!({ "august": true }))
        );
    }

    #[test]
    fn merge_creates_missing_documents() {
        let store = SqliteStore::in_memory().expect("store");
        let memos = CollectionPath::new(["grades", "prim1", "memos"]).expect("path");
        let doc = memos.doc("s1").expect("doc");
        store
            .merge(&doc, body(json!({ "term1": "pending" })))
            .expect("merge");
        store
            .merge(&doc, body(json!({ "term2": "received" })))
            .expect("merge");
        let got = store.get(&doc).expect("get").expect("exists");
        assert_eq!(
            Value::Object(got.data),
            json!({ "term1": "pending", "term2": "received" })
        );
    }

    #[test]
    fn delete_is_idempotent_and_delete_all_is_scoped() {
        let store = SqliteStore::in_memory().expect("store");
        let other = CollectionPath::new(["grades", "prim2", "students"]).expect("path");
        let id = store.add(&students(), Map::new()).expect("add");
        store.add(&students(), Map::new()).expect("add");
        store.add(&other, Map::new()).expect("add");

        let doc = students().doc(&id).expect("doc");
        store.delete(&doc).expect("delete");
        store.delete(&doc).expect("delete again");

        assert_eq!(store.delete_all(&students()).expect("delete all"), 1);
        assert_eq!(store.get_all(&other).expect("other").len(), 1);
    }

    #[test]
    fn meta_values_upsert() {
        let store = SqliteStore::in_memory().expect("store");
        assert_eq!(store.meta_get("k").expect("get"), None);
        store.meta_set("k", "1").expect("set");
        store.meta_set("k", "2").expect("set");
        assert_eq!(store.meta_get("k").expect("get").as_deref(), Some("2"));
    }
}
