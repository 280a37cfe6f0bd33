use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;

use crate::keyed::{KeyedStore, StoreError};

/// In-memory KeyedStore for testing and local development.
///
/// Clones share the same backing map, so two clones behave like two clients
/// of one backend (e.g. two browser tabs).
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: Mutex<BTreeMap<String, Value>>,
    watchers: Mutex<Vec<Watcher>>,
}

#[derive(Debug)]
struct Watcher {
    prefix: String,
    tx: watch::Sender<Vec<(String, Value)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn children_of(records: &BTreeMap<String, Value>, prefix: &str) -> Vec<(String, Value)> {
        records
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Push the current child list to every watcher of a prefix touched by
    /// `key`, and drop watchers whose receivers are gone.
    fn notify(&self, key: &str) {
        let records = self.inner.records.lock().unwrap();
        let mut watchers = self.inner.watchers.lock().unwrap();
        watchers.retain(|w| !w.tx.is_closed());
        for w in watchers.iter() {
            if key.starts_with(w.prefix.as_str()) {
                let _ = w.tx.send(Self::children_of(&records, &w.prefix));
            }
        }
    }
}

impl KeyedStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.inner.records.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner
            .records
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
        self.notify(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.records.lock().unwrap().remove(key);
        self.notify(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let records = self.inner.records.lock().unwrap();
        Ok(Self::children_of(&records, prefix))
    }

    fn watch(&self, prefix: &str) -> watch::Receiver<Vec<(String, Value)>> {
        let records = self.inner.records.lock().unwrap();
        let (tx, rx) = watch::channel(Self::children_of(&records, prefix));
        drop(records);
        self.inner.watchers.lock().unwrap().push(Watcher {
            prefix: prefix.to_string(),
            tx,
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_read_delete() {
        let store = MemoryStore::new();

        assert!(store.read("a/b").await.unwrap().is_none());

        store.write("a/b", json!({"n": 1})).await.unwrap();
        assert_eq!(store.read("a/b").await.unwrap(), Some(json!({"n": 1})));

        // Overwrite
        store.write("a/b", json!({"n": 2})).await.unwrap();
        assert_eq!(store.read("a/b").await.unwrap(), Some(json!({"n": 2})));

        store.delete("a/b").await.unwrap();
        assert!(store.read("a/b").await.unwrap().is_none());

        // Deleting an absent key is a no-op
        store.delete("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_backing_map() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.write("k", json!("v")).await.unwrap();
        assert_eq!(other.read("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = MemoryStore::new();
        store.write("games/1", json!({"name": "a"})).await.unwrap();
        store.write("games/2", json!({"name": "b"})).await.unwrap();
        store.write("other/3", json!({"name": "c"})).await.unwrap();

        let games = store.list("games/").await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].0, "games/1");
        assert_eq!(games[1].0, "games/2");

        assert!(store.list("nope/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_sees_mutations() {
        let store = MemoryStore::new();
        store.write("games/1", json!({"name": "first"})).await.unwrap();

        let mut rx = store.watch("games/");
        assert_eq!(rx.borrow().len(), 1);

        store.write("games/2", json!({"name": "second"})).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);

        // Writes outside the prefix do not wake the watcher
        store.write("other/x", json!(0)).await.unwrap();
        assert!(!rx.has_changed().unwrap());

        store.delete("games/1").await.unwrap();
        rx.changed().await.unwrap();
        let children = rx.borrow_and_update().clone();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, "games/2");
    }
}
