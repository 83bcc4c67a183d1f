use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

/// The Store is responsible for managing binary key-value pairs shared by every connection.
/// Each operation on a single key is atomic, and operations on different keys rarely wait on
/// each other. The store can be shared and cloned cheaply using reference counting.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

struct InnerStore {
    entries: DashMap<Bytes, Bytes>,
}

impl Store {
    pub fn new() -> Store {
        let inner = Arc::new(InnerStore {
            entries: DashMap::new(),
        });

        Self { inner }
    }

    /// Sets `key` to `value`, overwriting any previous value.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.inner.entries.insert(key, value);
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.inner.entries.get(key).map(|value| value.clone())
    }

    /// Removes `key`, returning whether it was present.
    pub fn del(&self, key: &[u8]) -> bool {
        self.inner.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_get_del() {
        let store = Store::new();

        store.set(Bytes::from("k"), Bytes::from("v1"));
        assert_eq!(store.get(b"k"), Some(Bytes::from("v1")));

        store.set(Bytes::from("k"), Bytes::from("v2"));
        assert_eq!(store.get(b"k"), Some(Bytes::from("v2")));
        assert_eq!(store.len(), 1);

        assert!(store.del(b"k"));
        assert_eq!(store.get(b"k"), None);
        assert!(!store.del(b"k"));
        assert!(store.is_empty());
    }

    #[test]
    fn binary_keys() {
        let store = Store::new();
        let key = Bytes::from_static(b"\0\r\n\xff");

        store.set(key.clone(), Bytes::from_static(b"\x01"));

        assert_eq!(store.get(&key), Some(Bytes::from_static(b"\x01")));
        assert_eq!(store.get(b"\0\r\n"), None);
    }

    #[test]
    fn clones_share_entries() {
        let store = Store::default();
        let other = store.clone();

        store.set(Bytes::from("shared"), Bytes::from("yes"));

        assert_eq!(other.get(b"shared"), Some(Bytes::from("yes")));
    }

    #[test]
    fn concurrent_sets_on_one_key() {
        let store = Store::new();
        let values: Vec<Bytes> = (0..64)
            .map(|i| Bytes::from(format!("value-{i}-").repeat(64)))
            .collect();

        thread::scope(|s| {
            for value in &values {
                let store = store.clone();
                s.spawn(move || store.set(Bytes::from("k"), value.clone()));
            }
        });

        let value = store.get(b"k").unwrap();
        assert!(values.contains(&value));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_operations_on_distinct_keys() {
        let store = Store::new();

        thread::scope(|s| {
            for t in 0..8 {
                let store = store.clone();
                s.spawn(move || {
                    for i in 0..500 {
                        let key = Bytes::from(format!("{t}:{i}"));
                        store.set(key.clone(), Bytes::from(i.to_string()));
                        if i % 2 == 0 {
                            assert!(store.del(&key));
                        }
                    }
                });
            }
        });

        assert_eq!(store.len(), 8 * 250);
        assert_eq!(store.get(b"3:7"), Some(Bytes::from("7")));
        assert_eq!(store.get(b"3:8"), None);
    }
}
