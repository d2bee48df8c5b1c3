//! Key-value persistence and the keyed collections built on top of it.
//!
//! The store holds three partitions, each a JSON document under its own key:
//! the user list, the consultation list and the current session. In memory a
//! partition becomes a [`Collection`], indexed by record id so lookups and
//! in-place updates do not scan the list.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Consultation, User};

pub const USERS_KEY: &str = "fisiovem_users";
pub const CONSULTATIONS_KEY: &str = "fisiovem_consultations";
pub const CURRENT_USER_KEY: &str = "fisiovem_current_user";

/// String values under string keys, like a browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
///
/// Writes replace the whole file, so two processes writing the same key
/// concurrently end up with whichever wrote last.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn key_file(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_file(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.base_path).map_err(io_err)?;
        fs::write(self.key_file(key), value).map_err(io_err)?;
        debug!(key, bytes = value.len(), "wrote storage key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_file(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Read and decode the JSON document under `key`, if any.
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Json {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// Something with a unique string id.
pub trait Record {
    fn id(&self) -> &str;
}

impl Record for User {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Consultation {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Records in insertion order, indexed by id.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Collection {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item);
        }
        collection
    }

    /// Add a record. A record whose id is already present replaces it in place.
    pub fn insert(&mut self, item: T) -> &T {
        let (position, _) = self.put(item);
        &self.items[position]
    }

    /// Place `item`, returning its position and the record it replaced.
    fn put(&mut self, item: T) -> (usize, Option<T>) {
        match self.index.get(item.id()).copied() {
            Some(position) => {
                let previous = std::mem::replace(&mut self.items[position], item);
                (position, Some(previous))
            }
            None => {
                let position = self.items.len();
                self.index.insert(item.id().to_string(), position);
                self.items.push(item);
                (position, None)
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let position = self.index.remove(id)?;
        let item = self.items.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(item)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        let position = *self.index.get(id)?;
        self.items.get(position)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let position = *self.index.get(id)?;
        self.items.get_mut(position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record + Serialize + DeserializeOwned> Collection<T> {
    /// Load the list stored under `key`; a missing key is an empty collection.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Result<Self, StoreError> {
        let items: Vec<T> = read_json(store, key)?.unwrap_or_default();
        debug!(key, count = items.len(), "loaded collection");
        Ok(Self::from_items(items))
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S, key: &str) -> Result<(), StoreError> {
        write_json(store, key, &self.items)
    }

    /// Insert or replace `item` and persist the collection under `key`.
    ///
    /// When the write fails the collection is put back the way it was, so
    /// memory never holds a change the store refused.
    pub fn commit<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        item: T,
    ) -> Result<&T, StoreError> {
        let id = item.id().to_string();
        let (position, previous) = self.put(item);
        if let Err(err) = self.save(store, key) {
            match previous {
                Some(previous) => self.items[position] = previous,
                None => {
                    self.remove(&id);
                }
            }
            return Err(err);
        }
        Ok(&self.items[position])
    }
}

/// A store whose writes can be made to fail, for exercising error paths.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing: Rc<std::cell::Cell<bool>>,
}

#[cfg(test)]
impl FlakyStore {
    pub(crate) fn fail_writes(&self, failing: bool) {
        self.failing.set(failing);
    }
}

#[cfg(test)]
impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failing.get() {
            return Err(StoreError::Io {
                key: key.to_string(),
                source: std::io::Error::new(ErrorKind::Other, "disk full"),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}
