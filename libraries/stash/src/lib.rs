//! Small persistence layer for browser apps that keep all of their state in a
//! string key-value store such as `window.localStorage`.
//!
//! Values are JSON documents. Types opt in through [`Record`], which is where
//! schema versioning happens: the usual shape is a `#[serde(tag = "version")]`
//! enum wrapping the current struct, so old blobs either upgrade or fail to
//! parse instead of being misread.

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod local_storage;

pub use memory::MemoryStore;

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorage;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("record under {key} could not be parsed")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record for {key} could not be serialized")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// A value that is persisted as a JSON document.
pub trait Record: Sized {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error>;
}

/// Typed access to a [`KeyValueStore`]. Implemented for every store.
pub trait RecordStore: KeyValueStore {
    fn load<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        let corrupt = |source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        };
        let json: serde_json::Value = serde_json::from_str(&raw).map_err(corrupt)?;
        R::from_json(&json).map(Some).map_err(corrupt)
    }

    fn save<R: Record>(&mut self, key: &str, record: &R) -> Result<(), StoreError> {
        let json = record.to_json().map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &json.to_string())
    }

    /// Like [`RecordStore::load`], but a record that no longer parses is
    /// treated as missing.
    fn load_or_discard<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        match self.load(key) {
            Err(StoreError::Corrupt { key, source }) => {
                log::warn!("Discarding unreadable record under {key}: {source}");
                Ok(None)
            }
            other => other,
        }
    }
}

impl<T: KeyValueStore + ?Sized> RecordStore for T {}
