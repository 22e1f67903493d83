use wasm_bindgen::JsValue;

use crate::{KeyValueStore, StoreError};

/// `window.localStorage`, with every key prefixed by `namespace`.
pub struct LocalStorage {
    storage: web_sys::Storage,
    namespace: String,
}

impl LocalStorage {
    pub fn new(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StoreError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self {
            storage,
            namespace: namespace.into(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }
}

fn describe(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage
            .get_item(&self.full_key(key))
            .map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: describe(e),
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // quota errors surface here
        self.storage
            .set_item(&self.full_key(key), value)
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                reason: describe(e),
            })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage
            .remove_item(&self.full_key(key))
            .map_err(|e| StoreError::Write {
                key: key.to_string(),
                reason: describe(e),
            })
    }
}
