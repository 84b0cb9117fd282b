/// Key-value persistence for chrome.storage.local
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Storage keys, one blob each
pub const CUSTOM_GROUPS_KEY: &str = "customGroups";
pub const GROUPING_SETTINGS_KEY: &str = "groupingSettings";
pub const ACTIVITY_KEY: &str = "tabActivityData";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("failed to serialize {key}: {message}")]
    Serialization { key: String, message: String },
}

impl From<StorageError> for JsValue {
    fn from(err: StorageError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// A whole-blob key-value store. Every write replaces the blob under its key.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

impl<S: StorageBackend + ?Sized> StorageBackend for &S {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }
}

/// Read and decode the blob under `key`, falling back to `T::default()` when absent
pub async fn load<T, S>(backend: &S, key: &str) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
    S: StorageBackend,
{
    match backend.get(key).await? {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Encode and write `data` as the blob under `key`
pub async fn save<T, S>(backend: &S, key: &str, data: &T) -> Result<(), StorageError>
where
    T: Serialize,
    S: StorageBackend,
{
    let value = serde_json::to_value(data).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    backend.set(key, value).await
}

/// In-process backend, used by tests and as a fallback when chrome.storage is missing
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RefCell<HashMap<String, Value>>,
    writes: Cell<usize>,
    unavailable: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Make every subsequent call fail, as when the extension context is invalidated
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.blobs.borrow().get(key).cloned()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.get() {
            Err(StorageError::Unavailable("memory storage switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check_available()?;
        Ok(self.blobs.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check_available()?;
        self.blobs.borrow_mut().insert(key.to_string(), value);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

// JS bridge to chrome.storage.local
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;
}

/// chrome.storage.local, reached through the JS bridge. Only usable on wasm32.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorage;

impl StorageBackend for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let js = getStorage(key)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?;

        if js.is_null() || js.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(js)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        // Plain objects, not Maps, so chrome.storage can persist them
        let js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        setStorage(key, js)
            .await
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Blob {
        names: Vec<String>,
    }

    #[test]
    fn test_load_missing_key_returns_default() {
        let storage = MemoryStorage::new();

        let blob: Blob = block_on(load(&storage, "missing")).unwrap();

        assert_eq!(blob, Blob::default());
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();
        let blob = Blob {
            names: vec!["Work".to_string()],
        };

        block_on(save(&storage, "blob", &blob)).unwrap();
        let loaded: Blob = block_on(load(&storage, "blob")).unwrap();

        assert_eq!(loaded, blob);
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.raw("blob"), Some(json!({"names": ["Work"]})));
    }

    #[test]
    fn test_load_null_is_default() {
        let storage = MemoryStorage::new();
        block_on(storage.set("blob", Value::Null)).unwrap();

        let blob: Blob = block_on(load(&storage, "blob")).unwrap();

        assert!(blob.names.is_empty());
    }

    #[test]
    fn test_load_malformed_blob_is_serialization_error() {
        let storage = MemoryStorage::new();
        block_on(storage.set("blob", json!({"names": 5}))).unwrap();

        let result: Result<Blob, _> = block_on(load(&storage, "blob"));

        assert!(matches!(result, Err(StorageError::Serialization { .. })));
    }

    #[test]
    fn test_unavailable_storage_fails_both_ways() {
        let storage = MemoryStorage::new();
        storage.set_unavailable(true);

        assert!(matches!(
            block_on(storage.get("blob")),
            Err(StorageError::Unavailable(_))
        ));
        assert!(block_on(save(&storage, "blob", &Blob::default())).is_err());
        assert_eq!(storage.write_count(), 0);
    }
}
