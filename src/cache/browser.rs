//! Cache API backend.

use super::CacheStorage;
use crate::error::CacheError;
use crate::http::ResponseSnapshot;
use crate::web::convert::{js_error_message, response_from_js, response_to_js, scope};
use js_sys::Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Cache;

/// Cache storage backed by `self.caches`.
#[derive(Clone, Default)]
pub struct BrowserCacheStorage;

impl BrowserCacheStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Result<web_sys::CacheStorage, CacheError> {
        scope()
            .and_then(|scope| scope.caches())
            .map_err(|e| CacheError::OperationFailed(js_error_message(&e)))
    }

    async fn open(partition: &str) -> Result<Cache, CacheError> {
        let open_failed = |e: JsValue| CacheError::OpenFailed {
            partition: partition.to_string(),
            message: js_error_message(&e),
        };
        let cache = JsFuture::from(Self::storage()?.open(partition))
            .await
            .map_err(open_failed)?;
        cache.dyn_into::<Cache>().map_err(open_failed)
    }
}

fn op_failed(e: JsValue) -> CacheError {
    CacheError::OperationFailed(js_error_message(&e))
}

impl CacheStorage for BrowserCacheStorage {
    async fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> Result<Option<ResponseSnapshot>, CacheError> {
        let cache = Self::open(partition).await?;
        let matched = JsFuture::from(cache.match_with_str(key))
            .await
            .map_err(op_failed)?;
        if matched.is_undefined() || matched.is_null() {
            return Ok(None);
        }
        let response = matched
            .dyn_into::<web_sys::Response>()
            .map_err(op_failed)?;
        response_from_js(response).await.map(Some).map_err(op_failed)
    }

    async fn put(
        &self,
        partition: &str,
        key: &str,
        response: &ResponseSnapshot,
    ) -> Result<(), CacheError> {
        let cache = Self::open(partition).await?;
        let js_response = response_to_js(response).map_err(op_failed)?;
        JsFuture::from(cache.put_with_str(key, &js_response))
            .await
            .map_err(op_failed)?;
        Ok(())
    }

    async fn partition_names(&self) -> Result<Vec<String>, CacheError> {
        let keys = JsFuture::from(Self::storage()?.keys())
            .await
            .map_err(op_failed)?;
        Ok(Array::from(&keys)
            .iter()
            .filter_map(|name| name.as_string())
            .collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, CacheError> {
        let deleted = JsFuture::from(Self::storage()?.delete(partition))
            .await
            .map_err(op_failed)?;
        Ok(deleted.as_bool().unwrap_or(false))
    }
}
