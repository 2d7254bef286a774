//! IndexedDB queue store.
//!
//! ## Schema
//!
//! Database `flowforge-db` (version 1) with a single object store, by
//! default `sync-queue`:
//! - `keyPath: "id"`, `autoIncrement: true`
//! - Value: the record as a plain JS object (`url`, `method`, `headers`, `body`)
//!
//! Records are read field by field rather than through JSON, since pages may
//! store `body` as a string or as bytes (`Uint8Array`, `ArrayBuffer`, `Blob`).

use super::{NewQueueRecord, QueueStore, StoredRecord};
use crate::error::QueueError;
use crate::web::convert::{js_error_message, queue_record_from_js, queue_record_to_js, scope};
use js_sys::Array;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbObjectStoreParameters, IdbRequest, IdbTransaction, IdbTransactionMode,
};

/// Current database schema version.
pub const DATABASE_VERSION: u32 = 1;

/// Queue store backed by IndexedDB.
///
/// The connection is opened lazily and kept for the lifetime of the worker.
#[derive(Clone)]
pub struct IndexedDbQueueStore {
    database_name: Rc<str>,
    store_name: Rc<str>,
    db: Rc<RefCell<Option<IdbDatabase>>>,
}

impl IndexedDbQueueStore {
    pub fn new(database_name: &str, store_name: &str) -> Self {
        Self {
            database_name: Rc::from(database_name),
            store_name: Rc::from(store_name),
            db: Rc::new(RefCell::new(None)),
        }
    }

    /// Returns the open database, opening (and upgrading) it on first use.
    async fn database(&self) -> Result<IdbDatabase, QueueError> {
        if let Some(db) = self.db.borrow().clone() {
            return Ok(db);
        }
        let db = open_database(&self.database_name, &self.store_name).await?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    async fn transaction(
        &self,
        mode: IdbTransactionMode,
    ) -> Result<(IdbTransaction, web_sys::IdbObjectStore), QueueError> {
        let db = self.database().await?;
        let tx = db
            .transaction_with_str_and_mode(&self.store_name, mode)
            .map_err(|e| {
                QueueError::TransactionFailed(format!(
                    "Failed to create transaction: {}",
                    js_error_message(&e)
                ))
            })?;
        let store = tx.object_store(&self.store_name).map_err(|e| {
            QueueError::TransactionFailed(format!("Failed to get store: {}", js_error_message(&e)))
        })?;
        Ok((tx, store))
    }
}

impl QueueStore for IndexedDbQueueStore {
    async fn add(&self, record: &NewQueueRecord) -> Result<u64, QueueError> {
        let value = queue_record_to_js(record)
            .map_err(|e| QueueError::Serialization(js_error_message(&e)))?;
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite).await?;

        let request = store.add(&value).map_err(|e| {
            QueueError::TransactionFailed(format!("Failed to add record: {}", js_error_message(&e)))
        })?;
        let key = wait_for_request(&request).await?;
        wait_for_transaction(&tx).await?;

        key.as_f64().map(|id| id as u64).ok_or_else(|| {
            QueueError::TransactionFailed("Generated key is not a number".to_string())
        })
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>, QueueError> {
        let (_tx, store) = self.transaction(IdbTransactionMode::Readonly).await?;

        let request = store.get_all().map_err(|e| {
            QueueError::TransactionFailed(format!("Failed to get all: {}", js_error_message(&e)))
        })?;
        let result = wait_for_request(&request).await?;

        let mut records = Vec::new();
        for value in Array::from(&result).iter() {
            let record = queue_record_from_js(&value).await;
            if let Err(e) = &record {
                log::debug!("Unreadable queue record: {}", e);
            }
            records.push(record);
        }
        Ok(records)
    }

    async fn delete(&self, id: u64) -> Result<(), QueueError> {
        let (tx, store) = self.transaction(IdbTransactionMode::Readwrite).await?;

        store
            .delete(&JsValue::from_f64(id as f64))
            .map_err(|e| {
                QueueError::TransactionFailed(format!(
                    "Failed to delete record {}: {}",
                    id,
                    js_error_message(&e)
                ))
            })?;
        wait_for_transaction(&tx).await
    }
}

/// Opens the database, creating the queue store on first run.
async fn open_database(database_name: &str, store_name: &str) -> Result<IdbDatabase, QueueError> {
    let factory = scope()
        .and_then(|scope| scope.indexed_db())
        .map_err(|e| QueueError::DatabaseOpenFailed(js_error_message(&e)))?
        .ok_or_else(|| QueueError::DatabaseOpenFailed("IndexedDB not available".to_string()))?;

    let open_request = factory
        .open_with_u32(database_name, DATABASE_VERSION)
        .map_err(|e| QueueError::DatabaseOpenFailed(js_error_message(&e)))?;

    let store = store_name.to_string();
    let onupgradeneeded = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some(db) = event
            .target()
            .and_then(|target| target.dyn_into::<IdbRequest>().ok())
            .and_then(|request| request.result().ok())
            .and_then(|result| result.dyn_into::<IdbDatabase>().ok())
        else {
            log::error!("Upgrade event without a database");
            return;
        };

        if !db.object_store_names().contains(&store) {
            let params = IdbObjectStoreParameters::new();
            params.set_key_path(&JsValue::from_str("id"));
            params.set_auto_increment(true);
            match db.create_object_store_with_optional_parameters(&store, &params) {
                Ok(_) => log::info!("Created {} store", store),
                Err(e) => {
                    log::error!("Failed to create {} store: {}", store, js_error_message(&e))
                }
            }
        }
    }) as Box<dyn FnMut(_)>);

    open_request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));

    let db_result = wait_for_request(&open_request)
        .await
        .map_err(|e| QueueError::DatabaseOpenFailed(e.to_string()))?;
    open_request.set_onupgradeneeded(None);
    drop(onupgradeneeded);

    let db: IdbDatabase = db_result
        .dyn_into()
        .map_err(|_| QueueError::DatabaseOpenFailed("Failed to cast to IdbDatabase".to_string()))?;

    log::info!("Opened IndexedDB {} v{}", database_name, DATABASE_VERSION);
    Ok(db)
}

/// Waits for an IDB request to complete.
async fn wait_for_request(request: &IdbRequest) -> Result<JsValue, QueueError> {
    let (tx, rx) = futures_channel::oneshot::channel::<Result<JsValue, QueueError>>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let tx_success = tx.clone();
    let success_request = request.clone();
    let onsuccess = Closure::wrap(Box::new(move |_: web_sys::Event| {
        let result = success_request.result().unwrap_or(JsValue::UNDEFINED);
        if let Some(tx) = tx_success.borrow_mut().take() {
            let _ = tx.send(Ok(result));
        }
    }) as Box<dyn FnMut(_)>);

    let tx_error = tx;
    let error_request = request.clone();
    let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
        let error_msg = error_request
            .error()
            .ok()
            .flatten()
            .map(|e| e.message())
            .unwrap_or_else(|| "Unknown error".to_string());
        if let Some(tx) = tx_error.borrow_mut().take() {
            let _ = tx.send(Err(QueueError::TransactionFailed(error_msg)));
        }
    }) as Box<dyn FnMut(_)>);

    request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
    request.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    let result = rx
        .await
        .map_err(|_| QueueError::TransactionFailed("Channel closed".to_string()))?;

    request.set_onsuccess(None);
    request.set_onerror(None);

    drop(onsuccess);
    drop(onerror);

    result
}

/// Waits for an IDB transaction to commit.
async fn wait_for_transaction(tx: &IdbTransaction) -> Result<(), QueueError> {
    let (sender, rx) = futures_channel::oneshot::channel::<Result<(), QueueError>>();
    let sender = Rc::new(RefCell::new(Some(sender)));

    let tx_complete = sender.clone();
    let oncomplete = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tx) = tx_complete.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    }) as Box<dyn FnMut(_)>);

    let tx_error = sender.clone();
    let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tx) = tx_error.borrow_mut().take() {
            let _ = tx.send(Err(QueueError::TransactionFailed("Transaction error".to_string())));
        }
    }) as Box<dyn FnMut(_)>);

    let tx_abort = sender;
    let onabort = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tx) = tx_abort.borrow_mut().take() {
            let _ = tx.send(Err(QueueError::TransactionFailed("Transaction aborted".to_string())));
        }
    }) as Box<dyn FnMut(_)>);

    tx.set_oncomplete(Some(oncomplete.as_ref().unchecked_ref()));
    tx.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    tx.set_onabort(Some(onabort.as_ref().unchecked_ref()));

    let result = rx
        .await
        .map_err(|_| QueueError::TransactionFailed("Channel closed".to_string()))?;

    tx.set_oncomplete(None);
    tx.set_onerror(None);
    tx.set_onabort(None);

    drop(oncomplete);
    drop(onerror);
    drop(onabort);

    result
}
