//! Browser glue: wires [`ServiceWorker`] handlers to the global scope's
//! events.
//!
//! Each listener converts the event into snapshot types, runs the handler
//! and keeps the worker alive with `waitUntil` (or `respondWith` for
//! fetches). Handler errors reject that promise so the platform sees them.

pub mod convert;

use crate::cache::BrowserCacheStorage;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::host::BrowserHost;
use crate::http::ResponseSnapshot;
use crate::messages::{ControlMessage, ControlReply, QUEUE_REQUEST};
use crate::network::BrowserNetwork;
use crate::queue::IndexedDbQueueStore;
use crate::worker::fetch::Route;
use crate::worker::ServiceWorker;
use convert::{
    js_error_message, new_queue_record_from_js, request_from_js, response_to_js, scope, to_js,
};
use js_sys::Reflect;
use std::future::Future;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{
    ExtendableEvent, ExtendableMessageEvent, FetchEvent, MessagePort, NotificationEvent, PushEvent,
    ServiceWorkerGlobalScope,
};

type BrowserWorker =
    ServiceWorker<BrowserCacheStorage, BrowserNetwork, IndexedDbQueueStore, BrowserHost>;

impl From<WorkerError> for JsValue {
    fn from(error: WorkerError) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}

/// Builds the worker from `config` and registers every event listener.
pub fn install(config: WorkerConfig) -> Result<(), JsValue> {
    let scope = scope()?;
    let queue = IndexedDbQueueStore::new(&config.queue_database, &config.queue_store);
    let worker = ServiceWorker::new(
        config,
        BrowserCacheStorage::new(),
        BrowserNetwork::new(),
        queue,
        BrowserHost::new()?,
    )?;

    listen(&scope, "install", on_install(worker.clone()))?;
    listen(&scope, "activate", on_activate(worker.clone()))?;
    listen(&scope, "fetch", on_fetch(worker.clone()))?;
    listen(&scope, "sync", on_sync(worker.clone()))?;
    listen(&scope, "message", on_message(worker.clone()))?;
    listen(&scope, "push", on_push(worker.clone()))?;
    listen(&scope, "notificationclick", on_notification_click(worker))?;

    log::info!("Service worker listeners registered");
    Ok(())
}

fn listen(
    scope: &ServiceWorkerGlobalScope,
    event_type: &str,
    handler: impl FnMut(web_sys::Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
    scope.add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())?;
    // Listeners live as long as the worker.
    closure.forget();
    Ok(())
}

/// Extends the event's lifetime until `task` settles.
fn wait_until<F>(event: &ExtendableEvent, label: &'static str, task: F)
where
    F: Future<Output = Result<(), WorkerError>> + 'static,
{
    let promise = future_to_promise(async move {
        match task.await {
            Ok(()) => Ok(JsValue::UNDEFINED),
            Err(e) => {
                log::error!("{} failed: {}", label, e);
                Err(e.into())
            }
        }
    });
    if let Err(e) = event.wait_until(&promise) {
        log::error!("{}: waitUntil rejected: {}", label, js_error_message(&e));
    }
}

fn on_install(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<ExtendableEvent>() else {
            return;
        };
        let worker = worker.clone();
        wait_until(&event, "install", async move {
            worker.on_install().await.map(|_| ())
        });
    }
}

fn on_activate(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<ExtendableEvent>() else {
            return;
        };
        let worker = worker.clone();
        wait_until(&event, "activate", async move {
            worker.on_activate().await.map(|_| ())
        });
    }
}

fn on_fetch(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<FetchEvent>() else {
            return;
        };
        let request = request_from_js(&event.request());
        let route = worker.route(&request);
        if route == Route::Passthrough {
            return;
        }

        let worker = worker.clone();
        let promise = future_to_promise(async move {
            let response = worker
                .serve(route, &request)
                .await
                .unwrap_or_else(|| ResponseSnapshot::offline(&worker.config().offline_message));
            response_to_js(&response).map(JsValue::from)
        });
        if let Err(e) = event.respond_with(&promise) {
            log::error!(
                "respondWith failed for {}: {}",
                event.request().url(),
                js_error_message(&e)
            );
        }
    }
}

fn on_sync(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        // SyncEvent isn't exposed by web-sys; read the tag reflectively.
        let tag = Reflect::get(&event, &JsValue::from_str("tag"))
            .ok()
            .and_then(|tag| tag.as_string())
            .unwrap_or_default();
        let Ok(event) = event.dyn_into::<ExtendableEvent>() else {
            return;
        };
        let worker = worker.clone();
        wait_until(&event, "sync", async move {
            worker.on_sync(&tag).await.map(|_| ())
        });
    }
}

fn post_reply(port: Option<MessagePort>, reply: &ControlReply) -> Result<(), WorkerError> {
    let Some(port) = port else {
        log::debug!("No reply port for {:?}", reply);
        return Ok(());
    };
    let payload = to_js(reply).map_err(|e| WorkerError::Host(js_error_message(&e)))?;
    port.post_message(&payload)
        .map_err(|e| WorkerError::Host(js_error_message(&e)))
}

/// Decodes a control message. `QUEUE_REQUEST` is read field by field so
/// byte bodies survive; everything else goes through serde.
async fn message_from_js(data: JsValue) -> Result<Option<ControlMessage>, WorkerError> {
    let message_type = Reflect::get(&data, &JsValue::from_str("type"))
        .ok()
        .and_then(|t| t.as_string());
    if message_type.as_deref() == Some(QUEUE_REQUEST) {
        let record = new_queue_record_from_js(&data).await?;
        return Ok(Some(ControlMessage::QueueRequest(record)));
    }
    let data: serde_json::Value =
        serde_wasm_bindgen::from_value(data).unwrap_or(serde_json::Value::Null);
    Ok(ControlMessage::parse(data))
}

fn on_message(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<ExtendableMessageEvent>() else {
            return;
        };
        let data = event.data();
        let port = event.ports().get(0).dyn_into::<MessagePort>().ok();

        let worker = worker.clone();
        wait_until(&event, "message", async move {
            let Some(message) = message_from_js(data).await? else {
                return Ok(());
            };
            match worker.on_message(message).await? {
                Some(reply) => post_reply(port, &reply),
                None => Ok(()),
            }
        });
    }
}

fn on_push(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<PushEvent>() else {
            return;
        };
        let payload = event.data().map(|data| data.text());
        let worker = worker.clone();
        wait_until(&event, "push", async move {
            worker
                .on_push(payload.as_deref().map(str::as_bytes))
                .await
                .map(|_| ())
        });
    }
}

fn on_notification_click(worker: BrowserWorker) -> impl FnMut(web_sys::Event) {
    move |event: web_sys::Event| {
        let Ok(event) = event.dyn_into::<NotificationEvent>() else {
            return;
        };
        let notification = event.notification();
        notification.close();

        let action = Reflect::get(&event, &JsValue::from_str("action"))
            .ok()
            .and_then(|action| action.as_string())
            .filter(|action| !action.is_empty());
        let data: serde_json::Value =
            serde_wasm_bindgen::from_value(notification.data()).unwrap_or(serde_json::Value::Null);

        let worker = worker.clone();
        wait_until(&event, "notificationclick", async move {
            worker
                .on_notification_click(action.as_deref(), &data)
                .await
                .map(|_| ())
        });
    }
}
