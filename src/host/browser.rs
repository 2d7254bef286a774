use super::Host;
use crate::error::WorkerError;
use crate::messages::ClientMessage;
use crate::web::convert::{js_error_message, scope, to_js};
use crate::worker::notification::Notification;
use futures_util::future::LocalBoxFuture;
use js_sys::{Array, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{ClientQueryOptions, ClientType, ServiceWorkerGlobalScope, WindowClient};

fn host_error(e: JsValue) -> WorkerError {
    WorkerError::Host(js_error_message(&e))
}

async fn settle(promise: Promise) -> Result<JsValue, WorkerError> {
    JsFuture::from(promise).await.map_err(host_error)
}

/// Host backed by `ServiceWorkerGlobalScope`.
#[derive(Clone)]
pub struct BrowserHost {
    scope: ServiceWorkerGlobalScope,
    origin: url::Url,
}

impl BrowserHost {
    pub fn new() -> Result<Self, WorkerError> {
        let scope = scope().map_err(host_error)?;
        let origin = scope.location().origin();
        let origin = url::Url::parse(&origin)
            .map_err(|e| WorkerError::Host(format!("Invalid origin '{}': {}", origin, e)))?;
        Ok(Self { scope, origin })
    }

    /// Window clients; `include_uncontrolled` also returns pages this worker
    /// doesn't control yet.
    async fn windows(
        &self,
        include_uncontrolled: bool,
    ) -> Result<Vec<web_sys::Client>, WorkerError> {
        let options = ClientQueryOptions::new();
        options.set_type(ClientType::Window);
        options.set_include_uncontrolled(include_uncontrolled);
        let list = settle(self.scope.clients().match_all_with_options(&options)).await?;
        Ok(Array::from(&list)
            .iter()
            .filter_map(|client| client.dyn_into::<web_sys::Client>().ok())
            .collect())
    }
}

impl Host for BrowserHost {
    fn origin(&self) -> &url::Url {
        &self.origin
    }

    async fn skip_waiting(&self) -> Result<(), WorkerError> {
        settle(self.scope.skip_waiting().map_err(host_error)?).await?;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), WorkerError> {
        settle(self.scope.clients().claim()).await?;
        Ok(())
    }

    async fn broadcast(&self, message: &ClientMessage) -> Result<usize, WorkerError> {
        let payload = to_js(message).map_err(host_error)?;
        let clients = self.windows(false).await?;
        let mut delivered = 0;
        for client in &clients {
            match client.post_message(&payload) {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!(
                    "Failed to message client {}: {}",
                    client.id(),
                    js_error_message(&e)
                ),
            }
        }
        Ok(delivered)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), WorkerError> {
        let options = to_js(&notification.options).map_err(host_error)?;
        let promise = self
            .scope
            .registration()
            .show_notification_with_options(&notification.title, options.unchecked_ref())
            .map_err(host_error)?;
        settle(promise).await?;
        Ok(())
    }

    async fn open_or_focus(&self, url: &str) -> Result<(), WorkerError> {
        let target = self
            .origin
            .join(url)
            .map_err(|e| WorkerError::Host(format!("Invalid url '{}': {}", url, e)))?;

        for client in self.windows(true).await? {
            if client.url() != target.as_str() {
                continue;
            }
            if let Ok(window) = client.dyn_into::<WindowClient>() {
                settle(window.focus().map_err(host_error)?).await?;
                return Ok(());
            }
        }

        settle(self.scope.clients().open_window(target.as_str())).await?;
        Ok(())
    }

    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
