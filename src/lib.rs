#![warn(clippy::all)]

//! FlowForge offline worker.
//!
//! The background worker behind the FlowForge web tool: it precaches the
//! app shell, serves requests cache-first or network-first, replays queued
//! requests when connectivity returns, and shows push notifications.
//!
//! Built for `wasm32`, [`start`] registers the event listeners on the
//! service worker's global scope. On other targets the handlers in
//! [`worker`] can be driven directly over the in-memory backends.

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod messages;
pub mod network;
pub mod queue;
pub mod worker;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod test_support;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use worker::ServiceWorker;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Starts the worker with the default FlowForge configuration.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    boot(WorkerConfig::default())
}

/// Starts the worker with a configuration object; missing fields take
/// their defaults.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = startWithConfig)]
pub fn start_with_config(config: JsValue) -> Result<(), JsValue> {
    let config: WorkerConfig = if config.is_undefined() || config.is_null() {
        WorkerConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    boot(config)
}

#[cfg(target_arch = "wasm32")]
fn boot(config: WorkerConfig) -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    if let Some(level) = config.log_level_filter().to_level() {
        console_log::init_with_level(level).ok();
    }

    log::info!("Starting FlowForge worker {}", config.version);
    web::install(config)
}
