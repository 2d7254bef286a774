//! Outbound HTTP.

#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserNetwork;

use crate::error::NetworkError;
use crate::http::{RequestSnapshot, ResponseSnapshot};
use std::future::Future;

/// Performs network fetches on behalf of the worker.
///
/// Any HTTP status is a successful fetch; `Err` means the request never
/// produced a response (offline, DNS, CORS, aborted).
pub trait Network: Clone + 'static {
    fn fetch(
        &self,
        request: &RequestSnapshot,
    ) -> impl Future<Output = Result<ResponseSnapshot, NetworkError>>;
}
