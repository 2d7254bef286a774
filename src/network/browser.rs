use super::Network;
use crate::error::NetworkError;
use crate::http::{RequestSnapshot, ResponseSnapshot};
use crate::web::convert::{js_error_message, request_to_js, response_from_js, scope};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// `fetch()` from the worker's global scope.
#[derive(Clone, Default)]
pub struct BrowserNetwork;

impl BrowserNetwork {
    pub fn new() -> Self {
        Self
    }
}

impl Network for BrowserNetwork {
    async fn fetch(&self, request: &RequestSnapshot) -> Result<ResponseSnapshot, NetworkError> {
        let js_request = request_to_js(request)
            .map_err(|e| NetworkError::InvalidRequest(js_error_message(&e)))?;
        let scope = scope().map_err(|e| NetworkError::FetchFailed {
            url: request.url.clone(),
            message: js_error_message(&e),
        })?;

        let value = JsFuture::from(scope.fetch_with_request(&js_request))
            .await
            .map_err(|e| NetworkError::FetchFailed {
                url: request.url.clone(),
                message: js_error_message(&e),
            })?;
        let response = value
            .dyn_into::<web_sys::Response>()
            .map_err(|e| NetworkError::BodyRead(js_error_message(&e)))?;

        response_from_js(response)
            .await
            .map_err(|e| NetworkError::BodyRead(js_error_message(&e)))
    }
}
