//! Conversions between browser objects and the crate's snapshot types.

use crate::error::QueueError;
use crate::http::{Headers, RequestDestination, RequestSnapshot, ResponseSnapshot};
use crate::queue::{NewQueueRecord, QueueRecord, RecordBody, DEFAULT_METHOD};
use js_sys::{Array, ArrayBuffer, Object, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::ServiceWorkerGlobalScope;

/// Statuses whose responses must be constructed without a body.
const NULL_BODY_STATUSES: [u16; 4] = [101, 204, 205, 304];

/// Returns the worker's global scope.
pub fn scope() -> Result<ServiceWorkerGlobalScope, JsValue> {
    js_sys::global()
        .dyn_into::<ServiceWorkerGlobalScope>()
        .map_err(JsValue::from)
}

/// Serializes to plain JS objects (maps become objects, not `Map`s).
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

pub fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

pub fn headers_from_js(headers: &web_sys::Headers) -> Headers {
    let mut map = Headers::new();
    let Ok(Some(entries)) = js_sys::try_iter(headers) else {
        return map;
    };
    for entry in entries.flatten() {
        let pair = Array::from(&entry);
        if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
            map.insert(name.to_ascii_lowercase(), value);
        }
    }
    map
}

pub fn headers_to_js(headers: &Headers) -> Result<web_sys::Headers, JsValue> {
    let js_headers = web_sys::Headers::new()?;
    for (name, value) in headers {
        js_headers.append(name, value)?;
    }
    Ok(js_headers)
}

fn destination_from_js(destination: web_sys::RequestDestination) -> RequestDestination {
    match destination {
        web_sys::RequestDestination::Document => RequestDestination::Document,
        web_sys::RequestDestination::Script => RequestDestination::Script,
        web_sys::RequestDestination::Style => RequestDestination::Style,
        web_sys::RequestDestination::Image => RequestDestination::Image,
        web_sys::RequestDestination::Font => RequestDestination::Font,
        _ => RequestDestination::Other,
    }
}

/// Snapshots an intercepted request. The body is not read: only GET
/// requests are ever answered by the worker.
pub fn request_from_js(request: &web_sys::Request) -> RequestSnapshot {
    RequestSnapshot {
        method: request.method(),
        url: request.url(),
        headers: headers_from_js(&request.headers()),
        body: None,
        destination: destination_from_js(request.destination()),
    }
}

pub fn request_to_js(request: &RequestSnapshot) -> Result<web_sys::Request, JsValue> {
    let init = web_sys::RequestInit::new();
    init.set_method(&request.method);
    init.set_headers(&headers_to_js(&request.headers)?.into());
    if let Some(body) = &request.body {
        init.set_body(&Uint8Array::from(body.as_slice()));
    }
    web_sys::Request::new_with_str_and_init(&request.url, &init)
}

/// Buffers a live response into a snapshot.
pub async fn response_from_js(response: web_sys::Response) -> Result<ResponseSnapshot, JsValue> {
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(ResponseSnapshot {
        status: response.status(),
        status_text: response.status_text(),
        headers: headers_from_js(&response.headers()),
        body: Uint8Array::new(&buffer).to_vec(),
    })
}

pub fn response_to_js(response: &ResponseSnapshot) -> Result<web_sys::Response, JsValue> {
    let init = web_sys::ResponseInit::new();
    init.set_status(response.status);
    init.set_status_text(&response.status_text);
    init.set_headers(&headers_to_js(&response.headers)?.into());

    if response.body.is_empty() || NULL_BODY_STATUSES.contains(&response.status) {
        return web_sys::Response::new_with_opt_buffer_source_and_init(None, &init);
    }
    let body = Uint8Array::from(response.body.as_slice());
    web_sys::Response::new_with_opt_buffer_source_and_init(
        Some(body.unchecked_ref::<js_sys::Object>()),
        &init,
    )
}

fn get_field(value: &JsValue, name: &str) -> Result<JsValue, QueueError> {
    Reflect::get(value, &JsValue::from_str(name))
        .map_err(|e| QueueError::InvalidRecord(format!("{}: {}", name, js_error_message(&e))))
}

/// Bytes covered by a typed array or `DataView`.
fn view_bytes(view: &JsValue) -> Result<Vec<u8>, QueueError> {
    let buffer = get_field(view, "buffer")?;
    let offset = get_field(view, "byteOffset")?.as_f64().unwrap_or(0.0) as u32;
    let length = get_field(view, "byteLength")?.as_f64().unwrap_or(0.0) as u32;
    Ok(Uint8Array::new_with_byte_offset_and_length(&buffer, offset, length).to_vec())
}

/// Reads a queue record body: a string, an `ArrayBuffer`, a typed array or
/// `DataView`, or a `Blob`. `null` and `undefined` mean no body.
pub async fn queue_body_from_js(value: &JsValue) -> Result<Option<RecordBody>, QueueError> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    if let Some(text) = value.as_string() {
        return Ok(Some(RecordBody::Text(text)));
    }
    if value.is_instance_of::<ArrayBuffer>() {
        return Ok(Some(RecordBody::Bytes(Uint8Array::new(value).to_vec())));
    }
    if ArrayBuffer::is_view(value) {
        return view_bytes(value).map(|bytes| Some(RecordBody::Bytes(bytes)));
    }
    if let Some(blob) = value.dyn_ref::<web_sys::Blob>() {
        let buffer = JsFuture::from(blob.array_buffer())
            .await
            .map_err(|e| QueueError::InvalidRecord(js_error_message(&e)))?;
        return Ok(Some(RecordBody::Bytes(Uint8Array::new(&buffer).to_vec())));
    }
    Err(QueueError::InvalidRecord(format!("unsupported body {:?}", value)))
}

/// Reads headers stored as a plain object. Non-string values are skipped.
fn plain_headers_from_js(value: &JsValue) -> Headers {
    let mut headers = Headers::new();
    let Some(object) = value.dyn_ref::<Object>() else {
        return headers;
    };
    for entry in Object::entries(object).iter() {
        let pair = Array::from(&entry);
        if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
            headers.insert(name.to_ascii_lowercase(), value);
        }
    }
    headers
}

/// Reads a record as pages write it: `{url, method?, headers?, body?}`.
pub async fn new_queue_record_from_js(value: &JsValue) -> Result<NewQueueRecord, QueueError> {
    let url = get_field(value, "url")?
        .as_string()
        .ok_or_else(|| QueueError::InvalidRecord("missing url".to_string()))?;
    let method = get_field(value, "method")?
        .as_string()
        .unwrap_or_else(|| DEFAULT_METHOD.to_string());
    let mut record = NewQueueRecord::new(method, url);
    record.headers = plain_headers_from_js(&get_field(value, "headers")?);
    record.body = queue_body_from_js(&get_field(value, "body")?).await?;
    Ok(record)
}

/// Reads a stored record, including its `id` key.
pub async fn queue_record_from_js(value: &JsValue) -> Result<QueueRecord, QueueError> {
    let id = get_field(value, "id")?
        .as_f64()
        .ok_or_else(|| QueueError::InvalidRecord("missing id".to_string()))?;
    let request = new_queue_record_from_js(value)
        .await
        .map_err(|e| match e {
            QueueError::InvalidRecord(reason) => {
                QueueError::InvalidRecord(format!("#{}: {}", id, reason))
            }
            other => other,
        })?;
    Ok(QueueRecord {
        id: id as u64,
        request,
    })
}

/// Builds the stored form of a record. Byte bodies become `Uint8Array`s.
pub fn queue_record_to_js(record: &NewQueueRecord) -> Result<JsValue, JsValue> {
    let object = Object::new();
    let set = |name: &str, value: &JsValue| Reflect::set(&object, &JsValue::from_str(name), value);
    set("url", &JsValue::from_str(&record.url))?;
    set("method", &JsValue::from_str(&record.method))?;
    set("headers", &to_js(&record.headers)?)?;
    if let Some(body) = &record.body {
        let body = match body {
            RecordBody::Text(text) => JsValue::from_str(text),
            RecordBody::Bytes(bytes) => Uint8Array::from(bytes.as_slice()).into(),
        };
        set("body", &body)?;
    }
    Ok(object.into())
}
