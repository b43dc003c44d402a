//! Response envelope and request helpers shared by every route
//!
//! Every response body is `{status, message, data}` with `status` either
//! `"success"` or `"error"`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE,
};
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use bson::{Bson, Document};

use crate::auth::{extract_token_from_header, AccessGate, Caller, JwtValidator};
use crate::types::{ErrorKind, FolioError, Result};

pub type FullBody = Full<Bytes>;

/// Error bound for request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct Envelope<'a> {
    status: &'a str,
    message: &'a str,
    data: Value,
}

fn with_headers(status: StatusCode, body: Vec<u8>) -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn envelope(status: StatusCode, outcome: &str, message: &str, data: Value) -> Response<FullBody> {
    let body = serde_json::to_vec(&Envelope {
        status: outcome,
        message,
        data,
    })
    .unwrap_or_else(|_| b"{}".to_vec());
    with_headers(status, body)
}

/// `200` success envelope
pub fn success(message: &str, data: Value) -> Response<FullBody> {
    envelope(StatusCode::OK, "success", message, data)
}

/// `201` success envelope
pub fn created(message: &str, data: Value) -> Response<FullBody> {
    envelope(StatusCode::CREATED, "success", message, data)
}

/// Error envelope with an explicit status
pub fn error_response(status: StatusCode, message: &str) -> Response<FullBody> {
    envelope(status, "error", message, Value::Null)
}

/// HTTP status for an error kind
pub fn status_for(err: &FolioError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Timeout | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error envelope for a failed operation
pub fn failure(err: &FolioError) -> Response<FullBody> {
    let status = status_for(err);
    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    error_response(status, &err.to_string())
}

/// CORS preflight response
pub fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

pub fn not_found_response(path: &str) -> Response<FullBody> {
    error_response(StatusCode::NOT_FOUND, &format!("No route for {path}"))
}

pub fn method_not_allowed() -> Response<FullBody> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// JSON form of a BSON value: ObjectIds as hex, timestamps as RFC 3339
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => Value::String(dt.to_chrono().to_rfc3339()),
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(k, v)| (k, bson_to_json(v)))
            .collect::<Map<String, Value>>(),
    )
}

/// Encode a stored record for a response body
pub fn record_to_json<T: Serialize>(record: &T) -> Result<Value> {
    Ok(document_to_json(bson::to_document(record)?))
}

/// Read and decode a JSON request body
///
/// Reading stops once the body exceeds [`MAX_BODY_BYTES`].
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                FolioError::InvalidArgument("Request body too large".into())
            } else {
                FolioError::InvalidArgument(format!("Failed to read body: {e}"))
            }
        })?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|e| FolioError::InvalidArgument(format!("Invalid JSON: {e}")))
}

fn get_auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Verified caller from the bearer token
pub fn require_caller(headers: &HeaderMap, jwt: &JwtValidator) -> Result<Caller> {
    let token = extract_token_from_header(get_auth_header(headers))
        .ok_or_else(|| FolioError::Unauthorized("No token provided".into()))?;
    jwt.verify_token(token).into_claims().map(Caller::from)
}

/// Verified caller holding the admin flag
pub fn require_admin(headers: &HeaderMap, jwt: &JwtValidator) -> Result<Caller> {
    let caller = require_caller(headers, jwt)?;
    AccessGate::require_admin(&caller)?;
    Ok(caller)
}

/// Caller if a token was sent; an invalid token is still an error
pub fn optional_caller(headers: &HeaderMap, jwt: &JwtValidator) -> Result<Option<Caller>> {
    match get_auth_header(headers) {
        None => Ok(None),
        Some(_) => require_caller(headers, jwt).map(Some),
    }
}
