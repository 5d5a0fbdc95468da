//! Shared response and request helpers for route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::EncvError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Error type of request bodies handlers accept
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Largest JSON body accepted by form endpoints
pub const MAX_JSON_BODY: usize = 256 * 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    add_cors_headers(headers);
    response
}

fn add_cors_headers(headers: &mut hyper::HeaderMap) {
    use hyper::header::HeaderValue;
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// Map an error to its status code and a JSON body
pub fn error_response(err: EncvError) -> Response<BoxBody> {
    let status = err.status_code();
    let code = err.code().to_string();
    let message = match &err {
        // Internal details stay in the logs
        EncvError::Database(_) | EncvError::Internal(_) | EncvError::Export(_) => {
            tracing::error!("{}", err);
            "Internal server error".to_string()
        }
        _ => err.to_string(),
    };

    json_response(
        status,
        &ErrorResponse {
            error: message,
            code: Some(code),
        },
    )
}

pub fn no_content() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    add_cors_headers(response.headers_mut());
    response
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = no_content();
    response.headers_mut().insert(
        "Access-Control-Max-Age",
        hyper::header::HeaderValue::from_static("86400"),
    );
    response
}

/// File download with the given content type and file name
pub fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header(hyper::header::CONTENT_TYPE, content_type)
        .header(
            hyper::header::CONTENT_DISPOSITION,
            format!("inline; filename={file_name}"),
        )
        .body(full_body(bytes))
        .unwrap_or_else(|e| {
            error_response(EncvError::Internal(format!("Failed to build response: {e}")))
        })
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: Some("METHOD_NOT_ALLOWED".into()),
        },
    )
}

/// Read and decode a JSON request body of at most [`MAX_JSON_BODY`] bytes.
/// Reading stops as soon as the limit is crossed.
pub async fn parse_json_body<T, B>(req: Request<B>) -> Result<T, EncvError>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(req.into_body(), MAX_JSON_BODY)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                EncvError::BadRequest("Request body too large".into())
            } else {
                EncvError::BadRequest(format!("Failed to read body: {}", e))
            }
        })?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|e| EncvError::BadRequest(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Decode the query string into `T`; a missing query decodes from ""
pub fn parse_query<T: DeserializeOwned, B>(req: &Request<B>) -> Result<T, EncvError> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| EncvError::BadRequest(format!("Invalid query string: {}", e)))
}
