//! HTTP routes for authentication
//!
//! - POST /auth/login  - Check credentials and get a JWT
//! - POST /auth/logout - Client-side token discard; acknowledged only
//! - GET  /auth/me     - Current user from the bearer token

use chrono::Utc;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::response::{
    cors_preflight, error_response, get_auth_header, json_response, not_found_response,
    parse_json_body, BoxBody, BoxError,
};
use crate::auth::{resolve_principal, sign_in};
use crate::identity::{Role, Strand, User};
use crate::server::AppState;
use crate::types::{EncvError, Result};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
    pub role: Option<Role>,
    pub strand: Option<Strand>,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub role: Option<Role>,
    pub strand: Option<Strand>,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

/// POST /auth/login
async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body: LoginRequest = parse_json_body(req).await?;

    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(EncvError::BadRequest(
            "Missing required fields: username, password".into(),
        ));
    }

    let user = sign_in(&state.store, &body.username, &body.password, Utc::now()).await?;
    Ok(json_response(StatusCode::OK, &auth_response(&state, &user)?))
}

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse> {
    let now = Utc::now();
    Ok(AuthResponse {
        token: state.tokens.issue(user, now)?,
        username: user.username.clone(),
        role: user.role,
        strand: user.participant_strand,
        expires_at: state.tokens.expires_at(now).timestamp(),
    })
}

/// GET /auth/me
async fn handle_me(auth_header: Option<String>, state: Arc<AppState>) -> Result<Response<BoxBody>> {
    let principal = resolve_principal(&state.store, &state.tokens, auth_header.as_deref()).await?;
    let Some(id) = principal.id.filter(|_| principal.authenticated) else {
        return Err(EncvError::Unauthorized("Authorization required".into()));
    };

    Ok(json_response(
        StatusCode::OK,
        &MeResponse {
            user_id: id.to_string(),
            username: principal.username.clone(),
            role: principal.role,
            strand: principal.strand,
            is_admin: principal.is_admin(),
        },
    ))
}

/// Route `/auth/*`. Returns `None` for paths outside this module.
pub async fn handle_auth_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    if !path.starts_with("/auth") {
        return None;
    }

    let result = match (method, path.trim_end_matches('/')) {
        (Method::OPTIONS, _) => Ok(cors_preflight()),
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::POST, "/auth/logout") => Ok(json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Logged out".into(),
            },
        )),
        (Method::GET, "/auth/me") => {
            let auth_header = get_auth_header(&req).map(str::to_owned);
            handle_me(auth_header, state).await
        }
        _ => Ok(not_found_response(&path)),
    };

    Some(result.unwrap_or_else(error_response))
}
