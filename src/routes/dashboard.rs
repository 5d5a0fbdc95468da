//! HTTP routes for the dashboard
//!
//! - GET    /dashboard/                         - Models the user may open
//! - GET    /dashboard/<app>/<model>/           - List (`?q=`, `?page=`)
//! - POST   /dashboard/<app>/<model>/           - Create
//! - GET    /dashboard/<app>/<model>/<id>/      - Detail
//! - PUT    /dashboard/<app>/<model>/<id>/      - Update
//! - DELETE /dashboard/<app>/<model>/<id>/      - Delete
//!
//! Every route requires a signed-in user.

use chrono::Utc;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use uuid::Uuid;

use super::response::{
    cors_preflight, error_response, get_auth_header, json_response, method_not_allowed,
    no_content, parse_json_body, parse_query, BoxBody, BoxError,
};
use crate::auth::resolve_principal;
use crate::dashboard::{DashboardModel, ListQuery};
use crate::identity::{Principal, User};
use crate::records::{Conversation, JournalEntry, ModelKind, Questionnaire, Video};
use crate::server::AppState;
use crate::types::{EncvError, Result};

/// A parsed dashboard path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardPath {
    Index,
    Model(ModelKind),
    Object(ModelKind, Uuid),
}

impl DashboardPath {
    pub fn parse(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix("/dashboard")
            .ok_or_else(|| EncvError::NotFound(path.to_string()))?;
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Ok(DashboardPath::Index),
            [app, model] => Ok(DashboardPath::Model(ModelKind::from_path(app, model)?)),
            [app, model, id] => {
                let kind = ModelKind::from_path(app, model)?;
                let id = Uuid::parse_str(id)
                    .map_err(|_| EncvError::NotFound(format!("{} {}", kind.verbose_name(), id)))?;
                Ok(DashboardPath::Object(kind, id))
            }
            _ => Err(EncvError::NotFound(path.to_string())),
        }
    }
}

/// Route `/dashboard/*`
pub async fn handle_dashboard_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    route(req, state).await.unwrap_or_else(error_response)
}

async fn route<B>(req: Request<B>, state: Arc<AppState>) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let target = DashboardPath::parse(req.uri().path())?;

    let auth_header = get_auth_header(&req).map(str::to_owned);
    let principal = resolve_principal(&state.store, &state.tokens, auth_header.as_deref()).await?;
    if !principal.authenticated {
        return Err(EncvError::Unauthorized("Authorization required".into()));
    }

    let (kind, id) = match target {
        DashboardPath::Index => {
            if req.method() != Method::GET {
                return Ok(method_not_allowed());
            }
            let models = state.dashboard.index(&principal, Utc::now());
            return Ok(json_response(StatusCode::OK, &serde_json::json!({ "models": models })));
        }
        DashboardPath::Model(kind) => (kind, None),
        DashboardPath::Object(kind, id) => (kind, Some(id)),
    };

    match kind {
        ModelKind::User => dispatch::<User, B>(req, &state, &principal, id).await,
        ModelKind::JournalEntry => dispatch::<JournalEntry, B>(req, &state, &principal, id).await,
        ModelKind::Questionnaire => dispatch::<Questionnaire, B>(req, &state, &principal, id).await,
        ModelKind::Conversation => dispatch::<Conversation, B>(req, &state, &principal, id).await,
        ModelKind::Video => dispatch::<Video, B>(req, &state, &principal, id).await,
    }
}

async fn dispatch<M, B>(
    req: Request<B>,
    state: &AppState,
    principal: &Principal,
    id: Option<Uuid>,
) -> Result<Response<BoxBody>>
where
    M: DashboardModel,
    B: Body,
    B::Error: Into<BoxError>,
{
    let dashboard = &state.dashboard;
    let now = Utc::now();
    let method = req.method().clone();

    match (method, id) {
        (Method::GET, None) => {
            let query: ListQuery = parse_query(&req)?;
            let page = dashboard.list::<M>(principal, &query, now).await?;
            Ok(json_response(StatusCode::OK, &page))
        }
        (Method::POST, None) => {
            let form: M::Form = parse_json_body(req).await?;
            let created = dashboard.create::<M>(principal, form, now).await?;
            Ok(json_response(StatusCode::CREATED, &created))
        }
        (Method::GET, Some(id)) => {
            let detail = dashboard.get::<M>(principal, id, now).await?;
            Ok(json_response(StatusCode::OK, &detail))
        }
        (Method::PUT, Some(id)) => {
            let form: M::Form = parse_json_body(req).await?;
            let updated = dashboard.update::<M>(principal, id, form, now).await?;
            Ok(json_response(StatusCode::OK, &updated))
        }
        (Method::DELETE, Some(id)) => {
            dashboard.delete::<M>(principal, id, now).await?;
            Ok(no_content())
        }
        _ => Ok(method_not_allowed()),
    }
}
