//! Internal route trees the edge rewrites onto.
//!
//! Page rendering lives in the frontend. These handlers hand it a
//! [`PageContext`] describing which tree matched and the tenant context the
//! router attached.
use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    decision::{X_PATHNAME, X_PROJECT},
    error::AppError,
    request::{CookieJar, SetCookie, append_set_cookies},
    state::AppState,
};

const DEFAULT_SIGN_IN_REDIRECT: &str = "/dash";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContext {
    pub tree: String,
    pub path: String,
    pub pathname: Option<String>,
    pub project: Option<String>,
}

impl PageContext {
    fn new(tree: &str, uri: &Uri, headers: &HeaderMap) -> Self {
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            tree: tree.to_string(),
            path: uri.path().to_string(),
            pathname: header(X_PATHNAME),
            project: header(X_PROJECT),
        }
    }
}

pub async fn home_handler(uri: Uri, headers: HeaderMap) -> Json<PageContext> {
    Json(PageContext::new("home", &uri, &headers))
}

pub async fn dash_handler(uri: Uri, headers: HeaderMap) -> Json<PageContext> {
    Json(PageContext::new("dash", &uri, &headers))
}

/// Tenant pages. Unknown slugs are a 404, which is also where an unmatched
/// custom domain ends up after passing through the router.
pub async fn project_handler(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let slug = params.get("project").map(String::as_str).unwrap_or_default();

    if state.tenants().find_by_slug(slug).await?.is_none() {
        return Ok((StatusCode::NOT_FOUND, format!("Project {slug} not found")).into_response());
    }

    Ok(Json(PageContext::new("project", &uri, &headers)).into_response())
}

pub async fn api_not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    #[serde(rename = "successRedirect")]
    success_redirect: Option<String>,
}

/// Exchanges a sign-in code for a session cookie, then sends the user on.
pub async fn auth_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut cookies = Vec::new();

    if let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) {
        match state.sessions.exchange_code(code).await {
            Ok(lookup) if lookup.session.is_some() => {
                info!("Exchanged auth code for a new session");
                cookies = lookup.cookies;
            }
            Ok(_) => warn!("Auth code was unknown or already used"),
            Err(e) => warn!("Auth code exchange failed: {e}"),
        }
    }

    let target = params
        .success_redirect
        .filter(|r| is_local_path(r))
        .unwrap_or_else(|| DEFAULT_SIGN_IN_REDIRECT.to_string());

    with_cookies(Redirect::temporary(&target).into_response(), &cookies)
}

pub async fn sign_out_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let cookies = state
        .sessions
        .destroy(&CookieJar::from_headers(&headers))
        .await?;

    Ok(with_cookies(StatusCode::NO_CONTENT.into_response(), &cookies))
}

pub async fn health_handler() -> &'static str {
    "ok"
}

/// Same-origin paths only, so the callback cannot bounce users off-site.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

fn with_cookies(mut response: Response, cookies: &[SetCookie]) -> Response {
    append_set_cookies(response.headers_mut(), cookies);
    response
}
