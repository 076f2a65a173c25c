use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::request::{RequestContext, SetCookie, append_set_cookies};

pub const X_PATHNAME: HeaderName = HeaderName::from_static("x-pathname");
pub const X_PROJECT: HeaderName = HeaderName::from_static("x-project");
pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteAction {
    /// Serve a different internal route without changing the visible URL.
    Rewrite(String),
    PassThrough,
    Redirect(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteHeaders {
    pub pathname: Option<String>,
    pub project: Option<String>,
    pub powered_by: Option<String>,
}

impl RouteHeaders {
    pub fn tenant(ctx: &RequestContext, project: &str) -> Self {
        Self {
            pathname: Some(ctx.path.clone()),
            project: Some(project.to_string()),
            powered_by: None,
        }
    }

    pub fn powered_by(mut self, marker: &str) -> Self {
        self.powered_by = Some(marker.to_string());
        self
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            (X_PATHNAME, &self.pathname),
            (X_PROJECT, &self.project),
            (X_POWERED_BY, &self.powered_by),
        ];

        for (name, value) in pairs {
            if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(name, value);
            }
        }
    }
}

/// The complete outcome of routing one request.
///
/// Built once per request and applied once: to the forwarded request before
/// the route tree sees it, and to whatever response comes back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingDecision {
    pub branch: &'static str,
    pub action: RouteAction,
    pub headers: RouteHeaders,
    pub cookies: Vec<SetCookie>,
}

impl RoutingDecision {
    pub fn pass_through(branch: &'static str) -> Self {
        Self::new(branch, RouteAction::PassThrough, RouteHeaders::default())
    }

    pub fn new(branch: &'static str, action: RouteAction, headers: RouteHeaders) -> Self {
        Self {
            branch,
            action,
            headers,
            cookies: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<SetCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Internal path (and query) the request is served from.
    pub fn destination(&self, ctx: &RequestContext) -> String {
        match &self.action {
            RouteAction::Rewrite(destination) => destination.clone(),
            RouteAction::PassThrough | RouteAction::Redirect(_) => ctx.path_and_query(),
        }
    }

    pub fn apply_cookies(&self, headers: &mut HeaderMap) {
        append_set_cookies(headers, &self.cookies);
    }
}
