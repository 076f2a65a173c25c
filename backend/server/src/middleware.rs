use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Uri, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;
#[cfg(feature = "verbose")]
use tracing::info;

use crate::{
    decision::{RouteAction, RoutingDecision},
    error::AppError,
    matcher::is_routable,
    request::RequestContext,
    session::SessionGate,
    state::AppState,
};

/// Edge middleware wrapped around the whole route tree, so rewrites land
/// before route matching.
pub async fn route_request(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_routable(request.uri().path()) {
        return next.run(request).await;
    }

    match dispatch(&state, request, next).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn dispatch(state: &AppState, mut request: Request, next: Next) -> Result<Response, AppError> {
    let ctx = RequestContext::from_parts(request.uri(), request.headers())?;

    let (gate, cookies) = SessionGate::evaluate(state.sessions.as_ref(), &ctx.cookies).await;
    let decision = state.router.route(&ctx, &gate, cookies).await;

    debug!(
        host = %ctx.hostname,
        path = %ctx.path,
        branch = decision.branch,
        destination = %decision.destination(&ctx),
        "Routed request"
    );

    #[cfg(feature = "verbose")]
    info!("{} {} -> {:?}", ctx.hostname, ctx.path, decision.action);

    let mut response = match &decision.action {
        RouteAction::Redirect(location) => Redirect::temporary(location).into_response(),
        RouteAction::Rewrite(destination) => {
            rewrite_uri(&mut request, destination)?;
            decision.headers.apply(request.headers_mut());
            next.run(request).await
        }
        RouteAction::PassThrough => {
            decision.headers.apply(request.headers_mut());
            next.run(request).await
        }
    };

    finish(&decision, &mut response);

    Ok(response)
}

fn rewrite_uri(request: &mut Request, destination: &str) -> Result<(), AppError> {
    let path_and_query: PathAndQuery = destination
        .parse()
        .map_err(|_| AppError::InvalidRewrite(destination.to_string()))?;

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);

    *request.uri_mut() =
        Uri::from_parts(parts).map_err(|_| AppError::InvalidRewrite(destination.to_string()))?;

    Ok(())
}

fn finish(decision: &RoutingDecision, response: &mut Response) {
    decision.headers.apply(response.headers_mut());
    decision.apply_cookies(response.headers_mut());
}
