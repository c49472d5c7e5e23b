use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use axum::{
    body::Body,
    http::{Request, Response},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::CorsLayer,
    trace::{DefaultOnRequest, TraceLayer},
};
use tracing::{field, Span};

use crate::auth::session::require_session;
use crate::state::AppState;
use crate::{auth, profiles, recipes, uploads};

pub fn build_app(state: AppState) -> Router {
    let public = Router::new()
        .merge(auth::router())
        .merge(profiles::public_routes())
        .merge(recipes::public_routes())
        .route("/health", get(|| async { "ok" }));

    // Every route in here sees the session layer before anything else.
    let private = Router::new()
        .merge(profiles::private_routes())
        .merge(recipes::private_routes())
        .merge(uploads::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .nest("/api/v1", public.merge(private))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(trace_layer())
}

/// One span per request; the status is filled in once the response is known.
fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> Span + Clone,
    DefaultOnRequest,
    impl Fn(&Response<Body>, Duration, &Span) + Clone,
> {
    TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                status = field::Empty,
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, span: &Span| {
            let status = res.status();
            span.record("status", field::display(status));
            let latency_ms = latency.as_millis() as u64;
            if status.is_server_error() {
                tracing::error!(%status, latency_ms, "response");
            } else {
                tracing::info!(%status, latency_ms, "response");
            }
        })
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
