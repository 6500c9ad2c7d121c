use axum::Router;
use axum::middleware::from_fn;
use axum::middleware::from_fn_with_state;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vantage_subscription::Clock;

use crate::handlers;
use crate::middleware::ownership_check;
use crate::middleware::subscription_gate;
use crate::middleware::token_validation;
use crate::state::ApiState;

/// Builds the full HTTP surface. The caller mounts this under whatever
/// prefix it likes (the spec's is `/api/v1`); stage exemptions and the
/// premium-route pattern are matched against paths relative to that mount
/// point, which is what axum's nested routers hand middleware.
pub fn router<C: Clock + 'static>(state: ApiState<C>, cors: CorsLayer) -> Router {
    let company_scoped = Router::new()
        .route(
            "/transactions",
            get(handlers::list_transactions::<C>).post(handlers::create_transaction::<C>),
        )
        .route("/transactions/{id}", delete(handlers::delete_transaction::<C>))
        .route("/reports/pnl", get(handlers::get_pnl::<C>))
        .route("/anomalies", get(handlers::list_anomalies::<C>))
        .route("/anomalies/{id}", delete(handlers::dismiss_anomaly::<C>))
        .layer(from_fn(ownership_check));

    Router::new()
        .route("/auth/register", post(handlers::register::<C>))
        .route("/auth/login", post(handlers::login::<C>))
        .route("/auth/logout", post(handlers::logout::<C>))
        .route("/auth/me", get(handlers::me))
        .route("/subscription/start-trial", post(handlers::start_trial::<C>))
        .route("/subscription/status", get(handlers::subscription_status::<C>))
        .route("/health", get(handlers::health))
        .nest("/{company_id}", company_scoped)
        .layer(from_fn_with_state(state.clone(), subscription_gate::<C>))
        .layer(from_fn_with_state(state.clone(), token_validation::<C>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
