//! Router assembly.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with all routes.
///
/// Backend routes live under `/v1/<mount>/`, lease routes under
/// `/v1/sys/leases/`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/v1/sys/health", get(handlers::sys_health))
        .with_state(state.clone());

    let lease_routes = Router::new()
        .route("/v1/sys/leases/renew", post(handlers::leases::renew))
        .route("/v1/sys/leases/revoke", post(handlers::leases::revoke))
        .route("/v1/sys/leases/lookup", post(handlers::leases::lookup))
        .with_state(state.leases.clone());

    let config_routes = Router::new()
        .route(
            "/config",
            get(handlers::config::read)
                .post(handlers::config::write)
                .patch(handlers::config::update)
                .delete(handlers::config::delete),
        )
        .with_state(state.config_service.clone());

    let role_routes = Router::new()
        .route("/role", get(handlers::roles::list))
        .route(
            "/role/{name}",
            get(handlers::roles::read)
                .post(handlers::roles::write)
                .patch(handlers::roles::update)
                .delete(handlers::roles::delete),
        )
        .with_state(state.roles.clone());

    let creds_routes = Router::new()
        .route(
            "/creds/{name}",
            get(handlers::creds::issue).post(handlers::creds::issue),
        )
        .with_state(state.clone());

    let mount = format!("/v1/{}", state.config.mount_path());
    let backend_routes = Router::new()
        .merge(config_routes)
        .merge(role_routes)
        .merge(creds_routes);

    Router::new()
        .merge(health_routes)
        .merge(lease_routes)
        .nest(&mount, backend_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
