pub mod health;
pub mod llm;

use crate::middleware::{
    auth::{require_bearer_auth, JwtAuth},
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

/// All routes; `/create` and `/generate_questions` sit behind the bearer
/// check and the request-rate limiter.
pub fn router(state: AppState, auth: JwtAuth, api_rps: u32) -> Router {
    let base_routes = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health));

    let llm_api = Router::new()
        .route("/create", get(llm::create_text))
        .route("/generate_questions", post(llm::generate_questions))
        .layer(from_fn_with_state(auth, require_bearer_auth))
        .layer(from_fn_with_state(RateLimiter::new(api_rps), rps_middleware));

    base_routes.merge(llm_api).with_state(state)
}
