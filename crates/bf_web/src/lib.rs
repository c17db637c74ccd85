use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles", post(handlers::create_article))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/articles/:id", put(handlers::update_article))
        .route("/api/articles/:id", delete(handlers::delete_article))
        .route("/api/articles/:id/versions", get(handlers::get_versions))
        .route("/api/articles/:id/enhanced", get(handlers::get_enhanced))
        .route(
            "/api/articles/:id/enhanced/all",
            get(handlers::get_enhanced_all),
        )
        .route("/api/scrape", post(handlers::trigger_scrape))
        .route(
            "/api/scrape/:job_id/progress",
            get(handlers::job_progress),
        )
        .route("/api/enhance/:id", post(handlers::trigger_enhance))
        .route(
            "/api/enhance/:job_id/progress",
            get(handlers::job_progress),
        )
        .layer(cors)
        .with_state(Arc::new(state))
}
