use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use bf_core::{ArticleDraft, ArticleStore, EnhancedArticleStore};
use bf_enhance::ENHANCE_STEPS;
use bf_progress::{JobProgress, ProgressSink, TrackerSink};
use bf_scraper::MAX_BATCH;

use crate::AppState;

type ApiResponse = (StatusCode, Json<Value>);

fn ok(data: Value) -> ApiResponse {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn created(data: Value) -> ApiResponse {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
}

fn fail(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(json!({ "success": false, "error": message })),
    )
}

fn internal(e: bf_core::Error) -> ApiResponse {
    error!("request failed: {}", e);
    fail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    10
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResponse {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let total = match state.store.count().await {
        Ok(n) => n,
        Err(e) => return internal(e),
    };
    match state.store.list(offset, limit).await {
        Ok(articles) => ok(json!({
            "articles": articles,
            "total": total,
            "page": page,
            "pages": total.div_ceil(limit),
        })),
        Err(e) => internal(e),
    }
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ArticleDraft>,
) -> ApiResponse {
    let record = draft.into_record();
    match state.store.insert(record.clone()).await {
        Ok(()) => created(json!(record)),
        Err(e) => internal(e),
    }
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.store.get(&id).await {
        Ok(Some(article)) => ok(json!(article)),
        Ok(None) => fail(StatusCode::NOT_FOUND, "article not found"),
        Err(e) => internal(e),
    }
}

/// An update never mutates the stored record; it creates a new version
/// linked to the lineage root.
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<ArticleDraft>,
) -> ApiResponse {
    match state.store.create_version(&id, draft).await {
        Ok(record) => created(json!(record)),
        Err(bf_core::Error::NotFound(_)) => fail(StatusCode::NOT_FOUND, "article not found"),
        Err(e) => internal(e),
    }
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.store.delete(&id).await {
        Ok(true) => ok(json!({ "deleted": true })),
        Ok(false) => fail(StatusCode::NOT_FOUND, "article not found"),
        Err(e) => internal(e),
    }
}

pub async fn get_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.store.versions(&id).await {
        Ok(set) => ok(json!(set)),
        Err(bf_core::Error::NotFound(_)) => fail(StatusCode::NOT_FOUND, "article not found"),
        Err(e) => internal(e),
    }
}

pub async fn get_enhanced(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.enhanced.latest_for(&id).await {
        Ok(Some(record)) => ok(json!(record)),
        Ok(None) => fail(StatusCode::NOT_FOUND, "no enhanced version found"),
        Err(e) => internal(e),
    }
}

pub async fn get_enhanced_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    match state.enhanced.all_for(&id).await {
        Ok(records) => ok(json!(records)),
        Err(e) => internal(e),
    }
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    #[serde(default = "default_scrape_count")]
    pub count: usize,
}

fn default_scrape_count() -> usize {
    5
}

/// Kick off a scrape batch. Returns immediately with a job id; the caller
/// polls the progress endpoint.
pub async fn trigger_scrape(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResponse {
    let scraper = match &state.scraper {
        Some(scraper) => Arc::clone(scraper),
        None => {
            return fail(
                StatusCode::SERVICE_UNAVAILABLE,
                "scraping is not configured",
            )
        }
    };

    let count = request.count.clamp(1, MAX_BATCH);
    let job_id = state.tracker.create(JobProgress::batch()).await;
    let sink = TrackerSink::new(state.tracker.clone(), job_id.clone());

    tokio::spawn(async move {
        match scraper.scrape_batch(count, &sink).await {
            Ok(_) => sink.finish().await,
            Err(e) => sink.fail(&e.to_string()).await,
        }
    });

    ok(json!({ "job_id": job_id }))
}

/// Kick off an enhancement run for one article. Returns a job id whose
/// progress carries the named pipeline steps.
pub async fn trigger_enhance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResponse {
    let enhancer = match &state.enhancer {
        Some(enhancer) => Arc::clone(enhancer),
        None => {
            return fail(
                StatusCode::SERVICE_UNAVAILABLE,
                "enhancement is not configured",
            )
        }
    };

    let job_id = state.tracker.create(JobProgress::stepped(ENHANCE_STEPS)).await;
    let sink = TrackerSink::new(state.tracker.clone(), job_id.clone());

    tokio::spawn(async move {
        // The orchestrator reports completion and failure through the sink
        let _ = enhancer.enhance(&id, &sink).await;
    });

    ok(json!({ "job_id": job_id }))
}

/// Poll a running (or recently finished) job. Expired and unknown ids are a
/// plain 404, never a default record.
pub async fn job_progress(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResponse {
    match state.tracker.get(&job_id).await {
        Some(progress) => ok(json!(progress)),
        None => fail(StatusCode::NOT_FOUND, "job not found"),
    }
}
