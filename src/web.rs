use crate::{
    app::{AppError, ItemService},
    eid::Eid,
    items::{ItemDraft, ItemPatch, ItemType},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

#[derive(Clone)]
struct SharedState {
    app: Arc<RwLock<ItemService>>,
}

async fn start_app(app: ItemService, listen_addr: String) {
    let uploads_dir = app.uploads_dir().clone();
    let app = Arc::new(RwLock::new(app));

    let signal = shutdown_signal(app.clone());
    let shared_state = Arc::new(SharedState { app: app.clone() });

    async fn shutdown_signal(app: Arc<RwLock<ItemService>>) {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {
                let mut app = app.write().await;
                app.shutdown();

                log::warn!("waiting for task queue to stop");
                app.wait_task_queue_finish();
            },
            _ = terminate => {},
        }
    }

    let router = build_router(shared_state, uploads_dir);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
        .unwrap();
}

fn build_router(shared_state: Arc<SharedState>, uploads_dir: std::path::PathBuf) -> Router {
    Router::new()
        .nest_service("/uploads", tower_http::services::ServeDir::new(uploads_dir))
        .route("/api/items", post(create_item).get(list_items))
        .route("/api/items/search", get(nl_search))
        .route("/api/items/semantic-search", get(semantic_search))
        .route("/api/items/upload", post(upload_image))
        .route("/api/items/:id", put(update_item).delete(delete_item))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

/// Standalone router over a service, used by the daemon and by tests.
pub fn router(service: ItemService) -> Router {
    let uploads_dir = service.uploads_dir().clone();
    let shared_state = Arc::new(SharedState {
        app: Arc::new(RwLock::new(service)),
    });

    build_router(shared_state, uploads_dir)
}

pub fn start_daemon(app: ItemService, listen_addr: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app, listen_addr).await });
}

// Wraps `AppError` so axum knows how to answer with it.
#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({"message": "Item not found"}).to_string(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({"message": msg}).to_string(),
            ),
            AppError::Store(msg) => {
                log::error!("store failure: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"message": "Internal server error", "error": msg}).to_string(),
                )
            }
            AppError::Other(err) => {
                log::error!("{err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"message": "Internal server error", "error": err.to_string()})
                        .to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn health() -> axum::Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn create_item(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ItemDraft>,
) -> Result<(StatusCode, axum::Json<serde_json::Value>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let item = app.create(payload)?;

        Ok((
            StatusCode::CREATED,
            Json(json!({"message": "Item saved successfully", "item": item})),
        ))
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ListItemsParams {
    q: Option<String>,
    #[serde(rename = "type")]
    item_type: Option<String>,
}

async fn list_items(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<ListItemsParams>,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    log::debug!("params: {params:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();

        // an unknown type filter matches nothing rather than everything
        let item_type = match params.item_type.as_deref() {
            Some(value) => match ItemType::parse(value) {
                Some(item_type) => Some(item_type),
                None => {
                    return Ok(Json(
                        json!({"message": "Fetched items", "items": Vec::<()>::new()}),
                    ))
                }
            },
            None => None,
        };

        let items = app.list(params.q.as_deref(), item_type)?;

        Ok(Json(json!({"message": "Fetched items", "items": items})))
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

async fn nl_search(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SearchParams>,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    log::debug!("params: {params:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let query_text = params.query.unwrap_or_default();
        let (parsed, items) = app.nl_search(&query_text, None)?;

        Ok(Json(json!({
            "query": query_text,
            "parsedParams": parsed,
            "count": items.len(),
            "items": items,
        })))
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SemanticSearchParams {
    query: Option<String>,
    limit: Option<usize>,
}

async fn semantic_search(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SemanticSearchParams>,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    log::debug!("params: {params:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let query_text = params.query.unwrap_or_default();
        let search = app.semantic_search(&query_text, params.limit)?;

        Ok(Json(json!({
            "query": query_text,
            "count": search.items.len(),
            "totalItemsSearched": search.total_searched,
            "items": search.items,
        })))
    })
}

async fn update_item(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Json(payload): Json<ItemPatch>,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    log::debug!("id: {id}, payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let item = app.update(&Eid::from(id), payload)?;

        Ok(Json(
            json!({"message": "Item updated successfully", "item": item}),
        ))
    })
}

async fn delete_item(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    log::debug!("id: {id}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        app.delete(&Eid::from(id))?;

        Ok(Json(json!({"message": "Item deleted successfully"})))
    })
}

async fn upload_image(
    State(state): State<Arc<SharedState>>,
    mut multipart: Multipart,
) -> Result<axum::Json<serde_json::Value>, HttpError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(err.to_string()))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::Validation(err.to_string()))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::Validation("No file uploaded".to_string()).into());
    };

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let result = app.store_upload(&filename, &bytes)?;

        Ok(Json(json!({
            "message": "File uploaded successfully",
            "imageUrl": result.image_url,
            "filename": result.filename,
            "ocrText": result.ocr_text,
            "ocrProcessed": result.ocr_processed,
        })))
    })
}
