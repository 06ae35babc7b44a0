pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, request_id_of},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ExecutionConfig;
use crate::services::{LineItemService, MailService, MaterialService, PhotoLimits};

#[derive(Clone)]
pub struct AppState {
    pub config: ExecutionConfig,
    pub line_items: LineItemService,
    pub materials: MaterialService,
    pub mail: MailService,
    pub photo_limits: PhotoLimits,
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/dashboard/summary", get(handlers::get_summary))
        .route("/sites", get(handlers::list_sites))
        .route("/site-items", get(handlers::list_site_items))
        .route("/alerts", get(handlers::get_alerts))
        .route(
            "/line-items",
            get(handlers::list_site_summaries).post(handlers::create_line_item),
        )
        .route(
            "/line-items/:id",
            get(handlers::get_line_item)
                .put(handlers::update_line_item)
                .delete(handlers::delete_line_item),
        )
        .route("/line-items/:id/history", get(handlers::get_line_item_history))
        .route("/line-items/:id/photos", get(handlers::get_line_item_photos))
        .route(
            "/line-items/:id/materials/:material_id/samples",
            post(handlers::upload_sample),
        )
        .route(
            "/line-items/:id/materials/:material_id/tds-mail",
            post(handlers::send_tds_mail),
        )
        .route(
            "/upload/photos",
            post(handlers::upload_photos).delete(handlers::delete_photo),
        )
        .route("/upload/excel", post(handlers::upload_excel))
        .route("/shop-drawing/mail", post(handlers::send_shop_drawing_mail))
        .route(
            "/materials",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route("/materials/categories", get(handlers::list_material_categories))
        .route("/materials/used", get(handlers::list_used_materials))
        .route(
            "/materials/:id",
            get(handlers::get_material)
                .put(handlers::update_material)
                .delete(handlers::delete_material),
        )
        .layer(DefaultBodyLimit::max(state.config.uploads.max_request_bytes));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&state.config.storage.local_path))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id_of(request),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static("x-request-id"),
                ]),
        )
}
