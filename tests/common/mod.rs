#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use catalog_api::{app_router, default_catalog, resolve, AppState, Settings};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

pub fn test_settings() -> Settings {
    Settings::from_lookup(|name| match name {
        "APP_ENV" => Some("test".into()),
        "MEDIA_DIR" => Some(std::env::temp_dir().join("catalog-test-media").display().to_string()),
        _ => None,
    })
    .expect("test settings")
}

/// Router over the embedded catalog and the given pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let model = resolve(&default_catalog().expect("catalog parses")).expect("catalog resolves");
    app_router(AppState::new(pool, model, test_settings()))
}

/// Router whose pool never connects: for requests that are answered before any query runs.
pub fn build_offline_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost:1/unreachable")
        .expect("lazy pool");
    build_test_app(pool)
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(req.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
