//! Standard response envelope helpers.

use crate::config::CacheConfig;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

/// `public, max-age=N[, s-maxage=M]`
pub fn cache_control_value(cache: &CacheConfig) -> Option<HeaderValue> {
    let mut value = format!("public, max-age={}", cache.max_age);
    if let Some(shared) = cache.shared_max_age {
        value.push_str(&format!(", s-maxage={}", shared));
    }
    HeaderValue::from_str(&value).ok()
}

/// Attach the resource's Cache-Control header, if it declares one.
pub fn cached(cache: Option<&CacheConfig>, body: impl IntoResponse) -> Response {
    let mut resp = body.into_response();
    if let Some(value) = cache.and_then(cache_control_value) {
        resp.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    resp
}
