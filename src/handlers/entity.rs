//! Resource CRUD handlers: list, nested list, read, create, replace, patch, delete.
//! Wire keys are camelCase; the catalog and database use snake_case.

use crate::case::{object_keys_to_snake_case, value_keys_to_camel_case_recursive};
use crate::config::{Operation, PkType, ResolvedEntity};
use crate::error::AppError;
use crate::filters::{filter_predicates, group_query_pairs, FilterInput};
use crate::response::{cached, success_many, success_one, success_one_ok};
use crate::service::{CrudService, RequestValidator};
use crate::sql::Predicate;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Entity for a path segment, if it exists and allows `op`.
pub fn resolve_entity<'a>(
    state: &'a AppState,
    path_segment: &str,
    op: Operation,
) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("resource '{}'", path_segment)))?;
    if !entity.allows(op) {
        return Err(AppError::MethodNotAllowed(format!(
            "{} not allowed on {}",
            op.as_str(),
            path_segment
        )));
    }
    Ok(entity)
}

pub fn parse_id(id_str: &str, pk_type: &PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str)
                .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))?;
            Value::String(u.to_string())
        }
        PkType::BigInt => {
            let n: i64 = id_str
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))?;
            Value::Number(n.into())
        }
        PkType::Int => {
            let n: i32 = id_str
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", id_str)))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

fn body_to_columns(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(object_keys_to_snake_case(m)),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn to_wire(mut row: Value) -> Value {
    value_keys_to_camel_case_recursive(&mut row);
    row
}

fn text_param(params: &HashMap<String, FilterInput>, name: &str) -> Option<u32> {
    match params.get(name) {
        Some(FilterInput::Text(s)) => s.parse().ok(),
        _ => None,
    }
}

async fn list_with(
    state: &AppState,
    entity: &ResolvedEntity,
    pairs: &[(String, String)],
    mut predicates: Vec<Predicate>,
) -> Result<Response, AppError> {
    let params = group_query_pairs(pairs);
    predicates.extend(filter_predicates(&entity.filters, &params));
    let rows = CrudService::list(
        &state.pool,
        entity,
        predicates,
        text_param(&params, "limit"),
        text_param(&params, "offset"),
    )
    .await?;
    let rows: Vec<Value> = rows.into_iter().map(to_wire).collect();
    Ok(cached(entity.cache.as_ref(), success_many(rows)))
}

/// GET /:path_segment
pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::List)?;
    list_with(&state, entity, &pairs, Vec::new()).await
}

/// GET /:parent/:parent_id/:path_segment, e.g. /authors/3/books (routed as `/:path_segment/:id/:nested`)
pub async fn nested_list(
    State(state): State<AppState>,
    Path((parent, parent_id, path_segment)): Path<(String, String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let parent_entity = state
        .model
        .entity_by_path(&parent)
        .ok_or_else(|| AppError::NotFound(format!("resource '{}'", parent)))?;
    let entity = resolve_entity(&state, &path_segment, Operation::List)?;
    let link = entity.nested_under(&parent).ok_or_else(|| {
        AppError::NotFound(format!("{} are not listed under {}", path_segment, parent))
    })?;
    let parent_id = parse_id(&parent_id, &parent_entity.table.pk_type)?;
    let predicates = vec![Predicate::eq(&link.foreign_key, parent_id)];
    list_with(&state, entity, &pairs, predicates).await
}

/// GET /:path_segment/:id
pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id_str, &entity.table.pk_type)?;
    let row = CrudService::read(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", path_segment, id_str)))?;
    Ok(cached(entity.cache.as_ref(), success_one_ok(to_wire(row))))
}

/// POST /:path_segment
pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::Create)?;
    let body = body_to_columns(body)?;
    RequestValidator::validate(&body, &entity.table, &entity.validation)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    Ok(success_one(to_wire(row)))
}

/// PUT /:path_segment/:id
pub async fn replace(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::Replace)?;
    let id = parse_id(&id_str, &entity.table.pk_type)?;
    let body = body_to_columns(body)?;
    RequestValidator::validate(&body, &entity.table, &entity.validation)?;
    let row = CrudService::replace(&state.pool, entity, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", path_segment, id_str)))?;
    Ok(success_one_ok(to_wire(row)))
}

/// PATCH /:path_segment/:id
pub async fn patch(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::Patch)?;
    let id = parse_id(&id_str, &entity.table.pk_type)?;
    let body = body_to_columns(body)?;
    RequestValidator::validate_partial(&body, &entity.table, &entity.validation)?;
    let row = CrudService::patch(&state.pool, entity, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", path_segment, id_str)))?;
    Ok(success_one_ok(to_wire(row)))
}

/// DELETE /:path_segment/:id
pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let entity = resolve_entity(&state, &path_segment, Operation::Delete)?;
    let id = parse_id(&id_str, &entity.table.pk_type)?;
    if !CrudService::delete(&state.pool, &state.model, entity, &id).await? {
        return Err(AppError::NotFound(format!("{} {}", path_segment, id_str)));
    }
    Ok(StatusCode::NO_CONTENT)
}
