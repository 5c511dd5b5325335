//! Generic CRUD execution against PostgreSQL. Resource extensions are applied to every
//! collection and item statement here, so no caller can skip them.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::extensions::{collection_predicates, item_predicates};
use crate::sql::{
    cascade_deletes, delete, insert, patch, replace, select_by_id, select_list, select_pk,
    PgBindValue, Predicate, QueryBuf,
};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres};

pub const DEFAULT_LIMIT: u32 = 100;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

pub struct CrudService;

impl CrudService {
    /// List rows matching `predicates` (filters, nested parent), limit (default 100,
    /// max 1000), offset (default 0).
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        mut predicates: Vec<Predicate>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Value>, AppError> {
        predicates.extend(collection_predicates(entity));
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);
        let q = select_list(entity, &predicates, Some(limit), Some(offset));
        Self::fetch_all(pool, &q).await
    }

    /// Fetch one visible row by primary key.
    pub async fn read(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<Option<Value>, AppError> {
        let q = select_by_id(entity, id, &item_predicates(entity));
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row and return it as stored (defaults filled in).
    pub async fn create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(&entity.table, body);
        let pk = Self::fetch_optional(pool, &q)
            .await?
            .and_then(|row| first_value(&row))
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        Self::reload(pool, entity, &pk).await
    }

    /// Overwrite every writable column of a visible row. None when no visible row has `id`.
    pub async fn replace(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = replace(&entity.table, id, body, &item_predicates(entity));
        Self::write_and_reload(pool, entity, &q).await
    }

    /// Update the columns present in body on a visible row.
    pub async fn patch(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = patch(&entity.table, id, body, &item_predicates(entity));
        Self::write_and_reload(pool, entity, &q).await
    }

    /// Delete a visible row and everything that cascades from it, in one transaction.
    /// Returns false when no visible row has `id`.
    pub async fn delete(
        pool: &PgPool,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        id: &Value,
    ) -> Result<bool, AppError> {
        let preds = item_predicates(entity);
        let mut tx = pool.begin().await?;

        let visible = select_pk(&entity.table, id, &preds);
        log_query(&visible);
        if bind(&visible).fetch_optional(&mut *tx).await?.is_none() {
            return Ok(false);
        }

        let cascades = cascade_deletes(model, &entity.table);
        for sql in &cascades {
            tracing::debug!(sql = %sql, id = %id, "cascade delete");
            let result = sqlx::query(sql)
                .bind(PgBindValue::from_json(id))
                .execute(&mut *tx)
                .await?;
            tracing::debug!(rows = result.rows_affected(), "cascade removed");
        }

        let q = delete(&entity.table, id, &preds);
        log_query(&q);
        let deleted = bind(&q).fetch_optional(&mut *tx).await?.is_some();
        tx.commit().await?;
        Ok(deleted)
    }

    async fn write_and_reload(
        pool: &PgPool,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Value>, AppError> {
        let Some(pk) = Self::fetch_optional(pool, q).await?.and_then(|row| first_value(&row)) else {
            return Ok(None);
        };
        Self::reload(pool, entity, &pk).await.map(Some)
    }

    /// Re-read a row just written, without extension predicates: a write may
    /// legitimately leave the row hidden (e.g. unpublishing a book).
    async fn reload(pool: &PgPool, entity: &ResolvedEntity, pk: &Value) -> Result<Value, AppError> {
        let q = select_by_id(entity, pk, &[]);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        log_query(q);
        let rows = bind(q).fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        log_query(q);
        let row = bind(q).fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

fn log_query(q: &QueryBuf) {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
}

fn bind(q: &QueryBuf) -> PgQuery<'_> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

/// Value of the first column (the `RETURNING pk` of a write).
fn first_value(row: &Value) -> Option<Value> {
    row.as_object()
        .and_then(|m| m.values().next())
        .filter(|v| !v.is_null())
        .cloned()
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_value_is_the_returned_key() {
        assert_eq!(first_value(&json!({ "id": 12 })), Some(json!(12)));
        assert_eq!(first_value(&json!({ "id": null })), None);
        assert_eq!(first_value(&json!({})), None);
    }
}
