//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from resolved catalog entities.

use super::predicate::{render_where, Predicate};
use crate::config::{ColumnInfo, ResolvedEmbed, ResolvedEntity, ResolvedModel, ResolvedTable};
use serde_json::{Map, Value};

pub const MAIN_ALIAS: &str = "main";
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from the catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `"schema"."table"`.
pub fn qualified_table(table: &ResolvedTable) -> String {
    format!("{}.{}", quoted(&table.schema_name), quoted(&table.table_name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf::default()
    }

    pub fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

/// `$n::type` so untyped JSON values (strings, nulls) bind to the column type.
fn cast_placeholder(n: u32, column: &ColumnInfo) -> String {
    format!("${}::{}", n, column.pg_type)
}

fn pk_info(table: &ResolvedTable) -> Option<&ColumnInfo> {
    table.column(&table.pk_column)
}

/// `main."pk" = $n::type`, pushing the id.
fn pk_condition(table: &ResolvedTable, id: &Value, q: &mut QueryBuf) -> String {
    let n = q.push_param(id.clone());
    let ph = match pk_info(table) {
        Some(c) => cast_placeholder(n, c),
        None => format!("${}", n),
    };
    format!("{}.{} = {}", MAIN_ALIAS, quoted(&table.pk_column), ph)
}

fn select_column_list(table: &ResolvedTable) -> Vec<String> {
    table
        .columns
        .iter()
        .map(|c| format!("{}.{} AS {}", MAIN_ALIAS, quoted(&c.name), quoted(&c.name)))
        .collect()
}

/// Child rows as a JSON array: `(SELECT COALESCE(json_agg(...), '[]') ...) AS "name"`.
fn embed_subquery(embed: &ResolvedEmbed, parent: &ResolvedTable) -> String {
    let cols: Vec<String> = embed.columns.iter().map(|c| quoted(c)).collect();
    format!(
        "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {} WHERE {} = {}.{} ORDER BY {}) sub) AS {}",
        cols.join(", "),
        qualified_table(&embed.table),
        quoted(&embed.foreign_key),
        MAIN_ALIAS,
        quoted(&parent.pk_column),
        quoted(&embed.table.pk_column),
        quoted(&embed.name)
    )
}

fn select_parts(entity: &ResolvedEntity) -> String {
    let mut parts = select_column_list(&entity.table);
    for e in &entity.embeds {
        parts.push(embed_subquery(e, &entity.table));
    }
    parts.join(", ")
}

/// SELECT list with predicates ANDed, ORDER BY pk, LIMIT (capped) / OFFSET.
pub fn select_list(
    entity: &ResolvedEntity,
    predicates: &[Predicate],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = &entity.table;
    let where_clause = render_where(Vec::new(), predicates, MAIN_ALIAS, &mut q);
    let order_clause = format!(" ORDER BY {}.{}", MAIN_ALIAS, quoted(&table.pk_column));
    let limit_clause = limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} AS {}{}{}{}{}",
        select_parts(entity),
        qualified_table(table),
        MAIN_ALIAS,
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// SELECT one row by primary key, subject to `predicates`.
pub fn select_by_id(entity: &ResolvedEntity, id: &Value, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = &entity.table;
    let pk = pk_condition(table, id, &mut q);
    let where_clause = render_where(vec![pk], predicates, MAIN_ALIAS, &mut q);
    q.sql = format!(
        "SELECT {} FROM {} AS {}{}",
        select_parts(entity),
        qualified_table(table),
        MAIN_ALIAS,
        where_clause
    );
    q
}

/// SELECT only the primary key; used to check a row is visible before acting on it.
pub fn select_pk(table: &ResolvedTable, id: &Value, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = pk_condition(table, id, &mut q);
    let where_clause = render_where(vec![pk], predicates, MAIN_ALIAS, &mut q);
    q.sql = format!(
        "SELECT {}.{} FROM {} AS {}{}",
        MAIN_ALIAS,
        quoted(&table.pk_column),
        qualified_table(table),
        MAIN_ALIAS,
        where_clause
    );
    q
}

/// INSERT writable columns from body. Omitted columns with a DB default are left out
/// so the default applies; other omitted columns are bound as NULL.
pub fn insert(table: &ResolvedTable, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in table.columns.iter().filter(|c| c.writable) {
        let val = body.get(&c.name).cloned();
        if val.is_none() && c.has_default {
            continue;
        }
        let n = q.push_param(val.unwrap_or(Value::Null));
        cols.push(quoted(&c.name));
        placeholders.push(cast_placeholder(n, c));
    }
    let returning = quoted(&table.pk_column);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(table),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

fn update_statement(
    table: &ResolvedTable,
    sets: Vec<String>,
    id: &Value,
    predicates: &[Predicate],
    mut q: QueryBuf,
) -> QueryBuf {
    let pk = pk_condition(table, id, &mut q);
    let where_clause = render_where(vec![pk], predicates, MAIN_ALIAS, &mut q);
    q.sql = format!(
        "UPDATE {} AS {} SET {}{} RETURNING {}.{}",
        qualified_table(table),
        MAIN_ALIAS,
        sets.join(", "),
        where_clause,
        MAIN_ALIAS,
        quoted(&table.pk_column)
    );
    q
}

/// UPDATE every writable column: from body when present, else DEFAULT or NULL.
pub fn replace(
    table: &ResolvedTable,
    id: &Value,
    body: &Map<String, Value>,
    predicates: &[Predicate],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in table.columns.iter().filter(|c| c.writable) {
        let rhs = match body.get(&c.name) {
            Some(v) => cast_placeholder(q.push_param(v.clone()), c),
            None if c.has_default => "DEFAULT".to_string(),
            None => "NULL".to_string(),
        };
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if sets.is_empty() {
        return select_pk(table, id, predicates);
    }
    update_statement(table, sets, id, predicates, q)
}

/// UPDATE only the writable columns present in body. With nothing to set, selects the pk.
pub fn patch(
    table: &ResolvedTable,
    id: &Value,
    body: &Map<String, Value>,
    predicates: &[Predicate],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in table.columns.iter().filter(|c| c.writable) {
        if let Some(v) = body.get(&c.name) {
            let ph = cast_placeholder(q.push_param(v.clone()), c);
            sets.push(format!("{} = {}", quoted(&c.name), ph));
        }
    }
    if sets.is_empty() {
        return select_pk(table, id, predicates);
    }
    update_statement(table, sets, id, predicates, q)
}

/// DELETE by id, subject to `predicates`.
pub fn delete(table: &ResolvedTable, id: &Value, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = pk_condition(table, id, &mut q);
    let where_clause = render_where(vec![pk], predicates, MAIN_ALIAS, &mut q);
    q.sql = format!(
        "DELETE FROM {} AS {}{} RETURNING {}.{}",
        qualified_table(table),
        MAIN_ALIAS,
        where_clause,
        MAIN_ALIAS,
        quoted(&table.pk_column)
    );
    q
}

/// DELETE statements removing every row that cascades from `table` row `$1`, deepest first.
/// Each statement binds the owner id as its only parameter.
pub fn cascade_deletes(model: &ResolvedModel, table: &ResolvedTable) -> Vec<String> {
    let key = match pk_info(table) {
        Some(c) => cast_placeholder(1, c),
        None => "$1".to_string(),
    };
    let mut out = Vec::new();
    collect_cascades(model, table, &key, &mut out);
    out
}

/// `keys` is a SQL expression (placeholder or subquery) yielding the owner keys being deleted.
fn collect_cascades(model: &ResolvedModel, owner: &ResolvedTable, keys: &str, out: &mut Vec<String>) {
    for dep in &owner.dependents {
        let Some(child) = model.table(&dep.table_name) else {
            continue;
        };
        let child_table = qualified_table(child);
        let matching = format!("{} IN ({})", quoted(&dep.foreign_key), keys);
        let child_keys = format!(
            "SELECT {} FROM {} WHERE {}",
            quoted(&child.pk_column),
            child_table,
            matching
        );
        collect_cascades(model, child, &child_keys, out);
        out.push(format!("DELETE FROM {} WHERE {}", child_table, matching));
    }
}

/// Row count of a whole table.
pub fn count(table: &ResolvedTable) -> QueryBuf {
    QueryBuf {
        sql: format!("SELECT COUNT(*) FROM {}", qualified_table(table)),
        params: Vec::new(),
    }
}
