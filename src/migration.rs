//! Apply the catalog to the database: schema, tables, added columns, indexes, foreign keys.
//! Every statement is idempotent, so migrating an up-to-date database changes nothing.

use crate::config::types::*;
use crate::config::validate;
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;

fn full_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

fn default_sql(d: &ColumnDefaultConfig) -> String {
    match d {
        ColumnDefaultConfig::Expression { expression } => expression.clone(),
        ColumnDefaultConfig::Literal(s) => {
            let bare = s.parse::<f64>().is_ok()
                || matches!(s.to_lowercase().as_str(), "true" | "false" | "null");
            if bare {
                s.clone()
            } else {
                format!("'{}'", s.replace('\'', "''"))
            }
        }
    }
}

fn column_def(c: &ColumnConfig, is_pk: bool) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.type_.ddl());
    if !c.nullable || is_pk {
        def.push_str(" NOT NULL");
    }
    if let Some(ref d) = c.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_sql(d));
    }
    if c.unique && !is_pk {
        def.push_str(" UNIQUE");
    }
    def
}

/// DDL for the whole catalog, in dependency order: schema, tables (then any columns the
/// tables lack), indexes, foreign keys.
pub fn schema_statements(config: &CatalogConfig) -> Vec<String> {
    let mut out = Vec::new();
    if config.schema != "public" {
        out.push(format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&config.schema)));
    }

    for t in &config.tables {
        let table = full_name(&config.schema, &t.name);
        let mut defs: Vec<String> = t
            .columns
            .iter()
            .map(|c| column_def(c, c.name == t.primary_key))
            .collect();
        defs.push(format!("PRIMARY KEY ({})", quoted(&t.primary_key)));
        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            table,
            defs.join(",\n  ")
        ));
        for c in t.columns.iter().filter(|c| c.name != t.primary_key) {
            out.push(format!(
                "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}",
                table,
                column_def(c, false)
            ));
        }
    }

    for t in &config.tables {
        let table = full_name(&config.schema, &t.name);
        for idx in &t.indexes {
            let cols: Vec<String> = idx.columns.iter().map(|c| quoted(c)).collect();
            out.push(format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                if idx.unique { "UNIQUE " } else { "" },
                quoted(&idx.name),
                table,
                cols.join(", ")
            ));
        }
    }

    for t in &config.tables {
        let table = full_name(&config.schema, &t.name);
        for r in &t.references {
            let constraint = format!("fk_{}_{}", t.name, r.column);
            out.push(format!(
                "DO $$ BEGIN\n  IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = '{}' AND conrelid = '{}'::regclass) THEN\n    ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {};\n  END IF;\nEND $$",
                constraint.replace('\'', "''"),
                table.replace('\'', "''"),
                table,
                quoted(&constraint),
                quoted(&r.column),
                full_name(&config.schema, &r.table),
                quoted(&r.target_column),
                r.on_delete.as_sql()
            ));
        }
    }
    out
}

/// Validate the catalog and run its DDL in one transaction.
pub async fn apply_migrations(pool: &PgPool, config: &CatalogConfig) -> Result<(), AppError> {
    validate(config)?;
    let statements = schema_statements(config);
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(
        tables = config.tables.len(),
        statements = statements.len(),
        "catalog schema applied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_catalog;
    use pretty_assertions::assert_eq;

    fn statements() -> Vec<String> {
        schema_statements(&default_catalog().unwrap())
    }

    #[test]
    fn creates_book_table_with_published_flag() {
        let stmts = statements();
        let book = stmts
            .iter()
            .find(|s| s.starts_with(r#"CREATE TABLE IF NOT EXISTS "public"."book""#))
            .unwrap();
        assert!(book.contains(r#""id" serial NOT NULL"#));
        assert!(book.contains(r#""title" varchar(255) NOT NULL"#));
        assert!(book.contains(r#""is_published" boolean NOT NULL DEFAULT true"#));
        assert!(book.contains(r#"PRIMARY KEY ("id")"#));
    }

    #[test]
    fn existing_tables_gain_missing_columns() {
        assert!(statements().contains(
            &r#"ALTER TABLE "public"."book" ADD COLUMN IF NOT EXISTS "is_published" boolean NOT NULL DEFAULT true"#
                .to_string()
        ));
    }

    #[test]
    fn lookup_indexes_are_created() {
        let stmts = statements();
        assert!(stmts.contains(
            &r#"CREATE INDEX IF NOT EXISTS "idx_nationality" ON "public"."author" ("nationality")"#.to_string()
        ));
        assert!(stmts.contains(
            &r#"CREATE INDEX IF NOT EXISTS "idx_publication_year" ON "public"."book" ("publication_year")"#
                .to_string()
        ));
    }

    #[test]
    fn foreign_keys_come_after_all_tables() {
        let stmts = statements();
        let last_table = stmts
            .iter()
            .rposition(|s| s.starts_with("CREATE TABLE"))
            .unwrap();
        let first_fk = stmts.iter().position(|s| s.starts_with("DO $$")).unwrap();
        assert!(first_fk > last_table);
        let fk = stmts
            .iter()
            .find(|s| s.contains(r#"ADD CONSTRAINT "fk_book_author_id""#))
            .unwrap();
        assert!(fk.contains(r#"REFERENCES "public"."author" ("id") ON DELETE CASCADE"#));
    }

    #[test]
    fn string_defaults_are_quoted() {
        assert_eq!(default_sql(&ColumnDefaultConfig::Literal("draft".into())), "'draft'");
        assert_eq!(default_sql(&ColumnDefaultConfig::Literal("true".into())), "true");
        assert_eq!(default_sql(&ColumnDefaultConfig::Literal("5".into())), "5");
        assert_eq!(
            default_sql(&ColumnDefaultConfig::Expression {
                expression: "NOW()".into()
            }),
            "NOW()"
        );
    }
}
