//! Load the catalog definition (embedded or from a file) and resolve it into the runtime model.

use crate::case::to_snake_case;
use crate::config::resolved::{
    ColumnInfo, Dependent, NestedLink, PkType, ResolvedEmbed, ResolvedEntity, ResolvedFilter,
    ResolvedModel, ResolvedTable,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("../../catalog.json");

/// The catalog shipped with the crate.
pub fn default_catalog() -> Result<CatalogConfig, ConfigError> {
    parse_catalog(DEFAULT_CATALOG)
}

pub fn parse_catalog(json: &str) -> Result<CatalogConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read a catalog definition from `path`, or the embedded one when `path` is None.
pub async fn load_catalog(path: Option<&Path>) -> Result<CatalogConfig, ConfigError> {
    let Some(path) = path else {
        return default_catalog();
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "loaded catalog definition");
    parse_catalog(&raw)
}

/// Build resolved model from the catalog (validates first).
pub fn resolve(config: &CatalogConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut dependents: HashMap<&str, Vec<Dependent>> = HashMap::new();
    for t in &config.tables {
        for r in &t.references {
            if r.on_delete == OnDelete::Cascade {
                dependents.entry(r.table.as_str()).or_default().push(Dependent {
                    table_name: t.name.clone(),
                    foreign_key: r.column.clone(),
                });
            }
        }
    }

    let mut tables = HashMap::new();
    for t in &config.tables {
        let pk_col = t
            .columns
            .iter()
            .find(|c| c.name == t.primary_key)
            .ok_or_else(|| ConfigError::InvalidPrimaryKey {
                table: t.name.clone(),
                column: t.primary_key.clone(),
            })?;
        let columns = t
            .columns
            .iter()
            .map(|c| {
                let is_pk = c.name == t.primary_key;
                ColumnInfo {
                    name: c.name.clone(),
                    is_pk,
                    nullable: c.nullable && !is_pk,
                    writable: c.writable && !is_pk,
                    has_default: c.default.is_some() || is_serial(&c.type_),
                    pg_type: c.type_.cast_type(),
                }
            })
            .collect();
        tables.insert(
            t.name.clone(),
            ResolvedTable {
                schema_name: config.schema.clone(),
                table_name: t.name.clone(),
                pk_column: t.primary_key.clone(),
                pk_type: infer_pk_type(pk_col),
                columns,
                dependents: dependents.remove(t.name.as_str()).unwrap_or_default(),
            },
        );
    }

    let lookup = |name: &str| -> Result<ResolvedTable, ConfigError> {
        tables
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: name.to_string(),
            })
    };

    let mut entity_by_path = HashMap::new();
    for res in &config.resources {
        let table = lookup(&res.table)?;
        let filters = res
            .filters
            .iter()
            .map(|f| ResolvedFilter {
                property: f.property.clone(),
                column: to_snake_case(&f.property),
                kind: f.kind,
            })
            .collect();
        let mut embeds = Vec::with_capacity(res.embeds.len());
        for e in &res.embeds {
            let child = lookup(&e.table)?;
            let columns = if e.columns.is_empty() {
                child.columns.iter().map(|c| c.name.clone()).collect()
            } else {
                e.columns.clone()
            };
            embeds.push(ResolvedEmbed {
                name: e.name.clone(),
                table: child,
                foreign_key: e.foreign_key.clone(),
                columns,
            });
        }
        let nested = res
            .nested
            .iter()
            .map(|n| NestedLink {
                parent_path: n.parent.clone(),
                foreign_key: n.foreign_key.clone(),
            })
            .collect();
        entity_by_path.insert(
            res.path.clone(),
            ResolvedEntity {
                path_segment: res.path.clone(),
                table,
                operations: res.operations.clone(),
                filters,
                extensions: res.extensions.clone(),
                embeds,
                nested,
                cache: res.cache.clone(),
                validation: res.validation.clone(),
            },
        );
    }

    Ok(ResolvedModel {
        tables,
        entity_by_path,
    })
}

fn is_serial(ty: &ColumnTypeConfig) -> bool {
    ty.base_name().to_lowercase().contains("serial")
}

fn infer_pk_type(col: &ColumnConfig) -> PkType {
    let t = col.type_.base_name().to_lowercase();
    if t == "uuid" {
        PkType::Uuid
    } else if t == "bigint" || t == "bigserial" || t == "int8" || t == "serial8" {
        PkType::BigInt
    } else if t.contains("int") || t.contains("serial") {
        PkType::Int
    } else {
        PkType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterKind;

    fn model() -> ResolvedModel {
        resolve(&default_catalog().unwrap()).expect("default catalog resolves")
    }

    #[test]
    fn resolves_resources_by_path() {
        let m = model();
        let mut paths: Vec<_> = m.entity_by_path.keys().cloned().collect();
        paths.sort();
        assert_eq!(paths, vec!["authors", "books", "media_objects", "reviews"]);
        assert!(m.entity_by_path("users").is_none());
        assert!(m.table("users").is_some());
    }

    #[test]
    fn serial_primary_keys_are_int_and_read_only() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        assert_eq!(books.table.pk_type, PkType::Int);
        let id = books.table.column("id").unwrap();
        assert!(id.is_pk && !id.writable && id.has_default);
        assert_eq!(id.pg_type, "integer");
        assert_eq!(books.table.column("title").unwrap().pg_type, "varchar(255)");
        assert!(!m.table("review").unwrap().column("created_at").unwrap().writable);
    }

    #[test]
    fn filters_map_camel_case_property_to_column() {
        let m = model();
        let f = &m.entity_by_path("books").unwrap().filters[0];
        assert_eq!(f.property, "publicationYear");
        assert_eq!(f.column, "publication_year");
        assert_eq!(f.kind, FilterKind::PublicationYear);
        let f = &m.entity_by_path("authors").unwrap().filters[0];
        assert_eq!(f.kind, FilterKind::Nationality);
    }

    #[test]
    fn cascade_dependents_follow_references() {
        let m = model();
        let author = m.table("author").unwrap();
        assert_eq!(author.dependents.len(), 1);
        assert_eq!(author.dependents[0].table_name, "book");
        assert_eq!(author.dependents[0].foreign_key, "author_id");
        let book = m.table("book").unwrap();
        assert_eq!(book.dependents[0].table_name, "review");
        // SET NULL is left to the foreign key
        assert!(m.table("media_object").unwrap().dependents.is_empty());
    }

    #[test]
    fn book_embeds_selected_review_columns() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        assert_eq!(books.embeds[0].name, "reviews");
        assert_eq!(books.embeds[0].columns, vec!["id", "rating", "comment", "reviewer_name"]);
        assert_eq!(books.nested_under("authors").unwrap().foreign_key, "author_id");
        assert!(books.nested_under("books").is_none());
    }

    #[test]
    fn parse_error_is_load_error() {
        assert!(matches!(parse_catalog("{"), Err(ConfigError::Load(_))));
    }
}
