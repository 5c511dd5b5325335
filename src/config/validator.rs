//! Catalog validation: referential integrity and API consistency.

use crate::case::to_snake_case;
use crate::config::{CatalogConfig, ExtensionKind, OnDelete, TableConfig};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

fn column_exists(table: &TableConfig, column: &str) -> bool {
    table.columns.iter().any(|c| c.name == column)
}

fn require_column(table: &TableConfig, column: &str) -> Result<(), ConfigError> {
    if column_exists(table, column) {
        Ok(())
    } else {
        Err(ConfigError::MissingReference {
            kind: "column",
            id: format!("{}.{}", table.name, column),
        })
    }
}

pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
    let mut tables_by_name: HashMap<&str, &TableConfig> = HashMap::new();
    for t in &config.tables {
        if tables_by_name.insert(t.name.as_str(), t).is_some() {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
        if !column_exists(t, &t.primary_key) {
            return Err(ConfigError::InvalidPrimaryKey {
                table: t.name.clone(),
                column: t.primary_key.clone(),
            });
        }
    }
    let table = |name: &str| {
        tables_by_name
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: name.to_string(),
            })
    };

    for t in &config.tables {
        for idx in &t.indexes {
            for col in &idx.columns {
                require_column(t, col)?;
            }
        }
        for r in &t.references {
            require_column(t, &r.column)?;
            let target = table(&r.table)?;
            require_column(target, &r.target_column)?;
        }
    }
    check_cascade_cycles(config)?;

    let mut path_segments = HashSet::new();
    for res in &config.resources {
        let t = table(&res.table)?;
        if !path_segments.insert(res.path.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(res.path.clone()));
        }
        for f in &res.filters {
            require_column(t, &to_snake_case(&f.property))?;
        }
        for ext in &res.extensions {
            match ext {
                ExtensionKind::PublishedOnly => {
                    let col = t.columns.iter().find(|c| c.name == "is_published");
                    let is_bool = col
                        .map(|c| c.type_.base_name().to_lowercase().starts_with("bool"))
                        .unwrap_or(false);
                    if !is_bool {
                        return Err(ConfigError::Validation(format!(
                            "published_only on '{}' requires a boolean is_published column",
                            res.path
                        )));
                    }
                }
            }
        }
        for e in &res.embeds {
            let child = table(&e.table)?;
            require_column(child, &e.foreign_key)?;
            for col in &e.columns {
                require_column(child, col)?;
            }
        }
        for col in res.validation.keys() {
            require_column(t, col)?;
        }
    }

    let paths: HashSet<&str> = config.resources.iter().map(|r| r.path.as_str()).collect();
    for res in &config.resources {
        let t = table(&res.table)?;
        for n in &res.nested {
            if !paths.contains(n.parent.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "resource",
                    id: n.parent.clone(),
                });
            }
            require_column(t, &n.foreign_key)?;
        }
    }

    Ok(())
}

/// Cascading deletes walk from owner to dependents; a cycle would never terminate.
fn check_cascade_cycles(config: &CatalogConfig) -> Result<(), ConfigError> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for t in &config.tables {
        for r in &t.references {
            if r.on_delete == OnDelete::Cascade {
                edges.entry(r.table.as_str()).or_default().push(t.name.as_str());
            }
        }
    }

    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), ConfigError> {
        if path.contains(&node) {
            return Err(ConfigError::Validation(format!(
                "cascade cycle through table '{}'",
                node
            )));
        }
        path.push(node);
        for next in edges.get(node).map(|v| v.as_slice()).unwrap_or(&[]) {
            visit(*next, edges, path)?;
        }
        path.pop();
        Ok(())
    }

    for t in &config.tables {
        visit(t.name.as_str(), &edges, &mut Vec::new())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_catalog;
    use assert_matches::assert_matches;

    #[test]
    fn default_catalog_is_valid() {
        let config = default_catalog().expect("embedded catalog parses");
        validate(&config).expect("embedded catalog validates");
    }

    #[test]
    fn rejects_filter_on_unknown_column() {
        let mut config = default_catalog().unwrap();
        let books = config.resources.iter_mut().find(|r| r.path == "books").unwrap();
        books.filters[0].property = "printRun".into();
        assert_matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "column", id }) if id == "book.print_run"
        );
    }

    #[test]
    fn rejects_duplicate_path_segment() {
        let mut config = default_catalog().unwrap();
        let dup = config.resources[0].clone();
        config.resources.push(dup);
        assert_matches!(validate(&config), Err(ConfigError::DuplicatePathSegment(_)));
    }

    #[test]
    fn rejects_published_only_without_column() {
        let mut config = default_catalog().unwrap();
        let reviews = config.resources.iter_mut().find(|r| r.path == "reviews").unwrap();
        reviews.extensions.push(ExtensionKind::PublishedOnly);
        assert_matches!(validate(&config), Err(ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_cascade_cycle() {
        let mut config = default_catalog().unwrap();
        let author = config.tables.iter_mut().find(|t| t.name == "author").unwrap();
        author.columns.push(serde_json::from_value(serde_json::json!({
            "name": "favourite_book_id", "type": "integer"
        })).unwrap());
        author.references.push(serde_json::from_value(serde_json::json!({
            "column": "favourite_book_id", "table": "book", "on_delete": "CASCADE"
        })).unwrap());
        assert_matches!(validate(&config), Err(ConfigError::Validation(msg)) if msg.contains("cascade cycle"));
    }

    #[test]
    fn rejects_nested_link_to_unknown_parent() {
        let mut config = default_catalog().unwrap();
        let books = config.resources.iter_mut().find(|r| r.path == "books").unwrap();
        books.nested[0].parent = "publishers".into();
        assert_matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "resource", .. })
        );
    }
}
