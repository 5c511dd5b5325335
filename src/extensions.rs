//! Query extensions: conditions appended to every collection and item query of a resource,
//! whatever the caller asked for.

use crate::config::{ExtensionKind, ResolvedEntity};
use crate::sql::Predicate;

pub trait QueryExtension: Send + Sync {
    fn apply_to_collection(&self, entity: &ResolvedEntity, predicates: &mut Vec<Predicate>);
    fn apply_to_item(&self, entity: &ResolvedEntity, predicates: &mut Vec<Predicate>);
}

/// Hides unpublished rows: `is_published = true`.
pub struct PublishedOnly;

pub const PUBLISHED_COLUMN: &str = "is_published";

impl QueryExtension for PublishedOnly {
    fn apply_to_collection(&self, _entity: &ResolvedEntity, predicates: &mut Vec<Predicate>) {
        predicates.push(Predicate::eq(PUBLISHED_COLUMN, true));
    }

    fn apply_to_item(&self, _entity: &ResolvedEntity, predicates: &mut Vec<Predicate>) {
        predicates.push(Predicate::eq(PUBLISHED_COLUMN, true));
    }
}

fn extension(kind: ExtensionKind) -> &'static dyn QueryExtension {
    match kind {
        ExtensionKind::PublishedOnly => &PublishedOnly,
    }
}

/// Predicates every extension declared on `entity` adds to a collection query.
pub fn collection_predicates(entity: &ResolvedEntity) -> Vec<Predicate> {
    let mut preds = Vec::new();
    for kind in &entity.extensions {
        extension(*kind).apply_to_collection(entity, &mut preds);
    }
    preds
}

/// Predicates every extension declared on `entity` adds to a single-item query.
pub fn item_predicates(entity: &ResolvedEntity) -> Vec<Predicate> {
    let mut preds = Vec::new();
    for kind in &entity.extensions {
        extension(*kind).apply_to_item(entity, &mut preds);
    }
    preds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve};

    #[test]
    fn books_only_see_published_rows() {
        let model = resolve(&default_catalog().unwrap()).unwrap();
        let books = model.entity_by_path("books").unwrap();
        let expected = vec![Predicate::eq("is_published", true)];
        assert_eq!(collection_predicates(books), expected);
        assert_eq!(item_predicates(books), expected);
    }

    #[test]
    fn resources_without_extensions_are_untouched() {
        let model = resolve(&default_catalog().unwrap()).unwrap();
        for path in ["authors", "reviews", "media_objects"] {
            let entity = model.entity_by_path(path).unwrap();
            assert!(collection_predicates(entity).is_empty());
            assert!(item_predicates(entity).is_empty());
        }
    }
}
