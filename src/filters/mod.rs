//! Query-string filters declared on resources. Each filter parses its raw input into a
//! grammar variant and turns it into WHERE predicates; input it cannot parse adds nothing.

pub mod nationality;
pub mod publication_year;

pub use nationality::NationalityFilter;
pub use publication_year::YearFilter;

use crate::config::{FilterKind, ResolvedFilter};
use crate::sql::Predicate;
use std::collections::HashMap;

/// Raw value of one query parameter: `name=v` or repeated `name[]=v`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterInput {
    Text(String),
    List(Vec<String>),
}

/// Group query pairs by parameter name. `name[]` accumulates into a list; a plain `name`
/// keeps the last value given.
pub fn group_query_pairs(pairs: &[(String, String)]) -> HashMap<String, FilterInput> {
    let mut grouped: HashMap<String, FilterInput> = HashMap::new();
    for (key, value) in pairs {
        match key.strip_suffix("[]") {
            Some(name) => match grouped.get_mut(name) {
                Some(FilterInput::List(items)) => items.push(value.clone()),
                _ => {
                    grouped.insert(name.to_string(), FilterInput::List(vec![value.clone()]));
                }
            },
            None => {
                grouped.insert(key.clone(), FilterInput::Text(value.clone()));
            }
        }
    }
    grouped
}

/// Predicates for every declared filter whose parameter is present.
pub fn filter_predicates(
    filters: &[ResolvedFilter],
    params: &HashMap<String, FilterInput>,
) -> Vec<Predicate> {
    let mut out = Vec::new();
    for f in filters {
        let Some(input) = params.get(&f.property) else {
            continue;
        };
        let preds = match f.kind {
            FilterKind::PublicationYear => YearFilter::parse(input).predicates(&f.column),
            FilterKind::Nationality => NationalityFilter::parse(input).predicates(&f.column),
        };
        if preds.is_empty() {
            tracing::debug!(filter = %f.property, ?input, "filter input ignored");
        }
        out.extend(preds);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn bracketed_keys_collect_into_a_list() {
        let g = group_query_pairs(&pairs(&[
            ("nationality[]", "French"),
            ("limit", "5"),
            ("nationality[]", "German"),
        ]));
        assert_eq!(
            g.get("nationality"),
            Some(&FilterInput::List(vec!["French".into(), "German".into()]))
        );
        assert_eq!(g.get("limit"), Some(&FilterInput::Text("5".into())));
    }

    #[test]
    fn last_plain_value_wins() {
        let g = group_query_pairs(&pairs(&[("publicationYear", "1990"), ("publicationYear", "2001")]));
        assert_eq!(g.get("publicationYear"), Some(&FilterInput::Text("2001".into())));
    }

    #[test]
    fn only_declared_filters_apply() {
        let model = resolve(&default_catalog().unwrap()).unwrap();
        let books = model.entity_by_path("books").unwrap();
        let params = group_query_pairs(&pairs(&[
            ("publicationYear", "1990s"),
            ("nationality", "French"),
        ]));
        let preds = filter_predicates(&books.filters, &params);
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| matches!(p, Predicate::Compare(..))));

        let params = group_query_pairs(&pairs(&[("publicationYear", "abc")]));
        assert!(filter_predicates(&books.filters, &params).is_empty());
    }
}
