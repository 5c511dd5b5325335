//! Request validation from catalog rules and column types. Messages name fields the way
//! clients send them (camelCase).

use crate::case::to_camel_case;
use crate::config::{ResolvedTable, ValidationRule};
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full body (create, replace). Required fields must be present and non-null.
    pub fn validate(
        body: &Map<String, Value>,
        table: &ResolvedTable,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        check_types(body, table)?;
        for (col, rule) in sorted(rules) {
            let val = body.get(col);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!(
                    "{} is required",
                    to_camel_case(col)
                )));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (patch). Required is enforced as non-null.
    pub fn validate_partial(
        body: &Map<String, Value>,
        table: &ResolvedTable,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        check_types(body, table)?;
        for (col, rule) in sorted(rules) {
            let Some(v) = body.get(col) else {
                continue;
            };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!(
                    "{} must not be null",
                    to_camel_case(col)
                )));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }
}

fn sorted(rules: &HashMap<String, ValidationRule>) -> Vec<(&String, &ValidationRule)> {
    let mut v: Vec<_> = rules.iter().collect();
    v.sort_by(|a, b| a.0.cmp(b.0));
    v
}

/// JSON type of each writable column present in body must fit the column.
fn check_types(body: &Map<String, Value>, table: &ResolvedTable) -> Result<(), AppError> {
    for c in table.columns.iter().filter(|c| c.writable) {
        let Some(v) = body.get(&c.name) else {
            continue;
        };
        if v.is_null() {
            continue;
        }
        let expected = if c.is_integer() && v.as_i64().is_none() {
            Some("an integer")
        } else if c.is_boolean() && !v.is_boolean() {
            Some("a boolean")
        } else if c.is_text() && !v.is_string() {
            Some("a string")
        } else {
            None
        };
        if let Some(expected) = expected {
            return Err(AppError::Validation(format!(
                "{} must be {}",
                to_camel_case(&c.name),
                expected
            )));
        }
    }
    Ok(())
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    let field = to_camel_case(col);
    let fail = |message: String| Err(AppError::Validation(message));

    if let Some(s) = v.as_str() {
        if rule.not_blank == Some(true) && s.trim().is_empty() {
            return fail(format!("{} must not be blank", field));
        }
        let len = s.chars().count();
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return fail(format!("{} must be at least {} characters", field, min));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return fail(format!("{} must be at most {} characters", field, max));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|_| AppError::Validation(format!("invalid pattern for {}", field)))?;
            if !re.is_match(s) {
                return fail(format!("{} does not match required pattern", field));
            }
        }
    }
    if let Some(format) = &rule.format {
        validate_format(&field, v, format)?;
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return fail(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            ));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return fail(format!("{} must be at least {}", field, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return fail(format!("{} must be at most {}", field, max));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Ok(());
    };
    let (ok, what) = match format.to_lowercase().as_str() {
        "email" => (is_valid_email(s), "email"),
        "isbn" => (is_valid_isbn(s), "ISBN"),
        "uuid" => (uuid::Uuid::parse_str(s).is_ok(), "UUID"),
        _ => (true, ""),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", field, what)))
    }
}

pub fn is_valid_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// ISBN-10 or ISBN-13 with a valid check digit; hyphens are ignored.
pub fn is_valid_isbn(s: &str) -> bool {
    let chars: Vec<char> = s.chars().filter(|c| *c != '-').collect();
    match chars.len() {
        10 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let digit = match c.to_digit(10) {
                    Some(d) => d,
                    None if i == 9 && (*c == 'X' || *c == 'x') => 10,
                    None => return false,
                };
                sum += digit * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve, ResolvedEntity, ResolvedModel};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&default_catalog().unwrap()).unwrap()
    }

    fn body(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn full(entity: &ResolvedEntity, v: Value) -> Result<(), AppError> {
        RequestValidator::validate(&body(v), &entity.table, &entity.validation)
    }

    fn message(r: Result<(), AppError>) -> String {
        match r {
            Err(AppError::Validation(m)) => m,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_a_valid_book() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        let r = full(
            books,
            json!({ "title": "Dune", "isbn": "978-0-441-17271-9", "publication_year": 1965, "author_id": 1 }),
        );
        assert_matches!(r, Ok(()));
    }

    #[test]
    fn reports_missing_required_field_in_camel_case() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        let msg = message(full(books, json!({ "title": "Dune", "author_id": 1 })));
        assert_eq!(msg, "publicationYear is required");
    }

    #[test]
    fn enforces_ranges_and_lengths() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        let base = |year: i64, title: &str| {
            json!({ "title": title, "publication_year": year, "author_id": 1 })
        };
        assert_eq!(
            message(full(books, base(999, "Dune"))),
            "publicationYear must be at least 1000"
        );
        assert_eq!(
            message(full(books, base(2031, "Dune"))),
            "publicationYear must be at most 2030"
        );
        assert_eq!(
            message(full(books, base(2000, "D"))),
            "title must be at least 2 characters"
        );
        assert_eq!(message(full(books, base(2000, "   "))), "title must not be blank");

        let reviews = m.entity_by_path("reviews").unwrap();
        let r = full(reviews, json!({ "rating": 6, "reviewer_name": "Ann", "book_id": 1 }));
        assert_eq!(message(r), "rating must be at most 5");
    }

    #[test]
    fn rejects_mistyped_values() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        let r = full(books, json!({ "title": "Dune", "publication_year": "1965", "author_id": 1 }));
        assert_eq!(message(r), "publicationYear must be an integer");
        let r = full(
            books,
            json!({ "title": "Dune", "publication_year": 1965, "author_id": 1, "is_published": "yes" }),
        );
        assert_eq!(message(r), "isPublished must be a boolean");
    }

    #[test]
    fn partial_only_checks_present_fields() {
        let m = model();
        let books = m.entity_by_path("books").unwrap();
        let ok = RequestValidator::validate_partial(
            &body(json!({ "is_published": false })),
            &books.table,
            &books.validation,
        );
        assert_matches!(ok, Ok(()));
        let err = RequestValidator::validate_partial(
            &body(json!({ "title": null })),
            &books.table,
            &books.validation,
        );
        assert_eq!(message(err), "title must not be null");
    }

    #[test]
    fn isbn_checksums() {
        assert!(is_valid_isbn("0-306-40615-2"));
        assert!(is_valid_isbn("080442957X"));
        assert!(is_valid_isbn("9780306406157"));
        assert!(!is_valid_isbn("9780306406158"));
        assert!(!is_valid_isbn("0306406153"));
        assert!(!is_valid_isbn("12345"));
        assert!(!is_valid_isbn("X306406152"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.org"));
        assert!(!is_valid_email("ada.example.org"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("a da@example.org"));
    }
}
