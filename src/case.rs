//! Case conversion at the API edge: request keys camelCase -> snake_case (columns),
//! response keys snake_case -> camelCase.

use serde_json::{Map, Value};

/// e.g. "publication_year" -> "publicationYear", "is_published" -> "isPublished"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// e.g. "reviewerName" -> "reviewer_name", "authorId" -> "author_id"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Request body object with its keys converted to column names.
pub fn object_keys_to_snake_case(obj: Map<String, Value>) -> Map<String, Value> {
    obj.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}

/// Recursively camelCase every object key (objects and arrays of objects), for responses.
pub fn value_keys_to_camel_case_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let converted: Map<String, Value> = std::mem::take(map)
                .into_iter()
                .map(|(k, mut v)| {
                    value_keys_to_camel_case_recursive(&mut v);
                    (to_camel_case(&k), v)
                })
                .collect();
            *map = converted;
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                value_keys_to_camel_case_recursive(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_identifiers_both_ways() {
        assert_eq!(to_camel_case("publication_year"), "publicationYear");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_snake_case("isPublished"), "is_published");
        assert_eq!(to_snake_case("nationality"), "nationality");
        assert_eq!(to_snake_case(&to_camel_case("reviewer_name")), "reviewer_name");
    }

    #[test]
    fn response_keys_are_camel_cased_recursively() {
        let mut v = json!({
            "publication_year": 1999,
            "reviews": [{ "reviewer_name": "Ann", "id": 1 }]
        });
        value_keys_to_camel_case_recursive(&mut v);
        assert_eq!(
            v,
            json!({ "publicationYear": 1999, "reviews": [{ "reviewerName": "Ann", "id": 1 }] })
        );
    }

    #[test]
    fn body_keys_become_columns() {
        let body = json!({ "authorId": 3, "title": "Dune" });
        let Value::Object(map) = body else { unreachable!() };
        let map = object_keys_to_snake_case(map);
        assert_eq!(map.get("author_id"), Some(&json!(3)));
        assert_eq!(map.get("title"), Some(&json!("Dune")));
    }
}
