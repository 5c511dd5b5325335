//! Nationality grammar, case-insensitive: `French,German`, `!French`, `Fren*`, `French`,
//! or repeated `nationality[]=...`.

use super::FilterInput;
use crate::sql::{CmpOp, Operand, Predicate};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NationalityFilter {
    AnyOf(Vec<String>),
    Not(String),
    /// SQL LIKE pattern, already lowercased and escaped.
    Like(String),
    Equals(String),
    NoFilter,
}

/// Empty and `"0"` count as absent values.
fn is_blank(value: &str) -> bool {
    value.is_empty() || value == "0"
}

fn any_of<'a>(items: impl Iterator<Item = &'a str>) -> NationalityFilter {
    let values: Vec<String> = items
        .map(str::trim)
        .filter(|s| !is_blank(s))
        .map(str::to_lowercase)
        .collect();
    if values.is_empty() {
        NationalityFilter::NoFilter
    } else {
        NationalityFilter::AnyOf(values)
    }
}

/// Escape LIKE metacharacters, then turn `*` into `%`.
fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.to_lowercase().chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            _ => out.push(c),
        }
    }
    out
}

impl NationalityFilter {
    pub fn parse(input: &FilterInput) -> Self {
        match input {
            FilterInput::Text(s) => Self::parse_str(s),
            FilterInput::List(items) => any_of(items.iter().map(String::as_str)),
        }
    }

    pub fn parse_str(value: &str) -> Self {
        if is_blank(value) {
            NationalityFilter::NoFilter
        } else if value.contains(',') {
            any_of(value.split(','))
        } else if let Some(rest) = value.strip_prefix('!') {
            NationalityFilter::Not(rest.to_lowercase())
        } else if value.contains('*') {
            NationalityFilter::Like(like_pattern(value))
        } else {
            NationalityFilter::Equals(value.to_lowercase())
        }
    }

    pub fn predicates(&self, column: &str) -> Vec<Predicate> {
        let lower = || Operand::Lower(column.to_string());
        match self {
            NationalityFilter::AnyOf(values) => vec![Predicate::In(
                lower(),
                values.iter().cloned().map(Value::String).collect(),
            )],
            NationalityFilter::Not(v) => vec![Predicate::NotEqualOrNull(lower(), v.clone().into())],
            NationalityFilter::Like(p) => vec![Predicate::Like(lower(), p.clone())],
            NationalityFilter::Equals(v) => {
                vec![Predicate::Compare(lower(), CmpOp::Eq, v.clone().into())]
            }
            NationalityFilter::NoFilter => Vec::new(),
        }
    }
}
