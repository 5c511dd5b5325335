//! Publication-year grammar: `2000`, `1990s`, `1990-2000`, `>2000`, `<2000`.

use super::FilterInput;
use crate::sql::{CmpOp, Operand, Predicate};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YearFilter {
    Exact(i32),
    /// Inclusive on both ends.
    Range(i32, i32),
    /// `[start, start + 10)`.
    Decade(i32),
    After(i32),
    Before(i32),
    NoFilter,
}

struct Patterns {
    decade: Regex,
    range: Regex,
    after: Regex,
    before: Regex,
    exact: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        decade: Regex::new(r"^([0-9]{4})s$").expect("valid regex"),
        range: Regex::new(r"^([0-9]{4})-([0-9]{4})$").expect("valid regex"),
        after: Regex::new(r"^>([0-9]{4})$").expect("valid regex"),
        before: Regex::new(r"^<([0-9]{4})$").expect("valid regex"),
        exact: Regex::new(r"^([0-9]{4})$").expect("valid regex"),
    })
}

fn year(caps: &regex::Captures<'_>, i: usize) -> i32 {
    caps.get(i)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_default()
}

impl YearFilter {
    /// Only a single string is accepted; lists and unmatched text yield `NoFilter`.
    pub fn parse(input: &FilterInput) -> Self {
        match input {
            FilterInput::Text(s) => Self::parse_str(s),
            FilterInput::List(_) => YearFilter::NoFilter,
        }
    }

    pub fn parse_str(value: &str) -> Self {
        let p = patterns();
        if let Some(c) = p.decade.captures(value) {
            YearFilter::Decade(year(&c, 1))
        } else if let Some(c) = p.range.captures(value) {
            YearFilter::Range(year(&c, 1), year(&c, 2))
        } else if let Some(c) = p.after.captures(value) {
            YearFilter::After(year(&c, 1))
        } else if let Some(c) = p.before.captures(value) {
            YearFilter::Before(year(&c, 1))
        } else if let Some(c) = p.exact.captures(value) {
            YearFilter::Exact(year(&c, 1))
        } else {
            YearFilter::NoFilter
        }
    }

    pub fn predicates(&self, column: &str) -> Vec<Predicate> {
        let cmp = |op, y: i32| Predicate::Compare(Operand::Column(column.to_string()), op, y.into());
        match *self {
            YearFilter::Exact(y) => vec![cmp(CmpOp::Eq, y)],
            YearFilter::Range(start, end) => vec![cmp(CmpOp::Gte, start), cmp(CmpOp::Lte, end)],
            YearFilter::Decade(start) => vec![cmp(CmpOp::Gte, start), cmp(CmpOp::Lt, start + 10)],
            YearFilter::After(y) => vec![cmp(CmpOp::Gt, y)],
            YearFilter::Before(y) => vec![cmp(CmpOp::Lt, y)],
            YearFilter::NoFilter => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_form() {
        assert_eq!(YearFilter::parse_str("2000"), YearFilter::Exact(2000));
        assert_eq!(YearFilter::parse_str("1990s"), YearFilter::Decade(1990));
        assert_eq!(YearFilter::parse_str("1990-2000"), YearFilter::Range(1990, 2000));
        assert_eq!(YearFilter::parse_str(">2000"), YearFilter::After(2000));
        assert_eq!(YearFilter::parse_str("<2000"), YearFilter::Before(2000));
    }

    #[test]
    fn anything_else_is_no_filter() {
        for raw in ["", "abc", "200", "20000", "1990s ", "1990-", ">=2000", "١٩٩٠", "1990-2000-2010"] {
            assert_eq!(YearFilter::parse_str(raw), YearFilter::NoFilter, "{raw:?}");
        }
        assert_eq!(
            YearFilter::parse(&FilterInput::List(vec!["2000".into()])),
            YearFilter::NoFilter
        );
    }

    #[test]
    fn decade_is_half_open() {
        let preds = YearFilter::Decade(1990).predicates("publication_year");
        let col = || Operand::Column("publication_year".into());
        assert_eq!(
            preds,
            vec![
                Predicate::Compare(col(), CmpOp::Gte, json!(1990)),
                Predicate::Compare(col(), CmpOp::Lt, json!(2000)),
            ]
        );
    }

    #[test]
    fn range_is_inclusive_and_bounds_are_strict() {
        let col = || Operand::Column("y".into());
        assert_eq!(
            YearFilter::Range(1990, 2000).predicates("y"),
            vec![
                Predicate::Compare(col(), CmpOp::Gte, json!(1990)),
                Predicate::Compare(col(), CmpOp::Lte, json!(2000)),
            ]
        );
        assert_eq!(
            YearFilter::After(2000).predicates("y"),
            vec![Predicate::Compare(col(), CmpOp::Gt, json!(2000))]
        );
        assert_eq!(
            YearFilter::Before(2000).predicates("y"),
            vec![Predicate::Compare(col(), CmpOp::Lt, json!(2000))]
        );
        assert!(YearFilter::NoFilter.predicates("y").is_empty());
    }
}
