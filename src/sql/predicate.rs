//! WHERE-clause predicates produced by filters, extensions and nested links.
//! Column names come from the catalog; every value is a bound parameter.

use super::builder::{quoted, QueryBuf};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Column(String),
    /// `LOWER(column)` for case-insensitive matching.
    Lower(String),
}

impl Operand {
    pub fn column(&self) -> &str {
        match self {
            Operand::Column(c) | Operand::Lower(c) => c,
        }
    }

    fn render(&self, alias: &str) -> String {
        match self {
            Operand::Column(c) => format!("{}.{}", alias, quoted(c)),
            Operand::Lower(c) => format!("LOWER({}.{})", alias, quoted(c)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "<>",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare(Operand, CmpOp, Value),
    In(Operand, Vec<Value>),
    Like(Operand, String),
    /// `operand <> value OR column IS NULL`: exclusion that keeps rows with no value.
    NotEqualOrNull(Operand, Value),
}

impl Predicate {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Predicate::Compare(Operand::Column(column.to_string()), CmpOp::Eq, value.into())
    }

    /// Renders against `alias`, pushing values onto `q.params`.
    pub fn render(&self, alias: &str, q: &mut QueryBuf) -> String {
        match self {
            Predicate::Compare(operand, op, value) => {
                let n = q.push_param(value.clone());
                format!("{} {} ${}", operand.render(alias), op.as_sql(), n)
            }
            Predicate::In(_, values) if values.is_empty() => "FALSE".to_string(),
            Predicate::In(operand, values) => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("${}", q.push_param(v.clone())))
                    .collect();
                format!("{} IN ({})", operand.render(alias), placeholders.join(", "))
            }
            Predicate::Like(operand, pattern) => {
                let n = q.push_param(Value::String(pattern.clone()));
                format!("{} LIKE ${}", operand.render(alias), n)
            }
            Predicate::NotEqualOrNull(operand, value) => {
                let n = q.push_param(value.clone());
                format!(
                    "({} <> ${} OR {}.{} IS NULL)",
                    operand.render(alias),
                    n,
                    alias,
                    quoted(operand.column())
                )
            }
        }
    }
}

/// ` WHERE a AND b` (empty when there is nothing to render).
pub fn render_where(
    leading: Vec<String>,
    predicates: &[Predicate],
    alias: &str,
    q: &mut QueryBuf,
) -> String {
    let mut parts = leading;
    parts.extend(predicates.iter().map(|p| p.render(alias, q)));
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn renders_comparison_with_numbered_params() {
        let mut q = QueryBuf::new();
        let preds = vec![
            Predicate::Compare(Operand::Column("publication_year".into()), CmpOp::Gte, json!(1990)),
            Predicate::Compare(Operand::Column("publication_year".into()), CmpOp::Lt, json!(2000)),
        ];
        let sql = render_where(Vec::new(), &preds, "main", &mut q);
        assert_eq!(
            sql,
            r#" WHERE main."publication_year" >= $1 AND main."publication_year" < $2"#
        );
        assert_eq!(q.params, vec![json!(1990), json!(2000)]);
    }

    #[test]
    fn renders_case_insensitive_forms() {
        let mut q = QueryBuf::new();
        let col = || Operand::Lower("nationality".into());
        let any = Predicate::In(col(), vec![json!("french"), json!("german")]).render("main", &mut q);
        let like = Predicate::Like(col(), "fren%".into()).render("main", &mut q);
        let not = Predicate::NotEqualOrNull(col(), json!("french")).render("main", &mut q);
        assert_eq!(any, r#"LOWER(main."nationality") IN ($1, $2)"#);
        assert_eq!(like, r#"LOWER(main."nationality") LIKE $3"#);
        assert_eq!(
            not,
            r#"(LOWER(main."nationality") <> $4 OR main."nationality" IS NULL)"#
        );
        assert_eq!(q.params.len(), 4);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let mut q = QueryBuf::new();
        let sql = Predicate::In(Operand::Column("id".into()), Vec::new()).render("main", &mut q);
        assert_eq!(sql, "FALSE");
        assert!(q.params.is_empty());
    }

    #[test]
    fn leading_conditions_come_first() {
        let mut q = QueryBuf::new();
        q.push_param(json!(7));
        let sql = render_where(
            vec![r#"main."id" = $1::integer"#.to_string()],
            &[Predicate::eq("is_published", true)],
            "main",
            &mut q,
        );
        assert_eq!(sql, r#" WHERE main."id" = $1::integer AND main."is_published" = $2"#);
    }
}
