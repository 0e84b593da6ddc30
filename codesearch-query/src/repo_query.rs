// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering expressions as parameterized predicates over a repository table.
//!
//! The predicate refers to two columns: `name`, the repository name, and `content`, the
//! document text. Pattern values are never written into the predicate; each one is
//! replaced by a placeholder produced by a [`BindVar`], and returned separately by
//! [`RepoQuery::args`] in placeholder order.

use crate::Expr;
use std::fmt;

/// Produces the placeholder for a bound value.
pub trait BindVar {
    /// Returns the placeholder for the value at `position`, starting at 1.
    fn bind_var(&self, position: usize) -> String;
}

impl<F> BindVar for F
where
    F: Fn(usize) -> String,
{
    fn bind_var(&self, position: usize) -> String {
        self(position)
    }
}

/// Binds values with `?`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuestionBindVar;

impl BindVar for QuestionBindVar {
    fn bind_var(&self, _position: usize) -> String {
        "?".to_owned()
    }
}

/// Binds values with numbered placeholders: `$1`, `$2` and so on.
#[derive(Clone, Copy, Debug, Default)]
pub struct DollarBindVar;

impl BindVar for DollarBindVar {
    fn bind_var(&self, position: usize) -> String {
        format!("${position}")
    }
}

/// Binds values with `%q`, for printf-style debugging output.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintfBindVar;

impl BindVar for PrintfBindVar {
    fn bind_var(&self, _position: usize) -> String {
        "%q".to_owned()
    }
}

/// A value bound to a placeholder in a [`RepoQuery`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryArg {
    /// A substring or a repository name regex.
    Text(String),
    /// A list of repository names, in ascending order.
    Names(Vec<String>),
}

impl fmt::Display for QueryArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Names(names) => {
                f.write_str("{")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name:?}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder,
}

/// A predicate template with its bound values.
///
/// Created by [`Expr::repo_query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoQuery {
    segments: Vec<Segment>,
    args: Vec<QueryArg>,
}

impl RepoQuery {
    /// Returns the predicate, with placeholders produced by `binder`.
    pub fn query(&self, binder: &impl BindVar) -> String {
        let mut query = String::new();
        let mut position = 0;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => query.push_str(text),
                Segment::Placeholder => {
                    position += 1;
                    query.push_str(&binder.bind_var(position));
                }
            }
        }
        query
    }

    /// Returns the bound values, in the order their placeholders appear.
    pub fn args(&self) -> &[QueryArg] {
        &self.args
    }
}

#[derive(Default)]
struct RepoQueryBuilder {
    segments: Vec<Segment>,
    args: Vec<QueryArg>,
}

impl RepoQueryBuilder {
    fn push_str(&mut self, text: &str) {
        match self.segments.last_mut() {
            Some(Segment::Literal(literal)) => literal.push_str(text),
            _ => self.segments.push(Segment::Literal(text.to_owned())),
        }
    }

    fn push_arg(&mut self, arg: QueryArg) {
        self.segments.push(Segment::Placeholder);
        self.args.push(arg);
    }

    fn push_list(&mut self, children: &[Expr], separator: &str) {
        self.push_str("(");
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.push_str(separator);
            }
            self.push_expr(child);
        }
        self.push_str(")");
    }

    fn push_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Substring(pattern) => {
                self.push_str("strpos(content, ");
                self.push_arg(QueryArg::Text(pattern.clone()));
                self.push_str(") > 0");
            }
            Expr::Repo(pattern) => {
                self.push_str("name ~ ");
                self.push_arg(QueryArg::Text(pattern.clone()));
            }
            Expr::RepoSet(names) => {
                self.push_str("name = ANY(");
                self.push_arg(QueryArg::Names(names.iter().cloned().collect()));
                self.push_str(")");
            }
            Expr::Const(true) => self.push_str("TRUE"),
            Expr::Const(false) => self.push_str("FALSE"),
            Expr::And(children) if children.is_empty() => self.push_str("TRUE"),
            Expr::Or(children) if children.is_empty() => self.push_str("FALSE"),
            Expr::Not(child) => {
                self.push_str("NOT ");
                match &**child {
                    // These bring their own parentheses.
                    Expr::And(children) | Expr::Or(children) if !children.is_empty() => {
                        self.push_expr(child)
                    }
                    _ => {
                        self.push_str("(");
                        self.push_expr(child);
                        self.push_str(")");
                    }
                }
            }
            Expr::And(children) => self.push_list(children, " AND "),
            Expr::Or(children) => self.push_list(children, " OR "),
        }
    }

    fn finish(self) -> RepoQuery {
        RepoQuery {
            segments: self.segments,
            args: self.args,
        }
    }
}

impl Expr {
    /// Renders this expression as a parameterized predicate.
    ///
    /// * `Substring(p)` becomes `strpos(content, <var>) > 0`, binding `p`.
    /// * `Repo(p)` becomes `name ~ <var>`, binding `p`.
    /// * `RepoSet(names)` becomes `name = ANY(<var>)`, binding the sorted names.
    /// * `And` and `Or` become parenthesized ` AND ` and ` OR ` lists. An empty `And` is
    ///   `TRUE` and an empty `Or` is `FALSE`.
    /// * `Not(c)` becomes `NOT (c)`.
    pub fn repo_query(&self) -> RepoQuery {
        let mut builder = RepoQueryBuilder::default();
        builder.push_expr(self);
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use test_case::test_case;

    fn text(value: &str) -> QueryArg {
        QueryArg::Text(value.to_owned())
    }

    #[test]
    fn test_repo_query() {
        let expr = Expr::parse("foo r:ba -(r:foo or r:baz)")
            .expect("valid query")
            .simplify();
        let query = expr.repo_query();
        assert_eq!(
            query.query(&DollarBindVar),
            "(strpos(content, $1) > 0 AND name ~ $2 AND NOT (name ~ $3 OR name ~ $4))"
        );
        assert_eq!(
            query.args(),
            [text("foo"), text("ba"), text("foo"), text("baz")]
        );
    }

    #[test]
    fn test_binders() {
        let expr = Expr::new_or([
            Expr::Substring("a".to_owned()),
            Expr::RepoSet(BTreeSet::from(["foo".to_owned(), "bar".to_owned()])),
        ]);
        let query = expr.repo_query();
        assert_eq!(
            query.query(&QuestionBindVar),
            "(strpos(content, ?) > 0 OR name = ANY(?))"
        );
        assert_eq!(
            query.query(&PrintfBindVar),
            "(strpos(content, %q) > 0 OR name = ANY(%q))"
        );
        assert_eq!(
            query.query(&|position: usize| format!(":p{position}")),
            "(strpos(content, :p1) > 0 OR name = ANY(:p2))"
        );
        assert_eq!(
            query.args(),
            [
                text("a"),
                QueryArg::Names(vec!["bar".to_owned(), "foo".to_owned()])
            ]
        );
    }

    #[test_case(Expr::Const(true), "TRUE" ; "true")]
    #[test_case(Expr::Const(false), "FALSE" ; "false")]
    #[test_case(Expr::And(Vec::new()), "TRUE" ; "empty and")]
    #[test_case(Expr::Or(Vec::new()), "FALSE" ; "empty or")]
    #[test_case(Expr::Const(false).negate(), "NOT (FALSE)" ; "negated constant")]
    #[test_case(Expr::And(Vec::new()).negate(), "NOT (TRUE)" ; "negated empty and")]
    #[test_case(
        Expr::Substring("x".to_owned()).negate(),
        "NOT (strpos(content, $1) > 0)"
        ; "negated atom"
    )]
    #[test_case(
        Expr::Repo("x".to_owned()).negate().negate(),
        "NOT (NOT (name ~ $1))"
        ; "double negation"
    )]
    #[test_case(
        Expr::new_and([Expr::Repo("x".to_owned())]),
        "(name ~ $1)"
        ; "single child"
    )]
    fn test_repo_query_shapes(expr: Expr, expected: &str) {
        assert_eq!(expr.repo_query().query(&DollarBindVar), expected);
    }

    #[test]
    fn test_values_are_not_interpolated() {
        let pattern = "'; DROP TABLE repo; --";
        let expr = Expr::new_and([
            Expr::Substring(pattern.to_owned()),
            Expr::Repo(pattern.to_owned()),
        ]);
        let query = expr.repo_query();
        assert!(!query.query(&QuestionBindVar).contains(pattern));
        assert_eq!(query.args(), [text(pattern), text(pattern)]);
    }

    #[test]
    fn test_query_arg_display() {
        assert_eq!(text(r#"say "hi""#).to_string(), r#""say \"hi\"""#);
        assert_eq!(
            QueryArg::Names(vec!["bar".to_owned(), "foo".to_owned()]).to_string(),
            r#"{"bar","foo"}"#
        );
        assert_eq!(QueryArg::Names(Vec::new()).to_string(), "{}");
    }
}
