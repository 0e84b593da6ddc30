// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use codesearch_query::{Expr, PrintfBindVar, QueryArg, RepoList, errors::LookupError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;
use test_case::test_case;

fn list() -> RepoList {
    RepoList::new(["foo", "bar", "baz"])
}

#[track_caller]
fn parse(input: &str) -> Expr {
    match Expr::parse(input) {
        Ok(expr) => expr,
        Err(errors) => panic!("{input:?} failed to parse: {:?}", errors.errors),
    }
}

fn display_set(set: Option<BTreeSet<String>>) -> String {
    match set {
        Some(set) => format!("{{{}}}", set.into_iter().collect::<Vec<_>>().join(" ")),
        None => String::new(),
    }
}

#[test_case("r:", "(reposet bar baz foo)")]
#[test_case("r:b", "(reposet bar baz)")]
#[test_case("r:b r:a", "(reposet bar baz)")]
#[test_case("r:b -r:baz", "(reposet bar)")]
#[test_case("-r:f", "(reposet bar baz)")]
#[test_case("r:foo", "(reposet foo)")]
#[test_case("r:foo r:baz", "FALSE")]
#[test_case("r:foo test", r#"(and substr:"test" (reposet foo))"#)]
#[test_case(
    "r:foo test -hello",
    r#"(and substr:"test" (not substr:"hello") (reposet foo))"#
)]
#[test_case("(r:ba test (r:b r:a -r:z))", r#"(and substr:"test" (reposet bar))"#)]
// The only case where a repository set ends up under a negation.
#[test_case(
    "bar -(r:foo test)",
    r#"(and substr:"bar" (not (and substr:"test" (reposet foo))))"#
)]
fn test_expand_repo(input: &str, expected: &str) {
    let expanded = parse(input).expand_repo(&list()).unwrap();
    assert_eq!(expanded.to_string(), expected);
}

#[test]
fn test_expand_repo_error() {
    let oracle = |_: &[String], _: &[String]| -> Result<BTreeSet<String>, LookupError> {
        Err("fail".into())
    };
    let expr = parse("(foo repo:bar) or (baz repo:bam)");
    let error = expr
        .expand_repo(&oracle)
        .expect_err("oracle errors are returned");
    assert_eq!(
        error.to_string(),
        r#"failed to look up repositories (include: ["bar"], exclude: [])"#
    );
}

#[test_case("r:", "{bar baz foo}")]
#[test_case("r:b", "{bar baz}")]
#[test_case("r:b r:a", "{bar baz}")]
#[test_case("r:b -r:baz", "{bar}")]
#[test_case("-r:f", "{bar baz}")]
#[test_case("r:foo", "{foo}")]
#[test_case("r:foo r:baz", "{}")]
#[test_case("foo -(r:foo r:baz)", "")]
#[test_case("foo r:ba -(r:foo or r:baz)", "{bar}")]
#[test_case("foo r:ba -(r:foo or r:baz or hello)", "{bar}")]
#[test_case("foo r:ba -(r:foo or hello)", "{bar baz}")]
#[test_case("foo -(r:baz hello)", "")]
#[test_case("foo r:ba -((r:foo or hello) world)", "{bar baz}")]
#[test_case("foo r:ba -((r:foo or hello) r:foo)", "{bar baz}")]
#[test_case("foo -(-(r:bar hello))", "{bar}")]
#[test_case("foo -(-(hello))", "")]
#[test_case("foo -(r:bar hello)", "")]
#[test_case("foo -(hello)", "")]
#[test_case("foo r:b -(-(r:bar hello))", "{bar}")]
#[test_case("foo r:b -(-(hello))", "{bar baz}")]
#[test_case("foo r:b -(r:bar hello)", "{bar baz}")]
#[test_case("foo r:b -(hello)", "{bar baz}")]
// baz is still allowed since it can have matches in documents without hello.
#[test_case("foo r:ba -(r:baz hello)", "{bar baz}")]
#[test_case("r:foo test", "{foo}")]
#[test_case("r:foo test -hello", "{foo}")]
#[test_case("(r:ba test (r:b r:a -r:z))", "{bar}")]
#[test_case("bar -(r:foo test)", "")]
fn test_minimal_repo_set(input: &str, expected: &str) {
    let expanded = parse(input).expand_repo(&list()).unwrap();
    assert_eq!(display_set(expanded.minimal_repo_set()), expected);

    // Simplifying doesn't change the answer.
    assert_eq!(
        display_set(expanded.simplify().minimal_repo_set()),
        expected,
        "after simplify"
    );

    // Neither does going through the whole pipeline.
    let resolved = parse(input).resolve(&list()).unwrap();
    assert_eq!(
        display_set(resolved.repos().cloned()),
        expected,
        "after resolve"
    );
}

#[test_case(
    "r:foo test",
    "(strpos(content, %q) > 0 AND name = ANY(%q))",
    &[QueryArg::Text("test".to_owned()), QueryArg::Names(vec!["foo".to_owned()])]
    ; "repository set"
)]
#[test_case(
    "foo r:ba -(r:foo or r:baz)",
    "(strpos(content, %q) > 0 AND NOT (name = ANY(%q) OR name = ANY(%q)) AND name = ANY(%q))",
    &[
        QueryArg::Text("foo".to_owned()),
        QueryArg::Names(vec!["foo".to_owned()]),
        QueryArg::Names(vec!["baz".to_owned()]),
        QueryArg::Names(vec!["bar".to_owned(), "baz".to_owned()]),
    ]
    ; "negated alternatives"
)]
#[test_case("r:foo r:baz", "FALSE", &[] ; "nothing matches")]
fn test_repo_query(input: &str, expected: &str, args: &[QueryArg]) {
    let resolved = parse(input).resolve(&list()).unwrap();
    let query = resolved.repo_query();
    assert_eq!(query.query(&PrintfBindVar), expected);
    assert_eq!(query.args(), args);
}

// ---
// Properties over a small universe.
// ---

const REPOS: [&str; 3] = ["alpha", "beta", "gamma"];
const WORDS: [&str; 2] = ["x", "y"];

/// A document: the repository it's in, and its content.
struct Doc {
    repo: &'static str,
    content: String,
}

fn docs() -> Vec<Doc> {
    let contents = ["", "x", "y", "x y"];
    REPOS
        .into_iter()
        .flat_map(|repo| {
            contents.iter().map(move |content| Doc {
                repo,
                content: (*content).to_owned(),
            })
        })
        .collect()
}

fn matches(expr: &Expr, doc: &Doc) -> bool {
    match expr {
        Expr::Substring(pattern) => doc.content.contains(pattern.as_str()),
        Expr::Repo(pattern) => regex::Regex::new(pattern)
            .expect("generated patterns are valid")
            .is_match(doc.repo),
        Expr::RepoSet(names) => names.contains(doc.repo),
        Expr::Const(value) => *value,
        Expr::Not(child) => !matches(child, doc),
        Expr::And(children) => children.iter().all(|child| matches(child, doc)),
        Expr::Or(children) => children.iter().any(|child| matches(child, doc)),
    }
}

/// Queries as a user would write them: parsed from the surface syntax.
fn query_strategy() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        prop::sample::select(WORDS.to_vec()).prop_map(|word| Expr::Substring(word.to_owned())),
        prop::sample::select(vec!["", "a", "^b", "ma$", "gamma|beta", "^$", "^alpha$"])
            .prop_map(|pattern| Expr::Repo(pattern.to_owned())),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expr::negate),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Expr::And),
            prop::collection::vec(inner, 1..4).prop_map(Expr::Or),
        ]
    })
    .prop_map(|expr| {
        let query = expr
            .simplify()
            .to_query_string()
            .expect("no constants are generated");
        parse(&query)
    })
}

fn universe() -> RepoList {
    RepoList::new(REPOS)
}

#[test_strategy::proptest]
fn proptest_expand_preserves_matches(#[strategy(query_strategy())] expr: Expr) {
    let expanded = expr.expand_repo(&universe()).unwrap();
    let resolved = expr.resolve(&universe()).unwrap();
    for doc in docs() {
        let expected = matches(&expr, &doc);
        prop_assert_eq!(matches(&expanded, &doc), expected, "expand_repo: {}", expanded);
        prop_assert_eq!(
            matches(resolved.expr(), &doc),
            expected,
            "resolve: {}",
            resolved.expr()
        );
    }
}

#[test_strategy::proptest]
fn proptest_resolved_repos_are_sound(#[strategy(query_strategy())] expr: Expr) {
    let resolved = expr.resolve(&universe()).unwrap();
    for doc in docs() {
        if matches(&expr, &doc) {
            prop_assert!(
                resolved.may_match_repo(doc.repo),
                "{} matches a document in {}, but the resolved set is {:?}",
                expr,
                doc.repo,
                resolved.repos()
            );
        }
    }
}

#[test_strategy::proptest]
fn proptest_simplify_preserves_matches(#[strategy(query_strategy())] expr: Expr) {
    let simplified = expr.simplify();
    for doc in docs() {
        prop_assert_eq!(matches(&simplified, &doc), matches(&expr, &doc));
    }
}
