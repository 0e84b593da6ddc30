// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Expr, RepoOracle, RepoQuery, errors::RepoLookupError};
use std::collections::BTreeSet;
use tracing::debug;

/// A query whose repository filters have been resolved against an oracle.
///
/// Created by [`Expr::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedQuery {
    expr: Expr,
    repos: Option<BTreeSet<String>>,
}

impl ResolvedQuery {
    /// Returns the expanded, simplified expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Returns the repositories that can contain matches, or `None` if any repository
    /// can.
    pub fn repos(&self) -> Option<&BTreeSet<String>> {
        self.repos.as_ref()
    }

    /// Returns true if documents in the repository `name` may match.
    ///
    /// Repositories for which this returns false can be skipped entirely.
    pub fn may_match_repo(&self, name: &str) -> bool {
        self.repos.as_ref().is_none_or(|repos| repos.contains(name))
    }

    /// Returns true if nothing can match this query.
    pub fn is_empty(&self) -> bool {
        self.expr == Expr::Const(false)
    }

    /// Renders the expression as a parameterized predicate.
    pub fn repo_query(&self) -> RepoQuery {
        self.expr.repo_query()
    }

    /// Splits this into the expression and the repository set.
    pub fn into_parts(self) -> (Expr, Option<BTreeSet<String>>) {
        (self.expr, self.repos)
    }
}

impl Expr {
    /// Expands repository filters through `oracle`, simplifies the result and computes
    /// the repositories it can match in.
    ///
    /// Unlike [`Expr::expand_repo`], this resolves every repository filter: filters that
    /// are not directly inside a conjunction, such as a bare `Repo` or one under a double
    /// negation, are first wrapped in a conjunction of their own. The resolved expression
    /// has no [`Expr::Repo`] left.
    pub fn resolve(&self, oracle: &impl RepoOracle) -> Result<ResolvedQuery, RepoLookupError> {
        let expanded = scope_repo_filters(self, false).expand_repo(oracle)?;
        let expr = expanded.simplify();
        let repos = expr.minimal_repo_set();
        debug!(
            %expr,
            repos = ?repos.as_ref().map(|repos| repos.len()),
            "resolved query"
        );
        Ok(ResolvedQuery { expr, repos })
    }
}

/// Wraps every `Repo` that expansion would skip in a single-child `And`.
fn scope_repo_filters(expr: &Expr, in_conjunction: bool) -> Expr {
    match expr {
        Expr::Repo(_) if !in_conjunction => Expr::And(vec![expr.clone()]),
        Expr::Not(child) => match &**child {
            Expr::Repo(_) if in_conjunction => expr.clone(),
            child => scope_repo_filters(child, false).negate(),
        },
        Expr::And(children) => Expr::And(
            children
                .iter()
                .map(|child| scope_repo_filters(child, true))
                .collect(),
        ),
        Expr::Or(children) => Expr::Or(
            children
                .iter()
                .map(|child| scope_repo_filters(child, false))
                .collect(),
        ),
        Expr::Substring(_) | Expr::Repo(_) | Expr::RepoSet(_) | Expr::Const(_) => expr.clone(),
    }
}
