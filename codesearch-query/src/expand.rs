// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of repository filters into explicit repository sets.

use crate::{
    Expr,
    errors::{LookupError, RepoLookupError},
};
use std::collections::BTreeSet;
use tracing::debug;

/// Resolves repository name patterns to the repositories they match.
///
/// This is implemented for closures with the same signature as [`RepoOracle::lookup`], and
/// by [`RepoList`](crate::RepoList).
pub trait RepoOracle {
    /// Returns the names of the repositories that match every pattern in `include` and no
    /// pattern in `exclude`.
    ///
    /// An empty `include` matches every known repository.
    fn lookup(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<BTreeSet<String>, LookupError>;
}

impl<F> RepoOracle for F
where
    F: Fn(&[String], &[String]) -> Result<BTreeSet<String>, LookupError>,
{
    fn lookup(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<BTreeSet<String>, LookupError> {
        self(include, exclude)
    }
}

impl Expr {
    /// Replaces the repository filters of every conjunction with the set of repositories
    /// they select.
    ///
    /// Within each `And`, the `Repo` children and the negated `Repo` children are resolved
    /// together with a single call to `oracle`. If no repository matches, the whole
    /// conjunction becomes `Const(false)`; otherwise the filters are replaced by one
    /// [`Expr::RepoSet`] appended after the remaining children.
    ///
    /// Repository filters directly inside an `Or` or a `Not` are left as they are. The input
    /// is expected to be flat, as built by [`Expr::new_and`] or [`Expr::parse`].
    ///
    /// If the oracle fails, the error is returned and nothing else is.
    pub fn expand_repo(&self, oracle: &impl RepoOracle) -> Result<Expr, RepoLookupError> {
        match self {
            Self::Not(child) => Ok(child.expand_repo(oracle)?.negate()),
            Self::Or(children) => {
                let children = children
                    .iter()
                    .map(|child| child.expand_repo(oracle))
                    .collect::<Result<_, _>>()?;
                Ok(Self::Or(children))
            }
            Self::And(children) => expand_conjunction(children, oracle),
            Self::Substring(_) | Self::Repo(_) | Self::RepoSet(_) | Self::Const(_) => {
                Ok(self.clone())
            }
        }
    }
}

fn expand_conjunction(
    children: &[Expr],
    oracle: &impl RepoOracle,
) -> Result<Expr, RepoLookupError> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut other = Vec::new();
    for child in children {
        match child {
            Expr::Repo(pattern) => include.push(pattern.clone()),
            Expr::Not(inner) => match &**inner {
                Expr::Repo(pattern) => exclude.push(pattern.clone()),
                _ => other.push(child.expand_repo(oracle)?),
            },
            _ => other.push(child.expand_repo(oracle)?),
        }
    }

    if include.is_empty() && exclude.is_empty() {
        return Ok(Expr::And(other));
    }

    let names = match oracle.lookup(&include, &exclude) {
        Ok(names) => names,
        Err(error) => return Err(RepoLookupError::new(include, exclude, error)),
    };
    debug!(
        ?include,
        ?exclude,
        matched = names.len(),
        "resolved repository filters"
    );

    if names.is_empty() {
        return Ok(Expr::Const(false));
    }
    if other.is_empty() {
        return Ok(Expr::RepoSet(names));
    }
    other.push(Expr::RepoSet(names));
    Ok(Expr::And(other))
}
