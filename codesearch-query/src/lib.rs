// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The query algebra of a code search engine.
//!
//! A query is parsed into an [`Expr`] tree of substring and repository filters combined
//! with `and`, `or` and `not`. Repository filters are then resolved against a
//! [`RepoOracle`] into explicit repository sets, after which the query can be used to:
//!
//! * compute the smallest set of repositories that can contain a match
//!   ([`Expr::minimal_repo_set`]), to route the query;
//! * render a parameterized predicate for a backend store ([`Expr::repo_query`]).
//!
//! [`Expr::resolve`] runs the whole pipeline.

pub mod errors;
mod expand;
mod expression;
mod parsing;
#[cfg(any(test, feature = "internal-testing"))]
mod proptest_helpers;
mod repo_list;
mod repo_query;
mod repo_set;
mod resolve;
mod simplify;

pub use expand::RepoOracle;
pub use expression::Expr;
pub use repo_list::{RepoList, RepoListConfig};
pub use repo_query::{BindVar, DollarBindVar, PrintfBindVar, QueryArg, QuestionBindVar, RepoQuery};
pub use resolve::ResolvedQuery;
