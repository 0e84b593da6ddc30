// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Computing the smallest set of repositories a query can match in.

use crate::expression::{Expr, ExprFrame, Wrapped};
use recursion::CollapsibleExt;
use std::collections::BTreeSet;

/// What a sub-expression says about the repositories its matches can come from.
#[derive(Clone, Debug, PartialEq, Eq)]
enum RepoBound {
    /// Matches are only in these repositories.
    Bounded(BTreeSet<String>),
    /// Matches are in any repository except these.
    Excluded(BTreeSet<String>),
    /// Matches may be in any repository.
    Unbounded,
}

impl RepoBound {
    fn empty() -> Self {
        Self::Bounded(BTreeSet::new())
    }

    fn for_atom(atom: &Expr) -> Self {
        match atom {
            Expr::Const(false) => Self::empty(),
            Expr::Const(true) | Expr::Substring(_) => Self::Unbounded,
            Expr::RepoSet(names) => Self::Bounded(names.clone()),
            Expr::Repo(name) => Self::Bounded(BTreeSet::from([name.clone()])),
            // Not reachable through the frame traversal, which only passes atoms here.
            Expr::Not(_) | Expr::And(_) | Expr::Or(_) => Self::Unbounded,
        }
    }

    fn for_negated_atom(atom: &Expr) -> Self {
        match atom {
            Expr::Const(value) => Self::for_atom(&Expr::Const(!value)),
            other => Self::for_atom(other).negate(),
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::Bounded(names) => Self::Excluded(names),
            Self::Excluded(names) => Self::Bounded(names),
            Self::Unbounded => Self::Unbounded,
        }
    }

    fn and_all(bounds: impl IntoIterator<Item = Self>) -> Self {
        let mut anchor: Option<BTreeSet<String>> = None;
        let mut excluded = BTreeSet::new();
        for bound in bounds {
            match bound {
                Self::Bounded(names) if names.is_empty() => return Self::empty(),
                Self::Bounded(names) => {
                    anchor = Some(match anchor {
                        Some(anchor) => anchor.intersection(&names).cloned().collect(),
                        None => names,
                    });
                }
                Self::Excluded(names) => excluded.extend(names),
                Self::Unbounded => {}
            }
        }

        match anchor {
            Some(anchor) => Self::Bounded(anchor.difference(&excluded).cloned().collect()),
            None if !excluded.is_empty() => Self::Excluded(excluded),
            None => Self::Unbounded,
        }
    }

    fn or_all(bounds: impl IntoIterator<Item = Self>) -> Self {
        let mut union = BTreeSet::new();
        let mut any_bounded = false;
        let mut excluded: Option<BTreeSet<String>> = None;
        for bound in bounds {
            match bound {
                Self::Unbounded => return Self::Unbounded,
                // An empty set is the identity.
                Self::Bounded(names) if names.is_empty() => {}
                Self::Bounded(names) => {
                    any_bounded = true;
                    union.extend(names);
                }
                Self::Excluded(names) => {
                    excluded = Some(match excluded {
                        Some(excluded) => excluded.intersection(&names).cloned().collect(),
                        None => names,
                    });
                }
            }
        }

        match (any_bounded, excluded) {
            (_, None) => Self::Bounded(union),
            (false, Some(excluded)) => Self::Excluded(excluded),
            // Mixing the two is not tracked.
            (true, Some(_)) => Self::Unbounded,
        }
    }
}

impl Expr {
    /// Returns the smallest set of repositories that every match of this expression is
    /// guaranteed to be in, or `None` if no such set could be determined.
    ///
    /// This is meant to be called on the output of [`Expr::expand_repo`], and does not
    /// consult any oracle. Any remaining [`Expr::Repo`] is treated as the exact name of a
    /// repository rather than as a pattern.
    ///
    /// The analysis is conservative: it may return `None` for queries that are in fact
    /// bounded, but a returned set always contains every repository with a match.
    ///
    /// Disjunctions are tracked a little more precisely than by treating every mix of
    /// inclusions and exclusions as unbounded: an operand that matches nothing is ignored,
    /// and a disjunction of exclusions excludes the repositories common to all of them.
    pub fn minimal_repo_set(&self) -> Option<BTreeSet<String>> {
        // Every node is evaluated both as is and negated, which pushes negations down to the
        // atoms.
        let (bound, _) = Wrapped(self).collapse_frames(
            |frame: ExprFrame<&Expr, (RepoBound, RepoBound)>| match frame {
                ExprFrame::Atom(atom) => (
                    RepoBound::for_atom(atom),
                    RepoBound::for_negated_atom(atom),
                ),
                ExprFrame::Not((positive, negative)) => (negative, positive),
                ExprFrame::And(children) => {
                    let (positive, negative): (Vec<_>, Vec<_>) = children.into_iter().unzip();
                    (RepoBound::and_all(positive), RepoBound::or_all(negative))
                }
                ExprFrame::Or(children) => {
                    let (positive, negative): (Vec<_>, Vec<_>) = children.into_iter().unzip();
                    (RepoBound::or_all(positive), RepoBound::and_all(negative))
                }
            },
        );

        match bound {
            RepoBound::Bounded(names) => Some(names),
            RepoBound::Excluded(_) | RepoBound::Unbounded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn substr(pattern: &str) -> Expr {
        Expr::Substring(pattern.to_owned())
    }

    fn repo_set(set: &[&str]) -> Expr {
        Expr::RepoSet(names(set))
    }

    #[test_case(substr("foo"), None ; "substring")]
    #[test_case(Expr::Const(true), None ; "true")]
    #[test_case(Expr::Const(false), Some(&[][..]) ; "false")]
    #[test_case(repo_set(&["bar", "foo"]), Some(&["bar", "foo"][..]) ; "repo set")]
    #[test_case(Expr::Repo("bar".to_owned()), Some(&["bar"][..]) ; "repo is an exact name")]
    #[test_case(Expr::And(Vec::new()), None ; "empty and")]
    #[test_case(Expr::Or(Vec::new()), Some(&[][..]) ; "empty or")]
    #[test_case(
        Expr::new_and([substr("foo"), repo_set(&["bar", "baz"])]),
        Some(&["bar", "baz"][..])
        ; "and with a set"
    )]
    #[test_case(
        Expr::new_and([repo_set(&["bar", "baz"]), repo_set(&["baz", "foo"])]),
        Some(&["baz"][..])
        ; "and intersects"
    )]
    #[test_case(
        Expr::new_and([repo_set(&["bar", "baz"]), Expr::Const(false)]),
        Some(&[][..])
        ; "and with false"
    )]
    #[test_case(
        Expr::new_or([repo_set(&["bar"]), repo_set(&["foo"])]),
        Some(&["bar", "foo"][..])
        ; "or unions"
    )]
    #[test_case(
        Expr::new_or([repo_set(&["bar"]), substr("foo")]),
        None
        ; "or with unbounded"
    )]
    #[test_case(
        Expr::new_and([
            substr("foo"),
            repo_set(&["bar", "baz"]),
            Expr::new_or([repo_set(&["foo"]), repo_set(&["baz"])]).negate(),
        ]),
        Some(&["bar"][..])
        ; "negated or excludes"
    )]
    #[test_case(
        Expr::new_and([
            repo_set(&["bar", "baz"]),
            Expr::new_and([substr("hello"), repo_set(&["baz"])]).negate(),
        ]),
        Some(&["bar", "baz"][..])
        ; "negated and with unbounded child"
    )]
    #[test_case(
        Expr::new_and([
            repo_set(&["bar", "baz"]),
            Expr::new_or([repo_set(&["bar"]).negate(), repo_set(&["baz"]).negate()]),
        ]),
        Some(&["bar", "baz"][..])
        ; "or of exclusions intersects"
    )]
    #[test_case(
        Expr::new_and([
            repo_set(&["bar", "baz", "foo"]),
            Expr::new_and([repo_set(&["bar"]).negate(), repo_set(&["baz"]).negate()]),
        ]),
        Some(&["foo"][..])
        ; "and of exclusions unions"
    )]
    #[test_case(
        Expr::new_or([repo_set(&["bar"]), repo_set(&["baz"]).negate()]),
        None
        ; "mixed or is unbounded"
    )]
    #[test_case(
        Expr::new_and([substr("foo"), repo_set(&["bar"]).negate().negate()]),
        Some(&["bar"][..])
        ; "double negation"
    )]
    #[test_case(
        Expr::new_and([substr("foo"), Expr::Const(false).negate()]),
        None
        ; "negated false"
    )]
    #[test_case(
        Expr::new_and([repo_set(&["bar"]), Expr::Const(true).negate()]),
        Some(&[][..])
        ; "negated true"
    )]
    #[test_case(
        repo_set(&["bar"]).negate(),
        None
        ; "exclusion alone"
    )]
    fn test_minimal_repo_set(expr: Expr, expected: Option<&[&str]>) {
        assert_eq!(expr.minimal_repo_set(), expected.map(names));
    }

    #[test]
    fn test_and_all_or_all() {
        use RepoBound::*;

        assert_eq!(RepoBound::and_all([]), Unbounded);
        assert_eq!(RepoBound::or_all([]), RepoBound::empty());
        assert_eq!(
            RepoBound::and_all([Excluded(names(&["a"])), Unbounded, Excluded(names(&["b"]))]),
            Excluded(names(&["a", "b"]))
        );
        assert_eq!(
            RepoBound::and_all([Unbounded, Bounded(BTreeSet::new()), Bounded(names(&["a"]))]),
            RepoBound::empty()
        );
        assert_eq!(
            RepoBound::or_all([Excluded(names(&["a", "b"])), Excluded(names(&["b", "c"]))]),
            Excluded(names(&["b"]))
        );
        assert_eq!(
            RepoBound::or_all([Bounded(names(&["a"])), Unbounded, Excluded(names(&["b"]))]),
            Unbounded
        );
        assert_eq!(
            RepoBound::or_all([RepoBound::empty(), Excluded(names(&["b"]))]),
            Excluded(names(&["b"]))
        );
    }
}
