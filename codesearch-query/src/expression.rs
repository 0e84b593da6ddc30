// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{QueryParseErrors, ParseSingleError},
    parsing::{ExprResult, new_span, parse},
};
use recursion::{Collapsible, CollapsibleExt, MappableFrame, PartiallyApplied};
use std::{collections::BTreeSet, fmt};

/// A search query expression.
///
/// Expressions are immutable trees: every transformation returns a new tree. Build
/// conjunctions and disjunctions with [`Expr::new_and`] and [`Expr::new_or`] so that
/// nested nodes of the same kind are flattened at construction time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Matches content containing the pattern.
    Substring(String),
    /// Matches repositories whose name matches the regex.
    ///
    /// After [`Expr::expand_repo`], the only repository filters left are the ones
    /// inside disjunction or negation scopes.
    Repo(String),
    /// Matches an explicit set of repositories.
    ///
    /// Only produced by [`Expr::expand_repo`].
    RepoSet(BTreeSet<String>),
    /// Matches everything (`true`) or nothing (`false`).
    Const(bool),
    /// Matches whatever the inner expression doesn't match.
    Not(Box<Expr>),
    /// Matches whatever every child matches.
    And(Vec<Expr>),
    /// Matches whatever any child matches.
    Or(Vec<Expr>),
}

impl Expr {
    /// Parses a query in the surface syntax.
    ///
    /// Every sequence of terms, including the whole query, is returned as an
    /// [`Expr::And`]. Call [`Expr::simplify`] to normalize the result.
    ///
    /// Negations and parentheses can be nested at most 128 deep. Deeper queries are
    /// rejected with [`ParseSingleError::NestingTooDeep`].
    pub fn parse(input: &str) -> Result<Self, QueryParseErrors> {
        let mut errors = Vec::new();
        let result = parse(new_span(input, &mut errors));
        match result {
            Ok(ExprResult::Valid(expr)) if errors.is_empty() => Ok(expr),
            Ok(_) if !errors.is_empty() => Err(QueryParseErrors::new(input, errors)),
            // The parser reports an error whenever it produces an invalid result, so this
            // should not happen.
            _ => Err(QueryParseErrors::new(input, vec![ParseSingleError::Unknown])),
        }
    }

    /// Builds a conjunction, splicing in the children of any argument that is itself
    /// a conjunction.
    pub fn new_and(children: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::And(grandchildren) => flat.extend(grandchildren),
                other => flat.push(other),
            }
        }
        Self::And(flat)
    }

    /// Builds a disjunction, splicing in the children of any argument that is itself
    /// a disjunction.
    pub fn new_or(children: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::Or(grandchildren) => flat.extend(grandchildren),
                other => flat.push(other),
            }
        }
        Self::Or(flat)
    }

    /// Negates this expression.
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Rebuilds the tree, replacing every atom with the result of `f`.
    ///
    /// Composite nodes keep their shape and are never passed to `f`. The order in which
    /// atoms are passed to `f` is unspecified; use [`Expr::visit_atoms`] for an ordered
    /// traversal.
    pub fn map(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        Wrapped(self).collapse_frames(|frame: ExprFrame<&Expr, Expr>| match frame {
            ExprFrame::Atom(atom) => f(atom),
            ExprFrame::Not(child) => child.negate(),
            ExprFrame::And(children) => Self::And(children),
            ExprFrame::Or(children) => Self::Or(children),
        })
    }

    /// Calls `visit` once for every atom, left to right.
    pub fn visit_atoms(&self, mut visit: impl FnMut(&Expr)) {
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::Not(child) => stack.push(child.as_ref()),
                // Reversed so that children are popped left to right.
                Self::And(children) | Self::Or(children) => stack.extend(children.iter().rev()),
                atom => visit(atom),
            }
        }
    }

    /// Renders this expression in the surface query syntax.
    ///
    /// Returns `None` if the expression contains a constant or a repository set, which
    /// have no surface form.
    pub fn to_query_string(&self) -> Option<String> {
        let mut has_surface_form = true;
        self.visit_atoms(|atom| {
            if matches!(atom, Self::Const(_) | Self::RepoSet(_)) {
                has_surface_form = false;
            }
        });
        has_surface_form.then(|| DisplayQueryString(self).to_string())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(pattern) => write!(f, "substr:{pattern:?}"),
            Self::Repo(pattern) => write!(f, "repo:{pattern:?}"),
            Self::RepoSet(names) => {
                f.write_str("(reposet")?;
                for name in names {
                    write!(f, " {name}")?;
                }
                f.write_str(")")
            }
            Self::Const(true) => f.write_str("TRUE"),
            Self::Const(false) => f.write_str("FALSE"),
            Self::Not(child) => write!(f, "(not {child})"),
            Self::And(children) => write_list(f, "and", children),
            Self::Or(children) => write_list(f, "or", children),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, op: &str, children: &[Expr]) -> fmt::Result {
    write!(f, "({op}")?;
    for child in children {
        write!(f, " {child}")?;
    }
    f.write_str(")")
}

// This should match the parser in parsing.rs.
struct DisplayQueryString<'a>(&'a Expr);

impl DisplayQueryString<'_> {
    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, child: &Expr, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", DisplayQueryString(child))
        } else {
            write!(f, "{}", DisplayQueryString(child))
        }
    }
}

impl fmt::Display for DisplayQueryString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::Substring(pattern) => write!(f, "{}", DisplayWord(pattern)),
            Expr::Repo(pattern) => write!(f, "r:{}", DisplayRepoPattern(pattern)),
            // Callers check for these before displaying.
            Expr::RepoSet(_) | Expr::Const(_) => write!(f, "{}", self.0),
            Expr::Not(child) => {
                f.write_str("-")?;
                self.fmt_child(f, child, matches!(**child, Expr::And(_) | Expr::Or(_)))
            }
            Expr::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    // Juxtaposition binds tighter than "or".
                    self.fmt_child(f, child, matches!(child, Expr::And(_) | Expr::Or(_)))?;
                }
                Ok(())
            }
            Expr::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    self.fmt_child(f, child, matches!(child, Expr::Or(_)))?;
                }
                Ok(())
            }
        }
    }
}

/// Displays a substring pattern, quoting it if it would otherwise parse as something
/// else.
struct DisplayWord<'a>(&'a str);

impl fmt::Display for DisplayWord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = self.0;
        let needs_quotes = word.is_empty()
            || word == "or"
            || word.starts_with('-')
            || word.starts_with("r:")
            || word.starts_with("repo:")
            || word.chars().any(is_word_delimiter);
        if needs_quotes {
            write!(f, "{}", DisplayQuoted(word))
        } else {
            f.write_str(word)
        }
    }
}

struct DisplayRepoPattern<'a>(&'a str);

impl fmt::Display for DisplayRepoPattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.chars().any(is_word_delimiter) {
            write!(f, "{}", DisplayQuoted(self.0))
        } else {
            f.write_str(self.0)
        }
    }
}

// This should match parse_escaped_char in parsing/quoted.rs.
struct DisplayQuoted<'a>(&'a str);

impl fmt::Display for DisplayQuoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")
    }
}

/// Returns true for characters that end a bare word.
pub(crate) fn is_word_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"')
}

/// One layer of an [`Expr`], with children replaced by `A`.
pub(crate) enum ExprFrame<Atom, A> {
    Atom(Atom),
    Not(A),
    And(Vec<A>),
    Or(Vec<A>),
}

impl<Atom> MappableFrame for ExprFrame<Atom, PartiallyApplied> {
    type Frame<X> = ExprFrame<Atom, X>;

    fn map_frame<A, B>(input: Self::Frame<A>, mut f: impl FnMut(A) -> B) -> Self::Frame<B> {
        use ExprFrame::*;
        match input {
            Atom(atom) => Atom(atom),
            Not(a) => Not(f(a)),
            And(children) => And(children.into_iter().map(f).collect()),
            Or(children) => Or(children.into_iter().map(f).collect()),
        }
    }
}

// Wrapped struct to prevent trait impl leakages.
pub(crate) struct Wrapped<T>(pub(crate) T);

impl<'a> Collapsible for Wrapped<&'a Expr> {
    type FrameToken = ExprFrame<&'a Expr, PartiallyApplied>;

    fn into_frame(self) -> <Self::FrameToken as MappableFrame>::Frame<Self> {
        match self.0 {
            Expr::Not(child) => ExprFrame::Not(Wrapped(child.as_ref())),
            Expr::And(children) => ExprFrame::And(children.iter().map(Wrapped).collect()),
            Expr::Or(children) => ExprFrame::Or(children.iter().map(Wrapped).collect()),
            atom => ExprFrame::Atom(atom),
        }
    }
}
