// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while parsing queries and resolving repository filters.

use camino::Utf8PathBuf;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// An error returned by a [`RepoOracle`](crate::RepoOracle) lookup.
pub type LookupError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A set of errors that occurred while parsing a query.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct QueryParseErrors {
    /// The input string.
    pub input: String,

    /// The parse errors returned.
    pub errors: Vec<ParseSingleError>,
}

impl QueryParseErrors {
    pub(crate) fn new(input: impl Into<String>, errors: Vec<ParseSingleError>) -> Self {
        Self {
            input: input.into(),
            errors,
        }
    }
}

/// An individual error that occurred while parsing a query.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq)]
#[non_exhaustive]
pub enum ParseSingleError {
    /// An invalid repository regex was encountered.
    #[error("invalid regex")]
    InvalidRegex {
        /// The part of the input that failed.
        #[label("{}", message)]
        span: SourceSpan,

        /// A message indicating the failure.
        message: String,
    },

    /// An invalid regex was encountered but we couldn't determine a better error message.
    #[error("invalid regex")]
    InvalidRegexWithoutMessage(#[label("invalid regex")] SourceSpan),

    /// A quoted string was not closed.
    #[error("unterminated quoted string")]
    UnterminatedQuote(#[label("missing closing '\"'")] SourceSpan),

    /// An unknown escape sequence was found inside a quoted string.
    #[error("invalid escape character")]
    InvalidEscapeCharacter(#[label("invalid escape character")] SourceSpan),

    /// A closing parenthesis was expected.
    #[error("expected close parenthesis")]
    ExpectedCloseParenthesis(#[label("missing ')'")] SourceSpan),

    /// An expression was expected in this position but not found.
    #[error("expected expression")]
    ExpectedExpr(#[label("missing expression")] SourceSpan),

    /// The expression was expected to end here.
    #[error("expected end of expression")]
    ExpectedEndOfExpression(#[label("unparsed input")] SourceSpan),

    /// Negations and parentheses were nested more deeply than the parser allows.
    #[error("query is nested too deeply")]
    NestingTooDeep(#[label("nesting limit reached here")] SourceSpan),

    /// An unknown parse error occurred.
    #[error("unknown parsing error")]
    Unknown,
}

impl ParseSingleError {
    pub(crate) fn invalid_regex(input: &str, start: usize, end: usize) -> Self {
        // Use regex-syntax to parse the input so that we get better error messages.
        match regex_syntax::Parser::new().parse(input) {
            Ok(_) => {
                // It is weird that this function was called for a regex that parses fine, but
                // we can't do better.
                Self::InvalidRegexWithoutMessage((start, end - start).into())
            }
            Err(err) => {
                let (message, span) = match &err {
                    regex_syntax::Error::Parse(err) => (format!("{}", err.kind()), err.span()),
                    regex_syntax::Error::Translate(err) => (format!("{}", err.kind()), err.span()),
                    _ => return Self::InvalidRegexWithoutMessage((start, end - start).into()),
                };

                // This isn't exact for quoted patterns since it doesn't account for escapes,
                // but it'll do for now.
                let err_start = start + span.start.offset;
                let err_end = start + span.end.offset;

                Self::InvalidRegex {
                    span: (err_start, err_end - err_start).into(),
                    message,
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct State<'a> {
    errors: &'a mut Vec<ParseSingleError>,
    // Current number of enclosing negations and parentheses.
    depth: usize,
    // Set once parsing has given up on the rest of the input.
    abandoned: bool,
}

impl<'a> State<'a> {
    pub fn new(errors: &'a mut Vec<ParseSingleError>) -> Self {
        Self {
            errors,
            depth: 0,
            abandoned: false,
        }
    }

    pub fn report_error(&mut self, error: ParseSingleError) {
        // Anything reported after giving up is a consequence of having skipped the input.
        if !self.abandoned {
            self.errors.push(error);
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn enter(&mut self) {
        self.depth += 1;
    }

    pub fn exit(&mut self) {
        self.depth -= 1;
    }

    pub fn abandon(&mut self, error: ParseSingleError) {
        self.report_error(error);
        self.abandoned = true;
    }
}

/// An error that occurred while resolving repository filters through a
/// [`RepoOracle`](crate::RepoOracle).
///
/// Returned by [`Expr::expand_repo`](crate::Expr::expand_repo). When this is returned, no
/// part of the expansion is available.
#[derive(Debug, Error)]
#[error(
    "failed to look up repositories (include: {include:?}, exclude: {exclude:?})"
)]
#[non_exhaustive]
pub struct RepoLookupError {
    /// Patterns that every repository had to match.
    pub include: Vec<String>,

    /// Patterns that no repository could match.
    pub exclude: Vec<String>,

    /// The error returned by the oracle.
    #[source]
    pub error: LookupError,
}

impl RepoLookupError {
    pub(crate) fn new(include: Vec<String>, exclude: Vec<String>, error: LookupError) -> Self {
        Self {
            include,
            exclude,
            error,
        }
    }
}

/// An error returned by [`RepoList`](crate::RepoList) lookups.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepoListError {
    /// A pattern could not be compiled.
    #[error("invalid repository pattern `{pattern}`")]
    InvalidRegex {
        /// The pattern.
        pattern: String,

        /// The underlying error.
        #[source]
        error: regex::Error,
    },
}

/// An error that occurred while loading a repository list file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepoListConfigError {
    /// The file could not be read.
    #[error("failed to read repository list at `{path}`")]
    Read {
        /// The path to the file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: std::io::Error,
    },

    /// The file could not be parsed.
    #[error("failed to parse repository list at `{path}`")]
    Parse {
        /// The path to the file.
        path: Utf8PathBuf,

        /// The underlying TOML error.
        #[source]
        error: toml::de::Error,
    },
}
