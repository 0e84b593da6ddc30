// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing for search queries.
//!
//! The grammar is:
//!
//! ```text
//! query       = conjunction ("or" conjunction)*
//! conjunction = term+
//! term        = "-" term | "(" query ")" | repo | text
//! repo        = ("r:" | "repo:") (quoted | bare?)
//! text        = quoted | bare
//! ```
//!
//! Every conjunction becomes an `And` built with [`Expr::new_and`], so parenthesized
//! conjunctions are merged into the enclosing one.
//!
//! The parsing strategy is based on the following blog post:
//! `<https://eyalkalderon.com/blog/nom-error-recovery/>`
//!
//! All high level parsing functions should:
//! - always return Ok(_)
//! - on error:
//!     - consume as much input as it makes sense so that we can try to resume parsing
//!     - return an error/none variant of the expected result type
//!     - push an error in the parsing state (in span.state)

use crate::{
    errors::{ParseSingleError, State},
    expression::{Expr, is_word_delimiter},
};
use miette::SourceSpan;
use winnow::{
    LocatingSlice, ModalParser, Parser,
    combinator::{alt, delimited, eof, peek, preceded, repeat, terminated, trace},
    stream::{Location, SliceLen, Stream},
    token::{one_of, take_till, take_while},
};

mod quoted;

pub(crate) type Span<'a> = winnow::Stateful<LocatingSlice<&'a str>, State<'a>>;
type Error = ();
type PResult<T> = winnow::ModalResult<T, Error>;

pub(crate) fn new_span<'a>(input: &'a str, errors: &'a mut Vec<ParseSingleError>) -> Span<'a> {
    Span {
        input: LocatingSlice::new(input),
        state: State::new(errors),
    }
}

pub(crate) enum ExprResult {
    Valid(Expr),
    Error,
}

impl ExprResult {
    fn combine(results: Vec<Self>, build: impl FnOnce(Vec<Expr>) -> Expr) -> Self {
        let exprs: Option<Vec<_>> = results
            .into_iter()
            .map(|result| match result {
                Self::Valid(expr) => Some(expr),
                Self::Error => None,
            })
            .collect();
        match exprs {
            Some(exprs) => Self::Valid(build(exprs)),
            None => Self::Error,
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::Valid(expr) => Self::Valid(expr.negate()),
            Self::Error => Self::Error,
        }
    }
}

enum SpanLength {
    Unknown,
    Exact(usize),
    Offset(isize, usize),
}

fn expect_inner<'a, F, T>(
    mut parser: F,
    make_err: fn(SourceSpan) -> ParseSingleError,
    limit: SpanLength,
) -> impl ModalParser<Span<'a>, Option<T>, Error>
where
    F: ModalParser<Span<'a>, T, Error>,
{
    move |input: &mut _| match parser.parse_next(input) {
        Ok(out) => Ok(Some(out)),
        Err(winnow::error::ErrMode::Backtrack(_)) | Err(winnow::error::ErrMode::Cut(_)) => {
            let fragment_start = input.current_token_start();
            let fragment_length = input.slice_len();
            let span = match limit {
                SpanLength::Unknown => (fragment_start, fragment_length).into(),
                SpanLength::Exact(x) => (fragment_start, x.min(fragment_length)).into(),
                SpanLength::Offset(offset, x) => {
                    // e.g. fragment_start = 5, fragment_length = 2, offset = -1, x = 2.
                    // Here, start = 4.
                    let effective_start = fragment_start.saturating_add_signed(offset);
                    // end = 6.
                    let effective_end = effective_start + fragment_length;
                    // len = min(2, 6 - 4) = 2.
                    let len = (effective_end - effective_start).min(x);
                    (effective_start, len).into()
                }
            };
            let err = make_err(span);
            input.state.report_error(err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn expect<'a, F, T>(
    parser: F,
    make_err: fn(SourceSpan) -> ParseSingleError,
) -> impl ModalParser<Span<'a>, Option<T>, Error>
where
    F: ModalParser<Span<'a>, T, Error>,
{
    expect_inner(parser, make_err, SpanLength::Unknown)
}

fn expect_n<'a, F, T>(
    parser: F,
    make_err: fn(SourceSpan) -> ParseSingleError,
    limit: SpanLength,
) -> impl ModalParser<Span<'a>, Option<T>, Error>
where
    F: ModalParser<Span<'a>, T, Error>,
{
    expect_inner(parser, make_err, limit)
}

fn expect_char<'a>(
    c: char,
    make_err: fn(SourceSpan) -> ParseSingleError,
) -> impl ModalParser<Span<'a>, Option<char>, Error> {
    expect_inner(ws(c), make_err, SpanLength::Exact(0))
}

fn ws<'a, T, P: ModalParser<Span<'a>, T, Error>>(
    mut inner: P,
) -> impl ModalParser<Span<'a>, T, Error> {
    move |input: &mut Span<'a>| {
        let start = input.checkpoint();
        // Any whitespace separates terms, matching is_word_delimiter.
        () = take_while(0.., char::is_whitespace)
            .void()
            .parse_next(input)?;
        match inner.parse_next(input) {
            Ok(res) => Ok(res),
            Err(winnow::error::ErrMode::Backtrack(err)) => {
                input.reset(&start);
                Err(winnow::error::ErrMode::Backtrack(err))
            }
            Err(winnow::error::ErrMode::Cut(err)) => {
                input.reset(&start);
                Err(winnow::error::ErrMode::Cut(err))
            }
            Err(err) => Err(err),
        }
    }
}

fn parse_bare_word<'i>(input: &mut Span<'i>) -> PResult<String> {
    trace(
        "parse_bare_word",
        take_till(1.., is_word_delimiter)
            // "or" on its own is an operator, not a word.
            .verify(|word: &str| word != "or")
            .map(|word: &str| word.to_owned()),
    )
    .parse_next(input)
}

fn parse_text(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace(
        "parse_text",
        alt((quoted::parse_quoted, parse_bare_word.map(Some))).map(|text: Option<String>| {
            text.map_or(ExprResult::Error, |text| {
                ExprResult::Valid(Expr::Substring(text))
            })
        }),
    )
    .parse_next(input)
}

fn parse_repo<'i>(input: &mut Span<'i>) -> PResult<ExprResult> {
    trace("parse_repo", |input: &mut Span<'i>| {
        let _ = alt(("repo:", "r:")).parse_next(input)?;
        let is_quoted = input.starts_with('"');
        let start = input.current_token_start();
        let pattern = alt((
            quoted::parse_quoted,
            take_till(0.., is_word_delimiter).map(|pattern: &str| Some(pattern.to_owned())),
        ))
        .parse_next(input)?;
        let end = input.current_token_start();

        let Some(pattern) = pattern else {
            // This was already reported by parse_quoted.
            return Ok(ExprResult::Error);
        };
        if regex_syntax::Parser::new().parse(&pattern).is_err() {
            // Regex offsets are relative to the first character after the opening quote.
            let pattern_start = if is_quoted { start + 1 } else { start };
            let err = ParseSingleError::invalid_regex(&pattern, pattern_start, end);
            input.state.report_error(err);
            return Ok(ExprResult::Error);
        }
        Ok(ExprResult::Valid(Expr::Repo(pattern)))
    })
    .parse_next(input)
}

fn expect_expr<'a, P: ModalParser<Span<'a>, ExprResult, Error>>(
    inner: P,
) -> impl ModalParser<Span<'a>, ExprResult, Error> {
    expect(inner, ParseSingleError::ExpectedExpr).map(|res| res.unwrap_or(ExprResult::Error))
}

/// The maximum number of negations and parentheses a term can be nested in.
pub(crate) const MAX_NESTING_DEPTH: usize = 128;

// Beyond the nesting limit the rest of the input is skipped, so that deeply nested queries
// are rejected without growing the stack any further.
fn nested<'a, P: ModalParser<Span<'a>, ExprResult, Error>>(
    mut inner: P,
) -> impl ModalParser<Span<'a>, ExprResult, Error> {
    move |input: &mut Span<'a>| {
        if input.state.depth() >= MAX_NESTING_DEPTH {
            let start = input.current_token_start();
            let skipped = input.finish().len();
            input
                .state
                .abandon(ParseSingleError::NestingTooDeep((start, skipped).into()));
            return Ok(ExprResult::Error);
        }

        input.state.enter();
        let res = inner.parse_next(input);
        input.state.exit();
        res
    }
}

fn parse_negation(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace(
        "parse_negation",
        preceded('-', nested(expect_expr(parse_term))).map(ExprResult::negate),
    )
    .parse_next(input)
}

fn parse_parentheses_expr(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace(
        "parse_parentheses_expr",
        delimited(
            '(',
            nested(expect_expr(parse_query)),
            expect_char(')', ParseSingleError::ExpectedCloseParenthesis),
        ),
    )
    .parse_next(input)
}

fn parse_term(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace(
        "parse_term",
        ws(alt((
            parse_negation,
            parse_parentheses_expr,
            // parse_repo must go above parse_text, otherwise "r:foo" would be parsed as a word.
            parse_repo,
            parse_text,
        ))),
    )
    .parse_next(input)
}

fn parse_conjunction(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace(
        "parse_conjunction",
        repeat(1.., parse_term)
            .fold(Vec::new, |mut terms, term| {
                terms.push(term);
                terms
            })
            .map(|terms| ExprResult::combine(terms, |exprs| Expr::new_and(exprs))),
    )
    .parse_next(input)
}

fn parse_or_operator(input: &mut Span<'_>) -> PResult<()> {
    trace(
        "parse_or_operator",
        ws(terminated(
            "or",
            // "or" followed by anything else is a word, e.g. "order".
            peek(alt((one_of(is_word_delimiter).void(), eof.void()))),
        ))
        .void(),
    )
    .parse_next(input)
}

fn parse_query(input: &mut Span<'_>) -> PResult<ExprResult> {
    trace("parse_query", |input: &mut _| {
        // "or" binds less tightly than juxtaposition, so parse conjunctions within it.
        let first = expect_expr(parse_conjunction).parse_next(input)?;

        let rest = repeat(
            0..,
            preceded(parse_or_operator, expect_expr(parse_conjunction)),
        )
        .fold(Vec::new, |mut alternatives, expr| {
            alternatives.push(expr);
            alternatives
        })
        .parse_next(input)?;

        if rest.is_empty() {
            return Ok(first);
        }
        let mut alternatives = Vec::with_capacity(rest.len() + 1);
        alternatives.push(first);
        alternatives.extend(rest);
        Ok(ExprResult::combine(alternatives, |exprs| Expr::new_or(exprs)))
    })
    .parse_next(input)
}

// ---

pub(crate) fn parse(input: Span<'_>) -> Result<ExprResult, winnow::error::ErrMode<Error>> {
    let (_, expr) = terminated(
        parse_query,
        expect(ws(eof), ParseSingleError::ExpectedEndOfExpression),
    )
    .parse_peek(input)?;
    Ok(expr)
}
