// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PResult, Span, SpanLength, expect_n};
use crate::errors::ParseSingleError;
use winnow::{
    Parser,
    combinator::{alt, preceded, repeat, trace},
    stream::Location,
    token::take_till,
};

// This should match DisplayQuoted in expression.rs.
fn parse_escaped_char(input: &mut Span<'_>) -> PResult<Option<char>> {
    trace("parse_escaped_char", |input: &mut Span<'_>| {
        let valid = alt((
            '"'.value('"'),
            '\\'.value('\\'),
            'n'.value('\n'),
            't'.value('\t'),
        ));
        preceded(
            '\\',
            // If none of the valid characters are found, this will report an error.
            expect_n(
                valid,
                ParseSingleError::InvalidEscapeCharacter,
                // -1 to account for the preceding backslash.
                SpanLength::Offset(-1, 2),
            ),
        )
        .parse_next(input)
    })
    .parse_next(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringFragment<'a> {
    Literal(&'a str),
    EscapedChar(char),
}

fn parse_fragment<'i>(input: &mut Span<'i>) -> PResult<Option<StringFragment<'i>>> {
    trace(
        "parse_fragment",
        alt((
            take_till(1.., ('"', '\\')).map(|s: &'i str| Some(StringFragment::Literal(s))),
            parse_escaped_char.map(|res| res.map(StringFragment::EscapedChar)),
        )),
    )
    .parse_next(input)
}

/// Parses a double-quoted string, including both quotes.
///
/// Returns None if the string isn't valid. The error has already been reported in that case.
pub(super) fn parse_quoted<'i>(input: &mut Span<'i>) -> PResult<Option<String>> {
    trace("parse_quoted", |input: &mut Span<'i>| {
        let start = input.current_token_start();
        let _ = '"'.parse_next(input)?;

        let string = repeat(0.., parse_fragment)
            .fold(
                || Some(String::new()),
                |string, fragment| match (string, fragment) {
                    (Some(mut string), Some(StringFragment::Literal(s))) => {
                        string.push_str(s);
                        Some(string)
                    }
                    (Some(mut string), Some(StringFragment::EscapedChar(c))) => {
                        string.push(c);
                        Some(string)
                    }
                    // We encountered a parsing error, and at this point we'll stop returning
                    // values. Parsing goes on until the closing quote.
                    (Some(_), None) | (None, _) => None,
                },
            )
            .parse_next(input)?;

        let closed: PResult<char> = '"'.parse_next(input);
        if closed.is_err() {
            let end = input.current_token_start();
            input
                .state
                .report_error(ParseSingleError::UnterminatedQuote((start, end - start).into()));
            return Ok(None);
        }
        Ok(string)
    })
    .parse_next(input)
}
