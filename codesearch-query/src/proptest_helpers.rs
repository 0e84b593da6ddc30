// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Expr;
use proptest::prelude::*;

impl Expr {
    /// Generates arbitrary expressions, including constants, repository sets and nodes
    /// with zero or one children.
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        let leaf = prop_oneof![
            4 => name_strategy().prop_map(Self::Substring),
            4 => regex_str_strategy().prop_map(Self::Repo),
            1 => repo_names_strategy().prop_map(Self::RepoSet),
            1 => any::<bool>().prop_map(Self::Const),
        ];
        recursive(leaf, 0..4)
    }

    /// Generates expressions that have a surface form: only substrings and repository
    /// filters, and no empty conjunctions or disjunctions.
    ///
    /// Once simplified, these expressions render with [`Expr::to_query_string`].
    #[doc(hidden)]
    pub fn query_strategy() -> impl Strategy<Value = Self> {
        let leaf = prop_oneof![
            1 => name_strategy().prop_map(Self::Substring),
            1 => regex_str_strategy().prop_map(Self::Repo),
        ];
        recursive(leaf, 1..4)
    }
}

fn recursive(
    leaf: impl Strategy<Value = Expr> + 'static,
    children: std::ops::Range<usize>,
) -> impl Strategy<Value = Expr> {
    leaf.prop_recursive(
        // Up to 6 levels deep
        6,
        // Max size 64 nodes
        64,
        // Up to 4 items per collection
        4,
        move |inner| {
            prop_oneof![
                1 => inner.clone().prop_map(Expr::negate),
                1 => prop::collection::vec(inner.clone(), children.clone()).prop_map(Expr::And),
                1 => prop::collection::vec(inner, children.clone()).prop_map(Expr::Or),
            ]
        },
    )
}

pub(crate) fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[abcde]{0,10}",
        // Characters that are meaningful in the query syntax
        1 => r#"[abcde\-()" \\:ro]{0,10}"#,
        // Keywords and prefixes
        1 => prop::sample::select(&["or", "-", "r:", "repo:", "r:x", "-a"][..])
            .prop_map(str::to_owned),
        // Other whitespace and non-ASCII characters
        1 => r"[abcde\r\t\n\u{2055}\u{1fe4e}]{0,10}",
    ]
}

fn repo_names_strategy() -> impl Strategy<Value = std::collections::BTreeSet<String>> {
    prop::collection::btree_set("[abc]{1,3}", 0..4)
}

pub(crate) fn regex_str_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        4 => "[abcde]{0,10}",
        // Some escapes
        1 => r"([abcde]|(\\\?)|(\\\*)|(\\\.)|){0,10}",
        // Whitespace and non-ASCII characters
        1 => r"[abcde/\r\t\n\u{2055}\u{1fe4e}]{0,10}",
    ];

    leaf.prop_recursive(
        // Up to 3 levels deep
        3,
        // Max size 16 nodes
        16,
        // Up to 3 items per collection
        3,
        |inner| {
            prop_oneof![
                1 => (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                    format!("{a}{b}")
                }),
                1 => (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                    format!("({a})|({b})")
                }),
                1 => inner.clone().prop_map(|a| {
                    format!("^({a})")
                }),
                1 => inner.prop_map(|a| {
                    format!("({a})?")
                }),
            ]
        },
    )
}
