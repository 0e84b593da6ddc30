// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normal-form reduction of expressions.

use crate::expression::{Expr, ExprFrame, Wrapped};
use recursion::CollapsibleExt;

impl Expr {
    /// Returns the normalized form of this expression.
    ///
    /// In the result:
    ///
    /// * no `And` is directly inside an `And` and no `Or` is directly inside an `Or`;
    /// * every `And` and `Or` has at least two children;
    /// * a constant only ever appears as the whole expression.
    ///
    /// Simplifying a simplified expression returns it unchanged.
    pub fn simplify(&self) -> Expr {
        Wrapped(self).collapse_frames(|frame: ExprFrame<&Expr, Expr>| match frame {
            ExprFrame::Atom(atom) => atom.clone(),
            ExprFrame::Not(Expr::Const(value)) => Expr::Const(!value),
            ExprFrame::Not(child) => child.negate(),
            ExprFrame::And(children) => fold_children(Connective::And, children),
            ExprFrame::Or(children) => fold_children(Connective::Or, children),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    /// The constant that leaves the connective unchanged: `true` for `And`.
    fn identity(self) -> bool {
        match self {
            Self::And => true,
            Self::Or => false,
        }
    }

    fn build(self, children: Vec<Expr>) -> Expr {
        match self {
            Self::And => Expr::And(children),
            Self::Or => Expr::Or(children),
        }
    }
}

fn fold_children(connective: Connective, children: Vec<Expr>) -> Expr {
    let identity = connective.identity();
    let mut folded = Vec::with_capacity(children.len());
    for child in children {
        match (connective, child) {
            (Connective::And, Expr::And(grandchildren))
            | (Connective::Or, Expr::Or(grandchildren)) => folded.extend(grandchildren),
            (_, child) => folded.push(child),
        }
    }

    // The absorbing element short-circuits the whole node.
    if folded.contains(&Expr::Const(!identity)) {
        return Expr::Const(!identity);
    }
    folded.retain(|child| *child != Expr::Const(identity));

    match <[Expr; 1]>::try_from(folded) {
        Ok([only]) => only,
        Err(folded) if folded.is_empty() => Expr::Const(identity),
        Err(folded) => connective.build(folded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn substr(pattern: &str) -> Expr {
        Expr::Substring(pattern.to_owned())
    }

    #[test]
    fn test_simplify_flattens() {
        let input = Expr::new_or([Expr::new_or([
            Expr::new_and([substr("hoi"), substr("hai").negate()]),
            Expr::new_or([substr("zip"), substr("zap")]),
        ])]);
        let expected = Expr::new_or([
            Expr::new_and([substr("hoi"), substr("hai").negate()]),
            substr("zip"),
            substr("zap"),
        ]);
        assert_eq!(input.simplify(), expected);
    }

    #[test]
    fn test_simplify_flattens_after_collapse() {
        // The inner `Or` collapses to an `And`, which must then be spliced into the outer
        // one.
        let input = Expr::And(vec![
            substr("a"),
            Expr::Or(vec![Expr::And(vec![substr("b"), substr("c")]), Expr::Const(false)]),
        ]);
        assert_eq!(
            input.simplify(),
            Expr::And(vec![substr("a"), substr("b"), substr("c")])
        );
    }

    #[test_case(Expr::And(Vec::new()), Expr::Const(true) ; "empty and")]
    #[test_case(Expr::Or(Vec::new()), Expr::Const(false) ; "empty or")]
    #[test_case(
        Expr::new_and([Expr::Const(true), Expr::Const(false)]),
        Expr::Const(false)
        ; "and short circuit"
    )]
    #[test_case(
        Expr::new_or([Expr::Const(false), Expr::Const(true)]),
        Expr::Const(true)
        ; "or short circuit"
    )]
    #[test_case(Expr::Const(true).negate(), Expr::Const(false) ; "not true")]
    #[test_case(
        Expr::Or(vec![Expr::Const(false), Expr::Const(false)]),
        Expr::Const(false)
        ; "or of identities"
    )]
    #[test_case(
        Expr::new_and([substr("byte"), Expr::new_and([substr("byte")]).negate()]),
        Expr::new_and([substr("byte"), substr("byte").negate()])
        ; "singleton under not"
    )]
    #[test_case(
        Expr::new_and([substr("x"), Expr::Const(true)]),
        substr("x")
        ; "identity removal then singleton"
    )]
    #[test_case(
        Expr::new_and([substr("x"), Expr::Or(Vec::new()).negate().negate()]),
        Expr::Const(false)
        ; "nested constant folding"
    )]
    fn test_simplify(input: Expr, expected: Expr) {
        assert_eq!(input.simplify(), expected);
    }

    #[test]
    fn test_simplify_keeps_double_negation() {
        let input = Expr::new_and([substr("a").negate().negate()]);
        assert_eq!(input.simplify(), substr("a").negate().negate());
    }

    #[test_strategy::proptest]
    fn proptest_simplify_idempotent(#[strategy(Expr::strategy())] expr: Expr) {
        let once = expr.simplify();
        let twice = once.simplify();
        proptest::prop_assert_eq!(&once, &twice);
    }

    #[test_strategy::proptest]
    fn proptest_simplify_normalized(#[strategy(Expr::strategy())] expr: Expr) {
        fn check(expr: &Expr, is_root: bool) -> Result<(), String> {
            match expr {
                Expr::And(children) | Expr::Or(children) => {
                    if children.len() < 2 {
                        return Err(format!("{expr} has fewer than 2 children"));
                    }
                    for child in children {
                        let nested = matches!(
                            (expr, child),
                            (Expr::And(_), Expr::And(_)) | (Expr::Or(_), Expr::Or(_))
                        );
                        if nested {
                            return Err(format!("{expr} has a nested child {child}"));
                        }
                        if matches!(child, Expr::Const(_)) {
                            return Err(format!("{expr} has a constant child"));
                        }
                        check(child, false)?;
                    }
                    Ok(())
                }
                Expr::Not(child) => {
                    if matches!(**child, Expr::Const(_)) {
                        return Err(format!("{expr} negates a constant"));
                    }
                    check(child, false)
                }
                Expr::Const(_) if !is_root => Err(format!("unexpected constant {expr}")),
                _ => Ok(()),
            }
        }

        let simplified = expr.simplify();
        if let Err(message) = check(&simplified, true) {
            proptest::prop_assert!(false, "{}", message);
        }
    }
}
