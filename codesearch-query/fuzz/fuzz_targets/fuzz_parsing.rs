#![no_main]

use codesearch_query::Expr;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Check that the input doesn't crash, and that valid queries survive a round trip through
    // the surface syntax.
    let Ok(expr) = Expr::parse(input) else {
        return;
    };
    let expr = expr.simplify();
    if let Some(query) = expr.to_query_string() {
        let reparsed = Expr::parse(&query).expect("rendered queries parse");
        assert_eq!(reparsed.simplify(), expr);
    }
});
