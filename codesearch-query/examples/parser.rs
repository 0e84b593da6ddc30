// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Standalone query parser
//!
//! Useful for manually testing parsing and repository resolution.

use camino::Utf8PathBuf;
use clap::Parser;
use codesearch_query::{DollarBindVar, Expr, RepoList, errors::QueryParseErrors};

#[derive(Debug, Parser)]
struct Args {
    /// Path to a TOML file listing the known repositories
    #[clap(short = 'r', long)]
    repo_list: Option<Utf8PathBuf>,

    /// The query to parse
    query: String,
}

fn load_repo_list(path: Option<Utf8PathBuf>) -> Option<RepoList> {
    let path = path?;
    match RepoList::from_path(&path) {
        Ok(list) => Some(list),
        Err(err) => {
            eprintln!("{err}: {}", display_source(&err));
            std::process::exit(1);
        }
    }
}

fn display_source(err: &dyn std::error::Error) -> String {
    err.source()
        .map_or_else(|| "unknown error".to_owned(), |source| source.to_string())
}

fn main() {
    let args = Args::parse();

    let expr = match Expr::parse(&args.query) {
        Ok(expr) => expr,
        Err(QueryParseErrors { input, errors, .. }) => {
            for error in errors {
                let report = miette::Report::new(error).with_source_code(input.clone());
                eprintln!("{report:?}");
            }
            std::process::exit(1);
        }
    };
    println!("parsed:     {expr}");
    println!("simplified: {}", expr.simplify());

    let Some(list) = load_repo_list(args.repo_list) else {
        return;
    };
    match expr.resolve(&list) {
        Ok(resolved) => {
            println!("resolved:   {}", resolved.expr());
            match resolved.repos() {
                Some(repos) => println!("repos:      {repos:?}"),
                None => println!("repos:      (unbounded)"),
            }
            let query = resolved.repo_query();
            println!("predicate:  {}", query.query(&DollarBindVar));
            for (i, arg) in query.args().iter().enumerate() {
                println!("  ${}: {arg}", i + 1);
            }
        }
        Err(err) => {
            eprintln!("{err}: {}", err.error);
            std::process::exit(1);
        }
    }
}
