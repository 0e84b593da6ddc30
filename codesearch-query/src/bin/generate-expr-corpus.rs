// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use codesearch_query::Expr;
use proptest::{
    strategy::{Strategy, ValueTree},
    test_runner::{Config, RngAlgorithm, TestRng, TestRunner},
};
use std::{
    hash::{Hash, Hasher},
    path::Path,
};
use xxhash_rust::xxh3::Xxh3;

static CORPUS_DIR: &str = "fuzz/corpus/fuzz_parsing";

fn main() {
    let mut generator = ValueGenerator::from_seed("fuzz_parsing_corpus");
    std::fs::create_dir_all(CORPUS_DIR).unwrap();
    for n in 0..1024 {
        let value = generator.generate(Expr::query_strategy()).simplify();
        let query = value
            .to_query_string()
            .expect("generated queries have a surface form");
        let path = Path::new(CORPUS_DIR);
        let path = path.join(format!("seed-{n}"));
        std::fs::write(path, query).unwrap();
    }
}

/// Draws single values out of proptest strategies with a seeded RNG, so that the corpus is
/// the same across runs.
#[derive(Debug)]
struct ValueGenerator {
    runner: TestRunner,
}

impl ValueGenerator {
    fn from_seed(seed: impl Hash) -> Self {
        // Each 8-byte window of the 32-byte RNG seed comes from a differently seeded hash.
        let mut rng_seed = [0u8; 32];
        for (index, chunk) in rng_seed.chunks_exact_mut(8).enumerate() {
            let mut hasher = Xxh3::with_seed(index as u64);
            seed.hash(&mut hasher);
            chunk.copy_from_slice(&hasher.finish().to_be_bytes());
        }

        Self {
            runner: TestRunner::new_with_rng(
                Config::default(),
                TestRng::from_seed(RngAlgorithm::default(), &rng_seed),
            ),
        }
    }

    fn generate<S: Strategy>(&mut self, strategy: S) -> S::Value {
        strategy
            .new_tree(&mut self.runner)
            .expect("creating a new value should succeed")
            .current()
    }
}
