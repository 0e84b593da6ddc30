// Copyright (c) The codesearch-query Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory repository oracle, and the file it is loaded from.

use crate::{
    errors::{LookupError, RepoListConfigError, RepoListError},
    expand::RepoOracle,
};
use camino::Utf8Path;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A fixed list of repository names.
///
/// Patterns are matched as unanchored regexes against each name: a name is selected if
/// it matches every include pattern and no exclude pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoList {
    names: BTreeSet<String>,
    regex_size_limit: Option<usize>,
}

impl RepoList {
    /// Creates a new list from the given names.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            regex_size_limit: None,
        }
    }

    /// Sets the maximum compiled size of each pattern, in bytes.
    ///
    /// Patterns that compile to a larger program are rejected with
    /// [`RepoListError::InvalidRegex`].
    pub fn with_regex_size_limit(mut self, limit: usize) -> Self {
        self.regex_size_limit = Some(limit);
        self
    }

    /// Loads a list from a TOML file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, RepoListConfigError> {
        RepoListConfig::from_path(path).map(Self::from)
    }

    /// Returns the names in this list.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Returns the names that match every pattern in `include` and no pattern in
    /// `exclude`.
    pub fn matching(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<BTreeSet<String>, RepoListError> {
        let include = self.compile_all(include)?;
        let exclude = self.compile_all(exclude)?;
        Ok(self
            .names
            .iter()
            .filter(|name| include.iter().all(|regex| regex.is_match(name)))
            .filter(|name| !exclude.iter().any(|regex| regex.is_match(name)))
            .cloned()
            .collect())
    }

    fn compile_all(&self, patterns: &[String]) -> Result<Vec<Regex>, RepoListError> {
        patterns
            .iter()
            .map(|pattern| {
                let mut builder = RegexBuilder::new(pattern);
                if let Some(limit) = self.regex_size_limit {
                    builder.size_limit(limit);
                }
                builder.build().map_err(|error| RepoListError::InvalidRegex {
                    pattern: pattern.clone(),
                    error,
                })
            })
            .collect()
    }
}

impl From<RepoListConfig> for RepoList {
    fn from(config: RepoListConfig) -> Self {
        let list = Self::new(config.repos);
        match config.regex_size_limit {
            Some(limit) => list.with_regex_size_limit(limit),
            None => list,
        }
    }
}

impl RepoOracle for RepoList {
    fn lookup(
        &self,
        include: &[String],
        exclude: &[String],
    ) -> Result<BTreeSet<String>, LookupError> {
        Ok(self.matching(include, exclude)?)
    }
}

/// The contents of a repository list file.
///
/// ```toml
/// repos = ["github.com/foo/bar", "github.com/foo/baz"]
/// regex-size-limit = 1048576
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct RepoListConfig {
    /// The names of the known repositories.
    #[serde(default)]
    pub repos: Vec<String>,

    /// The maximum compiled size of each pattern, in bytes.
    #[serde(default)]
    pub regex_size_limit: Option<usize>,
}

impl RepoListConfig {
    /// Reads and parses the file at `path`.
    ///
    /// Unknown keys are logged as warnings and otherwise ignored.
    pub fn from_path(path: &Utf8Path) -> Result<Self, RepoListConfigError> {
        debug!("repo list: attempting to load from {path}");
        let contents = std::fs::read_to_string(path).map_err(|error| RepoListConfigError::Read {
            path: path.to_owned(),
            error,
        })?;

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| RepoListConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;

        if !unknown.is_empty() {
            let keys = unknown.into_iter().collect::<Vec<_>>().join(", ");
            warn!("ignoring unknown keys in repository list at {path}: {keys}");
        }

        debug!(
            "repo list: loaded {} repositories from {path}",
            config.repos.len()
        );
        Ok(config)
    }

    /// Deserializes TOML content and returns the config along with any unknown keys.
    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: RepoListConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}
