//! Gitignore-style exclusion of source files.

use ::ignore::gitignore::{Gitignore, GitignoreBuilder};

/// An invalid ignore pattern.
#[derive(Debug, thiserror::Error)]
#[error("Invalid ignore pattern {pattern:?}: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// A single pattern and the matcher compiled from it.
#[derive(Debug)]
struct IgnoreRule {
    pattern: String,
    matcher: Gitignore,
}

/// Predicate over root-relative paths built from gitignore-style globs.
///
/// `*` does not cross `/`, `**` does, a leading `/` anchors to the source
/// root and a trailing `/` only matches directories (and so every file
/// beneath them). Each pattern is compiled on its own and a path is ignored
/// when any of them matches.
#[derive(Debug, Default)]
pub struct IgnoreMatcher {
    rules: Vec<IgnoreRule>,
}

impl IgnoreMatcher {
    /// Compile `patterns`. Blank patterns are skipped.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }

            let error = |e: ::ignore::Error| PatternError {
                pattern: pattern.to_string(),
                message: e.to_string(),
            };

            let mut builder = GitignoreBuilder::new(".");
            builder.add_line(None, pattern).map_err(error)?;
            let matcher = builder.build().map_err(error)?;

            rules.push(IgnoreRule {
                pattern: pattern.to_string(),
                matcher,
            });
        }

        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.pattern.as_str())
    }

    /// Whether the file at `relative_path` (slash separated, relative to the
    /// source root, with or without a leading `/`) is excluded.
    pub fn matches(&self, relative_path: &str) -> bool {
        let path = relative_path.trim_start_matches('/');
        if path.is_empty() {
            return false;
        }

        self.rules.iter().any(|rule| {
            rule.matcher
                .matched_path_or_any_parents(path, false)
                .is_ignore()
        })
    }
}
