//! Rewriting of local links from source paths to output paths.
//!
//! Authors link Markdown files to each other by their source names
//! (`[next](chapter-2.md)`). After the build those files live somewhere
//! else (`chapter-2.html`, or `chapter-2/index.html` when files become
//! directories), and the page doing the linking may itself have moved one
//! level deeper. [`LinkContext::rewrite`] recomputes every local href so it
//! resolves against the generated site.

use std::path::{Component, Path, PathBuf};

use crate::kind::ContentKind;
use crate::layout::{OutputLayout, HTML_SUFFIX, INDEX_STEM};
use crate::plan::plan;

/// What kind of reference an href came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A hyperlink (`<a href>`).
    Link,
    /// An image reference (`<img src>`). Never takes the directory form.
    Image,
}

/// Per-document rewrite state, passed explicitly into a single conversion.
#[derive(Debug, Clone)]
pub struct LinkContext {
    /// Absolute path of the file being converted.
    pub source_file: PathBuf,

    /// Where the converted file lands, relative to the output root.
    pub destination: PathBuf,

    /// Canonical root of the source tree.
    pub entrypoint: PathBuf,

    /// Layout of the whole build.
    pub layout: OutputLayout,
}

/// Where a link target lives in the output tree.
struct Target {
    dirs: Vec<String>,
    /// `None` addresses the directory itself (trailing slash).
    file: Option<String>,
}

impl LinkContext {
    pub fn new(
        source_file: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        entrypoint: impl Into<PathBuf>,
        layout: OutputLayout,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            destination: destination.into(),
            entrypoint: entrypoint.into(),
            layout,
        }
    }

    /// Rewrite `href` so it points at the output location of its target.
    ///
    /// External, absolute and fragment-only hrefs are returned unchanged.
    /// A local target that does not exist is reported and returned
    /// unchanged; rewriting never fails.
    pub fn rewrite(&self, href: &str, kind: LinkKind) -> String {
        if href.is_empty() || href.starts_with('#') || href.contains("://") || has_scheme(href) {
            return href.to_string();
        }

        let split = href.find(['#', '?']).unwrap_or(href.len());
        let (path_part, tail) = href.split_at(split);
        if path_part.is_empty() || path_part.starts_with('/') || Path::new(path_part).is_absolute()
        {
            return href.to_string();
        }

        // Resolved lexically, so targets reached through a symlinked directory
        // keep the path the walker publishes them under
        let base = self.source_file.parent().unwrap_or(Path::new(""));
        let candidate = normalize(&base.join(path_part));
        if !candidate.exists() {
            tracing::warn!(
                "In {}, link to {} does not exist",
                self.source_file.display(),
                href
            );
            return href.to_string();
        }

        let Ok(relative) = candidate.strip_prefix(&self.entrypoint) else {
            tracing::warn!(
                "In {}, link to {} points outside the site root",
                self.source_file.display(),
                href
            );
            return href.to_string();
        };

        let target = if candidate.is_dir() {
            Target {
                dirs: components(relative),
                file: None,
            }
        } else {
            self.output_target(relative, kind)
        };

        let rewritten = format!("{}{}", self.relative_to_destination(&target), tail);
        tracing::debug!(
            "Rewrote link {} -> {} in {}",
            href,
            rewritten,
            self.source_file.display()
        );
        rewritten
    }

    /// Output location of a source file given relative to the entrypoint,
    /// planned exactly as the build plans it.
    fn output_target(&self, relative: &Path, kind: LinkKind) -> Target {
        let relative = components(relative).join("/");
        let name = relative.rsplit('/').next().unwrap_or(&relative);
        let content = ContentKind::classify(name);
        let planned = plan(&relative, content, self.layout);

        let dirs = planned
            .destination
            .parent()
            .map(components)
            .unwrap_or_default();
        let file = planned
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Pages served as `dir/index.html` are linked by their directory
        let index_page = format!("{INDEX_STEM}{HTML_SUFFIX}");
        if kind == LinkKind::Link
            && self.layout.is_files_as_dirs()
            && content.is_templated()
            && file == index_page
        {
            return Target { dirs, file: None };
        }

        Target {
            dirs,
            file: Some(file),
        }
    }

    /// Relative href from the destination's directory to `target`.
    ///
    /// The destination directory already contains the synthetic directory a
    /// page gets under files-as-directories, so ascents are counted from
    /// where the page is served, not from where its source lives.
    fn relative_to_destination(&self, target: &Target) -> String {
        let from = self
            .destination
            .parent()
            .map(components)
            .unwrap_or_default();

        let common = from
            .iter()
            .zip(&target.dirs)
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = vec![".."; from.len() - common];
        parts.extend(target.dirs[common..].iter().map(String::as_str));

        match &target.file {
            Some(file) => {
                parts.push(file);
                parts.join("/")
            }
            None if parts.is_empty() => "./".to_string(),
            None => format!("{}/", parts.join("/")),
        }
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Whether `href` starts with a URI scheme such as `mailto:`.
///
/// Single letters are not treated as schemes so drive letters fall through
/// to the absolute-path check.
fn has_scheme(href: &str) -> bool {
    let Some(colon) = href.find(':') else {
        return false;
    };
    let scheme = &href[..colon];

    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
