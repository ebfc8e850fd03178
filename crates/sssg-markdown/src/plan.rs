//! Destination planning for source files.

use std::path::PathBuf;

use crate::kind::ContentKind;
use crate::layout::{
    OutputLayout, COPY_SUFFIX, HTML_SUFFIX, INDEX_STEM, MARKDOWN_SUFFIX, TEMPLATE_SUFFIX,
};

/// Where a source file's output lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// Destination path relative to the output root, slash separated.
    pub destination: PathBuf,

    /// `../` repeated once per directory between the destination and the
    /// output root. Empty at the root.
    pub path_to_root: String,

    /// Whether the file was given a directory of its own.
    pub nested: bool,
}

/// Plan the destination of `relative_source`.
///
/// Pipeline suffixes are stripped (`.j2`, `.sssg-copy`) and Markdown is
/// retargeted to `.html`. Under [`OutputLayout::FilesAsDirectories`] a
/// rendered HTML page `dir/name.html` becomes `dir/name/index.html`, unless
/// it is already called `index`.
pub fn plan(relative_source: &str, kind: ContentKind, layout: OutputLayout) -> OutputPlan {
    let relative_source = relative_source.trim_start_matches('/');
    let (dir, name) = match relative_source.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, relative_source),
    };

    let output_name = output_name(name, kind);
    let mut depth = relative_source.split('/').count();

    let page_stem = output_name
        .strip_suffix(HTML_SUFFIX)
        .filter(|stem| !stem.is_empty());

    let nested = match page_stem {
        Some(stem) => kind.is_templated() && layout.is_files_as_dirs() && stem != INDEX_STEM,
        None => false,
    };

    let mut destination = dir.map(PathBuf::from).unwrap_or_default();
    match page_stem {
        Some(stem) if nested => {
            depth += 1;
            destination.push(stem);
            destination.push(format!("{INDEX_STEM}{HTML_SUFFIX}"));
        }
        _ => destination.push(&output_name),
    }

    OutputPlan {
        destination,
        path_to_root: "../".repeat(depth.saturating_sub(1)),
        nested,
    }
}

/// Output file name for a source file name.
fn output_name(name: &str, kind: ContentKind) -> String {
    match kind {
        ContentKind::CopyPointer => name.strip_suffix(COPY_SUFFIX).unwrap_or(name).to_string(),
        ContentKind::Markdown => {
            let name = name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(name);
            let stem = name.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(name);
            format!("{stem}{HTML_SUFFIX}")
        }
        ContentKind::Template => name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(name).to_string(),
        ContentKind::Asset => name.to_string(),
    }
}
