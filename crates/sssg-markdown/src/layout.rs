//! Output layout and the file suffix conventions shared by every build stage.

/// Marks a file for template rendering. Never survives into output names.
pub const TEMPLATE_SUFFIX: &str = ".j2";

/// Marks Markdown content. Combinable with [`TEMPLATE_SUFFIX`] (`x.md.j2`).
pub const MARKDOWN_SUFFIX: &str = ".md";

/// Marks a file whose body names another file or URL to copy in its place.
pub const COPY_SUFFIX: &str = ".sssg-copy";

/// Extension of rendered pages.
pub const HTML_SUFFIX: &str = ".html";

/// Per-directory template override folder, never walked as content.
pub const TEMPLATES_DIR: &str = ".templates";

/// Base name of a page that is never nested under a directory of its own.
pub const INDEX_STEM: &str = "index";

/// How rendered pages are laid out in the destination tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// `about.md` becomes `about.html`.
    #[default]
    Flat,
    /// `about.md` becomes `about/index.html`, Jekyll style.
    FilesAsDirectories,
}

impl OutputLayout {
    pub fn from_files_as_dirs(files_as_dirs: bool) -> Self {
        if files_as_dirs {
            Self::FilesAsDirectories
        } else {
            Self::Flat
        }
    }

    pub fn is_files_as_dirs(self) -> bool {
        self == Self::FilesAsDirectories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_from_flag() {
        assert_eq!(OutputLayout::from_files_as_dirs(false), OutputLayout::Flat);
        assert!(OutputLayout::from_files_as_dirs(true).is_files_as_dirs());
    }
}
