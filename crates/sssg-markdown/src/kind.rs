//! Classification of source files by suffix.

use crate::layout::{COPY_SUFFIX, MARKDOWN_SUFFIX, TEMPLATE_SUFFIX};

/// How a source file is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `*.sssg-copy`: the body names a file or URL to copy in its place.
    CopyPointer,
    /// `*.md` or `*.md.j2`: rendered as a template, converted, then wrapped.
    Markdown,
    /// `*.j2`: rendered as a template.
    Template,
    /// Anything else: copied byte for byte.
    Asset,
}

impl ContentKind {
    /// Classify a file by name. Copy pointers take precedence over every
    /// other suffix, Markdown over plain templates.
    pub fn classify(file_name: &str) -> Self {
        let markdown_template = format!("{MARKDOWN_SUFFIX}{TEMPLATE_SUFFIX}");

        if file_name.ends_with(COPY_SUFFIX) {
            Self::CopyPointer
        } else if file_name.ends_with(MARKDOWN_SUFFIX) || file_name.ends_with(&markdown_template) {
            Self::Markdown
        } else if file_name.ends_with(TEMPLATE_SUFFIX) {
            Self::Template
        } else {
            Self::Asset
        }
    }

    /// Whether the file is rendered through the template engine.
    pub fn is_templated(self) -> bool {
        matches!(self, Self::Markdown | Self::Template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_suffix_precedence() {
        let cases = [
            ("logo.png.sssg-copy", ContentKind::CopyPointer),
            ("page.md.sssg-copy", ContentKind::CopyPointer),
            ("page.md.j2.sssg-copy", ContentKind::CopyPointer),
            ("about.md", ContentKind::Markdown),
            ("about.md.j2", ContentKind::Markdown),
            ("index.html.j2", ContentKind::Template),
            ("feed.xml.j2", ContentKind::Template),
            ("logo.png", ContentKind::Asset),
            ("notes.md.bak", ContentKind::Asset),
            ("README", ContentKind::Asset),
        ];

        for (name, expected) in cases {
            assert_eq!(ContentKind::classify(name), expected, "{name}");
        }
    }

    #[test]
    fn only_markdown_and_templates_are_templated() {
        assert!(ContentKind::Markdown.is_templated());
        assert!(ContentKind::Template.is_templated());
        assert!(!ContentKind::CopyPointer.is_templated());
        assert!(!ContentKind::Asset.is_templated());
    }
}
