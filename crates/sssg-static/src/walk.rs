//! Discovery of source files.

use std::path::{Component, Path, PathBuf};

use sssg_markdown::TEMPLATES_DIR;
use walkdir::{DirEntry, WalkDir};

use crate::ignore_matcher::IgnoreMatcher;

/// A file found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Absolute path of the file.
    pub path: PathBuf,

    /// Path relative to the source root, slash separated.
    pub relative: String,
}

impl DiscoveredFile {
    pub fn relative_path(&self) -> &Path {
        Path::new(&self.relative)
    }

    /// The file name, without any directory.
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// Depth-first, lazily evaluated walk over every file under a root.
///
/// Siblings are visited in file name order. Directories named `.templates`
/// are skipped at every level; files whose relative path matches the
/// [`IgnoreMatcher`] are left out one by one. Symbolic links are followed,
/// and any traversal error (a dangling link, a loop, an unreadable
/// directory) is yielded as an error.
pub struct DirectoryWalker<'a> {
    root: PathBuf,
    ignore: &'a IgnoreMatcher,
    entries: walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(root: impl Into<PathBuf>, ignore: &'a IgnoreMatcher) -> Self {
        let root = root.into();
        let entries = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_content as fn(&DirEntry) -> bool);

        Self {
            root,
            ignore,
            entries,
        }
    }

    fn discovered(&self, entry: DirEntry) -> DiscoveredFile {
        let path = entry.into_path();
        let relative = relative_slash_path(&self.root, &path);
        DiscoveredFile { path, relative }
    }
}

impl Iterator for DirectoryWalker<'_> {
    type Item = Result<DiscoveredFile, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let file = self.discovered(entry);
            if self.ignore.matches(&file.relative) {
                tracing::debug!("Ignoring {}", file.relative);
                continue;
            }

            return Some(Ok(file));
        }
    }
}

/// Everything except template override directories is walked.
fn is_content(entry: &DirEntry) -> bool {
    !(entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == TEMPLATES_DIR)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn walk(root: &Path, ignore: &IgnoreMatcher) -> Vec<String> {
        DirectoryWalker::new(root, ignore)
            .map(|f| f.unwrap().relative)
            .collect()
    }

    #[test]
    fn walks_depth_first_in_name_order() {
        let temp = tempdir().unwrap();
        for file in ["b.md", "a/z.txt", "a/b/c.png", "c.j2"] {
            touch(temp.path(), file);
        }

        let files = walk(temp.path(), &IgnoreMatcher::default());

        assert_eq!(files, vec!["a/b/c.png", "a/z.txt", "b.md", "c.j2"]);
    }

    #[test]
    fn skips_template_directories_at_every_level() {
        let temp = tempdir().unwrap();
        for file in [
            ".templates/markdown.html",
            "docs/.templates/post.html",
            "docs/page.md",
            "index.md",
        ] {
            touch(temp.path(), file);
        }

        let files = walk(temp.path(), &IgnoreMatcher::default());

        assert_eq!(files, vec!["docs/page.md", "index.md"]);
    }

    #[test]
    fn excludes_ignored_files() {
        let temp = tempdir().unwrap();
        for file in ["keep.md", "old.bak", "drafts/wip.md", "sub/also.bak", "sub/keep.md"] {
            touch(temp.path(), file);
        }
        let ignore = IgnoreMatcher::new(["*.bak", "drafts/"]).unwrap();

        let files = walk(temp.path(), &ignore);

        assert_eq!(files, vec!["keep.md", "sub/keep.md"]);
    }

    #[test]
    fn discovered_file_exposes_paths() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "img/logo.png");
        let ignore = IgnoreMatcher::default();

        let file = DirectoryWalker::new(temp.path(), &ignore)
            .next()
            .unwrap()
            .unwrap();

        assert_eq!(file.relative, "img/logo.png");
        assert_eq!(file.file_name(), "logo.png");
        assert_eq!(file.relative_path(), Path::new("img/logo.png"));
        assert_eq!(file.path, temp.path().join("img/logo.png"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_an_error() {
        let temp = tempdir().unwrap();
        std::os::unix::fs::symlink(temp.path().join("missing"), temp.path().join("link"))
            .unwrap();
        let ignore = IgnoreMatcher::default();

        let result: Result<Vec<_>, _> = DirectoryWalker::new(temp.path(), &ignore).collect();

        assert!(result.is_err());
    }
}
