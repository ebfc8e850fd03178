//! Registration points for project-specific extras.

use std::sync::Arc;

use minijinja::Environment;
use sssg_markdown::MarkdownPlugin;

/// A customizer failed to register its extras.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CustomizeError(pub String);

/// Adds filters and Markdown post-processors before a build starts.
///
/// Customizers are applied once, in order, before the first file is
/// processed. A customizer whose [`register_filters`](Self::register_filters)
/// fails is skipped with a warning and the build carries on without its
/// filters.
pub trait Customizer: Send + Sync {
    /// Name used when reporting problems.
    fn name(&self) -> &str;

    fn register_filters(&self, _env: &mut Environment<'static>) -> Result<(), CustomizeError> {
        Ok(())
    }

    /// Plugins run over every converted Markdown document, after links
    /// have been rewritten.
    fn markdown_plugins(&self) -> Vec<Arc<dyn MarkdownPlugin>> {
        Vec::new()
    }
}
