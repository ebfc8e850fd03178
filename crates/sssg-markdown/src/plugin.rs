//! Extension point for Markdown post-processing.

use pulldown_cmark::Event;

/// Transforms the event stream of a Markdown conversion.
///
/// Plugins run after link rewriting, in registration order, and see every
/// event of every converted document.
pub trait MarkdownPlugin: Send + Sync {
    #[inline(always)]
    fn map_event<'a>(&self, event: Event<'a>) -> Event<'a> {
        event
    }
}
