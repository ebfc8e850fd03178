//! Markdown to HTML conversion with link rewriting.

use std::fmt;
use std::sync::Arc;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};

use crate::links::{LinkContext, LinkKind};
use crate::plugin::MarkdownPlugin;

/// Converts Markdown to HTML.
///
/// The renderer itself holds no per-document state: the link context of the
/// document being converted is passed to [`MarkdownRenderer::render`], so one
/// renderer can be shared by any number of conversions.
#[derive(Clone)]
pub struct MarkdownRenderer {
    options: Options,
    rewrite_images: bool,
    plugins: Vec<Arc<dyn MarkdownPlugin>>,
}

impl MarkdownRenderer {
    /// Create a renderer with tables, footnotes, strikethrough and task
    /// lists enabled and image rewriting on.
    pub fn new() -> Self {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        Self {
            options,
            rewrite_images: true,
            plugins: Vec::new(),
        }
    }

    /// Whether image sources are rewritten along with hyperlinks.
    pub fn with_image_rewriting(mut self, enabled: bool) -> Self {
        self.rewrite_images = enabled;
        self
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn MarkdownPlugin>) {
        self.plugins.push(plugin);
    }

    /// Convert `content` to an HTML fragment.
    ///
    /// With a link context, every local link (and image, unless disabled) is
    /// rewritten to its output location. Without one, hrefs are emitted as
    /// written.
    pub fn render(&self, content: &str, links: Option<&LinkContext>) -> String {
        let parser = Parser::new_ext(content, self.options);
        let events = parser.map(|event| self.map_event(event, links));

        let mut html_output = String::new();
        html::push_html(&mut html_output, events);

        html_output
    }

    fn map_event<'a>(&self, event: Event<'a>, links: Option<&LinkContext>) -> Event<'a> {
        let event = match (event, links) {
            // Newlines inside a paragraph are kept as line breaks
            (Event::SoftBreak, _) => Event::HardBreak,

            (
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }),
                Some(ctx),
            ) if is_rewritable(link_type) => Event::Start(Tag::Link {
                link_type,
                dest_url: rewrite(ctx, dest_url, LinkKind::Link),
                title,
                id,
            }),

            (
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }),
                Some(ctx),
            ) if self.rewrite_images && is_rewritable(link_type) => Event::Start(Tag::Image {
                link_type,
                dest_url: rewrite(ctx, dest_url, LinkKind::Image),
                title,
                id,
            }),

            (event, _) => event,
        };

        self.plugins
            .iter()
            .fold(event, |event, plugin| plugin.map_event(event))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("options", &self.options)
            .field("rewrite_images", &self.rewrite_images)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

fn is_rewritable(link_type: LinkType) -> bool {
    !matches!(link_type, LinkType::Autolink | LinkType::Email)
}

fn rewrite<'a>(ctx: &LinkContext, dest_url: CowStr<'a>, kind: LinkKind) -> CowStr<'a> {
    let rewritten = ctx.rewrite(&dest_url, kind);
    if rewritten == *dest_url {
        dest_url
    } else {
        CowStr::from(rewritten)
    }
}
