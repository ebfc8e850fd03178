//! Markdown support for sssg.
//!
//! This crate extracts front matter from content files, converts Markdown to
//! HTML, and rewrites local links so they point at the generated output
//! instead of the source tree. It also owns the naming rules every build
//! stage shares: how a file is classified and where its output lands.

pub mod frontmatter;
pub mod kind;
pub mod layout;
pub mod links;
pub mod plan;
pub mod plugin;
pub mod render;

pub use frontmatter::{
    extract_frontmatter, FrontMatter, FrontmatterError, LOAD_JSON_KEY, REDIRECT_URL_KEY,
    TEMPLATE_NAME_KEY,
};
pub use kind::ContentKind;
pub use layout::{
    OutputLayout, COPY_SUFFIX, HTML_SUFFIX, INDEX_STEM, MARKDOWN_SUFFIX, TEMPLATES_DIR,
    TEMPLATE_SUFFIX,
};
pub use links::{LinkContext, LinkKind};
pub use plan::{plan, OutputPlan};
pub use plugin::MarkdownPlugin;
pub use pulldown_cmark;
pub use render::MarkdownRenderer;
