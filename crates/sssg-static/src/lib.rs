//! Static site build pipeline for sssg.
//!
//! Walks a source tree, decides per file how to transform it, plans where the
//! output lands, renders templates and Markdown, and materializes copy
//! pointers.

pub mod builder;
pub mod copy;
pub mod customize;
pub mod filters;
pub mod ignore_matcher;
pub mod templates;
pub mod walk;

pub use builder::{BuildConfig, BuildError, BuildResult, ProcessError, StaticBuilder};
pub use copy::{CopyResolver, CopySource};
pub use customize::{CustomizeError, Customizer};
pub use ignore_matcher::IgnoreMatcher;
pub use sssg_markdown::{plan, ContentKind, OutputLayout, OutputPlan};
pub use templates::{SourceFile, TemplateEngine, Variables};
pub use walk::{DirectoryWalker, DiscoveredFile};
