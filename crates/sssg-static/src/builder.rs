//! Static site builder.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use minijinja::Value;
use sssg_markdown::{
    plan, ContentKind, FrontmatterError, LinkContext, MarkdownRenderer, OutputLayout,
    TEMPLATES_DIR,
};

use crate::copy::{copy_preserving, CopyResolver};
use crate::customize::Customizer;
use crate::ignore_matcher::{IgnoreMatcher, PatternError};
use crate::templates::{SourceFile, TemplateEngine, Variables, PATH_TO_ROOT};
use crate::walk::{DirectoryWalker, DiscoveredFile};

/// Configuration for building a static site.
#[derive(Clone)]
pub struct BuildConfig {
    /// Source directory
    pub source_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Whether rendered pages get a directory of their own
    pub layout: OutputLayout,

    /// Gitignore-style patterns, matched against paths relative to the source
    pub ignore: Vec<String>,

    /// Remove the output directory before building
    pub wipe_output: bool,

    /// Rewrite image sources in Markdown along with links
    pub rewrite_images: bool,

    /// Extra filters and Markdown plugins, applied in order
    pub customizers: Vec<Arc<dyn Customizer>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("build"),
            layout: OutputLayout::Flat,
            ignore: vec![],
            wipe_output: false,
            rewrite_images: true,
            customizers: vec![],
        }
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let customizers: Vec<&str> = self.customizers.iter().map(|c| c.name()).collect();

        f.debug_struct("BuildConfig")
            .field("source_dir", &self.source_dir)
            .field("output_dir", &self.output_dir)
            .field("layout", &self.layout)
            .field("ignore", &self.ignore)
            .field("wipe_output", &self.wipe_output)
            .field("rewrite_images", &self.rewrite_images)
            .field("customizers", &customizers)
            .finish()
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of templates and Markdown files rendered
    pub pages: usize,

    /// Number of assets and copy pointers written
    pub copied: usize,

    /// Number of empty copy pointers
    pub skipped: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that stop a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Ignore(#[from] PatternError),

    #[error("Failed to set up HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to process {path}: {source}")]
    File {
        path: String,
        #[source]
        source: ProcessError,
    },

    #[error("Failed to prepare output {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why a single source file could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Invalid front matter: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Template error: {0:#}")]
    Template(#[from] minijinja::Error),

    #[error("JSON data file not found: {}", .0.display())]
    LoadJsonNotFound(PathBuf),

    #[error("Invalid JSON in {}: {source}", path.display())]
    LoadJsonInvalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON data in {} is not an object", .0.display())]
    LoadJsonNotObject(PathBuf),

    #[error("Copy source not found: {}", .0.display())]
    CopySourceNotFound(PathBuf),

    #[error("Unsupported copy source: {0}")]
    UnsupportedUrl(String),

    #[error("Failed to fetch: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Fetching {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },
}

/// What processing a file produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Rendered,
    Copied,
    Skipped,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build the static site.
    ///
    /// Files are processed one at a time in walk order. The first file that
    /// fails stops the run; whatever was written before it stays on disk.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let source = &self.config.source_dir;
        if !source.is_dir() {
            return Err(BuildError::SourceNotFound(source.clone()));
        }
        let root = source
            .canonicalize()
            .map_err(|_| BuildError::SourceNotFound(source.clone()))?;

        self.prepare_output()?;

        let engine = self.template_engine(&root);
        let copier = CopyResolver::new()?;
        let ignore = IgnoreMatcher::new(self.ignore_patterns(&root))?;

        let mut result = BuildResult {
            pages: 0,
            copied: 0,
            skipped: 0,
            duration_ms: 0,
            output_dir: self.config.output_dir.clone(),
        };

        for file in DirectoryWalker::new(&root, &ignore) {
            let file = file?;
            tracing::debug!("Processing {}", file.relative);

            let outcome = self
                .process_file(&engine, &copier, &root, &file)
                .await
                .map_err(|source| BuildError::File {
                    path: file.relative.clone(),
                    source,
                })?;

            match outcome {
                Outcome::Rendered => result.pages += 1,
                Outcome::Copied => result.copied += 1,
                Outcome::Skipped => result.skipped += 1,
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Built {} pages, copied {} files in {}ms",
            result.pages,
            result.copied,
            result.duration_ms
        );

        Ok(result)
    }

    fn prepare_output(&self) -> Result<(), BuildError> {
        let output = &self.config.output_dir;

        let write_error = |source: io::Error| BuildError::Write {
            path: output.clone(),
            source,
        };

        if self.config.wipe_output {
            match fs::remove_dir_all(output) {
                Ok(()) => tracing::info!("Removed {}", output.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(write_error(e)),
            }
        }

        fs::create_dir_all(output).map_err(write_error)
    }

    fn template_engine(&self, root: &Path) -> TemplateEngine {
        let mut markdown =
            MarkdownRenderer::new().with_image_rewriting(self.config.rewrite_images);
        for customizer in &self.config.customizers {
            for plugin in customizer.markdown_plugins() {
                markdown.add_plugin(plugin);
            }
        }

        let template_dir = root.join(TEMPLATES_DIR);
        let template_dir = template_dir.is_dir().then_some(template_dir);

        let mut engine = TemplateEngine::new(template_dir, markdown);
        for customizer in &self.config.customizers {
            match engine.customize(customizer.as_ref()) {
                Ok(()) => tracing::debug!("Applied customizer {}", customizer.name()),
                Err(e) => tracing::warn!("Skipping customizer {}: {}", customizer.name(), e),
            }
        }

        engine
    }

    /// Configured patterns, plus the output directory when it lives inside
    /// the source tree.
    fn ignore_patterns(&self, root: &Path) -> Vec<String> {
        let mut patterns = self.config.ignore.clone();

        let nested_output = self
            .config
            .output_dir
            .canonicalize()
            .ok()
            .and_then(|output| {
                output
                    .strip_prefix(root)
                    .ok()
                    .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            })
            .filter(|relative| !relative.is_empty());

        if let Some(relative) = nested_output {
            tracing::debug!(
                "Output directory {} is inside the source, skipping it",
                relative
            );
            patterns.push(format!("/{relative}/"));
        }

        patterns
    }

    async fn process_file(
        &self,
        engine: &TemplateEngine,
        copier: &CopyResolver,
        root: &Path,
        file: &DiscoveredFile,
    ) -> Result<Outcome, ProcessError> {
        let kind = ContentKind::classify(file.file_name());
        let planned = plan(&file.relative, kind, self.config.layout);
        let destination = self.config.output_dir.join(&planned.destination);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut variables = Variables::new();
        variables.insert(PATH_TO_ROOT.to_string(), Value::from(planned.path_to_root));

        let links = LinkContext::new(&file.path, &planned.destination, root, self.config.layout);

        match kind {
            ContentKind::Template => {
                let text = fs::read_to_string(&file.path)?;
                let source = source_file(file, &text);
                let html = engine.render_html(source, &variables, &links)?;
                fs::write(&destination, html)?;
                Ok(Outcome::Rendered)
            }
            ContentKind::Markdown => {
                let text = fs::read_to_string(&file.path)?;
                let source = source_file(file, &text);
                let html = engine.render_markdown(source, &variables, &links)?;
                fs::write(&destination, html)?;
                Ok(Outcome::Rendered)
            }
            ContentKind::CopyPointer => {
                if copier.materialize(&file.path, &destination).await? {
                    Ok(Outcome::Copied)
                } else {
                    Ok(Outcome::Skipped)
                }
            }
            ContentKind::Asset => {
                copy_preserving(&file.path, &destination)?;
                Ok(Outcome::Copied)
            }
        }
    }
}

fn source_file<'a>(file: &'a DiscoveredFile, text: &'a str) -> SourceFile<'a> {
    SourceFile {
        name: &file.relative,
        path: &file.path,
        text,
    }
}
