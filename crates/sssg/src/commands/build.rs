//! Static site build command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use sssg_static::{BuildConfig, OutputLayout, StaticBuilder};

/// Arguments of `sssg build`. Anything given here wins over sssg.toml.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Source directory (defaults to config or ".")
    #[arg(env = "SSSG_SOURCE")]
    pub source: Option<PathBuf>,

    /// Destination directory (defaults to config or "build")
    #[arg(env = "SSSG_DESTINATION")]
    pub destination: Option<PathBuf>,

    /// Delete the destination directory before building
    #[arg(short, long)]
    pub delete: bool,

    /// Give every rendered page its own directory (about.md -> about/index.html)
    #[arg(long, env = "SSSG_FILES_AS_DIRS")]
    pub files_as_dirs: bool,

    /// Gitignore-style patterns to skip, comma separated
    #[arg(short, long, env = "SSSG_IGNORE", value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Leave image sources in Markdown as written
    #[arg(long)]
    pub no_rewrite_images: bool,
}

/// Configuration file structure (sssg.toml).
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    build: BuildSettings,
}

#[derive(Debug, Deserialize)]
struct BuildSettings {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default = "default_destination")]
    destination: String,
    #[serde(default)]
    files_as_dirs: bool,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    wipe: bool,
    #[serde(default = "default_rewrite_images")]
    rewrite_images: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            destination: default_destination(),
            files_as_dirs: false,
            ignore: vec![],
            wipe: false,
            rewrite_images: default_rewrite_images(),
        }
    }
}

fn default_source() -> String {
    ".".to_string()
}
fn default_destination() -> String {
    "build".to_string()
}
fn default_rewrite_images() -> bool {
    true
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

/// Merge command-line arguments over file settings.
fn resolve(file: ConfigFile, args: BuildArgs) -> BuildConfig {
    let settings = file.build;

    let ignore = if args.ignore.is_empty() {
        settings.ignore
    } else {
        args.ignore
    };

    BuildConfig {
        source_dir: args.source.unwrap_or_else(|| PathBuf::from(&settings.source)),
        output_dir: args
            .destination
            .unwrap_or_else(|| PathBuf::from(&settings.destination)),
        layout: OutputLayout::from_files_as_dirs(args.files_as_dirs || settings.files_as_dirs),
        ignore: ignore
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        wipe_output: args.delete || settings.wipe,
        rewrite_images: settings.rewrite_images && !args.no_rewrite_images,
        customizers: vec![],
    }
}

/// Run the build command.
pub async fn run(config_path: &Path, args: BuildArgs) -> Result<()> {
    let file_config = load_config(config_path)?;
    let config = resolve(file_config, args);

    tracing::info!(
        "Building {} into {}",
        config.source_dir.display(),
        config.output_dir.display()
    );

    let result = StaticBuilder::new(config).build().await?;

    if result.skipped > 0 {
        tracing::info!("Skipped {} empty copy pointers", result.skipped);
    }
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
