//! Create a starter site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `sssg init`, relative to the working directory.
const SCAFFOLD: &[(&str, &str)] = &[
    ("sssg.toml", DEFAULT_CONFIG),
    ("site/index.md", DEFAULT_INDEX),
    ("site/about.md", DEFAULT_ABOUT),
    ("site/.templates/markdown.html", DEFAULT_MARKDOWN_TEMPLATE),
    ("site/style.css", DEFAULT_STYLE),
];

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing sssg...");

    scaffold(Path::new("."), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sssg build' to render the site into build/.");

    Ok(())
}

/// Write the starter files under `root`. Existing files are kept unless
/// `overwrite` is set.
fn scaffold(root: &Path, overwrite: bool) -> Result<()> {
    for (relative, content) in SCAFFOLD {
        let path = root.join(relative);

        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# sssg configuration

[build]
# Directory holding templates, Markdown and assets
source = "site"

# Where the rendered site is written
destination = "build"

# Render about.md to about/index.html instead of about.html
files_as_dirs = false

# Gitignore-style patterns, relative to the source directory
ignore = ["*.bak"]

# Delete the destination before every build
wipe = false

# Rewrite image sources in Markdown to their output location
rewrite_images = true
"#;

const DEFAULT_INDEX: &str = r#"---
title: Home
---

# Welcome

This site is built with **sssg**.

Read more [about this site](about.md).
"#;

const DEFAULT_ABOUT: &str = r#"+++
title = "About"
+++

# About

Markdown files are rendered as templates first, so front matter values such
as "{{ title }}" can be used in the body.

[Back home](index.md)
"#;

const DEFAULT_MARKDOWN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ title | default("Untitled") }}</title>
  <link rel="stylesheet" href="{{ path_to_root }}style.css">
</head>
<body>
  <main>
{{ md_content }}
  </main>
</body>
</html>
"#;

const DEFAULT_STYLE: &str = r#"body {
  max-width: 40rem;
  margin: 2rem auto;
  font-family: system-ui, sans-serif;
  line-height: 1.5;
}
"#;
