//! Front matter extraction and parsing.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Selects the wrapper template used for Markdown output.
pub const TEMPLATE_NAME_KEY: &str = "template_name";

/// Path to a JSON document merged into the render context.
pub const LOAD_JSON_KEY: &str = "load_json";

/// Replaces normal rendering with the redirect template.
pub const REDIRECT_URL_KEY: &str = "redirect_url";

/// Metadata parsed from the head of a content file.
///
/// Keys are unique strings; values are arbitrary structured data. Only
/// `load_json`, `template_name` and `redirect_url` mean anything to the
/// build pipeline, every other key is passed to templates verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter(BTreeMap<String, Value>);

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The value of `key` rendered as plain text.
    ///
    /// Strings are returned as-is, numbers and booleans are formatted. Null,
    /// sequences and mappings yield `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn load_json(&self) -> Option<String> {
        self.text(LOAD_JSON_KEY)
    }

    pub fn template_name(&self) -> Option<String> {
        self.text(TEMPLATE_NAME_KEY)
    }

    /// Whether this file asked to be replaced by a redirect page.
    pub fn is_redirect(&self) -> bool {
        self.0.contains_key(REDIRECT_URL_KEY)
    }
}

impl FromIterator<(String, Value)> for FrontMatter {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Syntax of a front matter block, chosen by its delimiter line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn from_delimiter(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }

    fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }

    fn parse(self, raw: &str) -> Result<FrontMatter, FrontmatterError> {
        if raw.trim().is_empty() {
            return Ok(FrontMatter::default());
        }

        let value: Value = match self {
            Self::Yaml => serde_yaml::from_str(raw)
                .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?,
            Self::Toml => toml::from_str(raw)
                .map_err(|e| FrontmatterError::InvalidToml(e.to_string()))?,
        };

        match value {
            Value::Null => Ok(FrontMatter::default()),
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(FrontmatterError::NotAMapping),
        }
    }
}

/// Extract front matter from the head of a content file.
///
/// A block opened by a `---` line is YAML, a block opened by a `+++` line is
/// TOML. Returns the parsed metadata and the body that follows the closing
/// delimiter. Text without a leading delimiter has empty metadata and is
/// returned whole.
pub fn extract_frontmatter(source: &str) -> Result<(FrontMatter, &str), FrontmatterError> {
    let text = source.strip_prefix('\u{feff}').unwrap_or(source);

    let Some((first, after_open)) = split_line(text) else {
        return Ok((FrontMatter::default(), source));
    };
    let Some(format) = Format::from_delimiter(first) else {
        return Ok((FrontMatter::default(), source));
    };

    let mut rest = after_open;
    loop {
        let Some((line, next)) = split_line(rest) else {
            return Err(FrontmatterError::Unclosed(format.delimiter()));
        };

        if line.trim_end() == format.delimiter() {
            let raw = &after_open[..after_open.len() - rest.len()];
            let metadata = format.parse(raw)?;
            return Ok((metadata, next.trim_start_matches(['\r', '\n'])));
        }

        rest = next;
    }
}

/// Split off the first line, without its terminator.
fn split_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }

    match text.find('\n') {
        Some(pos) => Some((&text[..pos], &text[pos + 1..])),
        None => Some((text, "")),
    }
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed front matter block - missing closing {0}")]
    Unclosed(&'static str),

    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Invalid TOML in front matter: {0}")]
    InvalidToml(String),

    #[error("Front matter must be a mapping of keys to values")]
    NotAMapping,
}
