//! Template engine for rendering content files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, ErrorKind};
use sssg_markdown::{extract_frontmatter, FrontMatter, LinkContext, MarkdownRenderer};

use crate::builder::ProcessError;
use crate::customize::{CustomizeError, Customizer};
use crate::filters::{self, LINKS_KEY};

/// Default wrapper for Markdown output.
pub const MARKDOWN_TEMPLATE: &str = "markdown.html";

/// Page rendered in place of a file that sets `redirect_url`.
pub const REDIRECT_TEMPLATE: &str = "redirect.html";

/// Relative prefix from a page to the site root.
pub const PATH_TO_ROOT: &str = "path_to_root";

/// Converted Markdown handed to the wrapper template.
pub const MD_CONTENT: &str = "md_content";

/// Variables the caller supplies to every render.
pub type Variables = BTreeMap<String, Value>;

/// A content file handed to the engine.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Path relative to the source root, used as the template name.
    pub name: &'a str,

    /// Absolute path, `load_json` is resolved against its directory.
    pub path: &'a Path,

    /// Full text, front matter included.
    pub text: &'a str,
}

/// Template engine using minijinja.
///
/// Templates are looked up in the project's `.templates` directory first and
/// then among the built-in templates. Nothing is escaped automatically.
#[derive(Debug)]
pub struct TemplateEngine {
    env: Environment<'static>,
    markdown: MarkdownRenderer,
}

impl TemplateEngine {
    /// Create an engine that loads overrides from `template_dir`.
    pub fn new(template_dir: Option<PathBuf>, markdown: MarkdownRenderer) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(move |name| load_template(template_dir.as_deref(), name));
        filters::register(&mut env, &markdown);

        Self { env, markdown }
    }

    /// Apply a customizer's filters. On failure the engine is left exactly
    /// as it was.
    pub fn customize(&mut self, customizer: &dyn Customizer) -> Result<(), CustomizeError> {
        let mut env = self.env.clone();
        customizer.register_filters(&mut env)?;
        self.env = env;
        Ok(())
    }

    /// Render a template file to its final text.
    ///
    /// A file whose front matter sets `redirect_url` renders the redirect
    /// page instead, and its body is never evaluated. `links` drives the
    /// `markdown` filter.
    pub fn render_html(
        &self,
        source: SourceFile<'_>,
        variables: &Variables,
        links: &LinkContext,
    ) -> Result<String, ProcessError> {
        let (metadata, body) = extract_frontmatter(source.text)?;
        if metadata.is_redirect() {
            return self.render_redirect(&metadata);
        }

        let (output, _) = self.render(source, body, &metadata, variables, links)?;
        Ok(output)
    }

    /// Render a Markdown file to a full page.
    ///
    /// The body is first rendered as a template, then converted to HTML with
    /// `links` governing link rewriting, and finally placed under
    /// `md_content` in the wrapper template chosen by `template_name`.
    pub fn render_markdown(
        &self,
        source: SourceFile<'_>,
        variables: &Variables,
        links: &LinkContext,
    ) -> Result<String, ProcessError> {
        let (metadata, body) = extract_frontmatter(source.text)?;
        if metadata.is_redirect() {
            return self.render_redirect(&metadata);
        }

        let (content, mut context) = self.render(source, body, &metadata, variables, links)?;
        let md_html = self.markdown.render(&content, Some(links));

        let template_name = metadata
            .template_name()
            .map(|name| format!("{name}.html"))
            .unwrap_or_else(|| MARKDOWN_TEMPLATE.to_string());

        context.insert(MD_CONTENT.to_string(), Value::from_safe_string(md_html));

        let template = self.env.get_template(&template_name)?;
        Ok(template.render(Value::from_iter(context))?)
    }

    /// Render the redirect page with the front matter as its only context.
    pub fn render_redirect(&self, metadata: &FrontMatter) -> Result<String, ProcessError> {
        let template = self.env.get_template(REDIRECT_TEMPLATE)?;
        Ok(template.render(Value::from_serialize(metadata))?)
    }

    /// Render `body` with the layered context and return it with that
    /// context.
    fn render(
        &self,
        source: SourceFile<'_>,
        body: &str,
        metadata: &FrontMatter,
        variables: &Variables,
        links: &LinkContext,
    ) -> Result<(String, Variables), ProcessError> {
        let data = match metadata.load_json() {
            Some(path) => Some(load_json(source.path, &path)?),
            None => None,
        };

        let mut context = layer_context(variables, metadata, data);
        context.insert(LINKS_KEY.to_string(), filters::links_value(links));
        let output = self
            .env
            .render_named_str(source.name, body, Value::from_iter(context.clone()))?;

        Ok((output, context))
    }
}

/// Merge the render context, later layers shadowing earlier ones:
/// caller variables, then front matter, then loaded JSON.
pub fn layer_context(
    variables: &Variables,
    metadata: &FrontMatter,
    data: Option<serde_json::Map<String, serde_json::Value>>,
) -> Variables {
    let mut context = variables.clone();

    for (key, value) in metadata.iter() {
        context.insert(key.clone(), Value::from_serialize(value));
    }

    for (key, value) in data.into_iter().flatten() {
        context.insert(key, Value::from_serialize(&value));
    }

    context
}

/// Load the JSON object named by `load_json`, relative to the source file.
fn load_json(
    source_file: &Path,
    target: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, ProcessError> {
    let base = source_file.parent().unwrap_or(Path::new(""));
    let path = base.join(target);

    let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ProcessError::LoadJsonNotFound(path.clone()),
        _ => ProcessError::Io(e),
    })?;

    match serde_json::from_str(&text) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProcessError::LoadJsonNotObject(path)),
        Err(source) => Err(ProcessError::LoadJsonInvalid { path, source }),
    }
}

/// Resolve a template by name: override directory first, built-ins second.
fn load_template(dir: Option<&Path>, name: &str) -> Result<Option<String>, minijinja::Error> {
    let relative = Path::new(name);
    let is_plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !is_plain {
        return Ok(None);
    }

    if let Some(dir) = dir {
        let path = dir.join(relative);
        match fs::read_to_string(&path) {
            Ok(source) => return Ok(Some(source)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {}", path.display()),
                )
                .with_source(e))
            }
        }
    }

    Ok(builtin_template(name).map(str::to_string))
}

fn builtin_template(name: &str) -> Option<&'static str> {
    match name {
        MARKDOWN_TEMPLATE => Some(MARKDOWN_SOURCE),
        REDIRECT_TEMPLATE => Some(REDIRECT_SOURCE),
        _ => None,
    }
}

const MARKDOWN_SOURCE: &str = "{{ md_content }}";

const REDIRECT_SOURCE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Redirecting</title>
  <link rel="canonical" href="{{ redirect_url }}">
  <meta http-equiv="refresh" content="0; url={{ redirect_url }}">
</head>
<body>
  <p>Redirecting to <a href="{{ redirect_url }}">{{ redirect_url }}</a>.</p>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sssg_markdown::OutputLayout;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempdir().unwrap();
            let root = temp.path().canonicalize().unwrap();
            Self { _temp: temp, root }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn engine(&self) -> TemplateEngine {
            TemplateEngine::new(Some(self.root.join(".templates")), MarkdownRenderer::new())
        }

        fn links(&self, source: &str, destination: &str) -> LinkContext {
            LinkContext::new(self.root.join(source), destination, &self.root, OutputLayout::Flat)
        }
    }

    fn vars(path_to_root: &str) -> Variables {
        let mut vars = Variables::new();
        vars.insert(PATH_TO_ROOT.to_string(), Value::from(path_to_root));
        vars
    }

    fn source<'a>(name: &'a str, path: &'a Path, text: &'a str) -> SourceFile<'a> {
        SourceFile { name, path, text }
    }

    #[test]
    fn renders_template_with_front_matter() {
        let fx = Fixture::new();
        let text = "---\ntitle: Home\n---\n<h1>{{ title }}</h1><a href=\"{{ path_to_root }}x\">";
        let path = fx.write("docs/index.html.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("docs/index.html.j2", &path, text),
                &vars("../"),
                &fx.links("docs/index.html.j2", "docs/index.html"),
            )
            .unwrap();

        assert_eq!(html, "<h1>Home</h1><a href=\"../x\">");
    }

    #[test]
    fn nothing_is_auto_escaped() {
        let fx = Fixture::new();
        let text = "---\nsnippet: \"<b>&</b>\"\n---\n{{ snippet }}";
        let path = fx.write("page.html.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("page.html.j2", &path, text),
                &vars(""),
                &fx.links("page.html.j2", "page.html"),
            )
            .unwrap();

        assert_eq!(html, "<b>&</b>");
    }

    #[test]
    fn json_shadows_front_matter_which_shadows_variables() {
        let fx = Fixture::new();
        fx.write("data/site.json", r#"{"title": "From JSON", "items": [1, 2]}"#);
        let text = concat!(
            "---\nload_json: data/site.json\ntitle: From front matter\npath_to_root: fm/\n---\n",
            "{{ title }}|{{ path_to_root }}|{{ items | length }}",
        );
        let path = fx.write("page.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("page.j2", &path, text),
                &vars("../"),
                &fx.links("page.j2", "page"),
            )
            .unwrap();

        assert_eq!(html, "From JSON|fm/|2");
    }

    #[test]
    fn load_json_resolves_relative_to_source_directory() {
        let fx = Fixture::new();
        fx.write("blog/posts.json", r#"{"count": 3}"#);
        let text = "---\nload_json: posts.json\n---\n{{ count }}";
        let path = fx.write("blog/list.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("blog/list.j2", &path, text),
                &vars("../"),
                &fx.links("blog/list.j2", "blog/list"),
            )
            .unwrap();

        assert_eq!(html, "3");
    }

    #[test]
    fn missing_load_json_fails() {
        let fx = Fixture::new();
        let text = "---\nload_json: nope.json\n---\nx";
        let path = fx.write("page.j2", text);

        let err = fx
            .engine()
            .render_html(
                source("page.j2", &path, text),
                &vars(""),
                &fx.links("page.j2", "page"),
            )
            .unwrap_err();

        assert!(matches!(err, ProcessError::LoadJsonNotFound(p) if p.ends_with("nope.json")));
    }

    #[test]
    fn invalid_load_json_fails() {
        let fx = Fixture::new();
        fx.write("bad.json", "{not json");
        fx.write("list.json", "[1, 2]");

        let text = "---\nload_json: bad.json\n---\nx";
        let path = fx.write("a.j2", text);
        let err = fx
            .engine()
            .render_html(
                source("a.j2", &path, text),
                &vars(""),
                &fx.links("a.j2", "a"),
            )
            .unwrap_err();
        assert!(matches!(err, ProcessError::LoadJsonInvalid { .. }));

        let text = "---\nload_json: list.json\n---\nx";
        let path = fx.write("b.j2", text);
        let err = fx
            .engine()
            .render_html(
                source("b.j2", &path, text),
                &vars(""),
                &fx.links("b.j2", "b"),
            )
            .unwrap_err();
        assert!(matches!(err, ProcessError::LoadJsonNotObject(_)));
    }

    #[test]
    fn redirect_skips_body_rendering() {
        let fx = Fixture::new();
        let text = "---\nredirect_url: /x\nload_json: missing.json\n---\n{{ this is not valid }}";
        let path = fx.write("old.html.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("old.html.j2", &path, text),
                &vars(""),
                &fx.links("old.html.j2", "old.html"),
            )
            .unwrap();

        assert!(html.contains(r#"<meta http-equiv="refresh" content="0; url=/x">"#));
        assert!(!html.contains("not valid"));
    }

    #[test]
    fn redirect_applies_to_markdown() {
        let fx = Fixture::new();
        let text = "---\nredirect_url: https://example.com/new\n---\n# Old page";
        let path = fx.write("old.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("old.md", &path, text),
                &vars(""),
                &fx.links("old.md", "old.html"),
            )
            .unwrap();

        assert!(html.contains(r#"href="https://example.com/new""#));
        assert!(!html.contains("<h1>"));
    }

    #[test]
    fn redirect_template_can_be_overridden() {
        let fx = Fixture::new();
        fx.write(".templates/redirect.html", "GO {{ redirect_url }} {{ title }}");
        let text = "---\nredirect_url: /x\ntitle: Moved\n---\n";
        let path = fx.write("old.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("old.md", &path, text),
                &vars(""),
                &fx.links("old.md", "old.html"),
            )
            .unwrap();

        assert_eq!(html, "GO /x Moved");
    }

    #[test]
    fn markdown_without_front_matter_renders_body_only() {
        let fx = Fixture::new();
        let text = "# Hello\n\nPlain *words*.";
        let path = fx.write("hello.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("hello.md", &path, text),
                &vars(""),
                &fx.links("hello.md", "hello.html"),
            )
            .unwrap();

        assert_eq!(html, "<h1>Hello</h1>\n<p>Plain <em>words</em>.</p>\n");
    }

    #[test]
    fn markdown_is_templated_before_conversion() {
        let fx = Fixture::new();
        let text = concat!(
            "---\nname: World\n---\n# Hello {{ name }}\n",
            "{% for i in range(2) %}- item {{ i }}\n{% endfor %}",
        );
        let path = fx.write("hello.md.j2", text);

        let html = fx
            .engine()
            .render_markdown(
                source("hello.md.j2", &path, text),
                &vars(""),
                &fx.links("hello.md.j2", "hello.html"),
            )
            .unwrap();

        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<li>item 0</li>"));
        assert!(html.contains("<li>item 1</li>"));
    }

    #[test]
    fn template_name_selects_wrapper() {
        let fx = Fixture::new();
        fx.write(
            ".templates/post.html",
            concat!(
                "<title>{{ title }}</title><base href=\"{{ path_to_root }}\">",
                "<main>{{ md_content }}</main>",
            ),
        );
        let text = "---\ntitle: Post\ntemplate_name: post\n---\nBody";
        let path = fx.write("blog/post.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("blog/post.md", &path, text),
                &vars("../"),
                &fx.links("blog/post.md", "blog/post.html"),
            )
            .unwrap();

        assert_eq!(
            html,
            "<title>Post</title><base href=\"../\"><main><p>Body</p>\n</main>"
        );
    }

    #[test]
    fn markdown_wrapper_can_be_overridden() {
        let fx = Fixture::new();
        fx.write(".templates/markdown.html", "<body>{{ md_content }}</body>");
        let text = "Hi";
        let path = fx.write("hi.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("hi.md", &path, text),
                &vars(""),
                &fx.links("hi.md", "hi.html"),
            )
            .unwrap();

        assert_eq!(html, "<body><p>Hi</p>\n</body>");
    }

    #[test]
    fn markdown_links_are_rewritten() {
        let fx = Fixture::new();
        fx.write("b.md", "");
        let text = "[next](b.md)";
        let path = fx.write("a.md", text);
        let links = LinkContext::new(
            &path,
            "a/index.html",
            &fx.root,
            OutputLayout::FilesAsDirectories,
        );

        let html = fx
            .engine()
            .render_markdown(source("a.md", &path, text), &vars("../"), &links)
            .unwrap();

        assert_eq!(html, "<p><a href=\"../b/\">next</a></p>\n");
    }

    #[test]
    fn markdown_filter_in_templates_rewrites_links() {
        let fx = Fixture::new();
        fx.write("b.md", "");
        let text = "{{ '[b](b.md)' | markdown }}";
        let path = fx.write("page.html.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("page.html.j2", &path, text),
                &vars(""),
                &fx.links("page.html.j2", "page.html"),
            )
            .unwrap();

        assert_eq!(html, "<p><a href=\"b.html\">b</a></p>\n");
    }

    #[test]
    fn markdown_filter_in_wrapper_rewrites_links() {
        let fx = Fixture::new();
        fx.write("b.md", "");
        fx.write(
            ".templates/markdown.html",
            "{{ md_content }}{{ '[b](b.md)' | markdown }}",
        );
        let text = "Hi";
        let path = fx.write("a.md", text);

        let html = fx
            .engine()
            .render_markdown(
                source("a.md", &path, text),
                &vars(""),
                &fx.links("a.md", "a.html"),
            )
            .unwrap();

        assert_eq!(html, "<p>Hi</p>\n<p><a href=\"b.html\">b</a></p>\n");
    }

    #[test]
    fn unknown_wrapper_is_a_template_error() {
        let fx = Fixture::new();
        let text = "---\ntemplate_name: nope\n---\nx";
        let path = fx.write("a.md", text);

        let err = fx
            .engine()
            .render_markdown(
                source("a.md", &path, text),
                &vars(""),
                &fx.links("a.md", "a.html"),
            )
            .unwrap_err();

        assert!(matches!(err, ProcessError::Template(_)));
    }

    #[test]
    fn template_syntax_errors_surface() {
        let fx = Fixture::new();
        let text = "{% if %}";
        let path = fx.write("broken.j2", text);

        let err = fx
            .engine()
            .render_html(
                source("broken.j2", &path, text),
                &vars(""),
                &fx.links("broken.j2", "broken"),
            )
            .unwrap_err();

        assert!(matches!(err, ProcessError::Template(_)));
    }

    #[test]
    fn templates_can_extend_overrides() {
        let fx = Fixture::new();
        fx.write(".templates/base.html", "[{% block body %}{% endblock %}]");
        let text = "{% extends \"base.html\" %}{% block body %}inner{% endblock %}";
        let path = fx.write("page.html.j2", text);

        let html = fx
            .engine()
            .render_html(
                source("page.html.j2", &path, text),
                &vars(""),
                &fx.links("page.html.j2", "page.html"),
            )
            .unwrap();

        assert_eq!(html, "[inner]");
    }

    #[test]
    fn loader_rejects_escaping_names() {
        let fx = Fixture::new();
        fx.write("secret.html", "nope");
        let dir = fx.root.join(".templates");

        assert!(load_template(Some(&dir), "../secret.html").unwrap().is_none());
        assert!(load_template(Some(&dir), MARKDOWN_TEMPLATE).unwrap().is_some());
    }

    #[test]
    fn layering_order() {
        let mut metadata = FrontMatter::new();
        metadata.insert("a", "fm");
        metadata.insert("b", "fm");
        let mut data = serde_json::Map::new();
        data.insert("b".into(), "json".into());

        let mut variables = vars("../");
        variables.insert("a".into(), Value::from("var"));
        variables.insert("c".into(), Value::from("var"));

        let context = layer_context(&variables, &metadata, Some(data));

        assert_eq!(context["a"].as_str(), Some("fm"));
        assert_eq!(context["b"].as_str(), Some("json"));
        assert_eq!(context["c"].as_str(), Some("var"));
        assert_eq!(context[PATH_TO_ROOT].as_str(), Some("../"));
    }
}
