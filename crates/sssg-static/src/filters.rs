//! Built-in template filters.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use minijinja::value::{Object, Value};
use minijinja::{Environment, Error, ErrorKind, State};
use sssg_markdown::{LinkContext, MarkdownRenderer};

/// Context key holding the link context of the file being rendered.
pub(crate) const LINKS_KEY: &str = "__sssg_links";

#[derive(Debug)]
struct CurrentLinks(LinkContext);

impl Object for CurrentLinks {}

/// Wrap `links` for insertion under [`LINKS_KEY`].
pub(crate) fn links_value(links: &LinkContext) -> Value {
    Value::from_object(CurrentLinks(links.clone()))
}

/// Register the built-in filters on `env`.
///
/// `markdown` converts text with `renderer`, rewriting links relative to
/// the file being rendered when the context carries [`LINKS_KEY`].
pub fn register(env: &mut Environment<'static>, renderer: &MarkdownRenderer) {
    let renderer = renderer.clone();
    env.add_filter("markdown", move |state: &State, text: String| {
        let current = state.lookup(LINKS_KEY);
        let links = current
            .as_ref()
            .and_then(|value| value.downcast_object_ref::<CurrentLinks>())
            .map(|current| &current.0);
        Value::from_safe_string(renderer.render(&text, links))
    });

    env.add_filter("b64encode", b64encode);
    env.add_filter("b64decode", b64decode);
    env.add_filter("urlsafe_b64encode", urlsafe_b64encode);
    env.add_filter("urlsafe_b64decode", urlsafe_b64decode);
}

pub fn b64encode(text: String) -> String {
    STANDARD.encode(text)
}

pub fn b64decode(text: String) -> Result<String, Error> {
    decode_utf8(&STANDARD, &text)
}

pub fn urlsafe_b64encode(text: String) -> String {
    URL_SAFE.encode(text)
}

pub fn urlsafe_b64decode(text: String) -> Result<String, Error> {
    decode_utf8(&URL_SAFE, &text)
}

fn decode_utf8(engine: &impl base64::Engine, text: &str) -> Result<String, Error> {
    let bytes = engine.decode(text).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, "invalid base64 input").with_source(e)
    })?;

    String::from_utf8(bytes).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, "decoded base64 is not UTF-8").with_source(e)
    })
}
