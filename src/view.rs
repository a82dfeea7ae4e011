//! HTML views read from a directory.
//!
//! Deliberately not a template engine: a view is `<dir>/<name>.html` with
//! `{{ key }}` placeholders filled from a [`Payload`]. String values are
//! inserted as text, anything else as compact JSON; both are HTML-escaped.
//! Unknown placeholders render as the empty string.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Error;
use crate::payload::Payload;
use crate::response::Response;

/// Renders named views into `200 OK` HTML responses.
#[derive(Clone, Debug)]
pub struct View {
    dir: PathBuf,
}

impl View {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn make(&self, name: &str, params: &Payload) -> Result<Response, Error> {
        let path = self.dir.join(format!("{name}.html"));
        let template = fs::read_to_string(&path).map_err(|source| Error::View { path, source })?;
        Ok(Response::html(render(&template, params)))
    }
}

fn render(template: &str, params: &Payload) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else { break };
        out.push_str(&rest[..start]);

        let key = rest[start + 2..start + len].trim();
        match params.get(key) {
            Some(Value::String(s)) => out.push_str(&escape(s)),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&escape(&other.to_string())),
        }
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders() {
        let params = Payload::new().with("name", "<ada>").with("count", 3);
        assert_eq!(
            render("hi {{ name }}, {{count}} left{{ missing }}.", &params),
            "hi &lt;ada&gt;, 3 left."
        );
    }

    #[test]
    fn leaves_unterminated_braces_alone() {
        assert_eq!(render("a {{ b", &Payload::new()), "a {{ b");
    }

    #[test]
    fn reads_views_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.html"), "<p>{{ who }}</p>").unwrap();

        let view = View::new(dir.path());
        let response = view.make("hello", &Payload::new().with("who", "you")).unwrap();
        assert_eq!(response.body(), b"<p>you</p>");
        assert!(matches!(view.make("absent", &Payload::new()), Err(Error::View { .. })));
    }
}
