use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use kiln_core::render::{RenderContext, RenderError, Renderer};
use serde_json::Value;

/// Loads component templates from a directory and fills `{{ key }}`
/// placeholders from the render context.
///
/// String values are HTML-escaped, other values are written as JSON text
/// and unknown keys render as nothing. There are no loops, conditionals or
/// filters.
pub struct FileRenderer {
    root: PathBuf,
}

impl FileRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory templates are loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Renderer for FileRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError> {
        // only plain relative paths below the root
        let relative = Path::new(template);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(RenderError::TemplateNotFound(template.to_string()));
        }

        let path = self.root.join(relative);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound(template.to_string()));
            }
            Err(e) => {
                return Err(RenderError::Failed(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(substitute(&source, context))
    }
}

/// Replace every `{{ key }}` in `source`. An unterminated `{{` is copied
/// through as is.
pub fn substitute(source: &str, context: &RenderContext) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after[..end].trim();
        match context.get(key) {
            Some(Value::String(s)) => push_escaped(&mut out, s),
            Some(other) => push_escaped(&mut out, &other.to_string()),
            None => {}
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
