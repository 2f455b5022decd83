use serde_json::{Map, Value};
use thiserror::Error;

/// Values visible to a component template.
pub type RenderContext = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("{0}")]
    Failed(String),
}

/// The template engine, seen from the runtime: a template path plus a
/// context in, HTML out.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &RenderContext) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, RenderError> {
        self(template, context)
    }
}
