//! Template engine for code generation using Handlebars.
//!
//! Wraps Handlebars with the built-in Python templates pre-registered.
//! Strict mode is on, so a context that misses a variable fails the render
//! instead of silently emitting nothing.

use handlebars::Handlebars;
use protomcp_core::{Error, Result};
use serde::Serialize;

/// Template engine with the built-in templates registered.
#[derive(Debug)]
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl TemplateEngine<'_> {
    /// Creates the engine and registers all built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if a built-in template fails to parse,
    /// which indicates a packaging bug rather than bad input.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Fail on missing variables instead of rendering empty strings.
        handlebars.set_strict_mode(true);

        register(&mut handlebars, "file", include_str!("../templates/file.py.hbs"))?;
        register(&mut handlebars, "factory", include_str!("../templates/factory.py.hbs"))?;
        register(&mut handlebars, "tool", include_str!("../templates/tool.py.hbs"))?;

        Ok(Self { handlebars })
    }

    /// Renders a registered template with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] when rendering fails.
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| Error::Template {
                message: format!("failed to render template '{name}'"),
                source: Some(Box::new(e)),
            })
    }
}

fn register(handlebars: &mut Handlebars<'_>, name: &str, template: &str) -> Result<()> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| Error::Template {
            message: format!("failed to register template '{name}'"),
            source: Some(Box::new(e)),
        })
}
