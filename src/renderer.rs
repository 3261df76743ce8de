//! Template expression rendering.
//!
//! The transformer chain depends on the [`TemplateRenderer`] trait only; the
//! expression language itself is provided by MiniJinja.
use crate::context::Context;
use crate::error::{Error, Result};
use log::debug;
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::Deserialize;

/// Trait for template rendering engines.
pub trait TemplateRenderer: Send + Sync {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `context` - Variable bindings for rendering
    ///
    /// # Errors
    /// * `Error::TemplateSyntaxError` if the template cannot be parsed
    /// * `Error::UnresolvedVariable` if it references a name absent from `context`
    fn render(&self, template: &str, context: &Context) -> Result<String>;
}

/// Delimiter flavour understood by [`MiniJinjaRenderer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// `{{ expr }}`, `{% block %}`, `{# comment #}`
    #[default]
    Jinja,
    /// `<%= expr %>`, `<% block %>`, `<%# comment %>`
    Erb,
}

impl Syntax {
    fn config(self) -> Result<Option<SyntaxConfig>> {
        match self {
            Syntax::Jinja => Ok(None),
            Syntax::Erb => SyntaxConfig::builder()
                .block_delimiters("<%", "%>")
                .variable_delimiters("<%=", "%>")
                .comment_delimiters("<%#", "%>")
                .build()
                .map(Some)
                .map_err(|e| Error::ConfigError(e.to_string())),
        }
    }
}

/// MiniJinja-based template rendering engine.
///
/// Undefined variables are errors, and a trailing newline in the template is
/// kept in the output.
#[derive(Clone)]
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer using the default Jinja delimiters.
    pub fn new() -> Self {
        Self { env: Self::base_environment() }
    }

    /// Creates a renderer using the given delimiter flavour.
    pub fn with_syntax(syntax: Syntax) -> Result<Self> {
        let mut env = Self::base_environment();
        if let Some(config) = syntax.config()? {
            env.set_syntax(config);
        }
        Ok(Self { env })
    }

    fn base_environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the name the failing template references but neither the context
/// nor the engine provides, preferring the one that appears first in the source.
fn missing_variable(
    template: &str,
    undeclared: impl IntoIterator<Item = String>,
    context: &Context,
    is_global: impl Fn(&str) -> bool,
) -> Option<String> {
    undeclared
        .into_iter()
        .filter(|name| !context.contains(name) && !is_global(name))
        .min_by_key(|name| (template.find(name.as_str()).unwrap_or(usize::MAX), name.clone()))
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        let mut env = self.env.clone();
        for (name, formatter) in context.formatters() {
            env.add_filter(name.to_string(), move |value: String| formatter.apply(&value));
            env.add_function(name.to_string(), move |value: String| formatter.apply(&value));
        }

        env.add_template_owned("temp", template.to_string()).map_err(|e| match e.kind() {
            ErrorKind::SyntaxError => Error::TemplateSyntaxError { message: e.to_string() },
            _ => Error::RenderError(e.to_string()),
        })?;
        let tmpl = env.get_template("temp").map_err(|e| Error::RenderError(e.to_string()))?;

        tmpl.render(context.to_json()).map_err(|e| match e.kind() {
            ErrorKind::UndefinedError => {
                debug!("Undefined value while rendering: {e}");
                let undeclared = tmpl.undeclared_variables(false);
                let is_global = |name: &str| env.globals().any(|(global, _)| global == name);
                match missing_variable(template, undeclared, context, is_global) {
                    Some(name) => Error::UnresolvedVariable { name },
                    None => Error::RenderError(e.to_string()),
                }
            }
            ErrorKind::SyntaxError => Error::TemplateSyntaxError { message: e.to_string() },
            _ => Error::RenderError(e.to_string()),
        })
    }
}
