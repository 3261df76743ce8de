//! The ordered rewrite pipeline applied to every template entry.
//!
//! A [`TransformerChain`] is a fixed sequence of [`Stage`]s. Each stage takes
//! an entry and the shared context and returns the rewritten entry; stages
//! are pure, so the same input always produces the same output.

use log::debug;
use regex::bytes::{NoExpand, Regex};
use serde::Deserialize;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::loader::TemplateEntry;
use crate::renderer::TemplateRenderer;

/// One rewrite step of a [`TransformerChain`].
pub trait Stage: Send + Sync {
    /// Name used when reporting failures.
    fn name(&self) -> &str;

    /// Rewrites the entry's path and content.
    fn apply(&self, entry: TemplateEntry, context: &Context) -> Result<TemplateEntry>;
}

/// Evaluates template expressions in an entry's path and content.
pub struct RenderStage {
    renderer: Box<dyn TemplateRenderer>,
    suffix: Option<String>,
}

impl RenderStage {
    pub fn new<R: TemplateRenderer + 'static>(renderer: R) -> Self {
        Self { renderer: Box::new(renderer), suffix: None }
    }

    /// Restricts content rendering to files whose name ends with `suffix`.
    ///
    /// The suffix is stripped from the output path of those files. Files
    /// without it keep their content as is; their path is still rendered.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Strips the template suffix from a rendered path, returning whether the
    /// content of that entry should be rendered.
    fn strip_suffix(&self, path: String) -> (String, bool) {
        let Some(suffix) = self.suffix.as_deref() else {
            return (path, true);
        };
        let file_name = path.rsplit('/').next().unwrap_or_default();
        if file_name.len() > suffix.len() && file_name.ends_with(suffix) {
            let stripped = path[..path.len() - suffix.len()].to_string();
            (stripped, true)
        } else {
            (path, false)
        }
    }
}

impl Stage for RenderStage {
    fn name(&self) -> &str {
        "render"
    }

    fn apply(&self, entry: TemplateEntry, context: &Context) -> Result<TemplateEntry> {
        let rendered_path = self.renderer.render(&entry.path, context)?;
        let (path, render_content) = self.strip_suffix(rendered_path);

        let rendered = match entry.text() {
            Some(text) if render_content => Some(self.renderer.render(text, context)?),
            None if render_content => {
                debug!("Not rendering binary content of '{}'", entry.path);
                None
            }
            _ => None,
        };
        let content = rendered.map(String::into_bytes).unwrap_or(entry.content);

        Ok(TemplateEntry { path, content })
    }
}

/// Which parts of an entry a [`ReplaceStage`] rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceScope {
    Path,
    Content,
    #[default]
    Both,
}

/// Where a [`ReplaceStage`] takes its replacement text from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Literal(String),
    /// A string variable, looked up in the context when the stage runs.
    Variable(String),
}

/// Fixed find/replace of a literal token, outside any expression syntax.
pub struct ReplaceStage {
    name: String,
    token: String,
    replacement: Replacement,
    pattern: Regex,
    scope: ReplaceScope,
}

impl ReplaceStage {
    /// Replaces `token` with fixed text.
    ///
    /// # Errors
    /// * `Error::ConfigError` if `token` is empty
    pub fn new(token: impl Into<String>, replacement: impl Into<String>) -> Result<Self> {
        Self::with_replacement(token, Replacement::Literal(replacement.into()))
    }

    /// Replaces `token` with the value of a context variable.
    pub fn from_variable(token: impl Into<String>, variable: impl Into<String>) -> Result<Self> {
        Self::with_replacement(token, Replacement::Variable(variable.into()))
    }

    pub fn with_replacement(token: impl Into<String>, replacement: Replacement) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::ConfigError("replacement token cannot be empty".to_string()));
        }
        let pattern = Regex::new(&regex::escape(&token))?;
        Ok(Self {
            name: format!("replace '{token}'"),
            token,
            replacement,
            pattern,
            scope: ReplaceScope::default(),
        })
    }

    pub fn with_scope(mut self, scope: ReplaceScope) -> Self {
        self.scope = scope;
        self
    }
}

impl Stage for ReplaceStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, entry: TemplateEntry, context: &Context) -> Result<TemplateEntry> {
        let replacement = match &self.replacement {
            Replacement::Literal(text) => text.as_str(),
            Replacement::Variable(name) => context.get_str(name)?,
        };

        let TemplateEntry { mut path, mut content } = entry;
        if matches!(self.scope, ReplaceScope::Path | ReplaceScope::Both) {
            path = path.replace(&self.token, replacement);
        }
        if matches!(self.scope, ReplaceScope::Content | ReplaceScope::Both) {
            content = self
                .pattern
                .replace_all(&content, NoExpand(replacement.as_bytes()))
                .into_owned();
        }
        Ok(TemplateEntry { path, content })
    }
}

/// A stage failure, tagged with the stage that raised it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub error: Error,
}

/// Ordered sequence of stages, fixed at construction.
#[derive(Default)]
pub struct TransformerChain {
    stages: Vec<Box<dyn Stage>>,
}

impl TransformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Appends every stage of `other`, keeping their order.
    pub fn extend(&mut self, other: TransformerChain) {
        self.stages.extend(other.stages);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Threads an entry through every stage, left to right.
    pub fn apply(
        &self,
        entry: TemplateEntry,
        context: &Context,
    ) -> std::result::Result<TemplateEntry, StageFailure> {
        self.stages.iter().try_fold(entry, |entry, stage| {
            stage.apply(entry, context).map_err(|error| StageFailure {
                stage: stage.name().to_string(),
                error,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MiniJinjaRenderer;

    fn context() -> Context {
        let mut ctx = Context::new();
        ctx.set("AppName", "foo").unwrap();
        ctx.freeze();
        ctx
    }

    #[test]
    fn test_render_stage_renders_path_and_content() {
        let stage = RenderStage::new(MiniJinjaRenderer::new());
        let entry = TemplateEntry::new("{{AppName}}/main.go", "package {{ AppName }}\n");

        let result = stage.apply(entry, &context()).unwrap();
        assert_eq!(result, TemplateEntry::new("foo/main.go", "package foo\n"));
    }

    #[test]
    fn test_render_stage_suffix() {
        let stage = RenderStage::new(MiniJinjaRenderer::new()).with_suffix(".j2");
        let ctx = context();

        let templated = stage
            .apply(TemplateEntry::new("{{AppName}}.txt.j2", "{{ AppName }}"), &ctx)
            .unwrap();
        assert_eq!(templated, TemplateEntry::new("foo.txt", "foo"));

        let plain = stage.apply(TemplateEntry::new("raw.txt", "{{ AppName }}"), &ctx).unwrap();
        assert_eq!(plain, TemplateEntry::new("raw.txt", "{{ AppName }}"));

        let bare = stage.apply(TemplateEntry::new("dir/.j2", "x"), &ctx).unwrap();
        assert_eq!(bare.path, "dir/.j2");
    }

    #[test]
    fn test_render_stage_passes_binary_content() {
        let stage = RenderStage::new(MiniJinjaRenderer::new());
        let bytes = vec![0x89, 0x50, 0x4e, 0x47, 0xff];
        let result = stage
            .apply(TemplateEntry::new("{{AppName}}.png", bytes.clone()), &context())
            .unwrap();
        assert_eq!(result, TemplateEntry::new("foo.png", bytes));
    }

    #[test]
    fn test_replace_stage_scopes() {
        let ctx = context();
        let entry = || TemplateEntry::new("cmd/{{appName}}d/main.go", "name: {{appName}}, $1");

        let both = ReplaceStage::new("{{appName}}", "foo$1").unwrap();
        assert_eq!(
            both.apply(entry(), &ctx).unwrap(),
            TemplateEntry::new("cmd/foo$1d/main.go", "name: foo$1, $1")
        );

        let path_only = ReplaceStage::new("{{appName}}", "foo").unwrap().with_scope(ReplaceScope::Path);
        assert_eq!(
            path_only.apply(entry(), &ctx).unwrap(),
            TemplateEntry::new("cmd/food/main.go", "name: {{appName}}, $1")
        );

        assert!(ReplaceStage::new("", "x").is_err());
    }

    #[test]
    fn test_replace_stage_from_variable() {
        let stage = ReplaceStage::from_variable("{{appName}}", "AppName").unwrap();
        let result = stage.apply(TemplateEntry::new("{{appName}}.go", ""), &context()).unwrap();
        assert_eq!(result.path, "foo.go");

        let missing = ReplaceStage::from_variable("{{x}}", "Missing").unwrap();
        assert!(matches!(
            missing.apply(TemplateEntry::new("a", ""), &context()),
            Err(Error::UndefinedVariable { name }) if name == "Missing"
        ));
    }

    #[test]
    fn test_chain_order_and_failure_attribution() {
        let chain = TransformerChain::new()
            .stage(RenderStage::new(MiniJinjaRenderer::new()))
            .stage(ReplaceStage::new("foo", "bar").unwrap());
        assert_eq!(chain.stage_names(), vec!["render", "replace 'foo'"]);

        let ok = chain.apply(TemplateEntry::new("{{ AppName }}.md", "{{ AppName }}"), &context());
        assert_eq!(ok.unwrap(), TemplateEntry::new("bar.md", "bar"));

        let failure = chain
            .apply(TemplateEntry::new("x.md", "{{ Missing }}"), &context())
            .unwrap_err();
        assert_eq!(failure.stage, "render");
        assert!(matches!(failure.error, Error::UnresolvedVariable { name } if name == "Missing"));
    }
}
