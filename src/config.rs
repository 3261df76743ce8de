//! Template manifest handling.
//! A template directory may carry a kiln.json, kiln.yml or kiln.yaml file that
//! declares variable defaults, formatters and the stages to run.

use crate::constants::MANIFEST_FILES;
use crate::context::{Context, ContextValue, Formatter};
use crate::error::{Error, Result};
use crate::renderer::{MiniJinjaRenderer, Syntax};
use crate::transform::{RenderStage, ReplaceScope, ReplaceStage, Replacement, TransformerChain};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::Path;

/// Default value of a manifest variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VariableDefault {
    Bool(bool),
    String(String),
}

impl From<VariableDefault> for ContextValue {
    fn from(value: VariableDefault) -> Self {
        match value {
            VariableDefault::Bool(b) => ContextValue::Bool(b),
            VariableDefault::String(s) => ContextValue::String(s),
        }
    }
}

/// A literal token replaced after rendering.
///
/// Exactly one of `value` or `variable` must be given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestReplacement {
    pub token: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
}

impl ManifestReplacement {
    fn replacement(&self) -> Result<Replacement> {
        match (&self.value, &self.variable) {
            (Some(value), None) => Ok(Replacement::Literal(value.clone())),
            (None, Some(variable)) => Ok(Replacement::Variable(variable.clone())),
            _ => Err(Error::ConfigError(format!(
                "replacement of '{}' needs exactly one of 'value' or 'variable'",
                self.token
            ))),
        }
    }
}

/// Parsed template manifest. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub variables: IndexMap<String, VariableDefault>,
    #[serde(default)]
    pub formatters: IndexMap<String, Formatter>,
    #[serde(default)]
    pub replacements: Vec<ManifestReplacement>,
    #[serde(default)]
    pub template_suffix: Option<String>,
    #[serde(default)]
    pub syntax: Syntax,
    #[serde(default)]
    pub replace_scope: ReplaceScope,
}

impl Manifest {
    /// Builds the context from the manifest defaults, then applies `overrides`.
    ///
    /// The returned context is not frozen yet.
    pub fn context<I>(&self, overrides: I) -> Result<Context>
    where
        I: IntoIterator<Item = (String, ContextValue)>,
    {
        let mut context = Context::new();
        for (name, default) in &self.variables {
            context.set(name.as_str(), default.clone())?;
        }
        for (name, value) in overrides {
            debug!("Overriding variable '{name}'");
            context.set(name, value)?;
        }
        for (name, formatter) in &self.formatters {
            context.set(name.as_str(), *formatter)?;
        }
        Ok(context)
    }

    /// Builds the render stage followed by the literal replacements, in order.
    pub fn chain(&self) -> Result<TransformerChain> {
        let renderer = MiniJinjaRenderer::with_syntax(self.syntax)?;
        let render = match &self.template_suffix {
            Some(suffix) => RenderStage::new(renderer).with_suffix(suffix.as_str()),
            None => RenderStage::new(renderer),
        };

        let mut chain = TransformerChain::new().stage(render);
        for replacement in &self.replacements {
            let stage = ReplaceStage::with_replacement(
                replacement.token.as_str(),
                replacement.replacement()?,
            )?
            .with_scope(self.replace_scope);
            chain = chain.stage(stage);
        }
        Ok(chain)
    }
}

/// Parses manifest content, choosing the format from the file name.
pub fn parse_manifest(file_name: &str, content: &str) -> Result<Manifest> {
    let parsed = if file_name.ends_with(".json") {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| Error::ConfigParseError { path: file_name.to_string(), message })
}

/// Loads the manifest of a template directory, trying each supported file name.
///
/// Returns the default manifest when the directory has none.
pub fn load_manifest<P: AsRef<Path>>(template_dir: P) -> Result<Manifest> {
    for file in MANIFEST_FILES {
        let manifest_path = template_dir.as_ref().join(file);
        if manifest_path.exists() {
            debug!("Loading manifest from {}", manifest_path.display());
            let content = std::fs::read_to_string(&manifest_path)?;
            return parse_manifest(file, &content);
        }
    }
    debug!("No manifest found (tried: {})", MANIFEST_FILES.join(", "));
    Ok(Manifest::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TemplateEntry;
    use tempfile::TempDir;

    const YAML: &str = r#"
variables:
  AppName: mars
  withTests: true
formatters:
  title: title
replacements:
  - token: "{{appName}}"
    variable: AppName
  - token: "@@year@@"
    value: "2026"
template_suffix: .plush
syntax: erb
replace_scope: both
"#;

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = parse_manifest("kiln.yaml", YAML).unwrap();
        assert_eq!(manifest.variables.get("AppName"), Some(&VariableDefault::String("mars".into())));
        assert_eq!(manifest.variables.get("withTests"), Some(&VariableDefault::Bool(true)));
        assert_eq!(manifest.formatters.get("title"), Some(&Formatter::Title));
        assert_eq!(manifest.syntax, Syntax::Erb);
        assert_eq!(manifest.template_suffix.as_deref(), Some(".plush"));
        assert_eq!(manifest.replacements.len(), 2);
    }

    #[test]
    fn test_parse_json_manifest() {
        let manifest =
            parse_manifest("kiln.json", r#"{"variables": {"AppName": "mars"}}"#).unwrap();
        assert_eq!(manifest.syntax, Syntax::Jinja);
        assert_eq!(manifest.replace_scope, ReplaceScope::Both);
        assert!(manifest.replacements.is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = parse_manifest("kiln.yaml", "questions: {}\n");
        assert!(matches!(result, Err(Error::ConfigParseError { .. })));
    }

    #[test]
    fn test_context_overrides_defaults() {
        let manifest = parse_manifest("kiln.yaml", YAML).unwrap();
        let context = manifest
            .context([("AppName".to_string(), ContextValue::from("venus"))])
            .unwrap();

        assert_eq!(context.get_str("AppName").unwrap(), "venus");
        assert_eq!(context.get("withTests").unwrap(), &ContextValue::Bool(true));
        assert_eq!(context.get("title").unwrap(), &ContextValue::Formatter(Formatter::Title));
        assert!(!context.is_frozen());
    }

    #[test]
    fn test_chain_from_manifest() {
        let manifest = parse_manifest("kiln.yaml", YAML).unwrap();
        let chain = manifest.chain().unwrap();
        assert_eq!(chain.stage_names(), vec!["render", "replace '{{appName}}'", "replace '@@year@@'"]);

        let mut context = manifest.context([]).unwrap();
        context.freeze();
        let entry = TemplateEntry::new(
            "cmd/{{appName}}d/main.go.plush",
            "// <%= title(AppName) %> @@year@@\n",
        );
        let result = chain.apply(entry, &context).unwrap();
        assert_eq!(result, TemplateEntry::new("cmd/marsd/main.go", "// Mars 2026\n"));
    }

    #[test]
    fn test_invalid_replacement() {
        let manifest = parse_manifest(
            "kiln.yaml",
            "replacements:\n  - token: x\n    value: a\n    variable: b\n",
        )
        .unwrap();
        assert!(matches!(manifest.chain(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_load_manifest() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(load_manifest(temp_dir.path()).unwrap(), Manifest::default());

        std::fs::write(temp_dir.path().join("kiln.yml"), "syntax: erb\n").unwrap();
        assert_eq!(load_manifest(temp_dir.path()).unwrap().syntax, Syntax::Erb);
    }
}
