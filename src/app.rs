//! Built-in application scaffold.
//!
//! Generates a new blockchain application source tree from the embedded
//! `templates/app` bundle, parameterized by the application's module path.

use crate::context::{Context, Formatter};
use crate::error::{Error, Result};
use crate::loader::EmbeddedSource;
use crate::pipeline::Pipeline;
use crate::renderer::{MiniJinjaRenderer, Syntax};
use crate::transform::{RenderStage, ReplaceScope, ReplaceStage};

/// Suffix marking the bundle files whose content is rendered.
pub const TEMPLATE_SUFFIX: &str = ".plush";

/// Address prefix used when none is given.
pub const DEFAULT_ADDRESS_PREFIX: &str = "cosmos";

/// Variables of the application scaffold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppOptions {
    pub module_path: String,
    pub app_name: String,
    pub owner_name: String,
    pub owner_and_repo_name: String,
    pub binary_name_prefix: String,
    pub address_prefix: String,
}

impl AppOptions {
    /// Derives the options from a module path such as `github.com/alice/mars`.
    ///
    /// The application name is the last path element, reduced to lower-case
    /// letters and digits; the owner is the element before it.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the module path has an empty element or yields
    ///   an empty application name
    pub fn from_module_path(module_path: &str, address_prefix: Option<&str>) -> Result<Self> {
        let elements: Vec<&str> = module_path.trim_end_matches('/').split('/').collect();
        if elements.iter().any(|e| e.is_empty()) {
            return Err(Error::ConfigError(format!("invalid module path '{module_path}'")));
        }

        let repo = elements[elements.len() - 1];
        let owner = if elements.len() >= 2 { elements[elements.len() - 2] } else { repo };
        let app_name: String = repo
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if app_name.is_empty() {
            return Err(Error::ConfigError(format!(
                "module path '{module_path}' does not yield an application name"
            )));
        }

        Ok(Self {
            module_path: module_path.trim_end_matches('/').to_string(),
            owner_and_repo_name: if elements.len() >= 2 {
                format!("{owner}/{repo}")
            } else {
                repo.to_string()
            },
            owner_name: owner.to_string(),
            binary_name_prefix: app_name.clone(),
            app_name,
            address_prefix: address_prefix.unwrap_or(DEFAULT_ADDRESS_PREFIX).to_string(),
        })
    }

    /// The variable bindings of the scaffold, not yet frozen.
    pub fn context(&self) -> Result<Context> {
        let mut context = Context::new();
        context.set("ModulePath", self.module_path.as_str())?;
        context.set("AppName", self.app_name.as_str())?;
        context.set("OwnerAndRepoName", self.owner_and_repo_name.as_str())?;
        context.set("OwnerName", self.owner_name.as_str())?;
        context.set("BinaryNamePrefix", self.binary_name_prefix.as_str())?;
        context.set("AddressPrefix", self.address_prefix.as_str())?;
        context.set("title", Formatter::Title)?;
        // Used for proto package names.
        context.set("formatOwnerName", Formatter::FormatUsername)?;
        Ok(context)
    }
}

/// The embedded application template bundle.
pub fn bundle() -> EmbeddedSource {
    crate::embedded_bundle!("app", "../templates/app" => [
        ".gitignore",
        "app/app.go.plush",
        "cmd/{{binaryNamePrefix}}d/main.go.plush",
        "go.mod.plush",
        "proto/{{appName}}/genesis.proto.plush",
        "readme.md.plush",
        "testutil/network/network.go.plush",
    ])
}

/// Assembles the application scaffold pipeline.
///
/// Content is rendered with `<%= %>` delimiters, so the `{{appName}}` and
/// `{{binaryNamePrefix}}` markers in file names survive rendering and are
/// replaced afterwards.
pub fn pipeline(options: &AppOptions) -> Result<Pipeline> {
    let renderer = MiniJinjaRenderer::with_syntax(Syntax::Erb)?;
    Pipeline::builder()
        .source(bundle())
        .context(options.context()?)
        .stage(RenderStage::new(renderer).with_suffix(TEMPLATE_SUFFIX))
        .stage(
            ReplaceStage::from_variable("{{appName}}", "AppName")?.with_scope(ReplaceScope::Path),
        )
        .stage(
            ReplaceStage::from_variable("{{binaryNamePrefix}}", "BinaryNamePrefix")?
                .with_scope(ReplaceScope::Path),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_module_path() {
        let options = AppOptions::from_module_path("github.com/alice/Mars-Chain", None).unwrap();
        assert_eq!(
            options,
            AppOptions {
                module_path: "github.com/alice/Mars-Chain".to_string(),
                app_name: "marschain".to_string(),
                owner_name: "alice".to_string(),
                owner_and_repo_name: "alice/Mars-Chain".to_string(),
                binary_name_prefix: "marschain".to_string(),
                address_prefix: "cosmos".to_string(),
            }
        );
    }

    #[test]
    fn test_from_single_element_module_path() {
        let options = AppOptions::from_module_path("mars", Some("mars")).unwrap();
        assert_eq!(options.owner_name, "mars");
        assert_eq!(options.owner_and_repo_name, "mars");
        assert_eq!(options.address_prefix, "mars");
    }

    #[test]
    fn test_invalid_module_paths() {
        for path in ["", "github.com//mars", "github.com/alice/---"] {
            assert!(AppOptions::from_module_path(path, None).is_err(), "{path:?}");
        }
    }

    #[test]
    fn test_bundle_lists_every_file() {
        use crate::loader::AssetSource;
        let paths: Vec<String> = bundle().list().map(|e| e.unwrap().path).collect();
        assert_eq!(paths.len(), 7);
        assert!(paths.contains(&"go.mod.plush".to_string()));
    }
}
