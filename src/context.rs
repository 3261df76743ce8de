//! Variable bindings shared by every stage of a generation run.
//!
//! A [`Context`] is assembled once, frozen, and then only read. Besides plain
//! scalars it can bind a name to a [`Formatter`], a closed set of pure string
//! helpers that renderers expose to templates.

use crate::error::{Error, Result};
use cruet::case::{
    camel::to_camel_case, kebab::to_kebab_case, pascal::to_pascal_case,
    screaming_snake::to_screaming_snake_case, snake::to_snake_case,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named pure string helpers that can be bound into a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatter {
    /// Upper-cases the first letter of every word; punctuation separates words.
    Title,
    Lower,
    Upper,
    SnakeCase,
    CamelCase,
    PascalCase,
    KebabCase,
    ScreamingSnakeCase,
    /// Removes every `-`.
    NoDash,
    /// Lower-cases and removes dashes, for use in package names.
    FormatUsername,
}

impl Formatter {
    pub const ALL: [Formatter; 10] = [
        Formatter::Title,
        Formatter::Lower,
        Formatter::Upper,
        Formatter::SnakeCase,
        Formatter::CamelCase,
        Formatter::PascalCase,
        Formatter::KebabCase,
        Formatter::ScreamingSnakeCase,
        Formatter::NoDash,
        Formatter::FormatUsername,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Formatter::Title => "title",
            Formatter::Lower => "lower",
            Formatter::Upper => "upper",
            Formatter::SnakeCase => "snake_case",
            Formatter::CamelCase => "camel_case",
            Formatter::PascalCase => "pascal_case",
            Formatter::KebabCase => "kebab_case",
            Formatter::ScreamingSnakeCase => "screaming_snake_case",
            Formatter::NoDash => "no_dash",
            Formatter::FormatUsername => "format_username",
        }
    }

    pub fn apply(&self, input: &str) -> String {
        match self {
            Formatter::Title => title(input),
            Formatter::Lower => input.to_lowercase(),
            Formatter::Upper => input.to_uppercase(),
            Formatter::SnakeCase => to_snake_case(input),
            Formatter::CamelCase => to_camel_case(input),
            Formatter::PascalCase => to_pascal_case(input),
            Formatter::KebabCase => to_kebab_case(input),
            Formatter::ScreamingSnakeCase => to_screaming_snake_case(input),
            Formatter::NoDash => input.replace('-', ""),
            Formatter::FormatUsername => input.replace('-', "").to_lowercase(),
        }
    }
}

impl FromStr for Formatter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Formatter::ALL
            .into_iter()
            .find(|f| f.id() == s)
            .ok_or_else(|| Error::ConfigError(format!("unknown formatter '{s}'")))
    }
}

/// Upper-cases the first letter of every word. Any character other than a
/// letter, digit or `_` separates words.
fn title(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for ch in input.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}

/// A value bound to a context name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    String(String),
    Bool(bool),
    Formatter(Formatter),
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<Formatter> for ContextValue {
    fn from(value: Formatter) -> Self {
        ContextValue::Formatter(value)
    }
}

/// Variable bindings for one generation run.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: IndexMap<String, ContextValue>,
    frozen: bool,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, replacing any previous binding.
    ///
    /// # Errors
    /// * `Error::FrozenContext` once the context has been frozen
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) -> Result<()> {
        let name = name.into();
        if self.frozen {
            return Err(Error::FrozenContext { name });
        }
        self.values.insert(name, value.into());
        Ok(())
    }

    /// # Errors
    /// * `Error::UndefinedVariable` if `name` was never set
    pub fn get(&self, name: &str) -> Result<&ContextValue> {
        self.values
            .get(name)
            .ok_or_else(|| Error::UndefinedVariable { name: name.to_string() })
    }

    /// Looks up a string binding.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.get(name)? {
            ContextValue::String(s) => Ok(s),
            other => Err(Error::ConfigError(format!(
                "variable '{name}' is not a string: {other:?}"
            ))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Ends the assembly phase. Every later `set` fails.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Bound formatters, in binding order.
    pub fn formatters(&self) -> impl Iterator<Item = (&str, Formatter)> + '_ {
        self.values.iter().filter_map(|(name, value)| match value {
            ContextValue::Formatter(f) => Some((name.as_str(), *f)),
            _ => None,
        })
    }

    /// Scalar bindings as a JSON object, for handing to a rendering engine.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .values
            .iter()
            .filter_map(|(name, value)| {
                let value = match value {
                    ContextValue::String(s) => serde_json::Value::String(s.clone()),
                    ContextValue::Bool(b) => serde_json::Value::Bool(*b),
                    ContextValue::Formatter(_) => return None,
                };
                Some((name.clone(), value))
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = Context::new();
        ctx.set("AppName", "mars").unwrap();
        ctx.set("withTests", true).unwrap();

        assert_eq!(ctx.get("AppName").unwrap(), &ContextValue::from("mars"));
        assert_eq!(ctx.get_str("AppName").unwrap(), "mars");
        assert!(matches!(
            ctx.get("Missing"),
            Err(Error::UndefinedVariable { name }) if name == "Missing"
        ));
    }

    #[test]
    fn test_frozen_context_rejects_writes() {
        let mut ctx = Context::new();
        ctx.set("AppName", "mars").unwrap();
        ctx.freeze();

        assert!(ctx.is_frozen());
        assert!(matches!(
            ctx.set("AppName", "venus"),
            Err(Error::FrozenContext { name }) if name == "AppName"
        ));
        assert_eq!(ctx.get_str("AppName").unwrap(), "mars");
    }

    #[test]
    fn test_to_json_skips_formatters() {
        let mut ctx = Context::new();
        ctx.set("AppName", "mars").unwrap();
        ctx.set("title", Formatter::Title).unwrap();
        ctx.set("debug", false).unwrap();

        assert_eq!(ctx.to_json(), json!({"AppName": "mars", "debug": false}));
        let formatters: Vec<_> = ctx.formatters().collect();
        assert_eq!(formatters, vec![("title", Formatter::Title)]);
    }

    #[test]
    fn test_formatters() {
        assert_eq!(Formatter::Title.apply("hello big world"), "Hello Big World");
        assert_eq!(Formatter::Title.apply("mars-chain"), "Mars-Chain");
        assert_eq!(Formatter::Title.apply("github.com/alice"), "Github.Com/Alice");
        assert_eq!(Formatter::Title.apply("snake_case v2x"), "Snake_case V2x");
        assert_eq!(Formatter::FormatUsername.apply("Alice-Smith"), "alicesmith");
        assert_eq!(Formatter::NoDash.apply("a-b-c"), "abc");
        assert_eq!(Formatter::SnakeCase.apply("FooBar"), "foo_bar");
        assert_eq!(Formatter::PascalCase.apply("foo_bar"), "FooBar");
        assert_eq!(Formatter::KebabCase.apply("FooBar"), "foo-bar");
        assert_eq!("pascal_case".parse::<Formatter>().unwrap(), Formatter::PascalCase);
        assert!("shout".parse::<Formatter>().is_err());
    }
}
