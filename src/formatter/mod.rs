//! Named, args-parameterized value formatters used by mapping rules.
//!
//! The set is closed: [`FormatterRegistry::with_builtins`] registers every
//! formatter once. Rules naming a formatter the registry does not know keep
//! their value unchanged, so partially migrated rule sets still convert.

mod builtin;
mod conversion;
mod recipe;

pub use recipe::{ingredients_from_ids, ingredients_from_pair, Ingredient};

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::convert::ConversionContext;

/// Formatter arguments, as written in the rule file
pub type FormatterArgs = Map<String, Value>;

pub trait Formatter: Send + Sync {
    fn apply(&self, value: Value, args: &FormatterArgs, raw: &Value, ctx: &ConversionContext<'_>) -> Value;
}

impl<F> Formatter for F
where
    F: Fn(Value, &FormatterArgs, &Value, &ConversionContext<'_>) -> Value + Send + Sync,
{
    fn apply(&self, value: Value, args: &FormatterArgs, raw: &Value, ctx: &ConversionContext<'_>) -> Value {
        self(value, args, raw, ctx)
    }
}

#[derive(Default)]
pub struct FormatterRegistry {
    formatters: HashMap<&'static str, Box<dyn Formatter>>,
}

impl FormatterRegistry {
    /// Registry without any formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in formatter
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        conversion::register(&mut registry);
        recipe::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &'static str, formatter: impl Formatter + 'static) {
        self.formatters.insert(name, Box::new(formatter));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Formatter> {
        self.formatters.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// Apply `name`; unknown names pass the value through unchanged
    pub fn apply(
        &self,
        name: &str,
        value: Value,
        args: &FormatterArgs,
        raw: &Value,
        ctx: &ConversionContext<'_>,
    ) -> Value {
        match self.get(name) {
            Some(formatter) => formatter.apply(value, args, raw, ctx),
            None => {
                tracing::debug!(formatter = name, "unknown formatter, value passed through");
                value
            }
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.formatters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.names())
            .finish()
    }
}

pub(crate) fn arg_str<'a>(args: &'a FormatterArgs, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

pub(crate) fn arg_i64(args: &FormatterArgs, name: &str) -> Option<i64> {
    args.get(name).and_then(crate::convert::value_as_i64)
}
