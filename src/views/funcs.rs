//! Template function maps.

use std::collections::BTreeMap;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::Environment;

/// Named functions made callable from every template of a collection.
#[derive(Debug, Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Value>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The common helpers:
    /// - `cap(s)`: upper-case the first character
    /// - `eqs(x, y)`: compare two values of any type by their string form
    pub fn default_funcs() -> Self {
        Self::new().with("cap", cap).with("eqs", eqs)
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn insert<F, Rv, Args>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.funcs.insert(name.into(), Value::from_function::<F, Rv, Args>(f));
        self
    }

    /// Builder form of [`FuncMap::insert`].
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, f);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub(crate) fn apply(&self, env: &mut Environment<'static>) {
        for (name, func) in &self.funcs {
            env.add_global(name.clone(), func.clone());
        }
    }
}

fn cap(value: String) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn eqs(x: Value, y: Value) -> bool {
    x.to_string() == y.to_string()
}
