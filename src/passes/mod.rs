use std::rc::Rc;

use thiserror::Error;

use crate::import_export::module_ref::ModuleRef;
use crate::syntax::Stylesheet;

pub use extract_imports::ExtractImports;
pub use local_by_default::LocalByDefault;
pub use replace_symbols::{replace_symbols, replace_value_symbols, Targets};
pub use scope::Scope;
pub use values::Values;

/// `composes: a b from "./file.css"` → `:import` blocks
mod extract_imports;
/// Marks bare classes, ids and keyframes as `:local(...)`
mod local_by_default;
/// Token-wise symbol substitution across a tree
mod replace_symbols;
/// Replaces `:local(...)` with scoped names and builds the local `:export` block
mod scope;
/// `@value` definitions and imports
mod values;

/// A stage which transforms a stylesheet in place.
///
/// User plugins implement this (closures do automatically) and run before or after the built-in
/// stages.
pub trait Pass {
    fn run(&self, sheet: &mut Stylesheet, ctx: &PassCtx<'_>) -> Result<(), PassError>;
}

/// What a pass knows about the module it transforms
#[derive(Debug, Clone, Copy)]
pub struct PassCtx<'a> {
    pub module: &'a ModuleRef,
    /// The module key (for files, the absolute path)
    pub from: &'a str,
    /// Module path relative to the build's input root
    pub relative_from: &'a str,
}

/// Passes and plugins which run on every module, in order
#[derive(Clone, Default)]
pub struct Plugins {
    pub before: Vec<Rc<dyn Pass>>,
    pub after: Vec<Rc<dyn Pass>>,
}

#[derive(Debug, Clone, Error)]
pub enum PassError {
    #[error("composition is only allowed when selector is single local class name, not \"{selector}\"")]
    ComposesOnComplexSelector { selector: String },
    #[error("referenced class name \"{class}\" in composes not found")]
    ComposedClassNotFound { class: String },
    #[error("invalid @value definition \"{params}\"")]
    InvalidValue { params: String },
    #[error("{0}")]
    Plugin(String),
}

impl<F: Fn(&mut Stylesheet, &PassCtx<'_>) -> Result<(), PassError>> Pass for F {
    fn run(&self, sheet: &mut Stylesheet, ctx: &PassCtx<'_>) -> Result<(), PassError> {
        self(sheet, ctx)
    }
}

/// Selector of an `:import("path")` block, returning the unquoted path
pub(crate) fn import_block_path(selector: &str) -> Option<String> {
    let inner = selector.strip_prefix(":import(")?.strip_suffix(')')?;
    let inner = inner.trim();
    Some(inner.trim_start_matches(['"', '\'']).trim_end_matches(['"', '\'']).to_string())
}

pub(crate) fn is_export_block(selector: &str) -> bool {
    selector == ":export"
}

/// Whether selectors of rules in these at-rules are keyframe offsets rather than selectors
pub(crate) fn in_keyframes(at_rules: &[String]) -> bool {
    at_rules.iter().any(|name| is_keyframes(name))
}

pub(crate) fn is_keyframes(at_rule_name: &str) -> bool {
    at_rule_name.to_ascii_lowercase().ends_with("keyframes")
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Make an identifier safe to embed in a generated alias
pub(crate) fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}
