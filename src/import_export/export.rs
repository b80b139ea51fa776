use derive_more::{AsRef, Deref, Display, From, Into};
use indexmap::IndexMap;

/// A module's exported symbols in declaration order. Values may be space-joined lists of scoped
/// names (composition)
pub type ExportTable = IndexMap<String, String>;

/// Local import alias → what it was resolved to. Later bindings for the same alias overwrite
/// earlier ones
pub type TranslationTable = IndexMap<String, Translation>;

/// What an imported alias resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Resolved(String),
    /// The imported module exists but doesn't export the symbol
    Undefined,
}

impl Translation {
    /// The substituted text. [Translation::Undefined] is the literal `undefined`
    pub fn as_str(&self) -> &str {
        match self {
            Translation::Resolved(value) => value,
            Translation::Undefined => "undefined"
        }
    }
}

/// Path to import a module as written in an `:import` block or `from` clause, distinguished from
/// the [ModuleRef](crate::import_export::module_ref::ModuleRef) it resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Into, AsRef, Deref)]
pub struct ImportPath(String);

impl From<&str> for ImportPath {
    fn from(path: &str) -> Self {
        ImportPath(path.to_string())
    }
}
