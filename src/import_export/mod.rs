use std::io;
use std::rc::Rc;
use std::sync::Arc;

use derive_more::{Display, Error};

use crate::import_export::export::ExportTable;
use crate::import_export::module_ref::ModuleRef;
use crate::passes::PassError;
use crate::syntax::ParseError;

/// Export table, translation table and import path datatypes
pub mod export;
/// Caches module loads for the duration of a build
pub mod import_cache;
/// Import resolution strategy and virtual modules
pub mod import_resolver;
/// Resolves `:import` blocks against other modules' exports and extracts `:export` blocks
pub mod link;
/// References a module: file, virtual module, or opaque handle
pub mod module_ref;

/// The cached result of processing one module
#[derive(Debug)]
pub struct LoadedModule {
    pub module: ModuleRef,
    /// The rewritten stylesheet (with an inline source map if enabled)
    pub css: String,
    pub exports: Rc<ExportTable>,
}

/// Failure to load or process a module.
///
/// Cloneable because every importer waiting on the same load receives it.
#[derive(Debug, Clone, Display, Error)]
pub enum LoadError {
    #[display(fmt = "could not load module at path {}: {}", path, source)]
    CouldNotLoad { #[error(not(source))] path: String, source: Arc<io::Error> },
    #[display(fmt = "module at path {} is not valid UTF-8", path)]
    NotUtf8 { #[error(not(source))] path: String },
    #[display(fmt = "could not parse {}: {}", path, source)]
    Parse { #[error(not(source))] path: String, source: ParseError },
    #[display(fmt = "could not transform {}: {}", path, source)]
    Pass { #[error(not(source))] path: String, source: PassError },
    #[display(fmt = "no module {}", key)]
    NoSuchModule { #[error(not(source))] key: String },
}

impl LoadError {
    pub(crate) fn could_not_load(path: impl Into<String>, source: io::Error) -> Self {
        LoadError::CouldNotLoad { path: path.into(), source: Arc::new(source) }
    }

    /// Underlying I/O error kind, if this is an I/O failure
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            LoadError::CouldNotLoad { source, .. } => Some(source.kind()),
            _ => None
        }
    }
}
