use std::rc::Rc;

use camino::Utf8PathBuf;
use indexmap::IndexMap;

use crate::import_export::export::{ExportTable, ImportPath};
use crate::import_export::module_ref::ModuleRef;
use crate::import_export::LoadError;
use crate::misc::to_posix;

/// Maps an import path to the module it refers to
pub trait PathResolver {
    fn resolve(&self, import_path: &ImportPath, from: &ModuleRef) -> ModuleRef;
}

impl<F: Fn(&ImportPath, &ModuleRef) -> ModuleRef> PathResolver for F {
    fn resolve(&self, import_path: &ImportPath, from: &ModuleRef) -> ModuleRef {
        self(import_path, from)
    }
}

/// Resolves relative to the directory of the importing module
#[derive(Debug, Default, Clone, Copy)]
pub struct RelativePathResolver;

impl PathResolver for RelativePathResolver {
    fn resolve(&self, import_path: &ImportPath, from: &ModuleRef) -> ModuleRef {
        let importer_dir = from.load_path()
            .and_then(|path| path.parent().map(|dir| dir.to_path_buf()))
            .unwrap_or_else(Utf8PathBuf::new);
        ModuleRef::file(importer_dir.join(import_path.as_str()))
    }
}

/// What an import path resolved to
#[derive(Debug, Clone)]
pub enum Located {
    /// A virtual module: its exports, without any backing file
    Exports(Rc<ExportTable>),
    Module(ModuleRef),
}

/// Import resolution strategy: virtual modules are checked first, then the path resolver
pub struct ImportResolver {
    pub virtual_modules: IndexMap<String, Rc<ExportTable>>,
    pub path_resolver: Rc<dyn PathResolver>,
}

impl ImportResolver {
    pub fn new(virtual_modules: IndexMap<String, ExportTable>, path_resolver: Rc<dyn PathResolver>) -> Self {
        Self {
            virtual_modules: virtual_modules.into_iter()
                .map(|(name, exports)| (name, Rc::new(exports)))
                .collect(),
            path_resolver
        }
    }

    /// Resolve `import_path` as written in `from`
    pub fn locate(&self, import_path: &ImportPath, from: &ModuleRef) -> Result<Located, LoadError> {
        let import_path = ImportPath::from(to_posix(import_path).into_owned());
        if let Some(exports) = self.virtual_modules.get(import_path.as_str()) {
            return Ok(Located::Exports(exports.clone()))
        }
        match self.path_resolver.resolve(&import_path, from) {
            ModuleRef::Virtual(name) => match self.virtual_modules.get(&name) {
                Some(exports) => Ok(Located::Exports(exports.clone())),
                None => Err(LoadError::NoSuchModule { key: name })
            },
            module => Ok(Located::Module(module))
        }
    }
}
