use std::rc::Rc;

use futures::future::{join_all, LocalBoxFuture};

use crate::import_export::export::{ExportTable, ImportPath, Translation, TranslationTable};
use crate::import_export::module_ref::ModuleRef;
use crate::import_export::LoadError;
use crate::passes::{import_block_path, is_export_block, replace_symbols, Targets};
use crate::syntax::{Node, Stylesheet};

/// Fetches the exports of the module an import path refers to, loading it if necessary
pub trait ExportFetcher {
    fn fetch_exports(&self, import_path: &ImportPath, from: &ModuleRef) -> LocalBoxFuture<'static, Result<Rc<ExportTable>, LoadError>>;
}

/// Called when an imported module can't be loaded. Handling the failure makes it non-fatal:
/// the import contributes no bindings
pub trait ModuleResolutionFailureHandler {
    fn on_failure(&self, failure: &LoadError, import_path: &str, from: &str);
}

/// Called when an imported module doesn't export a symbol. The alias is then left unbound
pub trait SymbolResolutionFailureHandler {
    fn on_failure(&self, symbol: &str, import_path: &str, from: &str);
}

impl<F: Fn(&LoadError, &str, &str)> ModuleResolutionFailureHandler for F {
    fn on_failure(&self, failure: &LoadError, import_path: &str, from: &str) {
        self(failure, import_path, from)
    }
}

impl<F: Fn(&str, &str, &str)> SymbolResolutionFailureHandler for F {
    fn on_failure(&self, symbol: &str, import_path: &str, from: &str) {
        self(symbol, import_path, from)
    }
}

/// Links one module: resolves its `:import` blocks, substitutes the imported values, and
/// extracts its `:export` blocks
pub struct Linker<'a> {
    pub fetcher: &'a dyn ExportFetcher,
    pub on_module_failure: Option<&'a dyn ModuleResolutionFailureHandler>,
    pub on_symbol_failure: Option<&'a dyn SymbolResolutionFailureHandler>,
}

/// An `:import` block: path and (alias, remote symbol) bindings
struct ImportDeclaration {
    path: String,
    bindings: Vec<(String, String)>,
}

impl<'a> Linker<'a> {
    /// Rewrite `sheet` (the tree of `module`) in place and return the module's exports.
    ///
    /// Module load failures are fatal unless a [ModuleResolutionFailureHandler] is set. Missing
    /// symbols are bound to `undefined` unless a [SymbolResolutionFailureHandler] is set.
    pub async fn link(&self, sheet: &mut Stylesheet, module: &ModuleRef) -> Result<ExportTable, LoadError> {
        let from = module.key();
        let imports = sheet.nodes.iter()
            .filter_map(Node::as_rule)
            .filter_map(|rule| Some(ImportDeclaration {
                path: import_block_path(&rule.selector)?,
                bindings: rule.decls().map(|decl| (decl.prop.clone(), decl.value.clone())).collect()
            }))
            .collect::<Vec<_>>();
        let fetched = join_all(imports.iter().map(|import| {
            self.fetcher.fetch_exports(&ImportPath::from(import.path.as_str()), module)
        })).await;

        let mut translations = TranslationTable::new();
        for (import, fetched) in imports.iter().zip(fetched) {
            let exports = match fetched {
                Ok(exports) => exports,
                Err(failure) => match self.on_module_failure {
                    None => return Err(failure),
                    Some(handler) => {
                        log::warn!("Could not resolve \"{}\" imported from {}: {}", import.path, from, failure);
                        handler.on_failure(&failure, &import.path, &from);
                        continue
                    }
                }
            };
            for (alias, symbol) in &import.bindings {
                match (exports.get(symbol), self.on_symbol_failure) {
                    (Some(value), _) => {
                        translations.insert(alias.clone(), Translation::Resolved(value.clone()));
                    }
                    (None, Some(handler)) => {
                        log::warn!("\"{}\" does not export {} (imported from {})", import.path, symbol, from);
                        handler.on_failure(symbol, &import.path, &from);
                    }
                    (None, None) => {
                        translations.insert(alias.clone(), Translation::Undefined);
                    }
                }
            }
        }

        sheet.retain(|node| !node.as_rule().is_some_and(|rule| import_block_path(&rule.selector).is_some()));
        replace_symbols(sheet, Targets::ALL, |token| translations.get(token).map(Translation::as_str));

        let mut exports = ExportTable::new();
        for rule in sheet.nodes.iter().filter_map(Node::as_rule).filter(|rule| is_export_block(&rule.selector)) {
            for decl in rule.decls() {
                exports.insert(decl.prop.clone(), decl.value.clone());
            }
        }
        sheet.retain(|node| !node.as_rule().is_some_and(|rule| is_export_block(&rule.selector)));
        Ok(exports)
    }
}
