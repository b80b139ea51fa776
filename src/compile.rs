use std::rc::Rc;

use camino::Utf8PathBuf;
use futures::future::{ready, LocalBoxFuture};
use futures::FutureExt;

use crate::config::Options;
use crate::import_export::export::{ExportTable, ImportPath};
use crate::import_export::import_cache::{ModuleLoad, ResolutionCache};
use crate::import_export::import_resolver::{ImportResolver, Located};
use crate::import_export::link::{ExportFetcher, Linker};
use crate::import_export::module_ref::ModuleRef;
use crate::import_export::{LoadError, LoadedModule};
use crate::misc::{normalize_path, relative_to, to_posix};
use crate::passes::{ExtractImports, LocalByDefault, Pass, PassCtx, Scope, Values};
use crate::syntax::{parse, print, print_with_map, Stylesheet};

/// State shared by every module of one build: options, import resolution and the
/// [ResolutionCache]
pub struct BuildCtx {
    /// Normalized, `/`-separated
    pub input_root: Utf8PathBuf,
    pub options: Options,
    pub resolver: ImportResolver,
    pub cache: ResolutionCache,
}

impl BuildCtx {
    pub fn new(input_root: Utf8PathBuf, options: Options) -> Rc<Self> {
        let resolver = ImportResolver::new(options.virtual_modules.clone(), options.path_resolver.clone());
        Rc::new(Self {
            input_root: normalize_path(&input_root),
            options,
            resolver,
            cache: ResolutionCache::new(),
        })
    }

    /// Path of `module` relative to the input root. Modules outside of it keep their key
    pub fn relative_path(&self, module: &ModuleRef) -> String {
        let key = to_posix(&module.key()).into_owned();
        let root = self.input_root.as_str().trim_end_matches('/');
        match key.strip_prefix(root).and_then(|rest| rest.strip_prefix('/')) {
            Some(relative) => relative.to_string(),
            None => key,
        }
    }

    /// The cached load of `module`, starting it if this is the first request
    pub fn load(self: &Rc<Self>, module: ModuleRef) -> ModuleLoad {
        let ctx = self.clone();
        let key = module.clone();
        self.cache.get_or_load(&key, move || process(ctx, module))
    }

    /// Name of `module` in its source map
    fn source_name(&self, module: &ModuleRef) -> String {
        let relative = self.relative_path(module);
        match self.options.source_maps.as_ref().and_then(|source_maps| source_maps.base_dir.as_ref()) {
            Some(base_dir) => relative_to(&relative, &to_posix(normalize_path(base_dir).as_str())),
            None => relative,
        }
    }
}

impl ExportFetcher for Rc<BuildCtx> {
    fn fetch_exports(&self, import_path: &ImportPath, from: &ModuleRef) -> LocalBoxFuture<'static, Result<Rc<ExportTable>, LoadError>> {
        match self.resolver.locate(import_path, from) {
            Err(err) => ready(Err(err)).boxed_local(),
            Ok(Located::Exports(exports)) => ready(Ok(exports)).boxed_local(),
            Ok(Located::Module(module)) => self.load(module)
                .map(|loaded| loaded.map(|loaded| loaded.exports.clone()))
                .boxed_local(),
        }
    }
}

/// Read, parse and transform one module, linking it against the modules it imports.
///
/// The passes run in this order: before-plugins, [Values], [LocalByDefault], [ExtractImports],
/// [Scope], the [Linker], after-plugins.
pub async fn process(ctx: Rc<BuildCtx>, module: ModuleRef) -> Result<LoadedModule, LoadError> {
    let from = module.key().into_owned();
    let Some(path) = module.load_path() else {
        return Err(LoadError::NoSuchModule { key: from })
    };
    let bytes = std::fs::read(&path).map_err(|err| LoadError::could_not_load(path.as_str(), err))?;
    let text = ctx.options.encoding.decode(bytes)
        .ok_or_else(|| LoadError::NotUtf8 { path: path.to_string() })?;
    let mut sheet = parse(&text).map_err(|source| LoadError::Parse { path: from.clone(), source })?;

    let relative_from = ctx.relative_path(&module);
    let pass_ctx = PassCtx { module: &module, from: &from, relative_from: &relative_from };
    let run = |pass: &dyn Pass, sheet: &mut Stylesheet| {
        pass.run(sheet, &pass_ctx).map_err(|source| LoadError::Pass { path: from.clone(), source })
    };
    for plugin in &ctx.options.plugins.before {
        run(&**plugin, &mut sheet)?;
    }
    run(&Values, &mut sheet)?;
    run(&LocalByDefault, &mut sheet)?;
    run(&ExtractImports, &mut sheet)?;
    let generate = |local_name: &str, rule_text: &str| {
        ctx.options.scoped_name.generate(local_name, &relative_from, rule_text, &module)
    };
    run(&Scope { generate: &generate }, &mut sheet)?;

    let linker = Linker {
        fetcher: &ctx,
        on_module_failure: ctx.options.on_module_resolution_failure.as_deref(),
        on_symbol_failure: ctx.options.on_symbol_resolution_failure.as_deref(),
    };
    let exports = linker.link(&mut sheet, &module).await?;
    for plugin in &ctx.options.plugins.after {
        run(&**plugin, &mut sheet)?;
    }

    let css = match &ctx.options.source_maps {
        Some(_) => print_with_map(&sheet, &ctx.source_name(&module)),
        None => print(&sheet),
    };
    log::debug!("Processed {} ({} exports)", relative_from, exports.len());
    Ok(LoadedModule { module, css, exports: Rc::new(exports) })
}
