use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;

use crate::import_export::module_ref::ModuleRef;
use crate::import_export::{LoadError, LoadedModule};

/// An in-flight or finished module load, which any number of importers can await
pub type ModuleLoad = Shared<LocalBoxFuture<'static, Result<Rc<LoadedModule>, LoadError>>>;

/// Caches module loads for one build, keyed by [ModuleRef::key].
///
/// The load is stored before it is first polled, so every request for a module which arrives
/// while it is still loading (diamonds, concurrent top-level files) awaits the same load.
///
/// There is no cycle detection: a module which (transitively) imports itself awaits its own
/// load and never completes.
#[derive(Default)]
pub struct ResolutionCache {
    loads: RefCell<HashMap<String, ModuleLoad>>,
    loads_started: Cell<usize>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached load for `module`, or stores and returns `load()` if there is none
    pub fn get_or_load<Fut: Future<Output=Result<LoadedModule, LoadError>> + 'static>(
        &self,
        module: &ModuleRef,
        load: impl FnOnce() -> Fut
    ) -> ModuleLoad {
        let key = module.key();
        if let Some(cached) = self.loads.borrow().get(&*key) {
            log::debug!("Module cache hit: {}", key);
            return cached.clone()
        }
        log::debug!("Loading module: {}", key);
        let module_load = load()
            .map(|loaded| loaded.map(Rc::new))
            .boxed_local()
            .shared();
        self.loads.borrow_mut().insert(key.into_owned(), module_load.clone());
        self.loads_started.set(self.loads_started.get() + 1);
        module_load
    }

    /// How many distinct module loads were started
    pub fn loads_started(&self) -> usize {
        self.loads_started.get()
    }

    /// Forget every load. Loads hold what they were started with, so this also breaks the
    /// reference cycle between a build and its cache
    pub fn clear(&self) {
        self.loads.borrow_mut().clear();
    }
}
