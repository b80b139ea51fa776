use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::misc::normalize_path;

/// A module reference supplied by a custom [PathResolver](crate::import_export::import_resolver::PathResolver)
/// which is neither a plain path nor a virtual module.
///
/// Its key must be stable: two handles with equal keys are the same module, and the module's
/// source is read from the key interpreted as a path.
pub trait OpaqueModule: Debug {
    fn key(&self) -> String;
}

/// References a module. Compared and hashed by [ModuleRef::key]
#[derive(Debug, Clone)]
pub enum ModuleRef {
    /// Normalized absolute (or input-relative) path
    File(Utf8PathBuf),
    /// Name in the virtual module table
    Virtual(String),
    Opaque(Rc<dyn OpaqueModule>),
}

impl ModuleRef {
    /// A file module. The path is normalized lexically
    pub fn file(path: impl AsRef<Utf8Path>) -> Self {
        ModuleRef::File(normalize_path(path.as_ref()))
    }

    pub fn opaque(module: impl OpaqueModule + 'static) -> Self {
        ModuleRef::Opaque(Rc::new(module))
    }

    /// Canonical comparable string form: the cache key and the `from` given to handlers
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            ModuleRef::File(path) => Cow::Borrowed(path.as_str()),
            ModuleRef::Virtual(name) => Cow::Borrowed(name),
            ModuleRef::Opaque(module) => Cow::Owned(module.key()),
        }
    }

    /// Path the module's source is read from. `None` for virtual modules
    pub fn load_path(&self) -> Option<Utf8PathBuf> {
        match self {
            ModuleRef::File(path) => Some(path.clone()),
            ModuleRef::Virtual(_) => None,
            ModuleRef::Opaque(module) => Some(normalize_path(Utf8Path::new(&module.key()))),
        }
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ModuleRef {}

impl Hash for ModuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl Display for ModuleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleRef::Virtual(name) => write!(f, "virtual module {}", name),
            _ => write!(f, "{}", self.key())
        }
    }
}
