use crate::import_export::module_ref::ModuleRef;

/// Generates the globally unique name which replaces a local class, id or keyframes name.
///
/// Must be pure: the same inputs always produce the same name.
pub trait ScopedNameGenerator {
    /// - `local_name`: the name as written in the module
    /// - `relative_path`: module path relative to the build's input root, `/`-separated
    /// - `rule_text`: source text of the rule which declares the name
    /// - `module`: the module itself, as the path resolver returned it
    fn generate(&self, local_name: &str, relative_path: &str, rule_text: &str, module: &ModuleRef) -> String;
}

impl<F: Fn(&str, &str, &str, &ModuleRef) -> String> ScopedNameGenerator for F {
    fn generate(&self, local_name: &str, relative_path: &str, rule_text: &str, module: &ModuleRef) -> String {
        self(local_name, relative_path, rule_text, module)
    }
}

/// `_<relative path without extension>__<local name>`, see [default_scoped_name]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScopedName;

impl ScopedNameGenerator for DefaultScopedName {
    fn generate(&self, local_name: &str, relative_path: &str, _rule_text: &str, _module: &ModuleRef) -> String {
        default_scoped_name(local_name, relative_path)
    }
}

/// Strips the final extension from `relative_path`, collapses each run of non-alphanumeric
/// characters into `_`, trims `_` from both ends, and returns `_<path>__<local_name>`.
///
/// `components/my-component.css`, `comp` → `_components_my_component__comp`
pub fn default_scoped_name(local_name: &str, relative_path: &str) -> String {
    let stem = match relative_path.rfind('.') {
        Some(dot) if dot + 1 < relative_path.len() && !relative_path[dot..].contains(['/', '\\']) => &relative_path[..dot],
        _ => relative_path
    };
    let mut sanitized = String::with_capacity(stem.len());
    let mut in_separator_run = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c);
            in_separator_run = false;
        } else if !in_separator_run {
            sanitized.push('_');
            in_separator_run = true;
        }
    }
    format!("_{}__{}", sanitized.trim_matches('_'), local_name)
}
