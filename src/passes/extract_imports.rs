use indexmap::IndexMap;
use join_lazy_fmt::Join;

use crate::passes::values::split_import;
use crate::passes::{sanitize, Pass, PassCtx, PassError};
use crate::syntax::{Node, Stylesheet};

/// Rewrites `composes: a b from "./other.css"` into `:import("./other.css")` blocks, replacing
/// the composed names with import aliases. `from global` names become `global(name)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractImports;

pub(crate) fn is_composes(prop: &str) -> bool {
    matches!(prop, "composes" | "compose-with")
}

impl Pass for ExtractImports {
    fn run(&self, sheet: &mut Stylesheet, _ctx: &PassCtx<'_>) -> Result<(), PassError> {
        // path → imported name → alias
        let mut imports = IndexMap::<String, IndexMap<String, String>>::new();
        let mut next_alias = 0;
        sheet.walk_decls_mut(&mut |decl| {
            if !is_composes(&decl.prop) {
                return
            }
            let Some((names, source)) = split_import(&decl.value) else { return };
            if source == "global" {
                decl.value = " ".join(names.split_whitespace().map(|name| format!("global({})", name))).to_string();
                return
            }
            let Ok(path) = enquote::unquote(source) else { return };
            let aliases = imports.entry(path).or_default();
            let composed = names.split_whitespace().map(|name| {
                aliases.entry(name.to_string()).or_insert_with(|| {
                    let alias = format!("i__imported_{}_{}", sanitize(name), next_alias);
                    next_alias += 1;
                    alias
                }).clone()
            }).collect::<Vec<_>>();
            decl.value = composed.join(" ");
        });
        for (path, aliases) in imports.into_iter().rev() {
            sheet.prepend(Node::rule(
                format!(":import(\"{}\")", path),
                aliases.into_iter().map(|(name, alias)| Node::decl(alias, name)).collect()
            ));
        }
        Ok(())
    }
}
