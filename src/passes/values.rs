use indexmap::IndexMap;

use crate::passes::{is_ident_char, replace_symbols, replace_value_symbols, sanitize, Pass, PassCtx, PassError, Targets};
use crate::syntax::{Node, Stylesheet};

/// Handles `@value`:
///
/// - `@value primary: #BF4040;` defines `primary`, substitutes it into declaration values,
///   selectors and at-rule params, and exports it.
/// - `@value primary, secondary as accent from "./colors.css";` imports values through an
///   `:import` block and exports them under their local names.
///
/// The `@value` rules themselves are removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Values;

impl Pass for Values {
    fn run(&self, sheet: &mut Stylesheet, _ctx: &PassCtx<'_>) -> Result<(), PassError> {
        let mut definitions = IndexMap::<String, String>::new();
        let mut imports = IndexMap::<String, Vec<(String, String)>>::new();
        let mut next_alias = 0;
        for node in &sheet.nodes {
            let Node::AtRule(at_rule) = node else { continue };
            if at_rule.name != "value" {
                continue
            }
            let params = at_rule.params.as_str();
            if let Some((names, source)) = split_import(params) {
                let path = match enquote::unquote(source) {
                    Ok(path) => path,
                    // Bare paths may name a previously defined value
                    Err(_) => definitions.get(source)
                        .map(|value| enquote::unquote(value).unwrap_or_else(|_| value.clone()))
                        .unwrap_or_else(|| source.to_string()),
                };
                let names = names.trim().trim_start_matches('(').trim_end_matches(')');
                for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
                    let (remote, local) = match name.split_once(" as ") {
                        Some((remote, local)) => (remote.trim(), local.trim()),
                        None => (name, name),
                    };
                    let alias = format!("i__value_{}_{}", sanitize(remote), next_alias);
                    next_alias += 1;
                    imports.entry(path.clone()).or_default().push((alias.clone(), remote.to_string()));
                    definitions.insert(local.to_string(), alias);
                }
            } else {
                let (name, value) = split_definition(params)
                    .ok_or_else(|| PassError::InvalidValue { params: params.to_string() })?;
                let value = replace_value_symbols(value, |token| definitions.get(token).map(String::as_str))
                    .into_owned();
                definitions.insert(name.to_string(), value);
            }
        }
        sheet.retain(|node| !matches!(node, Node::AtRule(at_rule) if at_rule.name == "value"));
        if definitions.is_empty() {
            return Ok(())
        }

        replace_symbols(sheet, Targets::ALL, |token| definitions.get(token).map(String::as_str));
        sheet.prepend(Node::rule(
            ":export",
            definitions.iter().map(|(name, value)| Node::decl(name, value)).collect()
        ));
        for (path, aliases) in imports.into_iter().rev() {
            sheet.prepend(Node::rule(
                format!(":import(\"{}\")", path),
                aliases.into_iter().map(|(alias, remote)| Node::decl(alias, remote)).collect()
            ));
        }
        Ok(())
    }
}

/// `names from "path"` → (names, path with quotes)
pub(super) fn split_import(params: &str) -> Option<(&str, &str)> {
    let mut search_end = params.len();
    while let Some(idx) = params[..search_end].rfind("from") {
        let before = &params[..idx];
        let after = &params[idx + "from".len()..];
        let is_word = before.ends_with(char::is_whitespace) && after.starts_with(char::is_whitespace);
        let source = after.trim();
        let is_source = source.starts_with(['"', '\''])
            || (!source.is_empty() && source.chars().all(is_ident_char));
        if is_word && is_source && !before.trim().is_empty() {
            return Some((before.trim(), source))
        }
        search_end = idx;
    }
    None
}

/// `name: value` or `name value` → (name, value)
fn split_definition(params: &str) -> Option<(&str, &str)> {
    let name_len = params.find(|c: char| !is_ident_char(c)).unwrap_or(params.len());
    if name_len == 0 {
        return None
    }
    let (name, rest) = params.split_at(name_len);
    let rest = rest.trim_start();
    let value = rest.strip_prefix(':').unwrap_or(rest).trim();
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::import_export::module_ref::ModuleRef;
    use crate::passes::{Pass, PassCtx, Values};
    use crate::syntax::{parse, print};
    use super::split_import;

    fn run(input: &str) -> String {
        let module = ModuleRef::file("/in/a.css");
        let ctx = PassCtx { module: &module, from: "/in/a.css", relative_from: "a.css" };
        let mut sheet = parse(input).unwrap();
        Values.run(&mut sheet, &ctx).unwrap();
        print(&sheet)
    }

    #[test]
    fn substitutes_local_definitions() {
        assert_eq!(
            run("@value primary: #BF4040;\n@value border: 1px solid primary;\n.a { border: border; }"),
            ":export {\n  primary: #BF4040;\n  border: 1px solid #BF4040;\n}\n.a { border: 1px solid #BF4040; }"
        );
    }

    #[test]
    fn imports_through_alias() {
        assert_eq!(
            run("@value a, b as c from \"./x.css\";\n.box { color: c; }"),
            ":import(\"./x.css\") {\n  i__value_a_0: a;\n  i__value_b_1: b;\n}\n:export {\n  a: i__value_a_0;\n  c: i__value_b_1;\n}\n.box { color: i__value_b_1; }"
        );
    }

    #[test]
    fn removes_only_value_rules() {
        assert_eq!(run("@value x: 1;"), ":export {\n  x: 1;\n}");
        assert_eq!(run(".a {}"), ".a {}");
    }

    #[test]
    fn finds_from_clause() {
        assert_eq!(split_import("foo from \"./a.css\""), Some(("foo", "\"./a.css\"")));
        assert_eq!(split_import("from-color from colors"), Some(("from-color", "colors")));
        assert_eq!(split_import("primary: red"), None);
    }
}
