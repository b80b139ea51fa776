use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;
use join_lazy_fmt::Join;

use crate::passes::extract_imports::is_composes;
use crate::passes::{import_block_path, is_export_block, is_ident_char, is_keyframes, Pass, PassCtx, PassError};
use crate::syntax::{print_node, Decl, Node, Rule, Stylesheet};

/// Replaces every `:local(...)` name with its scoped name, resolves `composes`, and appends an
/// `:export` block mapping each local name to its scoped name followed by everything it composes.
pub struct Scope<'a> {
    /// Maps a local name and the source text of the rule declaring it to the scoped name
    pub generate: &'a dyn Fn(&str, &str) -> String,
}

struct Scoper<'a, 'g> {
    generate: &'g dyn Fn(&str, &str) -> String,
    input: &'a str,
    /// Aliases declared by `:import` blocks
    imported: HashSet<String>,
    exports: IndexMap<String, Vec<String>>,
}

impl<'g> Pass for Scope<'g> {
    fn run(&self, sheet: &mut Stylesheet, _ctx: &PassCtx<'_>) -> Result<(), PassError> {
        let input = sheet.input.clone();
        let imported = sheet.nodes.iter()
            .filter_map(Node::as_rule)
            .filter(|rule| import_block_path(&rule.selector).is_some())
            .flat_map(|rule| rule.decls().map(|decl| decl.prop.clone()))
            .collect();
        let mut scoper = Scoper {
            generate: self.generate,
            input: &input,
            imported,
            exports: IndexMap::new(),
        };
        scoper.nodes(&mut sheet.nodes, &input)?;
        let exports = scoper.exports;
        if !exports.is_empty() {
            sheet.append(Node::rule(
                ":export",
                exports.iter()
                    .map(|(name, scoped)| Node::decl(name, " ".join(scoped).to_string()))
                    .collect()
            ));
        }
        Ok(())
    }
}

impl<'a, 'g> Scoper<'a, 'g> {
    fn nodes(&mut self, nodes: &mut [Node], parent_text: &str) -> Result<(), PassError> {
        for node in nodes {
            if let Node::Rule(rule) = node {
                if import_block_path(&rule.selector).is_some() || is_export_block(&rule.selector) {
                    continue
                }
            }
            let text = match node {
                Node::Rule(_) | Node::AtRule(_) => self.text_of(node),
                Node::Decl(_) | Node::Comment(_) => Cow::Borrowed(""),
            };
            match node {
                Node::Rule(rule) => self.rule(rule, &text)?,
                Node::AtRule(at_rule) => {
                    if is_keyframes(&at_rule.name) {
                        if let Some(name) = local_argument(at_rule.params.trim()) {
                            let name = name.to_string();
                            at_rule.params = self.export(&name, &text);
                        }
                    }
                    if let Some(children) = at_rule.nodes.as_mut() {
                        self.nodes(children, &text)?;
                    }
                }
                Node::Decl(decl) => self.decl(decl, parent_text),
                Node::Comment(_) => {}
            }
        }
        Ok(())
    }

    fn rule(&mut self, rule: &mut Rule, text: &str) -> Result<(), PassError> {
        let composer = single_local_class(&rule.selector).map(str::to_string);
        let selector = std::mem::take(&mut rule.selector);
        rule.selector = self.localize(&selector, text);

        let (compositions, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut rule.nodes)
            .into_iter()
            .partition(|node| matches!(node, Node::Decl(decl) if is_composes(&decl.prop)));
        rule.nodes = rest;
        for node in compositions {
            let Node::Decl(decl) = node else { continue };
            let Some(composer) = composer.as_deref() else {
                return Err(PassError::ComposesOnComplexSelector { selector })
            };
            for class in decl.value.split_whitespace() {
                let composed = if let Some(global) = class.strip_prefix("global(").and_then(|class| class.strip_suffix(')')) {
                    vec![global.to_string()]
                } else if self.imported.contains(class) {
                    vec![class.to_string()]
                } else if let Some(scoped) = self.exports.get(class) {
                    scoped.clone()
                } else {
                    return Err(PassError::ComposedClassNotFound { class: class.to_string() })
                };
                self.exports.entry(composer.to_string()).or_default().extend(composed);
            }
        }
        self.nodes(&mut rule.nodes, text)
    }

    fn decl(&mut self, decl: &mut Decl, parent_text: &str) {
        if decl.value.contains(":local(") {
            decl.value = self.localize(&decl.value, parent_text);
        }
    }

    /// Replace each `:local(...)` in `text` with the scoped names inside it
    fn localize(&mut self, text: &str, rule_text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(":local(") {
            out.push_str(&rest[..start]);
            let inner_start = start + ":local(".len();
            let Some(len) = closing_paren(&rest[inner_start..]) else {
                out.push_str(&rest[start..]);
                rest = "";
                break
            };
            let inner = &rest[inner_start..inner_start + len];
            out.push_str(&self.scope_names(inner, rule_text));
            rest = &rest[inner_start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    /// Scope the classes and ids in a `:local(...)` argument, or the whole argument if it is a
    /// bare name (keyframes)
    fn scope_names(&mut self, inner: &str, rule_text: &str) -> String {
        let trimmed = inner.trim();
        if !trimmed.is_empty() && trimmed.len() == ident_len(trimmed) {
            return self.export(trimmed, rule_text)
        }
        let mut out = String::with_capacity(inner.len());
        let mut idx = 0;
        while let Some(offset) = inner[idx..].find(['.', '#']) {
            let name_start = idx + offset + 1;
            let name_end = name_start + ident_len(&inner[name_start..]);
            out.push_str(&inner[idx..name_start]);
            if name_end > name_start {
                out.push_str(&self.export(&inner[name_start..name_end], rule_text));
            }
            idx = name_end;
        }
        out.push_str(&inner[idx..]);
        out
    }

    fn export(&mut self, local: &str, rule_text: &str) -> String {
        let scoped = (self.generate)(local, rule_text);
        let exported = self.exports.entry(local.to_string()).or_default();
        if !exported.contains(&scoped) {
            exported.push(scoped.clone());
        }
        scoped
    }

    fn text_of(&self, node: &Node) -> Cow<'a, str> {
        let input: &'a str = self.input;
        match node.span().and_then(|span| input.get(span.range())) {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(print_node(node)),
        }
    }
}

/// `:local(.name)` → `name`
fn single_local_class(selector: &str) -> Option<&str> {
    let name = selector.strip_prefix(":local(.")?.strip_suffix(')')?;
    (!name.is_empty() && name.len() == ident_len(name)).then_some(name)
}

/// `:local(name)` → `name`
fn local_argument(text: &str) -> Option<&str> {
    let name = text.strip_prefix(":local(")?.strip_suffix(')')?.trim();
    (!name.is_empty()).then_some(name)
}

/// Byte length of the identifier (with escapes) at the start of `text`
fn ident_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if !is_ident_char(c) {
            return idx
        }
    }
    text.len()
}

/// Offset of the `)` closing an already-opened parenthesis
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(idx),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}
