use std::borrow::Cow;

use crate::passes::{import_block_path, is_export_block, is_ident_char, is_keyframes};
use crate::syntax::{Node, Stylesheet};

/// Which parts of the tree [replace_symbols] rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub decl_values: bool,
    pub selectors: bool,
    pub at_rule_params: bool,
}

impl Targets {
    pub const ALL: Targets = Targets { decl_values: true, selectors: true, at_rule_params: true };
}

/// Replace every whole token in `value` for which `lookup` returns a replacement.
///
/// A token is a maximal run of identifier characters, optionally prefixed by `$`.
pub fn replace_value_symbols<'v, 's>(
    value: &'v str,
    mut lookup: impl FnMut(&str) -> Option<&'s str>
) -> Cow<'v, str> {
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut chars = value.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !(is_ident_char(c) || c == '$') {
            continue
        }
        let mut end = start + c.len_utf8();
        while let Some(&(idx, c)) = chars.peek() {
            if !is_ident_char(c) {
                break
            }
            end = idx + c.len_utf8();
            chars.next();
        }
        if let Some(replacement) = lookup(&value[start..end]) {
            let out = out.get_or_insert_with(String::new);
            out.push_str(&value[copied_to..start]);
            out.push_str(replacement);
            copied_to = end;
        }
    }
    match out {
        None => Cow::Borrowed(value),
        Some(mut out) => {
            out.push_str(&value[copied_to..]);
            Cow::Owned(out)
        }
    }
}

/// Substitute symbols throughout the tree. `:import` blocks are never touched; `:export` values
/// are, since exports may re-export substituted symbols.
pub fn replace_symbols<'s>(
    sheet: &mut Stylesheet,
    targets: Targets,
    mut lookup: impl FnMut(&str) -> Option<&'s str>
) {
    replace_in_nodes(&mut sheet.nodes, targets, &mut lookup)
}

fn replace_in_nodes<'s>(
    nodes: &mut [Node],
    targets: Targets,
    lookup: &mut impl FnMut(&str) -> Option<&'s str>
) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                if import_block_path(&rule.selector).is_some() {
                    continue
                }
                if targets.selectors && !is_export_block(&rule.selector) {
                    replace_in_place(&mut rule.selector, lookup);
                }
                replace_in_nodes(&mut rule.nodes, targets, lookup);
            }
            Node::AtRule(at_rule) => {
                if targets.at_rule_params && !is_keyframes(&at_rule.name) && at_rule.name != "value" {
                    replace_in_place(&mut at_rule.params, lookup);
                }
                if let Some(children) = at_rule.nodes.as_mut() {
                    replace_in_nodes(children, targets, lookup);
                }
            }
            Node::Decl(decl) => {
                if targets.decl_values {
                    replace_in_place(&mut decl.value, lookup);
                }
            }
            Node::Comment(_) => {}
        }
    }
}

fn replace_in_place<'s>(text: &mut String, lookup: &mut impl FnMut(&str) -> Option<&'s str>) {
    let replaced = match replace_value_symbols(text, &mut *lookup) {
        Cow::Borrowed(_) => return,
        Cow::Owned(replaced) => replaced,
    };
    *text = replaced;
}
