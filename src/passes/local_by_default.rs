use std::ops::Range;

use crate::passes::{import_block_path, in_keyframes, is_export_block, is_ident_char, is_keyframes, Pass, PassCtx, PassError};
use crate::syntax::{Node, Stylesheet};

/// Keyword values of `animation-name` which never name keyframes
const GLOBAL_KEYWORDS: [&str; 6] = ["none", "initial", "inherit", "unset", "revert", "revert-layer"];
/// Additional keywords of the `animation` shorthand
const ANIMATION_KEYWORDS: [&str; 17] = [
    "normal", "reverse", "alternate", "alternate-reverse", "forwards", "backwards", "both",
    "infinite", "paused", "running", "ease", "ease-in", "ease-out", "ease-in-out", "linear",
    "step-end", "step-start",
];

/// Wraps every class, id and keyframes name which isn't explicitly `:global` in `:local(...)`.
///
/// `:global(...)` and `:local(...)` wrappers are unwrapped and their contents processed in that
/// mode, while a bare `:global` or `:local` switches the mode until the end of the selector.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalByDefault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Local,
    Global,
}

impl Pass for LocalByDefault {
    fn run(&self, sheet: &mut Stylesheet, _ctx: &PassCtx<'_>) -> Result<(), PassError> {
        sheet.walk_rules_mut(&mut |rule, at_rules| {
            if in_keyframes(at_rules)
                || import_block_path(&rule.selector).is_some()
                || is_export_block(&rule.selector) {
                return
            }
            rule.selector = localize_selector(&rule.selector);
        });
        sheet.walk_mut(&mut |node| match node {
            Node::AtRule(at_rule) if is_keyframes(&at_rule.name) => {
                at_rule.params = localize_keyframes_name(&at_rule.params);
            }
            Node::Decl(decl) => match decl.prop.to_ascii_lowercase().as_str() {
                "animation" => decl.value = localize_animation(&decl.value, true),
                "animation-name" => decl.value = localize_animation(&decl.value, false),
                _ => {}
            },
            _ => {}
        });
        Ok(())
    }
}

pub(super) fn localize_selector(selector: &str) -> String {
    let chars = selector.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(selector.len() + 8);
    localize(&chars, Mode::Local, &mut out);
    out
}

/// Localize a selector list, where each selector starts in `default` mode
fn localize(chars: &[char], default: Mode, out: &mut String) {
    let mut mode = default;
    let mut idx = 0;
    while idx < chars.len() {
        let c = chars[idx];
        match c {
            ',' => {
                mode = default;
                out.push(c);
                idx += 1;
            }
            '"' | '\'' => idx = copy(chars, idx, skip_string(chars, idx), out),
            '[' => idx = copy(chars, idx, (find_close(chars, idx) + 1).min(chars.len()), out),
            '\\' => idx = copy(chars, idx, (idx + 2).min(chars.len()), out),
            '.' | '#' => {
                let end = ident_end(chars, idx + 1);
                if end > idx + 1 && mode == Mode::Local {
                    out.push_str(":local(");
                    copy(chars, idx, end, out);
                    out.push(')');
                    idx = end;
                } else {
                    idx = copy(chars, idx, end, out);
                }
            }
            ':' if chars.get(idx + 1) == Some(&':') => {
                // Pseudo-elements and their arguments are copied as-is
                let mut end = ident_end(chars, idx + 2);
                if chars.get(end) == Some(&'(') {
                    end = (find_close(chars, end) + 1).min(chars.len());
                }
                idx = copy(chars, idx, end, out);
            }
            ':' => {
                let name_end = ident_end(chars, idx + 1);
                let name = chars[idx + 1..name_end].iter().collect::<String>();
                let wrapper_mode = match name.to_ascii_lowercase().as_str() {
                    "global" => Some(Mode::Global),
                    "local" => Some(Mode::Local),
                    _ => None
                };
                let has_args = chars.get(name_end) == Some(&'(');
                match (wrapper_mode, has_args) {
                    (Some(wrapper_mode), true) => {
                        let close = find_close(chars, name_end);
                        localize(&chars[name_end + 1..close], wrapper_mode, out);
                        idx = (close + 1).min(chars.len());
                    }
                    (Some(switch_to), false) => {
                        mode = switch_to;
                        idx = name_end;
                        while chars.get(idx).is_some_and(|c| c.is_whitespace()) {
                            idx += 1;
                        }
                    }
                    (None, true) => {
                        let close = find_close(chars, name_end);
                        copy(chars, idx, name_end + 1, out);
                        localize(&chars[name_end + 1..close], mode, out);
                        if close < chars.len() {
                            out.push(')');
                        }
                        idx = (close + 1).min(chars.len());
                    }
                    (None, false) => idx = copy(chars, idx, name_end, out),
                }
            }
            _ => {
                out.push(c);
                idx += 1;
            }
        }
    }
}

/// Push `chars[start..end]` and return `end`
fn copy(chars: &[char], start: usize, end: usize, out: &mut String) -> usize {
    out.extend(&chars[start..end]);
    end
}

fn ident_end(chars: &[char], mut idx: usize) -> usize {
    while let Some(&c) = chars.get(idx) {
        if c == '\\' {
            idx = (idx + 2).min(chars.len());
        } else if is_ident_char(c) {
            idx += 1;
        } else {
            break
        }
    }
    idx
}

/// Index of the bracket closing the one at `open`, or the end if there is none
fn find_close(chars: &[char], open: usize) -> usize {
    let (opening, closing) = match chars[open] {
        '[' => ('[', ']'),
        _ => ('(', ')'),
    };
    let mut depth = 0;
    let mut idx = open;
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 1,
            '"' | '\'' => {
                idx = skip_string(chars, idx);
                continue
            }
            c if c == opening => depth += 1,
            c if c == closing => {
                depth -= 1;
                if depth == 0 {
                    return idx
                }
            }
            _ => {}
        }
        idx += 1;
    }
    chars.len()
}

/// Index after the string starting at `open`
fn skip_string(chars: &[char], open: usize) -> usize {
    let quote = chars[open];
    let mut idx = open + 1;
    while idx < chars.len() {
        match chars[idx] {
            '\\' => idx += 2,
            c if c == quote => return idx + 1,
            _ => idx += 1,
        }
    }
    chars.len()
}

fn localize_keyframes_name(params: &str) -> String {
    let name = params.trim();
    if let Some(global) = name.strip_prefix(":global(").and_then(|rest| rest.strip_suffix(')')) {
        return global.trim().to_string()
    }
    if name.is_empty() || name.starts_with(":local(") {
        return params.to_string()
    }
    format!(":local({})", name)
}

/// Wrap keyframes names in an `animation-name` list, or the first name in each `animation`
/// shorthand, in `:local(...)`
fn localize_animation(value: &str, shorthand: bool) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut copied_to = 0;
    for part in top_level_ranges(value, 0..value.len(), |c| c == ',') {
        for token in top_level_ranges(value, part, char::is_whitespace) {
            let text = &value[token.clone()];
            if !is_animation_name(text, shorthand) {
                continue
            }
            out.push_str(&value[copied_to..token.start]);
            out.push_str(":local(");
            out.push_str(text);
            out.push(')');
            copied_to = token.end;
            if shorthand {
                break
            }
        }
    }
    out.push_str(&value[copied_to..]);
    out
}

fn is_animation_name(text: &str, shorthand: bool) -> bool {
    let mut chars = text.chars();
    let starts_numeric = match (chars.next(), chars.next()) {
        (None, _) => return false,
        (Some(c), _) if c.is_ascii_digit() || c == '.' => true,
        (Some('-'), Some(c)) => c.is_ascii_digit() || c == '.',
        _ => false
    };
    if starts_numeric || !text.chars().all(is_ident_char) {
        return false
    }
    let lower = text.to_ascii_lowercase();
    !GLOBAL_KEYWORDS.contains(&lower.as_str())
        && !(shorthand && ANIMATION_KEYWORDS.contains(&lower.as_str()))
}

/// Non-empty subranges of `range` separated by `is_separator` outside of parentheses and strings
fn top_level_ranges(value: &str, range: Range<usize>, is_separator: impl Fn(char) -> bool) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = range.start;
    for (offset, c) in value[range.clone()].char_indices() {
        let idx = range.start + offset;
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 && is_separator(c) => {
                if idx > start {
                    ranges.push(start..idx);
                }
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if range.end > start {
        ranges.push(start..range.end);
    }
    ranges
}
