use std::ops::Range;
use std::rc::Rc;

/// A parsed stylesheet: the root of the tree.
///
/// Whitespace and punctuation between nodes are kept in each node's [Raws], so printing an
/// untouched tree reproduces the input exactly.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
    /// Whitespace after the last node
    pub after: String,
    /// Whether the last declaration-like child ends with `;`
    pub semicolon: bool,
    /// The text this was parsed from. Spans index into it
    pub input: Rc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Decl),
    Comment(Comment),
}

/// Formatting kept around each node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raws {
    /// Whitespace (and stray `;`) before the node
    pub before: String,
    /// Rule/at-rule: whitespace before `{` or `;`. Decl: the `:` with its surrounding whitespace
    pub between: String,
    /// Block: whitespace before `}`. Decl: whitespace between the value and `;`
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub semicolon: bool,
    pub raws: Raws,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    /// Whitespace between the name and the params
    pub after_name: String,
    pub params: String,
    /// `None` for statements like `@import "x";`
    pub nodes: Option<Vec<Node>>,
    pub semicolon: bool,
    pub raws: Raws,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub prop: String,
    pub value: String,
    /// Raw `!important` suffix including its leading whitespace, if any
    pub important: Option<String>,
    pub raws: Raws,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Everything between `/*` and `*/`
    pub text: String,
    pub raws: Raws,
    pub span: Option<Span>,
}

/// Byte range of a node in [Stylesheet::input], end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Stylesheet {
    /// Original source text of a node, if it came from the parser
    pub fn source_of(&self, node: &Node) -> Option<&str> {
        node.span().and_then(|span| self.input.get(span.range()))
    }

    /// Insert at the top. The old first node takes the leading whitespace of the node after it,
    /// and [Self::retain] hands the new node's (empty) whitespace back if it is removed again.
    pub fn prepend(&mut self, mut node: Node) {
        node.raws_mut().before = String::new();
        if !self.nodes.is_empty() {
            let before = self.nodes.get(1)
                .map_or_else(|| "\n".to_string(), |second| second.raws().before.clone());
            self.nodes[0].raws_mut().before = before;
        }
        self.nodes.insert(0, node);
    }

    /// Insert at the bottom, spaced like the current last node unless that is also the first
    pub fn append(&mut self, mut node: Node) {
        if self.nodes.len() > 1 {
            if let Some(last) = self.nodes.last() {
                node.raws_mut().before = last.raws().before.clone();
            }
        }
        self.nodes.push(node);
    }

    /// Remove top-level nodes where `keep` is false. Removing the first node moves its leading
    /// whitespace onto the node which becomes first.
    pub fn retain(&mut self, mut keep: impl FnMut(&Node) -> bool) {
        let mut idx = 0;
        while idx < self.nodes.len() {
            if keep(&self.nodes[idx]) {
                idx += 1;
                continue
            }
            let removed = self.nodes.remove(idx);
            if idx == 0 {
                if let Some(first) = self.nodes.first_mut() {
                    first.raws_mut().before = removed.raws().before.clone();
                }
            }
        }
    }

    /// Visit every node depth-first, parents before children
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        walk_nodes_mut(&mut self.nodes, f)
    }

    /// Visit every rule with its chain of enclosing at-rule names
    pub fn walk_rules_mut(&mut self, f: &mut impl FnMut(&mut Rule, &[String])) {
        let mut at_rules = Vec::new();
        walk_rules_mut(&mut self.nodes, &mut at_rules, f)
    }

    pub fn walk_decls_mut(&mut self, f: &mut impl FnMut(&mut Decl)) {
        self.walk_mut(&mut |node| if let Node::Decl(decl) = node {
            f(decl)
        })
    }
}

fn walk_nodes_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Node)) {
    for node in nodes {
        f(node);
        if let Some(children) = node.children_mut() {
            walk_nodes_mut(children, f);
        }
    }
}

fn walk_rules_mut(
    nodes: &mut [Node],
    at_rules: &mut Vec<String>,
    f: &mut impl FnMut(&mut Rule, &[String])
) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                f(rule, at_rules);
                walk_rules_mut(&mut rule.nodes, at_rules, f);
            }
            Node::AtRule(at_rule) => {
                if let Some(children) = at_rule.nodes.as_mut() {
                    at_rules.push(at_rule.name.clone());
                    walk_rules_mut(children, at_rules, f);
                    at_rules.pop();
                }
            }
            Node::Decl(_) | Node::Comment(_) => {}
        }
    }
}

impl Node {
    /// A rule not backed by source text, e.g. a generated `:export` block
    pub fn rule(selector: impl Into<String>, nodes: Vec<Node>) -> Self {
        Node::Rule(Rule {
            selector: selector.into(),
            nodes,
            semicolon: true,
            raws: Raws {
                before: "\n".to_string(),
                between: " ".to_string(),
                after: "\n".to_string(),
            },
            span: None
        })
    }

    pub fn decl(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Node::Decl(Decl {
            prop: prop.into(),
            value: value.into(),
            important: None,
            raws: Raws {
                before: "\n  ".to_string(),
                between: ": ".to_string(),
                after: String::new(),
            },
            span: None
        })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment(Comment {
            text: text.into(),
            raws: Raws {
                before: "\n".to_string(),
                ..Raws::default()
            },
            span: None
        })
    }

    pub fn raws(&self) -> &Raws {
        match self {
            Node::Rule(rule) => &rule.raws,
            Node::AtRule(at_rule) => &at_rule.raws,
            Node::Decl(decl) => &decl.raws,
            Node::Comment(comment) => &comment.raws,
        }
    }

    pub fn raws_mut(&mut self) -> &mut Raws {
        match self {
            Node::Rule(rule) => &mut rule.raws,
            Node::AtRule(at_rule) => &mut at_rule.raws,
            Node::Decl(decl) => &mut decl.raws,
            Node::Comment(comment) => &mut comment.raws,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Node::Rule(rule) => rule.span,
            Node::AtRule(at_rule) => at_rule.span,
            Node::Decl(decl) => decl.span,
            Node::Comment(comment) => comment.span,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Rule(rule) => Some(&mut rule.nodes),
            Node::AtRule(at_rule) => at_rule.nodes.as_mut(),
            Node::Decl(_) | Node::Comment(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Node::Rule(rule) => Some(rule),
            _ => None
        }
    }

    /// Decls and body-less at-rules are terminated by `;` (except possibly the last one)
    pub(crate) fn is_statement(&self) -> bool {
        match self {
            Node::Decl(_) => true,
            Node::AtRule(at_rule) => at_rule.nodes.is_none(),
            Node::Rule(_) | Node::Comment(_) => false,
        }
    }
}

impl Rule {
    /// The declarations directly inside this rule
    pub fn decls(&self) -> impl Iterator<Item=&Decl> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Decl(decl) => Some(decl),
            _ => None
        })
    }
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}
