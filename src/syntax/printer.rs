use crate::syntax::nodes::{Node, Span, Stylesheet};

/// Serialize a stylesheet using the raws recorded by the parser (or set by passes)
pub fn print(sheet: &Stylesheet) -> String {
    let mut printer = Printer::new(false);
    printer.stylesheet(sheet);
    printer.out
}

/// Print a single node without its leading whitespace
pub fn print_node(node: &Node) -> String {
    let mut printer = Printer::new(false);
    printer.node_body(node, true, true);
    printer.out
}

/// Generated position of a node boundary, paired with the span it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Marker {
    pub generated_line: usize,
    pub generated_column: usize,
    /// Byte offset in the original input
    pub original_offset: usize,
}

pub(crate) struct Printer {
    pub out: String,
    pub markers: Option<Vec<Marker>>,
    line: usize,
    column: usize,
}

impl Printer {
    pub fn new(track_markers: bool) -> Self {
        Self {
            out: String::new(),
            markers: track_markers.then(Vec::new),
            line: 0,
            column: 0,
        }
    }

    pub fn stylesheet(&mut self, sheet: &Stylesheet) {
        self.nodes(&sheet.nodes, sheet.semicolon);
        self.push(&sheet.after);
    }

    fn nodes(&mut self, nodes: &[Node], semicolon: bool) {
        for (idx, node) in nodes.iter().enumerate() {
            let last = idx + 1 == nodes.len();
            self.push(&node.raws().before);
            self.node_body(node, last, semicolon);
        }
    }

    fn node_body(&mut self, node: &Node, last: bool, parent_semicolon: bool) {
        let span = node.span();
        self.mark(span.map(|span| span.start));
        let terminate = !last || parent_semicolon;
        match node {
            Node::Rule(rule) => {
                self.push(&rule.selector);
                self.push(&rule.raws.between);
                self.push("{");
                self.nodes(&rule.nodes, rule.semicolon);
                self.push(&rule.raws.after);
                self.push("}");
                self.mark_end(span);
            }
            Node::AtRule(at_rule) => {
                self.push("@");
                self.push(&at_rule.name);
                self.push(&at_rule.after_name);
                self.push(&at_rule.params);
                self.push(&at_rule.raws.between);
                match &at_rule.nodes {
                    Some(children) => {
                        self.push("{");
                        self.nodes(children, at_rule.semicolon);
                        self.push(&at_rule.raws.after);
                        self.push("}");
                        self.mark_end(span);
                    }
                    None => {
                        self.mark_end(span);
                        if terminate {
                            self.push(";");
                        }
                    }
                }
            }
            Node::Decl(decl) => {
                self.push(&decl.prop);
                self.push(&decl.raws.between);
                self.push(&decl.value);
                if let Some(important) = &decl.important {
                    self.push(important);
                }
                self.mark_end(span);
                self.push(&decl.raws.after);
                if terminate {
                    self.push(";");
                }
            }
            Node::Comment(comment) => {
                self.push("/*");
                self.push(&comment.text);
                self.push("*/");
                self.mark_end(span);
            }
        }
    }

    fn mark(&mut self, original_offset: Option<usize>) {
        if let (Some(markers), Some(original_offset)) = (self.markers.as_mut(), original_offset) {
            markers.push(Marker {
                generated_line: self.line,
                generated_column: self.column,
                original_offset,
            });
        }
    }

    fn mark_end(&mut self, span: Option<Span>) {
        self.mark(span.map(|span| span.end))
    }

    fn push(&mut self, text: &str) {
        if self.markers.is_some() {
            for c in text.chars() {
                if c == '\n' {
                    self.line += 1;
                    self.column = 0;
                } else {
                    self.column += c.len_utf16();
                }
            }
        }
        self.out.push_str(text);
    }
}
