use crate::dom::{Element, Misc, Node};
use quick_xml::escape::partial_escape;
use std::borrow::Cow;

const INDENT: &str = "  ";
const DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// CRLF if the text uses it anywhere, LF otherwise.
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Serialize a full document: declaration, prolog, root element, epilog, one item per line.
pub(crate) fn serialize_document(
    prolog: &[Misc],
    root: &Element,
    epilog: &[Misc],
    eol: LineEnding,
) -> String {
    let eol = eol.as_str();
    let mut out = String::with_capacity(4096);
    out.push_str(DECLARATION);
    out.push_str(eol);
    for misc in prolog {
        write_misc(misc, &mut out);
        out.push_str(eol);
    }
    write_element(root, 0, eol, &mut out);
    for misc in epilog {
        write_misc(misc, &mut out);
        out.push_str(eol);
    }
    out
}

fn write_misc(misc: &Misc, out: &mut String) {
    match misc {
        Misc::Comment(c) => write_comment(c, out),
        Misc::Instruction(pi) => write_instruction(pi, out),
        Misc::DocType(d) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(d);
            out.push('>');
        }
    }
}

fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"')) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_start(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (k, v) in &el.attributes {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape_attr(v));
        out.push('"');
    }
}

fn write_end(el: &Element, out: &mut String) {
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn write_element(el: &Element, depth: usize, eol: &str, out: &mut String) {
    push_indent(depth, out);
    if el.children.is_empty() {
        write_start(el, out);
        out.push_str(" />");
    } else if el.has_element_children() && !el.has_mixed_content() {
        write_start(el, out);
        out.push('>');
        out.push_str(eol);
        for child in &el.children {
            match child {
                Node::Element(c) => {
                    write_element(c, depth + 1, eol, out);
                    continue;
                }
                // Blank text between children is layout.
                Node::Text(_) => continue,
                node => {
                    push_indent(depth + 1, out);
                    write_inline(node, out);
                }
            }
            out.push_str(eol);
        }
        push_indent(depth, out);
        write_end(el, out);
    } else {
        write_inline_element(el, out);
    }
    out.push_str(eol);
}

/// Write `el` and everything under it exactly as held, with no layout.
fn write_inline_element(el: &Element, out: &mut String) {
    write_start(el, out);
    if el.children.is_empty() {
        out.push_str(" />");
        return;
    }
    out.push('>');
    for child in &el.children {
        write_inline(child, out);
    }
    write_end(el, out);
}

fn write_inline(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => write_inline_element(el, out),
        Node::Text(t) => out.push_str(&partial_escape(t)),
        Node::CData(c) => write_cdata(c, out),
        Node::Comment(c) => write_comment(c, out),
        Node::Instruction(pi) => write_instruction(pi, out),
    }
}

fn write_comment(c: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(c);
    out.push_str("-->");
}

fn write_instruction(pi: &str, out: &mut String) {
    out.push_str("<?");
    out.push_str(pi);
    out.push_str("?>");
}

fn write_cdata(c: &str, out: &mut String) {
    out.push_str("<![CDATA[");
    out.push_str(c);
    out.push_str("]]>");
}
