use crate::dom::{Element, Misc, Node};
use crate::error::{DocError, DocResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A parsed document: the root element and the markup around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Parsed {
    pub prolog: Vec<Misc>,
    pub root: Element,
    pub epilog: Vec<Misc>,
}

/// Parse a standalone XML fragment (one element, surrounding whitespace allowed).
pub fn parse_fragment(xml: &str) -> DocResult<Element> {
    parse_tree(xml, "<fragment>")
}

/// Parse `xml` into its root element. `origin` names the source in error messages.
pub(crate) fn parse_tree(xml: &str, origin: &str) -> DocResult<Element> {
    parse_document(xml, origin).map(|parsed| parsed.root)
}

/// Parse `xml`, keeping comments, processing instructions and the doctype that surround
/// the root. The XML declaration is not kept; the writer emits its own.
pub(crate) fn parse_document(xml: &str, origin: &str) -> DocResult<Parsed> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut prolog: Vec<Misc> = Vec::new();
    let mut epilog: Vec<Misc> = Vec::new();

    let at = |reader: &Reader<&[u8]>, msg: String| {
        DocError::parse(origin, format!("{msg} (at byte {})", reader.buffer_position()))
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(at(&reader, "multiple root elements".to_string()));
                }
                stack.push(start_element(e).map_err(|m| at(&reader, m))?);
            }
            Ok(Event::End(_)) => {
                let mut completed = stack
                    .pop()
                    .ok_or_else(|| at(&reader, "unexpected closing tag".to_string()))?;
                drop_layout_whitespace(&mut completed);
                attach(&mut stack, &mut root, completed);
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(at(&reader, "multiple root elements".to_string()));
                }
                let el = start_element(e).map_err(|m| at(&reader, m))?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| at(&reader, format!("text error: {err}")))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                    None if text.trim().is_empty() => {}
                    None => return Err(at(&reader, "text outside the root element".to_string())),
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|err| at(&reader, format!("cdata error: {err}")))?
                    .to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(text)),
                    None => return Err(at(&reader, "cdata outside the root element".to_string())),
                }
            }
            Ok(Event::Comment(ref e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|err| at(&reader, format!("comment error: {err}")))?
                    .to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Comment(text)),
                    None => outside(&root, &mut prolog, &mut epilog).push(Misc::Comment(text)),
                }
            }
            Ok(Event::PI(ref e)) => {
                let text = std::str::from_utf8(e)
                    .map_err(|err| at(&reader, format!("processing instruction error: {err}")))?
                    .to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Instruction(text)),
                    None => outside(&root, &mut prolog, &mut epilog).push(Misc::Instruction(text)),
                }
            }
            Ok(Event::DocType(ref e)) => {
                if root.is_some() || !stack.is_empty() {
                    return Err(at(&reader, "doctype after the root element".to_string()));
                }
                let text = std::str::from_utf8(e)
                    .map_err(|err| at(&reader, format!("doctype error: {err}")))?
                    .to_string();
                prolog.push(Misc::DocType(text));
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    let unclosed: Vec<&str> = stack.iter().map(|el| el.name.as_str()).collect();
                    return Err(DocError::parse(
                        origin,
                        format!("unclosed element(s): <{}>", unclosed.join(">, <")),
                    ));
                }
                break;
            }
            // The declaration is regenerated on write.
            Ok(Event::Decl(_)) => {}
            Err(e) => {
                return Err(DocError::parse(
                    origin,
                    format!("{e} (at byte {})", reader.error_position()),
                ));
            }
        }
    }

    let root = root.ok_or_else(|| DocError::parse(origin, "no root element found"))?;
    Ok(Parsed {
        prolog,
        root,
        epilog,
    })
}

fn outside<'v>(
    root: &Option<Element>,
    prolog: &'v mut Vec<Misc>,
    epilog: &'v mut Vec<Misc>,
) -> &'v mut Vec<Misc> {
    if root.is_some() { epilog } else { prolog }
}

fn start_element(e: &BytesStart) -> Result<Element, String> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| format!("invalid element name: {err}"))?
        .to_string();
    let mut el = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("attribute error: {err}"))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| format!("attribute key error: {err}"))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("attribute value error: {err}"))?
            .into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

/// Whitespace between child elements is layout, regenerated on write. Text-only and mixed
/// elements keep their content verbatim.
fn drop_layout_whitespace(el: &mut Element) {
    if el.has_element_children() && !el.has_mixed_content() {
        el.children
            .retain(|c| !matches!(c, Node::Text(t) if t.trim().is_empty()));
    }
}
