use crate::query::Query;

/// Child indices from the root element down to a node, indexing `Element::children`.
pub type NodePath = Vec<usize>;

/// Strip any `{ns}` or `prefix:` qualifier from a tag name.
pub fn local_name(name: &str) -> &str {
    let name = match name.rfind('}') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// The `prefix` of a `prefix:local` name. `{ns}local` names have none.
pub fn name_prefix(name: &str) -> Option<&str> {
    if name.starts_with('{') {
        return None;
    }
    name.split_once(':').map(|(prefix, _)| prefix)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    /// Processing instruction body, between `<?` and `?>`.
    Instruction(String),
}

/// Markup before or after the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misc {
    Comment(String),
    Instruction(String),
    /// Everything between `<!DOCTYPE ` and the closing `>`.
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// An XML element. `name` is kept exactly as written (prefix included) so serialization
/// reproduces it; lookups go through [`Element::local_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style text setter, mostly for constructing small elements in code.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        name_prefix(&self.name)
    }

    /// Qualify every unprefixed element name in this subtree with `prefix`. Subtrees that
    /// declare their own default namespace are left as they are.
    pub fn adopt_prefix(&mut self, prefix: &str) {
        if self.attr("xmlns").is_some() {
            return;
        }
        if name_prefix(&self.name).is_none() && !self.name.starts_with('{') {
            self.name = format!("{prefix}:{}", self.name);
        }
        for child in self.children.iter_mut().filter_map(Node::as_element_mut) {
            child.adopt_prefix(prefix);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Concatenated text and CDATA content, or `None` when the element has none.
    pub fn text(&self) -> Option<String> {
        let mut out: Option<String> = None;
        for child in &self.children {
            if let Node::Text(t) | Node::CData(t) = child {
                out.get_or_insert_with(String::new).push_str(t);
            }
        }
        out
    }

    /// Replace all text content with `text`. Child elements and comments stay.
    /// An empty string leaves the element without text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children
            .retain(|c| !matches!(c, Node::Text(_) | Node::CData(_)));
        if !text.is_empty() {
            self.children.insert(0, Node::Text(text));
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First direct child with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|el| el.local_name() == local)
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, Node::Element(_) | Node::Comment(_) | Node::Instruction(_)))
    }

    /// Markup alongside non-blank text or CDATA. Such elements are written inline, with no
    /// layout whitespace added or removed.
    pub fn has_mixed_content(&self) -> bool {
        self.has_element_children()
            && self.children.iter().any(|c| match c {
                Node::Text(t) => !t.trim().is_empty(),
                Node::CData(_) => true,
                _ => false,
            })
    }

    /// First element matching `query`, evaluated with `self` as the context node.
    pub fn find_first(&self, query: &Query) -> Option<&Element> {
        query.matches_in(self).next().map(|(_, el)| el)
    }

    pub fn find_all<'a, 'q>(
        &'a self,
        query: &'q Query,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'q> {
        query.matches_in(self).map(|(_, el)| el)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &idx in path {
            current = current.children.get(idx)?.as_element()?;
        }
        Some(current)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &idx in path {
            current = current.children.get_mut(idx)?.as_element_mut()?;
        }
        Some(current)
    }
}
