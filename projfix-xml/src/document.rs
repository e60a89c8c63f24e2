use crate::dom::{Element, Misc, Node, NodePath};
use crate::error::{DocError, DocResult};
use crate::parse::{Parsed, parse_document, parse_fragment};
use crate::query::Query;
use crate::write::{LineEnding, serialize_document};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// One parsed project file.
///
/// A document opened from disk keeps its file handle until it is dropped, so there is one
/// live handle per file and the tree is the only mutable copy until [`Document::write_back`].
/// Nothing is saved implicitly. Files without write access open read-only; only
/// `write_back` then fails.
#[derive(Debug)]
pub struct Document {
    path: Option<Utf8PathBuf>,
    file: Option<fs::File>,
    writable: bool,
    original: String,
    prolog: Vec<Misc>,
    root: Element,
    epilog: Vec<Misc>,
    default_namespace: Option<String>,
    line_ending: LineEnding,
}

impl Document {
    /// Open and parse `path`, read-write when permitted and read-only otherwise.
    pub fn open(path: &Utf8Path) -> DocResult<Self> {
        let (mut file, writable) = match fs::OpenOptions::new().read(true).write(true).open(path)
        {
            Ok(file) => (file, true),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!(path = %path, "no write access, opening read-only");
                (fs::File::open(path)?, false)
            }
            Err(e) => return Err(e.into()),
        };
        let mut original = String::new();
        file.read_to_string(&mut original)?;

        let parsed = parse_document(&original, path.as_str())?;
        debug!(path = %path, writable, "opened project file");
        let mut doc = Self::build(Some(path.to_path_buf()), Some(file), original, parsed);
        doc.writable = writable;
        Ok(doc)
    }

    /// Parse a document held in memory. `write_back` is unavailable; use `write_to`.
    pub fn parse(xml: &str) -> DocResult<Self> {
        let parsed = parse_document(xml, "<memory>")?;
        Ok(Self::build(None, None, xml.to_string(), parsed))
    }

    fn build(
        path: Option<Utf8PathBuf>,
        file: Option<fs::File>,
        original: String,
        parsed: Parsed,
    ) -> Self {
        let Parsed {
            prolog,
            root,
            epilog,
        } = parsed;
        let default_namespace = root.attr("xmlns").map(str::to_string);
        let line_ending = LineEnding::detect(&original);
        Self {
            path,
            file,
            writable: false,
            original,
            prolog,
            root,
            epilog,
            default_namespace,
            line_ending,
        }
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// The `xmlns` declared on the root element, if any.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// The text the document was parsed from.
    pub fn original_text(&self) -> &str {
        &self.original
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Comments, processing instructions and doctype before the root element.
    pub fn prolog(&self) -> &[Misc] {
        &self.prolog
    }

    pub fn epilog(&self) -> &[Misc] {
        &self.epilog
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn find_first(&self, query: &Query) -> Option<&Element> {
        self.root.find_first(query)
    }

    /// Lazy, document-order matches.
    pub fn find_all<'a, 'q>(
        &'a self,
        query: &'q Query,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'q> {
        self.root.find_all(query)
    }

    /// Paths of every match, collected up front so the caller can mutate afterwards.
    pub fn select_paths(&self, query: &Query) -> Vec<NodePath> {
        query.matches_in(&self.root).map(|(path, _)| path).collect()
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.root.node_at(path)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.root.node_at_mut(path)
    }

    pub fn find_first_mut(&mut self, query: &Query) -> Option<&mut Element> {
        let path = query.matches_in(&self.root).next().map(|(path, _)| path)?;
        self.root.node_at_mut(&path)
    }

    pub fn contains(&self, query: &Query) -> bool {
        self.find_first(query).is_some()
    }

    /// Set the text of the first descendant named `tag`. Returns whether it was found;
    /// a miss is logged and leaves the tree unchanged.
    pub fn set_element_text(&mut self, tag: &str, text: &str) -> bool {
        match self.find_first_mut(&Query::descendant(tag)) {
            Some(el) => {
                el.set_text(text);
                true
            }
            None => {
                warn!(
                    path = %self.origin(),
                    "element <{tag}> not found, text not set"
                );
                false
            }
        }
    }

    /// Append `fragment` as the last child of the first element matching `parent`.
    /// A missing parent is a structure error. Unprefixed fragment elements take the
    /// parent's namespace prefix.
    pub fn insert_fragment_as_child(&mut self, parent: &Query, fragment: &str) -> DocResult<()> {
        let mut child = parse_fragment(fragment)?;
        let origin = self.origin();
        let target = self
            .find_first_mut(parent)
            .ok_or_else(|| DocError::Structure {
                message: format!("{origin}: no element matches {parent} to append into"),
            })?;
        if let Some(prefix) = target.prefix() {
            child.adopt_prefix(prefix);
        }
        target.append_child(child);
        Ok(())
    }

    /// Insert `fragment` right after the first element matching `anchor`. Returns `false`
    /// and leaves the tree alone when there is no anchor. Unprefixed fragment elements take
    /// the anchor's namespace prefix.
    pub fn insert_fragment_as_sibling(&mut self, anchor: &Query, fragment: &str) -> DocResult<bool> {
        let mut sibling = parse_fragment(fragment)?;
        let Some(path) = self.select_paths(anchor).into_iter().next() else {
            debug!(path = %self.origin(), "anchor {anchor} not found, nothing inserted");
            return Ok(false);
        };
        if let Some(anchor_el) = self.root.node_at(&path)
            && let Some(prefix) = anchor_el.prefix()
        {
            // The anchor may bind the prefix itself; the sibling then needs its own binding.
            let binding = format!("xmlns:{prefix}");
            let declared = anchor_el.attr(&binding).map(str::to_string);
            sibling.adopt_prefix(prefix);
            if let Some(uri) = declared {
                sibling.set_attr(&binding, uri);
            }
        }
        let Some((&index, parent_path)) = path.split_last() else {
            return Ok(false);
        };
        let Some(parent) = self.root.node_at_mut(parent_path) else {
            return Ok(false);
        };
        parent.children.insert(index + 1, Node::Element(sibling));
        Ok(true)
    }

    /// Serialize the current tree.
    pub fn to_xml_string(&self) -> String {
        serialize_document(&self.prolog, &self.root, &self.epilog, self.line_ending)
    }

    /// Replace the source file with the serialized tree.
    ///
    /// The new contents go to a temporary file in the same directory, which then takes the
    /// source's place with its permissions; a failed write leaves the source intact. The held
    /// handle moves to the new file.
    pub fn write_back(&mut self) -> DocResult<()> {
        let contents = self.to_xml_string();
        let origin = self.origin();
        let (Some(path), Some(file)) = (self.path.clone(), self.file.as_ref()) else {
            return Err(DocError::Structure {
                message: format!("{origin} was not opened from a file; use write_to"),
            });
        };
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{origin} was opened read-only"),
            )
            .into());
        }

        let permissions = file.metadata()?.permissions();
        let dir = match path.parent() {
            Some(dir) if !dir.as_str().is_empty() => dir,
            _ => Utf8Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.as_file().set_permissions(permissions)?;
        staged.as_file().sync_all()?;
        let replaced = staged.persist(&path).map_err(|e| e.error)?;

        self.file = Some(fs::File::from_parts(replaced, path.into_std_path_buf()));
        debug!(path = %origin, bytes = contents.len(), "wrote project file");
        Ok(())
    }

    /// Serialize to another path. The source file, if any, is left as it is.
    pub fn write_to(&self, path: &Utf8Path) -> DocResult<()> {
        fs::write(path, self.to_xml_string())?;
        Ok(())
    }

    fn origin(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}
