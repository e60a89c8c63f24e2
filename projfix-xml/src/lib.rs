//! XML document handle for projfix.
//!
//! Responsibilities:
//! - Parse a project file into an owned element tree (comments and CDATA kept).
//! - Query elements by local name, ignoring whatever namespace the file declares.
//! - Mutate in place: element text, attributes, fragments inserted as child or sibling.
//! - Serialize back with stable 2-space indentation and an XML declaration.

mod document;
mod dom;
mod error;
mod parse;
mod query;
mod write;

pub use document::Document;
pub use dom::{Element, Misc, Node, NodePath, local_name, name_prefix};
pub use error::{DocError, DocResult};
pub use parse::parse_fragment;
pub use query::{Axis, Matches, Query, Step};
pub use write::LineEnding;
