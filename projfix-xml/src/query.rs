//! A small ElementTree-style path language, matched by local name only.
//!
//! Supported: `.`, `/`, `//`, `*`, names qualified with `{ns}`, `{*}` or `prefix:` (the
//! qualifier is ignored), and attribute predicates `[@a]`, `[@a='v']`, `[@a="v"]`.
//! Paths are relative to a context element, which is never itself a match.

use crate::dom::{Element, NodePath, local_name};
use crate::error::DocError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrPredicate {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    axis: Axis,
    /// `None` is the `*` wildcard.
    local: Option<String>,
    predicates: Vec<AttrPredicate>,
}

impl Step {
    fn accepts(&self, el: &Element) -> bool {
        if let Some(local) = &self.local
            && el.local_name() != local.as_str()
        {
            return false;
        }
        self.predicates.iter().all(|p| match (&p.value, el.attr(&p.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(got)) => want.as_str() == got,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    steps: Vec<Step>,
}

impl Query {
    /// `.//local`: any descendant with this local name.
    pub fn descendant(local: &str) -> Self {
        Self::from_steps(vec![Step {
            axis: Axis::Descendant,
            local: Some(local_name(local).to_string()),
            predicates: Vec::new(),
        }])
    }

    /// `./local`: a direct child with this local name.
    pub fn child(local: &str) -> Self {
        Self::from_steps(vec![Step {
            axis: Axis::Child,
            local: Some(local_name(local).to_string()),
            predicates: Vec::new(),
        }])
    }

    /// Require the last step's element to carry `name`.
    pub fn with_attr(mut self, name: &str) -> Self {
        self.push_predicate(name, None);
        self
    }

    /// Require the last step's element to carry `name="value"`.
    pub fn with_attr_value(mut self, name: &str, value: &str) -> Self {
        self.push_predicate(name, Some(value.to_string()));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Lazily iterate matches below `context` in document order.
    pub fn matches_in<'a, 'q>(&'q self, context: &'a Element) -> Matches<'a, 'q> {
        Matches {
            query: self,
            frames: vec![Frame {
                element: context,
                index: 0,
                next: 0,
            }],
        }
    }

    fn from_steps(steps: Vec<Step>) -> Self {
        let source = render(&steps);
        Self { source, steps }
    }

    fn push_predicate(&mut self, name: &str, value: Option<String>) {
        if let Some(last) = self.steps.last_mut() {
            last.predicates.push(AttrPredicate {
                name: name.to_string(),
                value,
            });
        }
        self.source = render(&self.steps);
    }

    /// `chain[0]` is the context element, the last entry is the candidate.
    fn matches_chain(&self, chain: &[&Element]) -> bool {
        matches_from(&self.steps, chain, 0)
    }
}

fn matches_from(steps: &[Step], chain: &[&Element], ctx: usize) -> bool {
    let Some((step, rest)) = steps.split_first() else {
        return ctx + 1 == chain.len();
    };
    match step.axis {
        Axis::Child => {
            let next = ctx + 1;
            next < chain.len() && step.accepts(chain[next]) && matches_from(rest, chain, next)
        }
        Axis::Descendant => (ctx + 1..chain.len())
            .any(|next| step.accepts(chain[next]) && matches_from(rest, chain, next)),
    }
}

fn render(steps: &[Step]) -> String {
    let mut out = String::from(".");
    for step in steps {
        out.push_str(match step.axis {
            Axis::Child => "/",
            Axis::Descendant => "//",
        });
        out.push_str(step.local.as_deref().unwrap_or("*"));
        for p in &step.predicates {
            match &p.value {
                Some(v) => out.push_str(&format!("[@{}='{}']", p.name, v)),
                None => out.push_str(&format!("[@{}]", p.name)),
            }
        }
    }
    out
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Query {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |message: &str| DocError::Query {
            query: s.to_string(),
            message: message.to_string(),
        };

        let mut rest = s.trim();
        if let Some(r) = rest.strip_prefix('.')
            && !r.starts_with('.')
        {
            rest = r;
        }

        let mut steps = Vec::new();
        let mut first = true;
        while !rest.is_empty() {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                Axis::Child
            } else if first {
                Axis::Child
            } else {
                return Err(err("expected '/' between steps"));
            };
            first = false;

            let (name, after) = split_name(rest).map_err(err)?;
            rest = after;
            let local = match local_name(name) {
                "" => return Err(err("empty step name")),
                "*" => None,
                l => Some(l.to_string()),
            };

            let mut predicates = Vec::new();
            while let Some(r) = rest.strip_prefix('[') {
                let close = r.find(']').ok_or_else(|| err("unterminated predicate"))?;
                predicates.push(parse_predicate(&r[..close]).map_err(err)?);
                rest = &r[close + 1..];
            }

            steps.push(Step {
                axis,
                local,
                predicates,
            });
        }

        if steps.is_empty() {
            return Err(err("query selects nothing"));
        }
        Ok(Self::from_steps(steps))
    }
}

/// Split a step name off the front, allowing a `{...}` qualifier that may contain `/`.
fn split_name(input: &str) -> Result<(&str, &str), &'static str> {
    let mut end = 0;
    if input.starts_with('{') {
        end = input.find('}').ok_or("unterminated '{' qualifier")? + 1;
    }
    let tail = &input[end..];
    let len = tail.find(['/', '[']).unwrap_or(tail.len());
    Ok(input.split_at(end + len))
}

fn parse_predicate(body: &str) -> Result<AttrPredicate, &'static str> {
    let body = body
        .trim()
        .strip_prefix('@')
        .ok_or("only attribute predicates are supported")?;
    match body.split_once('=') {
        None => Ok(AttrPredicate {
            name: body.trim().to_string(),
            value: None,
        }),
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or("predicate value must be quoted")?;
            Ok(AttrPredicate {
                name: name.trim().to_string(),
                value: Some(unquoted.to_string()),
            })
        }
    }
}

struct Frame<'a> {
    element: &'a Element,
    /// Index of this element in its parent's `children`.
    index: usize,
    /// Next child index to visit.
    next: usize,
}

/// Depth-first, document-order iterator over query matches.
pub struct Matches<'a, 'q> {
    query: &'q Query,
    frames: Vec<Frame<'a>>,
}

impl<'a> Iterator for Matches<'a, '_> {
    type Item = (NodePath, &'a Element);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.frames.last_mut()?;
            let parent = top.element;
            let found = parent.children[top.next..]
                .iter()
                .enumerate()
                .find_map(|(offset, node)| node.as_element().map(|el| (top.next + offset, el)));

            let Some((index, child)) = found else {
                self.frames.pop();
                continue;
            };
            top.next = index + 1;
            self.frames.push(Frame {
                element: child,
                index,
                next: 0,
            });

            let chain: Vec<&Element> = self.frames.iter().map(|f| f.element).collect();
            if self.query.matches_chain(&chain) {
                let path = self.frames[1..].iter().map(|f| f.index).collect();
                return Some((path, child));
            }
        }
    }
}
