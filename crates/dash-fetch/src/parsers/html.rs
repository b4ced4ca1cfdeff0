//! HTML artifact parsing
//!
//! Builds an `html5ever` tree (`markup5ever_rcdom`) and exposes the small
//! amount of querying the directory lister needs: elements by tag and class,
//! first descendant by tag, attributes and text content.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fmt;

/// A parsed HTML document
pub struct HtmlDocument {
    dom: RcDom,
}

impl HtmlDocument {
    /// Parse bytes as an HTML document
    ///
    /// Never fails: invalid UTF-8 sequences become U+FFFD and broken markup is
    /// recovered the way browsers do.
    #[must_use]
    pub fn parse(content: &[u8]) -> Self {
        let text = String::from_utf8_lossy(content);
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(&*text);
        Self { dom }
    }

    /// The document node
    #[must_use]
    pub fn root(&self) -> HtmlElement {
        HtmlElement(self.dom.document.clone())
    }

    /// All `tag` elements carrying `class`, in document order
    #[must_use]
    pub fn elements_with_class(&self, tag: &str, class: &str) -> Vec<HtmlElement> {
        self.root().descendants_where(|el| el.is(tag) && el.has_class(class))
    }

    /// All `tag` elements, in document order
    #[must_use]
    pub fn elements(&self, tag: &str) -> Vec<HtmlElement> {
        self.root().descendants_where(|el| el.is(tag))
    }
}

impl fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlDocument")
            .field("root", &self.root())
            .finish_non_exhaustive()
    }
}

/// A node of a parsed document
#[derive(Clone)]
pub struct HtmlElement(Handle);

impl HtmlElement {
    /// Local tag name, if this node is an element
    #[must_use]
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.data {
            NodeData::Element { name, .. } => Some(name.local.to_string()),
            _ => None,
        }
    }

    /// Check if this node is a `tag` element
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        match &self.0.data {
            NodeData::Element { name, .. } => (*name.local).eq_ignore_ascii_case(tag),
            _ => false,
        }
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, attr_name: &str) -> Option<String> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| (*a.name.local).eq_ignore_ascii_case(attr_name))
                .map(|a| a.value.to_string()),
            _ => None,
        }
    }

    /// Check if the `class` attribute lists `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Concatenated text of this node and its descendants
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.0, &mut out);
        out
    }

    /// First `tag` element below this node, in document order
    #[must_use]
    pub fn find_first(&self, tag: &str) -> Option<HtmlElement> {
        find_first(&self.0, tag).map(HtmlElement)
    }

    /// All descendants matching `predicate`, in document order
    #[must_use]
    pub fn descendants_where<F>(&self, predicate: F) -> Vec<HtmlElement>
    where
        F: Fn(&HtmlElement) -> bool,
    {
        let mut out = Vec::new();
        collect_matching(&self.0, &predicate, &mut out);
        out
    }
}

impl fmt::Debug for HtmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HtmlElement")
            .field(&self.tag_name().unwrap_or_else(|| "#node".to_string()))
            .finish()
    }
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn find_first(handle: &Handle, tag: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if HtmlElement(child.clone()).is(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, tag) {
            return Some(found);
        }
    }
    None
}

fn collect_matching<F>(handle: &Handle, predicate: &F, out: &mut Vec<HtmlElement>)
where
    F: Fn(&HtmlElement) -> bool,
{
    for child in handle.children.borrow().iter() {
        let element = HtmlElement(child.clone());
        if predicate(&element) {
            out.push(element);
        }
        collect_matching(child, predicate, out);
    }
}
