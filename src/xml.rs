//src/xml.rs

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{BlastError, Result};

/// A minimal in-memory XML element: name, concatenated text and children.
///
/// Attributes are dropped; BLAST XML keeps all of its data in text nodes.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    /// First descendant called `name`, searching depth-first in document order.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant called `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect(name, found);
        }
    }

    /// Raw text of the descendant `field`, failing with `MissingField` when absent.
    pub fn field_text(&self, field: &str) -> Result<&str> {
        self.find(field)
            .map(|el| el.text.as_str())
            .ok_or_else(|| BlastError::MissingField {
                element: self.name.clone(),
                field: field.to_string(),
            })
    }
}

/// Build the element tree of a whole document and return its root.
///
/// Text is kept verbatim: alignment midlines start and end with spaces.
pub fn parse_document(text: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(XmlElement::new(e.name().as_ref())),
            Event::Empty(e) => {
                let el = XmlElement::new(e.name().as_ref());
                attach(&mut stack, &mut root, el);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(BlastError::MissingField {
            field: format!("/{}", open.name),
            element: open.name,
        });
    }
    root.ok_or_else(|| BlastError::MissingField {
        element: "document".to_string(),
        field: "root element".to_string(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}
