//! Streaming XML traversal shared by both extraction phases.
//!
//! UPnP events nest one XML document inside an escaped attribute of another.
//! Each document is walked independently with [`walk`], which reports a
//! flattened element/text stream to a visitor and rejects documents that are
//! not well-formed. Element names are reported exactly as written, prefix
//! included; no namespace resolution takes place.

use std::fmt::Display;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ParseError, ParseStage};

/// A node reported by [`walk`]
#[derive(Debug)]
pub(crate) enum Node<'n> {
    /// An element was opened; `depth` is 1 for the root element and
    /// `position` is the byte offset of its start tag
    Open {
        element: &'n BytesStart<'n>,
        depth: usize,
        position: usize,
    },
    /// Unescaped character data (text or CDATA) inside the current element
    Text(&'n str),
    /// The element opened at `depth` was closed
    Close { depth: usize },
}

/// Position and description of a well-formedness failure
#[derive(Debug, Clone)]
pub(crate) struct XmlFault {
    position: usize,
    message: String,
}

impl XmlFault {
    pub(crate) fn new(position: usize, message: impl Display) -> Self {
        Self {
            position,
            message: message.to_string(),
        }
    }

    /// Attach the phase the fault occurred in
    pub(crate) fn into_error(self, stage: ParseStage) -> ParseError {
        match stage {
            ParseStage::Event => ParseError::MalformedEvent {
                position: self.position,
                message: self.message,
            },
            ParseStage::Metadata => ParseError::MalformedMetadata {
                position: self.position,
                message: self.message,
            },
        }
    }
}

/// Walk `xml`, handing every element and text node to `visit`.
///
/// Self-closing elements are reported as an `Open` immediately followed by a
/// `Close`. The walk fails on mismatched or unclosed tags, bad entity
/// references, text outside the root element, multiple root elements and
/// documents without any element. A visitor error aborts the walk.
pub(crate) fn walk<F>(xml: &str, mut visit: F) -> Result<(), XmlFault>
where
    F: FnMut(Node<'_>) -> Result<(), XmlFault>,
{
    let mut reader = Reader::from_str(xml);
    reader.check_end_names(true);

    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| XmlFault::new(reader.buffer_position(), e))?;

        match event {
            Event::Start(element) => {
                enter_element(&mut seen_root, depth, position)?;
                depth += 1;
                visit(Node::Open {
                    element: &element,
                    depth,
                    position,
                })?;
            }
            Event::Empty(element) => {
                enter_element(&mut seen_root, depth, position)?;
                visit(Node::Open {
                    element: &element,
                    depth: depth + 1,
                    position,
                })?;
                visit(Node::Close { depth: depth + 1 })?;
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(XmlFault::new(
                        position,
                        "closing tag without a matching opening tag",
                    ));
                }
                visit(Node::Close { depth })?;
                depth -= 1;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| XmlFault::new(position, e))?;
                if depth > 0 {
                    visit(Node::Text(&text))?;
                } else if !text.trim().is_empty() {
                    return Err(XmlFault::new(position, "text outside of the root element"));
                }
            }
            Event::CData(data) => {
                if depth == 0 {
                    return Err(XmlFault::new(position, "CDATA outside of the root element"));
                }
                let text = std::str::from_utf8(&data).map_err(|e| XmlFault::new(position, e))?;
                visit(Node::Text(text))?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry nothing we extract.
            _ => {}
        }
    }

    if depth > 0 {
        return Err(XmlFault::new(
            reader.buffer_position(),
            format!("unexpected end of document, {depth} element(s) left open"),
        ));
    }
    if !seen_root {
        return Err(XmlFault::new(0, "document has no root element"));
    }

    Ok(())
}

fn enter_element(seen_root: &mut bool, depth: usize, position: usize) -> Result<(), XmlFault> {
    if depth == 0 {
        if *seen_root {
            return Err(XmlFault::new(position, "multiple root elements"));
        }
        *seen_root = true;
    }
    Ok(())
}

/// Read and unescape an attribute of `element`, matching its name literally
pub(crate) fn attribute_value(
    element: &BytesStart<'_>,
    name: &[u8],
    position: usize,
) -> Result<Option<String>, XmlFault> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| XmlFault::new(position, e))?;
        if attribute.key.as_ref() == name {
            let value = attribute
                .unescape_value()
                .map_err(|e| XmlFault::new(position, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
