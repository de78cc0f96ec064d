//! AVTransport LastChange extraction
//!
//! A renderer publishes its transport state as a LastChange document:
//! ```xml
//! <Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/">
//!   <InstanceID val="0">
//!     <TransportState val="PLAYING"/>
//!     <CurrentTrackMetaData val="&lt;DIDL-Lite ...&gt;...&lt;/DIDL-Lite&gt;"/>
//!   </InstanceID>
//! </Event>
//! ```
//!
//! On the wire the LastChange document is itself escaped inside a GENA
//! property set; both forms are accepted.

use crate::common::didl;
use crate::common::xml_decode::{self, Node};
use crate::error::{ParseResult, ParseStage};
use crate::track::Track;

/// Element carrying the escaped DIDL-Lite document
pub const METADATA_ELEMENT: &str = "CurrentTrackMetaData";

/// Attribute of [`METADATA_ELEMENT`] holding the DIDL-Lite document
pub const METADATA_ATTRIBUTE: &str = "val";

/// Property-set element whose text is the escaped LastChange document
pub const LAST_CHANGE_ELEMENT: &str = "LastChange";

/// LastChange documents nested inside a property set are unwrapped at most
/// this many times
const MAX_ENVELOPE_DEPTH: usize = 1;

/// Extract the current track from a raw LastChange event.
///
/// Runs the two parse phases in sequence: the outer document is scanned for
/// the first `CurrentTrackMetaData` element, and its unescaped `val`
/// attribute is parsed as DIDL-Lite. An event without track metadata yields
/// the empty track.
///
/// # Errors
///
/// [`crate::ParseError::MalformedEvent`] when the outer document is not
/// well-formed, [`crate::ParseError::MalformedMetadata`] when the nested
/// DIDL-Lite document is not.
pub fn extract_track(raw: &str) -> ParseResult<Track> {
    match find_track_metadata(raw)? {
        Some(metadata) => didl::parse_track_metadata(&metadata),
        None => Ok(Track::empty()),
    }
}

/// Outer phase: the unescaped `CurrentTrackMetaData@val` of `raw`, if any.
///
/// Element names are compared literally. The first metadata element wins;
/// the rest of the document is still checked for well-formedness. When
/// `raw` is a property set, the escaped LastChange text is decoded and
/// scanned the same way. A LastChange nested inside that document is
/// ignored.
pub fn find_track_metadata(raw: &str) -> ParseResult<Option<String>> {
    scan_for_metadata(raw, MAX_ENVELOPE_DEPTH)
}

fn scan_for_metadata(raw: &str, envelopes: usize) -> ParseResult<Option<String>> {
    let mut metadata: Option<Option<String>> = None;
    let mut last_change: Option<(usize, String)> = None;
    let mut nested = Vec::new();

    xml_decode::walk(raw, |node| {
        match node {
            Node::Open {
                element,
                depth,
                position,
            } => {
                let name = element.name();
                if metadata.is_none() && name.as_ref() == METADATA_ELEMENT.as_bytes() {
                    metadata = Some(xml_decode::attribute_value(
                        element,
                        METADATA_ATTRIBUTE.as_bytes(),
                        position,
                    )?);
                } else if envelopes > 0
                    && last_change.is_none()
                    && name.as_ref() == LAST_CHANGE_ELEMENT.as_bytes()
                {
                    last_change = Some((depth, String::new()));
                }
            }
            Node::Text(text) => {
                if let Some((_, buffer)) = last_change.as_mut() {
                    buffer.push_str(text);
                }
            }
            Node::Close { depth } => {
                if last_change.as_ref().is_some_and(|(open, _)| *open == depth) {
                    if let Some((_, document)) = last_change.take() {
                        nested.push(document);
                    }
                }
            }
        }
        Ok(())
    })
    .map_err(|fault| fault.into_error(ParseStage::Event))?;

    if let Some(found) = metadata {
        return Ok(found);
    }

    for document in nested {
        if document.trim().is_empty() {
            continue;
        }
        if let Some(found) = scan_for_metadata(&document, envelopes - 1)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}
