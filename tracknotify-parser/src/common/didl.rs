//! DIDL-Lite metadata extraction
//!
//! DIDL-Lite as carried in `CurrentTrackMetaData`:
//! ```xml
//! <DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" ...>
//!   <item id="-1" parentID="-1">
//!     <upnp:class>object.item.audioItem.musicTrack</upnp:class>
//!     <dc:title>Song Title</dc:title>
//!     <upnp:artist>Artist Name</upnp:artist>
//!   </item>
//! </DIDL-Lite>
//! ```

use crate::common::xml_decode::{self, Node};
use crate::error::{ParseResult, ParseStage};
use crate::track::{Track, TrackField};

/// Value renderers put in `CurrentTrackMetaData@val` when they have no metadata
pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Parse an unescaped DIDL-Lite document into a [`Track`].
///
/// The first occurrence of `upnp:class`, `dc:title` and `upnp:artist`
/// anywhere in the document wins; later duplicates and all other elements
/// are ignored. A first occurrence with no text still claims its field,
/// leaving it absent. Empty input and the `NOT_IMPLEMENTED` placeholder
/// yield the empty track.
///
/// # Errors
///
/// Returns [`crate::ParseError::MalformedMetadata`] when the document is not
/// well-formed.
pub fn parse_track_metadata(didl: &str) -> ParseResult<Track> {
    let trimmed = didl.trim();
    if trimmed.is_empty() || trimmed == NOT_IMPLEMENTED {
        return Ok(Track::empty());
    }

    let mut builder = TrackBuilder::default();
    let mut capture: Option<Capture> = None;

    xml_decode::walk(didl, |node| {
        match node {
            Node::Open { element, depth, .. } => {
                if capture.is_none() {
                    if let Some(field) = TrackField::from_tag(element.name().as_ref()) {
                        if builder.claim(field) {
                            capture = Some(Capture {
                                field,
                                depth,
                                text: String::new(),
                            });
                        }
                    }
                }
            }
            Node::Text(text) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(text);
                }
            }
            Node::Close { depth } => {
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let Some(done) = capture.take() {
                        builder.fill(done.field, done.text);
                    }
                }
            }
        }
        Ok(())
    })
    .map_err(|fault| fault.into_error(ParseStage::Metadata))?;

    Ok(builder.build())
}

/// Text collected for a field whose element is still open
struct Capture {
    field: TrackField,
    depth: usize,
    text: String,
}

/// First-wins accumulator; `None` means the field has not been seen yet
#[derive(Default)]
struct TrackBuilder {
    class: Option<Option<String>>,
    title: Option<Option<String>>,
    artist: Option<Option<String>>,
}

impl TrackBuilder {
    fn slot(&mut self, field: TrackField) -> &mut Option<Option<String>> {
        match field {
            TrackField::Class => &mut self.class,
            TrackField::Title => &mut self.title,
            TrackField::Artist => &mut self.artist,
        }
    }

    /// Mark `field` as seen; false if an earlier element already claimed it
    fn claim(&mut self, field: TrackField) -> bool {
        let slot = self.slot(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(None);
        true
    }

    fn fill(&mut self, field: TrackField, text: String) {
        *self.slot(field) = Some(Some(text));
    }

    fn build(self) -> Track {
        Track::new(
            self.class.flatten(),
            self.title.flatten(),
            self.artist.flatten(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_parse_full_item() {
        let didl = r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="-1" parentID="-1"><upnp:class>object.item.audioItem.musicTrack</upnp:class><dc:title>Help!</dc:title><upnp:artist>The Beatles</upnp:artist><upnp:album>Help!</upnp:album></item></DIDL-Lite>"#;

        let track = parse_track_metadata(didl).unwrap();
        assert_eq!(track.class(), Some("object.item.audioItem.musicTrack"));
        assert_eq!(track.title(), Some("Help!"));
        assert_eq!(track.artist(), Some("The Beatles"));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let didl = r#"<item><dc:title>First</dc:title><dc:title>Second</dc:title><upnp:artist>A</upnp:artist><upnp:artist>B</upnp:artist></item>"#;

        let track = parse_track_metadata(didl).unwrap();
        assert_eq!(track.title(), Some("First"));
        assert_eq!(track.artist(), Some("A"));
    }

    #[test]
    fn test_empty_first_occurrence_claims_field() {
        let didl = r#"<item><dc:title/><dc:title>Later</dc:title></item>"#;

        let track = parse_track_metadata(didl).unwrap();
        assert_eq!(track.title(), None);
    }

    #[test]
    fn test_prefixes_matched_literally() {
        let didl = r#"<item><title>No prefix</title><x:title>Other prefix</x:title><dc:creator>Creator</dc:creator></item>"#;

        let track = parse_track_metadata(didl).unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn test_entities_and_cdata_in_text() {
        let didl = r#"<item><dc:title>Rock &amp; Roll</dc:title><upnp:artist><![CDATA[AC/DC]]></upnp:artist></item>"#;

        let track = parse_track_metadata(didl).unwrap();
        assert_eq!(track.title(), Some("Rock & Roll"));
        assert_eq!(track.artist(), Some("AC/DC"));
    }

    #[test]
    fn test_placeholders_yield_empty_track() {
        assert!(parse_track_metadata("").unwrap().is_empty());
        assert!(parse_track_metadata("   ").unwrap().is_empty());
        assert!(parse_track_metadata(NOT_IMPLEMENTED).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_metadata() {
        let result = parse_track_metadata("<item><dc:title>Broken</item>");
        assert!(matches!(result, Err(ParseError::MalformedMetadata { .. })));
    }
}
