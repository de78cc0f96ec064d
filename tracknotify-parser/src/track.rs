//! Now-playing track record

use serde::{Deserialize, Serialize};

/// UPnP object class used by renderers for broadcast (radio) streams
pub const AUDIO_BROADCAST_CLASS: &str = "object.item.audioItem.audioBroadcast";

/// The DIDL-Lite fields a [`Track`] is built from.
///
/// Tags are matched literally, prefix included; no namespace URI resolution
/// is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackField {
    /// `upnp:class`
    Class,
    /// `dc:title`
    Title,
    /// `upnp:artist`
    Artist,
}

impl TrackField {
    /// All recognized fields
    pub const ALL: [TrackField; 3] = [TrackField::Class, TrackField::Title, TrackField::Artist];

    /// The qualified tag name this field is read from
    pub fn tag(self) -> &'static str {
        match self {
            TrackField::Class => "upnp:class",
            TrackField::Title => "dc:title",
            TrackField::Artist => "upnp:artist",
        }
    }

    /// Map a qualified element name to a field
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"upnp:class" => Some(TrackField::Class),
            b"dc:title" => Some(TrackField::Title),
            b"upnp:artist" => Some(TrackField::Artist),
            _ => None,
        }
    }
}

/// Metadata for the track a renderer is currently playing.
///
/// Every field is either a non-empty string or absent. A track with every
/// field absent is the empty sentinel; a track is only worth announcing
/// when it has a title or an artist (see [`Track::is_actionable`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTrack")]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artist: Option<String>,
}

impl Track {
    /// Create a track, treating empty or whitespace-only values as absent
    pub fn new(class: Option<String>, title: Option<String>, artist: Option<String>) -> Self {
        Self {
            class: normalize(class),
            title: normalize(title),
            artist: normalize(artist),
        }
    }

    /// The empty sentinel
    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a copy with the class replaced
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = normalize(Some(class));
        self
    }

    /// Return a copy with the title replaced
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = normalize(Some(title));
        self
    }

    /// Return a copy with the artist replaced
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = normalize(Some(artist));
        self
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    /// True when every field is absent
    pub fn is_empty(&self) -> bool {
        self.class.is_none() && self.title.is_none() && self.artist.is_none()
    }

    /// True when the track carries a title or an artist
    pub fn is_actionable(&self) -> bool {
        self.title.is_some() || self.artist.is_some()
    }

    /// True for broadcast streams such as internet radio
    pub fn is_broadcast(&self) -> bool {
        self.class.as_deref() == Some(AUDIO_BROADCAST_CLASS)
    }

    /// Human readable "now playing" line, `None` without title and artist
    pub fn now_playing(&self) -> Option<String> {
        match (self.title(), self.artist()) {
            (Some(title), Some(artist)) => Some(format!("Playing {title} by {artist}")),
            (Some(title), None) => Some(format!("Playing {title}")),
            (None, Some(artist)) => Some(format!("Playing {artist}")),
            (None, None) => None,
        }
    }
}

/// Deserialized fields before blank values are dropped
#[derive(Deserialize)]
struct RawTrack {
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        Track::new(raw.class, raw.title, raw.artist)
    }
}

fn normalize(value: Option<impl Into<String>>) -> Option<String> {
    let value = value?.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sentinel() {
        let track = Track::empty();
        assert!(track.is_empty());
        assert!(!track.is_actionable());
        assert_eq!(track.now_playing(), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let track = Track::new(Some("  ".into()), Some(String::new()), Some("\n".into()));
        assert!(track.is_empty());

        let track = Track::empty().with_title("  Help!  ");
        assert_eq!(track.title(), Some("Help!"));
    }

    #[test]
    fn test_class_only_is_not_actionable() {
        let track = Track::empty().with_class("object.item.audioItem.musicTrack");
        assert!(!track.is_empty());
        assert!(!track.is_actionable());
    }

    #[test]
    fn test_now_playing_variants() {
        let both = Track::empty().with_title("Help!").with_artist("The Beatles");
        assert_eq!(both.now_playing().as_deref(), Some("Playing Help! by The Beatles"));

        let title = Track::empty().with_title("Radio Paradise");
        assert_eq!(title.now_playing().as_deref(), Some("Playing Radio Paradise"));

        let artist = Track::empty().with_artist("Nina Simone");
        assert_eq!(artist.now_playing().as_deref(), Some("Playing Nina Simone"));
    }

    #[test]
    fn test_equality_covers_class() {
        let a = Track::empty().with_title("Help!").with_class("object.item.audioItem.musicTrack");
        let b = a.clone().with_class(AUDIO_BROADCAST_CLASS);
        assert_ne!(a, b);
        assert!(b.is_broadcast());
        assert!(!a.is_broadcast());
    }

    #[test]
    fn test_field_tags() {
        for field in TrackField::ALL {
            assert_eq!(TrackField::from_tag(field.tag().as_bytes()), Some(field));
        }
        assert_eq!(TrackField::from_tag(b"title"), None);
        assert_eq!(TrackField::from_tag(b"dc:creator"), None);
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let track = Track::empty().with_title("Help!");
        let json = serde_json::to_string(&track).unwrap();
        assert_eq!(json, r#"{"title":"Help!"}"#);

        let parsed: Track = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, track);
    }

    #[test]
    fn test_deserialize_drops_blank_values() {
        let parsed: Track =
            serde_json::from_str(r#"{"class":"","title":"  ","artist":" Nina Simone "}"#).unwrap();
        assert_eq!(parsed.class(), None);
        assert_eq!(parsed.title(), None);
        assert_eq!(parsed.artist(), Some("Nina Simone"));

        let blank: Track = serde_json::from_str(r#"{"title":"  "}"#).unwrap();
        assert!(blank.is_empty());
        assert_eq!(blank, Track::empty());
    }
}
